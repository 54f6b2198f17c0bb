// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Rust source emitters for the generated service.
//!
//! Each emitter builds a `TokenStream` with `quote!` and returns the rendered
//! source text. Comments cannot travel through a token stream, so human-readable
//! notes are emitted as `#[doc]` attributes.

pub mod contracts;
pub mod controller;
pub mod engine;
pub mod entrypoint;
pub mod handlers;
pub mod service;

use proc_macro2::TokenStream;

use crate::context::EmitContext;

/// Render tokens to source text behind a generated-file banner.
pub(crate) fn render(ctx: &EmitContext<'_>, tokens: TokenStream) -> String {
    format!(
        "// @generated by flowship-codegen from process '{}' (workflow '{}' v{}). Do not edit.\n{}\n",
        ctx.model.process_id.replace(['\n', '\r'], " "),
        ctx.metadata.workflow_name.replace(['\n', '\r'], " "),
        ctx.metadata.version,
        tokens
    )
}
