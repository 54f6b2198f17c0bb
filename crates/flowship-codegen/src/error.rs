// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Code generation errors.

use thiserror::Error;

/// Errors that can occur during code generation.
///
/// Generation is total over validated models; an error here is an internal bug
/// (an embedded template failed to compile or render).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodegenError {
    #[error("Template '{name}' failed to render: {reason}")]
    Template { name: String, reason: String },
}

impl CodegenError {
    pub(crate) fn template(name: &str, err: minijinja::Error) -> Self {
        CodegenError::Template {
            name: name.to_string(),
            reason: err.to_string(),
        }
    }
}
