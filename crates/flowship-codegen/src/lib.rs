// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Flowship Code Generator
//!
//! Turns a parsed [`WorkflowModel`] into the source bundle of a standalone
//! microservice that starts, inspects and cancels instances of the process on a
//! process engine and runs job workers for its service tasks.
//!
//! Generation is a pure function of its inputs: no I/O, no clocks, no random ids.
//! The same model and metadata always yield byte-identical files, so the bundle
//! checksum can be used to detect drift between deployments.
//!
//! # Bundle layout
//!
//! | Path | Content |
//! |------|---------|
//! | `Cargo.toml` | build manifest |
//! | `config/application.toml` | runtime configuration |
//! | `src/main.rs` | service bootstrap |
//! | `src/controller.rs` | HTTP routes |
//! | `src/service.rs` | start / status / cancel / publish |
//! | `src/engine.rs` | engine REST client |
//! | `src/handlers/mod.rs` | worker registration table |
//! | `src/handlers/{task}_handler.rs` | one per user and service task |
//! | `src/contracts/{mod,request,response}.rs` | request and response contracts |
//! | `resources/{processId}.bpmn` | the original document, verbatim |

pub mod bundle;
pub mod context;
pub mod emit;
pub mod error;
pub mod manifest;
pub mod naming;
pub mod types;

use flowship_bpmn::WorkflowModel;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub use bundle::GeneratedCode;
pub use error::CodegenError;
pub use naming::{kebab_case, package_safe, pascal_case, rust_ident, sanitize_ident, snake_case};
pub use types::{RequestField, RustType, request_fields};

use context::EmitContext;

/// Attributes of the workflow definition that feed generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowMetadata {
    pub workflow_name: String,
    pub version: i32,
    /// The source document, shipped unchanged with the service.
    pub bpmn_xml: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Generate the service bundle for a model.
///
/// # Errors
///
/// Returns [`CodegenError::Template`] only if an embedded template is broken.
pub fn generate(
    metadata: &WorkflowMetadata,
    model: &WorkflowModel,
) -> Result<GeneratedCode, CodegenError> {
    let ctx = EmitContext::new(metadata, model);
    let mut code = GeneratedCode::new(ctx.package_name.clone(), model.process_id.clone());

    code.insert("Cargo.toml", manifest::render_cargo_toml(&ctx)?);
    code.insert(
        "config/application.toml",
        manifest::render_application_toml(&ctx)?,
    );

    code.insert("src/main.rs", emit::entrypoint::emit(&ctx));
    code.insert("src/controller.rs", emit::controller::emit(&ctx));
    code.insert("src/service.rs", emit::service::emit(&ctx));
    code.insert("src/engine.rs", emit::engine::emit(&ctx));

    code.insert("src/handlers/mod.rs", emit::handlers::emit_mod(&ctx));
    for handler in &ctx.handlers {
        code.insert(handler.path(), emit::handlers::emit_handler(&ctx, handler));
    }

    code.insert("src/contracts/mod.rs", emit::contracts::emit_mod(&ctx));
    code.insert("src/contracts/request.rs", emit::contracts::emit_request(&ctx));
    code.insert("src/contracts/response.rs", emit::contracts::emit_response(&ctx));

    code.insert(ctx.resource_path(), metadata.bpmn_xml.clone());

    debug!(
        process_id = %model.process_id,
        package = %code.package_name,
        files = code.files.len(),
        handlers = ctx.handlers.len(),
        "Generated service bundle"
    );

    Ok(code)
}
