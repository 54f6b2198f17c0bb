// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Build manifest and runtime configuration of the generated service.
//!
//! Non-Rust files are rendered from embedded templates. String values are passed
//! pre-quoted so that arbitrary names stay valid TOML.

use minijinja::{Environment, context};
use serde::Serialize;

use crate::context::{EmitContext, HandlerKind};
use crate::error::CodegenError;

const CARGO_TEMPLATE: &str = include_str!("../templates/Cargo.toml.j2");
const APPLICATION_TEMPLATE: &str = include_str!("../templates/application.toml.j2");

/// Port the generated service listens on.
pub const SERVICE_PORT: u16 = 8080;

/// Engine URL baked into the default configuration.
pub const DEFAULT_ENGINE_URL: &str = "http://zeebe-gateway:8080";

#[derive(Serialize)]
struct TaskEntry {
    id: String,
    task_type: String,
}

#[derive(Serialize)]
struct WorkerEntry {
    id: String,
    task_type: String,
    implementation: &'static str,
    retries: u32,
}

/// `Cargo.toml`
pub fn render_cargo_toml(ctx: &EmitContext<'_>) -> Result<String, CodegenError> {
    let description = ctx
        .metadata
        .description
        .clone()
        .unwrap_or_else(|| format!("Generated service for process '{}'", ctx.model.process_id));

    render(
        "Cargo.toml",
        CARGO_TEMPLATE,
        context! {
            package_name => &ctx.package_name,
            crate_version => crate_version(ctx.metadata.version),
            description => toml_string(&description),
        },
    )
}

/// `config/application.toml`
pub fn render_application_toml(ctx: &EmitContext<'_>) -> Result<String, CodegenError> {
    let user_tasks: Vec<TaskEntry> = ctx
        .handlers
        .iter()
        .filter(|h| !h.is_service())
        .map(|h| TaskEntry {
            id: toml_string(&h.task_id),
            task_type: toml_string(&h.task_type),
        })
        .collect();

    let workers: Vec<WorkerEntry> = ctx
        .handlers
        .iter()
        .filter_map(|h| match &h.kind {
            HandlerKind::Service {
                implementation,
                retries,
            } => Some(WorkerEntry {
                id: toml_string(&h.task_id),
                task_type: toml_string(&h.task_type),
                implementation: implementation.as_str(),
                retries: *retries,
            }),
            HandlerKind::User { .. } => None,
        })
        .collect();

    render(
        "application.toml",
        APPLICATION_TEMPLATE,
        context! {
            package_name => &ctx.package_name,
            process_id => toml_string(&ctx.model.process_id),
            process_name => toml_string(&ctx.model.process_name),
            workflow_name => toml_string(&ctx.metadata.workflow_name),
            version => ctx.metadata.version,
            resource_path => toml_string(&ctx.resource_path()),
            port => SERVICE_PORT,
            engine_url => DEFAULT_ENGINE_URL,
            poll_interval_ms => 1000,
            user_tasks => user_tasks,
            workers => workers,
        },
    )
}

fn render(name: &str, source: &str, ctx: minijinja::Value) -> Result<String, CodegenError> {
    let mut env = Environment::new();
    env.set_keep_trailing_newline(true);
    env.add_template(name, source)
        .map_err(|e| CodegenError::template(name, e))?;
    let template = env
        .get_template(name)
        .map_err(|e| CodegenError::template(name, e))?;
    template
        .render(ctx)
        .map_err(|e| CodegenError::template(name, e))
}

/// Workflow versions are integers; the generated crate uses them as the major version.
fn crate_version(version: i32) -> String {
    format!("{}.0.0", version.max(0))
}

/// Quote a string as a TOML basic string.
pub(crate) fn toml_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => out.push_str(&format!("\\u{:04X}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
