// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error types for flowship-deploy.

use std::time::Duration;

use flowship_bpmn::ValidationResult;
use thiserror::Error;

use crate::pipeline::DeploymentStatus;

/// Deployment errors.
///
/// Stage failures inside a running pipeline are not errors: they end up on the
/// [`DeploymentRecord`](crate::model::DeploymentRecord) as `FAILED` plus a message.
/// This type covers refusals before a run starts and infrastructure faults.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Configuration loading failed.
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// External process could not be run.
    #[error("Runner error: {0}")]
    Runner(#[from] crate::runner::RunnerError),

    /// Persistence operation failed.
    #[error("Store error: {0}")]
    Store(#[from] crate::store::StoreError),

    /// Process engine call failed.
    #[error("Engine error: {0}")]
    Engine(#[from] crate::engine::EngineError),

    #[error("BPMN parse error: {0}")]
    Parse(#[from] flowship_bpmn::ParseError),

    #[error("Code generation error: {0}")]
    Codegen(#[from] flowship_codegen::CodegenError),

    /// Workflow definition was not found.
    #[error("Workflow not found: {0}")]
    WorkflowNotFound(String),

    /// Deployment record was not found.
    #[error("Deployment not found: {0}")]
    DeploymentNotFound(String),

    /// The BPMN document has blocking errors.
    #[error("BPMN validation failed: {}", .0.error_messages().join("; "))]
    Validation(ValidationResult),

    /// The operation is not allowed in the current state.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// The cluster refused the rollback; the record is unchanged.
    #[error("Rollback failed: {0}")]
    RollbackFailed(String),

    /// A wait for a deployment gave up before it reached a terminal status.
    #[error("Deployment {deployment_id} still {status} after {}s", .waited.as_secs())]
    WaitTimedOut {
        deployment_id: String,
        status: DeploymentStatus,
        waited: Duration,
    },
}

/// Result type using the deploy Error.
pub type Result<T> = std::result::Result<T, Error>;
