// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Process engine client.
//!
//! The engine (Zeebe, Camunda, ...) is a black box: the pipeline only deploys
//! process definitions to it. Instance operations are exposed for tooling and
//! smoke tests.

pub mod http;
pub mod mock;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

pub use http::{EngineConfig, HttpEngineClient};
pub use mock::MockEngineClient;

/// Errors from process engine calls.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EngineError {
    /// Transport-level failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The engine answered with a non-success status.
    #[error("Engine rejected request ({status}): {body}")]
    Rejected { status: u16, body: String },

    /// The engine answered successfully but without the expected fields.
    #[error("Invalid engine response: {0}")]
    InvalidResponse(String),

    /// Other error.
    #[error("{0}")]
    Other(String),
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Narrow interface to a process engine.
#[async_trait]
pub trait ProcessEngineClient: Send + Sync {
    /// Deploy a BPMN resource; returns the engine's deployment key.
    async fn deploy_definition(&self, bpmn: &[u8], resource_name: &str) -> Result<String>;

    /// Start an instance of the latest deployed version; returns the instance key.
    async fn create_instance(&self, process_id: &str, variables: Value) -> Result<String>;

    async fn cancel_instance(&self, instance_key: &str) -> Result<()>;

    async fn publish_message(&self, name: &str, correlation_key: &str, variables: Value) -> Result<()>;
}

/// Read a key that the engine may return either as a string or as a number.
pub fn key_of(value: &Value, field: &str) -> Option<String> {
    match value.get(field)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
