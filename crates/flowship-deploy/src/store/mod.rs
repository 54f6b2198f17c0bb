// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Persistence for workflow definitions, deployment records and their status
//! history.

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use thiserror::Error;

use crate::model::{DeploymentRecord, StatusTransition, WorkflowDefinition, WorkflowStatus};

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Errors from store operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored value could not be mapped back onto the model.
    #[error("Corrupt row: {0}")]
    Corrupt(String),

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Storage used by the orchestrator.
#[async_trait]
pub trait DeploymentStore: Send + Sync {
    /// Insert or replace a workflow definition.
    async fn save_workflow(&self, workflow: &WorkflowDefinition) -> Result<()>;

    async fn get_workflow(&self, id: &str) -> Result<Option<WorkflowDefinition>>;

    /// Newest first.
    async fn list_workflows(&self) -> Result<Vec<WorkflowDefinition>>;

    /// Fails with [`StoreError::NotFound`] for unknown ids.
    async fn update_workflow_status(&self, id: &str, status: WorkflowStatus) -> Result<()>;

    async fn insert_deployment(&self, record: &DeploymentRecord) -> Result<()>;

    /// Overwrite the mutable fields of an existing record.
    async fn update_deployment(&self, record: &DeploymentRecord) -> Result<()>;

    async fn get_deployment(&self, id: &str) -> Result<Option<DeploymentRecord>>;

    /// Newest first, optionally restricted to one workflow.
    async fn list_deployments(&self, workflow_id: Option<&str>) -> Result<Vec<DeploymentRecord>>;

    async fn append_transition(&self, transition: &StatusTransition) -> Result<()>;

    /// In the order they were appended.
    async fn list_transitions(&self, deployment_id: &str) -> Result<Vec<StatusTransition>>;
}
