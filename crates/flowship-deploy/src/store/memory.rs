// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! In-memory store for tests and one-shot CLI runs.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::{DeploymentStore, Result, StoreError};
use crate::model::{DeploymentRecord, StatusTransition, WorkflowDefinition, WorkflowStatus};

#[derive(Debug, Default)]
struct Tables {
    workflows: Vec<WorkflowDefinition>,
    deployments: Vec<DeploymentRecord>,
    transitions: Vec<StatusTransition>,
}

/// Vectors behind a `RwLock`; insertion order is the tie-breaker for "newest".
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DeploymentStore for MemoryStore {
    async fn save_workflow(&self, workflow: &WorkflowDefinition) -> Result<()> {
        let mut tables = self.tables.write().await;
        match tables.workflows.iter_mut().find(|w| w.id == workflow.id) {
            Some(existing) => *existing = workflow.clone(),
            None => tables.workflows.push(workflow.clone()),
        }
        Ok(())
    }

    async fn get_workflow(&self, id: &str) -> Result<Option<WorkflowDefinition>> {
        let tables = self.tables.read().await;
        Ok(tables.workflows.iter().find(|w| w.id == id).cloned())
    }

    async fn list_workflows(&self) -> Result<Vec<WorkflowDefinition>> {
        let tables = self.tables.read().await;
        Ok(tables.workflows.iter().rev().cloned().collect())
    }

    async fn update_workflow_status(&self, id: &str, status: WorkflowStatus) -> Result<()> {
        let mut tables = self.tables.write().await;
        let workflow = tables
            .workflows
            .iter_mut()
            .find(|w| w.id == id)
            .ok_or_else(|| StoreError::NotFound {
                kind: "Workflow",
                id: id.to_string(),
            })?;
        workflow.status = status;
        workflow.updated_at = Utc::now();
        Ok(())
    }

    async fn insert_deployment(&self, record: &DeploymentRecord) -> Result<()> {
        self.tables.write().await.deployments.push(record.clone());
        Ok(())
    }

    async fn update_deployment(&self, record: &DeploymentRecord) -> Result<()> {
        let mut tables = self.tables.write().await;
        let existing = tables
            .deployments
            .iter_mut()
            .find(|d| d.id == record.id)
            .ok_or_else(|| StoreError::NotFound {
                kind: "Deployment",
                id: record.id.clone(),
            })?;
        *existing = record.clone();
        Ok(())
    }

    async fn get_deployment(&self, id: &str) -> Result<Option<DeploymentRecord>> {
        let tables = self.tables.read().await;
        Ok(tables.deployments.iter().find(|d| d.id == id).cloned())
    }

    async fn list_deployments(&self, workflow_id: Option<&str>) -> Result<Vec<DeploymentRecord>> {
        let tables = self.tables.read().await;
        Ok(tables
            .deployments
            .iter()
            .rev()
            .filter(|d| workflow_id.is_none_or(|id| d.workflow_id == id))
            .cloned()
            .collect())
    }

    async fn append_transition(&self, transition: &StatusTransition) -> Result<()> {
        self.tables.write().await.transitions.push(transition.clone());
        Ok(())
    }

    async fn list_transitions(&self, deployment_id: &str) -> Result<Vec<StatusTransition>> {
        let tables = self.tables.read().await;
        Ok(tables
            .transitions
            .iter()
            .filter(|t| t.deployment_id == deployment_id)
            .cloned()
            .collect())
    }
}
