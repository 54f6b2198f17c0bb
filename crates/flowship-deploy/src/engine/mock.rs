// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! In-memory engine for testing.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::{EngineError, ProcessEngineClient, Result};

/// A definition received by [`MockEngineClient::deploy_definition`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployedResource {
    pub resource_name: String,
    pub content: Vec<u8>,
    pub deployment_key: String,
}

#[derive(Debug, Default)]
struct State {
    deployments: Vec<DeployedResource>,
    instances: Vec<(String, String, Value)>,
    cancelled: Vec<String>,
    messages: Vec<(String, String, Value)>,
}

/// Records calls and answers with sequential keys.
#[derive(Debug, Clone, Default)]
pub struct MockEngineClient {
    state: Arc<Mutex<State>>,
    /// If set, every call fails with this message.
    pub fail_with: Option<String>,
}

impl MockEngineClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock engine that rejects every request.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            fail_with: Some(message.into()),
            ..Self::default()
        }
    }

    pub async fn deployments(&self) -> Vec<DeployedResource> {
        self.state.lock().await.deployments.clone()
    }

    /// `(instance key, process id, variables)` of created instances.
    pub async fn instances(&self) -> Vec<(String, String, Value)> {
        self.state.lock().await.instances.clone()
    }

    pub async fn cancelled(&self) -> Vec<String> {
        self.state.lock().await.cancelled.clone()
    }

    /// `(name, correlation key, variables)` of published messages.
    pub async fn messages(&self) -> Vec<(String, String, Value)> {
        self.state.lock().await.messages.clone()
    }

    fn check(&self) -> Result<()> {
        match &self.fail_with {
            Some(message) => Err(EngineError::Rejected {
                status: 500,
                body: message.clone(),
            }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ProcessEngineClient for MockEngineClient {
    async fn deploy_definition(&self, bpmn: &[u8], resource_name: &str) -> Result<String> {
        self.check()?;
        let mut state = self.state.lock().await;
        let deployment_key = format!("mock-deployment-{}", state.deployments.len() + 1);
        state.deployments.push(DeployedResource {
            resource_name: resource_name.to_string(),
            content: bpmn.to_vec(),
            deployment_key: deployment_key.clone(),
        });
        Ok(deployment_key)
    }

    async fn create_instance(&self, process_id: &str, variables: Value) -> Result<String> {
        self.check()?;
        let mut state = self.state.lock().await;
        let key = format!("mock-instance-{}", state.instances.len() + 1);
        state
            .instances
            .push((key.clone(), process_id.to_string(), variables));
        Ok(key)
    }

    async fn cancel_instance(&self, instance_key: &str) -> Result<()> {
        self.check()?;
        self.state
            .lock()
            .await
            .cancelled
            .push(instance_key.to_string());
        Ok(())
    }

    async fn publish_message(&self, name: &str, correlation_key: &str, variables: Value) -> Result<()> {
        self.check()?;
        self.state.lock().await.messages.push((
            name.to_string(),
            correlation_key.to_string(),
            variables,
        ));
        Ok(())
    }
}
