// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! REST client for engines exposing the Camunda 8 `/v2` API.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, info};

use super::{EngineError, ProcessEngineClient, Result, key_of};

/// Engine endpoint settings.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Base URL, e.g. `http://zeebe-gateway:8080`.
    pub url: String,
    /// Bearer token sent with every request.
    pub token: Option<String>,
    pub timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8080".to_string(),
            token: None,
            timeout: Duration::from_secs(30),
        }
    }
}

/// HTTP implementation of [`ProcessEngineClient`].
#[derive(Debug, Clone)]
pub struct HttpEngineClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpEngineClient {
    pub fn new(config: &EngineConfig) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            http,
            base_url: config.url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let request = self.http.request(method, format!("{}{}", self.base_url, path));
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(EngineError::Rejected {
                status: status.as_u16(),
                body,
            })
        }
    }

    async fn send_json(&self, request: reqwest::RequestBuilder) -> Result<Value> {
        let response = self.send(request).await?;
        Ok(response.json().await?)
    }
}

#[async_trait]
impl ProcessEngineClient for HttpEngineClient {
    async fn deploy_definition(&self, bpmn: &[u8], resource_name: &str) -> Result<String> {
        let part = Part::bytes(bpmn.to_vec())
            .file_name(resource_name.to_string())
            .mime_str("application/xml")?;
        let form = Form::new().part("resources", part);

        let body = self
            .send_json(self.request(reqwest::Method::POST, "/v2/deployments").multipart(form))
            .await?;

        let key = key_of(&body, "deploymentKey").ok_or_else(|| {
            EngineError::InvalidResponse(format!("missing deploymentKey in {}", body))
        })?;
        info!(resource = %resource_name, deployment_key = %key, "Process definition deployed");
        Ok(key)
    }

    async fn create_instance(&self, process_id: &str, variables: Value) -> Result<String> {
        let body = self
            .send_json(
                self.request(reqwest::Method::POST, "/v2/process-instances")
                    .json(&json!({
                        "processDefinitionId": process_id,
                        "variables": variables,
                    })),
            )
            .await?;

        let key = key_of(&body, "processInstanceKey").ok_or_else(|| {
            EngineError::InvalidResponse(format!("missing processInstanceKey in {}", body))
        })?;
        debug!(process_id = %process_id, instance_key = %key, "Process instance created");
        Ok(key)
    }

    async fn cancel_instance(&self, instance_key: &str) -> Result<()> {
        let path = format!("/v2/process-instances/{}/cancellation", instance_key);
        self.send(self.request(reqwest::Method::POST, &path).json(&json!({})))
            .await?;
        debug!(instance_key = %instance_key, "Process instance cancelled");
        Ok(())
    }

    async fn publish_message(&self, name: &str, correlation_key: &str, variables: Value) -> Result<()> {
        self.send(
            self.request(reqwest::Method::POST, "/v2/messages/publication")
                .json(&json!({
                    "name": name,
                    "correlationKey": correlation_key,
                    "variables": variables,
                })),
        )
        .await?;
        debug!(message = %name, correlation_key = %correlation_key, "Message published");
        Ok(())
    }
}
