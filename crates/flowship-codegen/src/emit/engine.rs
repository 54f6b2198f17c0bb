// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Process-engine REST client used by the generated service and workers.

use quote::quote;

use super::render;
use crate::context::EmitContext;

/// `src/engine.rs`
pub fn emit(ctx: &EmitContext<'_>) -> String {
    let tokens = quote! {
        use serde_json::{Value, json};

        /// Errors talking to the process engine.
        #[derive(Debug, thiserror::Error)]
        pub enum EngineError {
            #[error("engine request failed: {0}")]
            Http(#[from] reqwest::Error),
        }

        /// Thin client over the engine's REST API.
        #[derive(Debug, Clone)]
        pub struct EngineClient {
            http: reqwest::Client,
            base_url: String,
            token: Option<String>,
        }

        impl EngineClient {
            pub fn new(base_url: impl Into<String>, token: Option<String>) -> Self {
                Self {
                    http: reqwest::Client::new(),
                    base_url: base_url.into(),
                    token,
                }
            }

            fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
                let url = format!("{}{}", self.base_url.trim_end_matches('/'), path);
                let builder = self.http.request(method, url);
                match &self.token {
                    Some(token) => builder.bearer_auth(token),
                    None => builder,
                }
            }

            pub async fn create_instance(
                &self,
                process_id: &str,
                variables: Value,
            ) -> Result<String, EngineError> {
                let body = json!({ "processDefinitionId": process_id, "variables": variables });
                let payload: Value = self
                    .request(reqwest::Method::POST, "/v2/process-instances")
                    .json(&body)
                    .send()
                    .await?
                    .error_for_status()?
                    .json()
                    .await?;
                Ok(key_of(&payload, "processInstanceKey"))
            }

            pub async fn get_instance(&self, key: &str) -> Result<Value, EngineError> {
                let payload = self
                    .request(reqwest::Method::GET, &format!("/v2/process-instances/{}", key))
                    .send()
                    .await?
                    .error_for_status()?
                    .json()
                    .await?;
                Ok(payload)
            }

            pub async fn cancel_instance(&self, key: &str) -> Result<(), EngineError> {
                self.request(
                    reqwest::Method::POST,
                    &format!("/v2/process-instances/{}/cancellation", key),
                )
                .send()
                .await?
                .error_for_status()?;
                Ok(())
            }

            pub async fn publish_message(
                &self,
                name: &str,
                correlation_key: &str,
                variables: Value,
            ) -> Result<(), EngineError> {
                let body = json!({
                    "name": name,
                    "correlationKey": correlation_key,
                    "variables": variables,
                });
                self.request(reqwest::Method::POST, "/v2/messages/publication")
                    .json(&body)
                    .send()
                    .await?
                    .error_for_status()?;
                Ok(())
            }

            pub async fn activate_jobs(
                &self,
                job_type: &str,
                worker: &str,
                max_jobs: u32,
            ) -> Result<Vec<Value>, EngineError> {
                let body = json!({
                    "type": job_type,
                    "worker": worker,
                    "timeout": 300000,
                    "maxJobsToActivate": max_jobs,
                });
                let payload: Value = self
                    .request(reqwest::Method::POST, "/v2/jobs/activation")
                    .json(&body)
                    .send()
                    .await?
                    .error_for_status()?
                    .json()
                    .await?;
                Ok(payload
                    .get("jobs")
                    .and_then(Value::as_array)
                    .cloned()
                    .unwrap_or_default())
            }

            pub async fn complete_job(&self, job_key: &str, variables: Value) -> Result<(), EngineError> {
                self.request(reqwest::Method::POST, &format!("/v2/jobs/{}/completion", job_key))
                    .json(&json!({ "variables": variables }))
                    .send()
                    .await?
                    .error_for_status()?;
                Ok(())
            }

            pub async fn fail_job(
                &self,
                job_key: &str,
                retries: u32,
                message: &str,
            ) -> Result<(), EngineError> {
                self.request(reqwest::Method::POST, &format!("/v2/jobs/{}/failure", job_key))
                    .json(&json!({ "retries": retries, "errorMessage": message }))
                    .send()
                    .await?
                    .error_for_status()?;
                Ok(())
            }
        }

        /// Engine keys arrive as strings or numbers depending on the API version.
        pub fn key_of(payload: &Value, field: &str) -> String {
            match payload.get(field) {
                Some(Value::String(key)) => key.clone(),
                Some(Value::Null) | None => String::new(),
                Some(other) => other.to_string(),
            }
        }
    };
    render(ctx, tokens)
}
