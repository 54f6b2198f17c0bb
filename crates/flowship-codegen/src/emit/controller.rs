// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! HTTP controller exposing the service operations.

use quote::quote;

use super::render;
use crate::context::EmitContext;

/// `src/controller.rs`
pub fn emit(ctx: &EmitContext<'_>) -> String {
    let controller = ctx.controller_ident();
    let service = ctx.service_ident();
    let request = ctx.request_ident();

    let tokens = quote! {
        use axum::{
            Json, Router,
            extract::{Path, State},
            http::StatusCode,
            response::{IntoResponse, Response},
            routing::{get, post},
        };
        use serde::Deserialize;
        use serde_json::{Value, json};

        use crate::contracts::{#request, ProcessInstanceResponse};
        use crate::engine::EngineError;
        use crate::service::#service;

        /// Routes: `POST /instances`, `GET|DELETE /instances/{key}`, `POST /messages`.
        pub struct #controller;

        impl #controller {
            pub fn router(service: #service) -> Router {
                Router::new()
                    .route("/instances", post(start_instance))
                    .route("/instances/{key}", get(get_instance).delete(cancel_instance))
                    .route("/messages", post(publish_message))
                    .route("/health", get(health))
                    .with_state(service)
            }
        }

        #[derive(Debug, Deserialize)]
        #[serde(rename_all = "camelCase")]
        pub struct PublishMessageRequest {
            pub name: String,
            pub correlation_key: String,
            #[serde(default)]
            pub variables: Value,
        }

        async fn start_instance(
            State(service): State<#service>,
            Json(request): Json<#request>,
        ) -> Result<(StatusCode, Json<ProcessInstanceResponse>), ApiError> {
            let response = service.start_process(request).await?;
            Ok((StatusCode::CREATED, Json(response)))
        }

        async fn get_instance(
            State(service): State<#service>,
            Path(key): Path<String>,
        ) -> Result<Json<Value>, ApiError> {
            Ok(Json(service.get_instance(&key).await?))
        }

        async fn cancel_instance(
            State(service): State<#service>,
            Path(key): Path<String>,
        ) -> Result<StatusCode, ApiError> {
            service.cancel_instance(&key).await?;
            Ok(StatusCode::NO_CONTENT)
        }

        async fn publish_message(
            State(service): State<#service>,
            Json(request): Json<PublishMessageRequest>,
        ) -> Result<StatusCode, ApiError> {
            service
                .publish_message(&request.name, &request.correlation_key, request.variables)
                .await?;
            Ok(StatusCode::ACCEPTED)
        }

        async fn health() -> Json<Value> {
            Json(json!({ "status": "UP", "processId": crate::service::PROCESS_ID }))
        }

        /// Engine failures surface as 502 with the error text.
        pub struct ApiError(EngineError);

        impl From<EngineError> for ApiError {
            fn from(err: EngineError) -> Self {
                Self(err)
            }
        }

        impl IntoResponse for ApiError {
            fn into_response(self) -> Response {
                tracing::warn!(error = %self.0, "Engine request failed");
                (
                    StatusCode::BAD_GATEWAY,
                    Json(json!({ "error": self.0.to_string() })),
                )
                    .into_response()
            }
        }
    };
    render(ctx, tokens)
}
