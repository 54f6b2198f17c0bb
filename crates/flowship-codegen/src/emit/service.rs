// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Service entry file: start, status, cancel and message publication.

use quote::quote;

use super::render;
use crate::context::EmitContext;

/// `src/service.rs`
pub fn emit(ctx: &EmitContext<'_>) -> String {
    let service = ctx.service_ident();
    let request = ctx.request_ident();
    let process_id = &ctx.model.process_id;
    let process_name = &ctx.model.process_name;
    let resource = format!("/{}", ctx.resource_path());
    let service_doc = format!("Entry point for '{}' process instances.", process_name);

    let tokens = quote! {
        use serde_json::Value;

        use crate::contracts::{#request, ProcessInstanceResponse};
        use crate::engine::{EngineClient, EngineError};

        /// BPMN process id this service drives.
        pub const PROCESS_ID: &str = #process_id;

        /// The process definition shipped with this service.
        pub const PROCESS_DEFINITION: &str =
            include_str!(concat!(env!("CARGO_MANIFEST_DIR"), #resource));

        #[doc = #service_doc]
        #[derive(Debug, Clone)]
        pub struct #service {
            engine: EngineClient,
        }

        impl #service {
            pub fn new(engine: EngineClient) -> Self {
                Self { engine }
            }

            /// Start a process instance with the request's fields as process variables.
            pub async fn start_process(
                &self,
                request: #request,
            ) -> Result<ProcessInstanceResponse, EngineError> {
                let variables = request.into_variables();
                let key = self.engine.create_instance(PROCESS_ID, variables).await?;
                tracing::info!(process_id = PROCESS_ID, instance_key = %key, "Started process instance");
                Ok(ProcessInstanceResponse::new(key))
            }

            /// Current state of a process instance as reported by the engine.
            pub async fn get_instance(&self, instance_key: &str) -> Result<Value, EngineError> {
                self.engine.get_instance(instance_key).await
            }

            pub async fn cancel_instance(&self, instance_key: &str) -> Result<(), EngineError> {
                self.engine.cancel_instance(instance_key).await?;
                tracing::info!(process_id = PROCESS_ID, instance_key, "Cancelled process instance");
                Ok(())
            }

            /// Publish a correlation message to waiting instances.
            pub async fn publish_message(
                &self,
                name: &str,
                correlation_key: &str,
                variables: Value,
            ) -> Result<(), EngineError> {
                self.engine
                    .publish_message(name, correlation_key, variables)
                    .await?;
                tracing::info!(process_id = PROCESS_ID, message = name, correlation_key, "Published message");
                Ok(())
            }
        }
    };
    render(ctx, tokens)
}
