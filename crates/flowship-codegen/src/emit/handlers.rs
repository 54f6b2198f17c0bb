// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Task handlers and the job-worker registration table.

use flowship_bpmn::ImplementationKind;
use proc_macro2::TokenStream;
use quote::quote;

use super::render;
use crate::context::{EmitContext, HandlerKind, HandlerPlan};

/// `src/handlers/mod.rs`
pub fn emit_mod(ctx: &EmitContext<'_>) -> String {
    let modules: Vec<TokenStream> = ctx
        .handlers
        .iter()
        .map(|h| {
            let module = h.module_ident();
            let type_ident = h.type_ident();
            quote! {
                pub mod #module;
                pub use #module::#type_ident;
            }
        })
        .collect();

    // One registration per task type; the first task declaring a type wins
    let mut seen: Vec<&str> = Vec::new();
    let workers: Vec<&HandlerPlan> = ctx
        .service_tasks()
        .filter(|h| {
            if seen.contains(&h.task_type.as_str()) {
                false
            } else {
                seen.push(&h.task_type);
                true
            }
        })
        .collect();

    let registrations = workers.iter().map(|h| {
        let task_id = &h.task_id;
        let task_type = &h.task_type;
        let (implementation, retries) = match &h.kind {
            HandlerKind::Service {
                implementation,
                retries,
            } => (implementation.as_str(), *retries),
            HandlerKind::User { .. } => ("user-task", 0),
        };
        quote! {
            WorkerRegistration {
                task_id: #task_id,
                task_type: #task_type,
                implementation: #implementation,
                retries: #retries,
            },
        }
    });

    let dispatch_arms = workers.iter().map(|h| {
        let task_type = &h.task_type;
        let type_ident = h.type_ident();
        quote! {
            #task_type => #type_ident::handle(variables).await,
        }
    });

    let user_task_types = ctx
        .handlers
        .iter()
        .filter(|h| !h.is_service())
        .map(|h| h.task_type.as_str());

    let tokens = quote! {
        #(#modules)*

        use std::time::Duration;

        use serde_json::Value;

        use crate::engine::{EngineClient, key_of};

        /// Errors raised by task handlers.
        #[derive(Debug, thiserror::Error)]
        pub enum HandlerError {
            #[error("no handler registered for task type '{0}'")]
            UnknownTaskType(String),
            #[error("{0}")]
            Failed(String),
        }

        /// Job worker registration for one service task type.
        #[derive(Debug, Clone, Copy)]
        pub struct WorkerRegistration {
            pub task_id: &'static str,
            pub task_type: &'static str,
            pub implementation: &'static str,
            pub retries: u32,
        }

        /// Service task types this service works on.
        pub const WORKERS: &[WorkerRegistration] = &[
            #(#registrations)*
        ];

        /// User task types; completed through the task inbox, never by this service.
        pub const USER_TASK_TYPES: &[&str] = &[#(#user_task_types),*];

        /// Route a job to its handler by task type.
        pub async fn dispatch(task_type: &str, variables: Value) -> Result<Value, HandlerError> {
            match task_type {
                #(#dispatch_arms)*
                other => {
                    let _ = variables;
                    Err(HandlerError::UnknownTaskType(other.to_string()))
                }
            }
        }

        /// Poll the engine for jobs of every registered type until the process exits.
        pub async fn run_workers(engine: EngineClient, worker_name: String, poll_interval: Duration) {
            if WORKERS.is_empty() {
                tracing::info!("No service tasks registered; job worker not started");
                return;
            }
            loop {
                for registration in WORKERS {
                    match engine.activate_jobs(registration.task_type, &worker_name, 10).await {
                        Ok(jobs) => {
                            for job in jobs {
                                process_job(&engine, registration, job).await;
                            }
                        }
                        Err(err) => {
                            tracing::warn!(task_type = registration.task_type, error = %err, "Job activation failed");
                        }
                    }
                }
                tokio::time::sleep(poll_interval).await;
            }
        }

        async fn process_job(engine: &EngineClient, registration: &WorkerRegistration, job: Value) {
            let job_key = key_of(&job, "jobKey");
            let variables = job.get("variables").cloned().unwrap_or(Value::Null);
            let remaining = job
                .get("retries")
                .and_then(Value::as_u64)
                .map(|r| r as u32)
                .unwrap_or(registration.retries);

            let outcome = match dispatch(registration.task_type, variables).await {
                Ok(output) => engine.complete_job(&job_key, output).await,
                Err(err) => {
                    tracing::warn!(job_key = %job_key, task_type = registration.task_type, error = %err, "Job failed");
                    engine
                        .fail_job(&job_key, remaining.saturating_sub(1), &err.to_string())
                        .await
                }
            };

            if let Err(err) = outcome {
                tracing::error!(job_key = %job_key, error = %err, "Failed to report job outcome");
            }
        }
    };
    render(ctx, tokens)
}

/// `src/handlers/{task}_handler.rs`
pub fn emit_handler(ctx: &EmitContext<'_>, handler: &HandlerPlan) -> String {
    let tokens = match &handler.kind {
        HandlerKind::User {
            assignment,
            form_key,
        } => {
            let assignee = optional_str(assignment.assignee.as_deref());
            let form_key = optional_str(form_key.as_deref());
            let groups = &assignment.candidate_groups;
            let users = &assignment.candidate_users;
            emit_user_handler(handler, quote! {
                pub const ASSIGNEE: Option<&'static str> = #assignee;
                pub const CANDIDATE_GROUPS: &'static [&'static str] = &[#(#groups),*];
                pub const CANDIDATE_USERS: &'static [&'static str] = &[#(#users),*];
                pub const FORM_KEY: Option<&'static str> = #form_key;
            })
        }
        HandlerKind::Service {
            implementation,
            retries,
        } => emit_service_handler(handler, *implementation, *retries),
    };
    render(ctx, tokens)
}

fn emit_user_handler(handler: &HandlerPlan, assignment: TokenStream) -> TokenStream {
    let type_ident = handler.type_ident();
    let task_id = &handler.task_id;
    let task_type = &handler.task_type;
    let doc = format!("Handler for user task '{}'{}.", task_id, name_suffix(handler));

    quote! {
        #[doc = #doc]
        ///
        /// User tasks are completed through the task inbox form-submission API, not by
        /// this service. The handler only carries the task's routing metadata.
        pub struct #type_ident;

        impl #type_ident {
            pub const TASK_ID: &'static str = #task_id;
            pub const TASK_TYPE: &'static str = #task_type;
            #assignment

            /// No-op: completion arrives via the form-submission API.
            pub fn on_created(instance_key: &str) {
                tracing::debug!(task_id = Self::TASK_ID, instance_key, "User task awaiting form submission");
            }
        }
    }
}

fn emit_service_handler(
    handler: &HandlerPlan,
    implementation: ImplementationKind,
    retries: u32,
) -> TokenStream {
    let type_ident = handler.type_ident();
    let task_id = &handler.task_id;
    let task_type = &handler.task_type;
    let kind = implementation.as_str();
    let doc = format!(
        "Handler for service task '{}'{} ({}).",
        task_id,
        name_suffix(handler),
        kind
    );

    let (todo, body) = match implementation {
        ImplementationKind::RestCall => (
            "TODO: call the REST endpoint for this task and map its response into process variables.",
            quote! {
                tracing::warn!(task_id = Self::TASK_ID, "REST call not implemented; completing without output");
                let _ = variables;
                Ok(json!({}))
            },
        ),
        ImplementationKind::MessagePublish => (
            "TODO: publish the outgoing message for this task.",
            quote! {
                tracing::warn!(task_id = Self::TASK_ID, "Message publication not implemented");
                let _ = variables;
                Ok(json!({ "published": false }))
            },
        ),
        ImplementationKind::Script => (
            "TODO: port the task's script; variables pass through unchanged until then.",
            quote! {
                tracing::warn!(task_id = Self::TASK_ID, "Script not implemented; passing variables through");
                Ok(variables)
            },
        ),
        ImplementationKind::JobWorker => (
            "TODO: implement the business logic of this job worker.",
            quote! {
                tracing::warn!(task_id = Self::TASK_ID, "Job worker not implemented; completing without output");
                let _ = variables;
                Ok(json!({}))
            },
        ),
    };

    quote! {
        #[allow(unused_imports)]
        use serde_json::{Value, json};

        use super::HandlerError;

        #[doc = #doc]
        pub struct #type_ident;

        impl #type_ident {
            pub const TASK_ID: &'static str = #task_id;
            pub const TASK_TYPE: &'static str = #task_type;
            pub const IMPLEMENTATION: &'static str = #kind;
            /// Retries registered with the engine for this task's jobs.
            pub const RETRIES: u32 = #retries;

            #[doc = #todo]
            pub async fn handle(variables: Value) -> Result<Value, HandlerError> {
                #body
            }
        }
    }
}

fn optional_str(value: Option<&str>) -> TokenStream {
    match value {
        Some(v) => quote! { Some(#v) },
        None => quote! { None },
    }
}

fn name_suffix(handler: &HandlerPlan) -> String {
    handler
        .task_name
        .as_deref()
        .map(|name| format!(" ({})", name))
        .unwrap_or_default()
}
