// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! `src/main.rs` of the generated service.

use quote::quote;

use super::render;
use crate::context::EmitContext;

pub fn emit(ctx: &EmitContext<'_>) -> String {
    let controller = ctx.controller_ident();
    let service = ctx.service_ident();

    let tokens = quote! {
        mod contracts;
        mod controller;
        mod engine;
        mod handlers;
        mod service;

        use std::time::Duration;

        use serde::Deserialize;
        use tracing_subscriber::EnvFilter;

        use crate::controller::#controller;
        use crate::engine::EngineClient;
        use crate::service::#service;

        #[derive(Debug, Deserialize)]
        struct AppConfig {
            server: ServerConfig,
            engine: EngineConfig,
            worker: WorkerConfig,
        }

        #[derive(Debug, Deserialize)]
        struct ServerConfig {
            bind: String,
        }

        #[derive(Debug, Deserialize)]
        struct EngineConfig {
            url: String,
            #[serde(default)]
            token: Option<String>,
        }

        #[derive(Debug, Deserialize)]
        struct WorkerConfig {
            name: String,
            poll_interval_ms: u64,
        }

        fn load_config() -> anyhow::Result<AppConfig> {
            let path = std::env::var("APP_CONFIG")
                .unwrap_or_else(|_| "config/application.toml".to_string());
            let raw = std::fs::read_to_string(&path)?;
            let mut config: AppConfig = toml::from_str(&raw)?;
            if let Ok(url) = std::env::var("ENGINE_URL") {
                config.engine.url = url;
            }
            if let Ok(token) = std::env::var("ENGINE_TOKEN") {
                config.engine.token = Some(token);
            }
            if let Ok(bind) = std::env::var("BIND_ADDR") {
                config.server.bind = bind;
            }
            Ok(config)
        }

        #[tokio::main]
        async fn main() -> anyhow::Result<()> {
            tracing_subscriber::fmt()
                .with_env_filter(
                    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
                )
                .init();

            let config = load_config()?;
            let engine = EngineClient::new(config.engine.url.clone(), config.engine.token.clone());

            tokio::spawn(handlers::run_workers(
                engine.clone(),
                config.worker.name.clone(),
                Duration::from_millis(config.worker.poll_interval_ms),
            ));

            let app = #controller::router(#service::new(engine));
            let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
            tracing::info!(
                bind = %config.server.bind,
                process_id = service::PROCESS_ID,
                definition_bytes = service::PROCESS_DEFINITION.len(),
                "Service listening"
            );
            axum::serve(listener, app).await?;
            Ok(())
        }
    };
    render(ctx, tokens)
}
