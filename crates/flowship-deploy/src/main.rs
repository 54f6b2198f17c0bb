// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Flowship - BPMN deployment pipeline CLI
//!
//! Validates and generates services offline, and registers and deploys workflow
//! definitions against the configured toolchain, registry, cluster and engine.
//! Configuration comes from the environment (and `.env`), see
//! [`flowship_deploy::DeployConfig`].

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{info, warn};

use flowship_deploy::engine::HttpEngineClient;
use flowship_deploy::runner::{ProcessRunner, SystemRunner};
use flowship_deploy::store::{DeploymentStore, SqliteStore};
use flowship_deploy::{
    DeployConfig, DeploymentRequest, DeploymentStatus, Orchestrator, WorkflowDefinition,
};

/// Flowship - ship BPMN workflows as services
#[derive(Parser)]
#[command(name = "flowship")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a BPMN document for structural problems
    Validate {
        /// Path to the BPMN file
        file: PathBuf,
    },

    /// Generate the service sources for a BPMN document into a directory
    Generate {
        /// Path to the BPMN file
        file: PathBuf,

        /// Workflow name
        #[arg(long)]
        name: String,

        /// Workflow version
        #[arg(long, default_value_t = 1)]
        version: i32,

        /// Output directory
        #[arg(long)]
        out: PathBuf,
    },

    /// Store a workflow definition so it can be deployed
    Register {
        /// Path to the BPMN file
        file: PathBuf,

        #[arg(long)]
        name: String,

        #[arg(long, default_value_t = 1)]
        version: i32,

        #[arg(long)]
        description: Option<String>,

        /// Namespace pattern overriding the configured one (`{env}` placeholder)
        #[arg(long)]
        namespace_template: Option<String>,
    },

    /// List registered workflow definitions
    Workflows,

    /// Deploy a registered workflow and follow it to completion
    Deploy {
        /// Workflow definition id
        workflow_id: String,

        /// Target environment (dev, staging, prod, ...)
        #[arg(long = "env")]
        environment: String,

        /// Who is deploying
        #[arg(long, env = "USER", default_value = "flowship")]
        user: String,

        #[arg(long, default_value_t = 500)]
        poll_interval_ms: u64,

        /// Give up waiting after this long
        #[arg(long, default_value_t = 3600)]
        wait_timeout_secs: u64,
    },

    /// Show a deployment record
    Status {
        deployment_id: String,

        /// Include the status history
        #[arg(long)]
        transitions: bool,
    },

    /// List deployments, newest first
    List {
        /// Only deployments of this workflow
        #[arg(long)]
        workflow: Option<String>,
    },

    /// Roll a deployment's cluster workload back to its previous release
    Rollback { deployment_id: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "flowship=info,flowship_deploy=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    // Load .env file if present
    if let Err(e) = dotenvy::dotenv() {
        warn!("No .env file loaded: {}", e);
    }

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { file } => validate(&file).await,
        Commands::Generate {
            file,
            name,
            version,
            out,
        } => generate(&file, name, version, &out).await,
        command => {
            let config = DeployConfig::from_env()?;
            run_with_store(config, command).await
        }
    }
}

async fn validate(file: &Path) -> anyhow::Result<()> {
    let xml = read_bpmn(file).await?;
    let report = flowship_bpmn::validate(&xml);
    print_json(&report)?;
    if !report.is_ok() {
        bail!("{} has {} validation error(s)", file.display(), report.errors.len());
    }
    Ok(())
}

async fn generate(file: &Path, name: String, version: i32, out: &Path) -> anyhow::Result<()> {
    let xml = read_bpmn(file).await?;

    let report = flowship_bpmn::validate(&xml);
    for warning in report.warning_messages() {
        warn!("{}", warning);
    }
    if !report.is_ok() {
        bail!("{}", report.error_messages().join("\n"));
    }

    let workflow = WorkflowDefinition::new(name, version, xml);
    let model = flowship_bpmn::parse(&workflow.bpmn_xml)?;
    let code = flowship_codegen::generate(&workflow.metadata(), &model)?;
    code.write_to(out)
        .with_context(|| format!("failed to write sources to {}", out.display()))?;

    info!(
        package = %code.package_name,
        files = code.files.len(),
        out = %out.display(),
        "Service sources generated"
    );
    print_json(&serde_json::json!({
        "packageName": code.package_name,
        "processId": code.process_id,
        "checksum": code.checksum(),
        "files": code.paths(),
    }))
}

async fn run_with_store(config: DeployConfig, command: Commands) -> anyhow::Result<()> {
    info!(
        database_url = %config.database_url,
        data_dir = %config.data_dir.display(),
        engine_url = %config.engine.url,
        "Starting Flowship"
    );

    tokio::fs::create_dir_all(&config.data_dir)
        .await
        .with_context(|| format!("failed to create {}", config.data_dir.display()))?;
    let store: Arc<dyn DeploymentStore> = Arc::new(SqliteStore::connect(&config.database_url).await?);

    let runner = Arc::new(SystemRunner::new());
    info!(runner_type = runner.runner_type(), "Runner initialized");
    let engine = Arc::new(HttpEngineClient::new(&config.engine)?);

    let orchestrator = Orchestrator::new(&config, store.clone(), runner, engine);

    match command {
        Commands::Register {
            file,
            name,
            version,
            description,
            namespace_template,
        } => {
            let xml = read_bpmn(&file).await?;
            let mut workflow = WorkflowDefinition::new(name, version, xml);
            if let Some(description) = description {
                workflow = workflow.with_description(description);
            }
            if let Some(template) = namespace_template {
                workflow = workflow.with_namespace_template(template);
            }
            store.save_workflow(&workflow).await?;
            info!(workflow_id = %workflow.id, name = %workflow.name, "Workflow registered");
            print_json(&workflow)
        }
        Commands::Workflows => print_json(&store.list_workflows().await?),
        Commands::Deploy {
            workflow_id,
            environment,
            user,
            poll_interval_ms,
            wait_timeout_secs,
        } => {
            let pending = orchestrator
                .trigger(DeploymentRequest {
                    workflow_id,
                    environment,
                    initiated_by: user,
                })
                .await?;
            let record = orchestrator
                .wait_for_completion(
                    &pending.id,
                    Duration::from_millis(poll_interval_ms),
                    Duration::from_secs(wait_timeout_secs),
                )
                .await?;
            print_json(&record)?;
            if record.status == DeploymentStatus::Failed {
                bail!(
                    "Deployment {} failed: {}",
                    record.id,
                    record.error.as_deref().unwrap_or("unknown error")
                );
            }
            Ok(())
        }
        Commands::Status {
            deployment_id,
            transitions,
        } => {
            let record = orchestrator.status(&deployment_id).await?;
            if transitions {
                let history = orchestrator.transitions(&deployment_id).await?;
                print_json(&serde_json::json!({ "deployment": record, "transitions": history }))
            } else {
                print_json(&record)
            }
        }
        Commands::List { workflow } => print_json(&orchestrator.list(workflow.as_deref()).await?),
        Commands::Rollback { deployment_id } => print_json(&orchestrator.rollback(&deployment_id).await?),
        Commands::Validate { .. } | Commands::Generate { .. } => Ok(()),
    }
}

async fn read_bpmn(file: &Path) -> anyhow::Result<String> {
    tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("failed to read BPMN file: {}", file.display()))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
