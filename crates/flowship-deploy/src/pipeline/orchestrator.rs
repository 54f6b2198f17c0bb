// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Deployment orchestrator.
//!
//! Drives a deployment record through the pipeline stages. Every state the
//! record enters is persisted together with a transition row before the stage
//! work begins, so an observer polling the store always sees the stage that is
//! currently running.

use chrono::Utc;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use super::status::{DeploymentStatus, Stage};
use super::workspace::Workspaces;
use crate::adapters::{
    BuildAdapter, ClusterAdapter, ContainerAdapter, VcsAdapter, WorkloadSpec, release_name,
};
use crate::config::DeployConfig;
use crate::engine::ProcessEngineClient;
use crate::error::{Error, Result};
use crate::model::{
    DeploymentRecord, DeploymentRequest, StatusTransition, WorkflowDefinition, WorkflowStatus,
};
use crate::runner::ProcessRunner;
use crate::store::DeploymentStore;

/// Identity of the generated service, known once code generation has run.
#[derive(Debug, Clone)]
struct GeneratedService {
    process_id: String,
    package_name: String,
}

/// State shared by the stages of one run.
struct RunContext {
    workflow: WorkflowDefinition,
    workdir: PathBuf,
    service: Option<GeneratedService>,
}

impl RunContext {
    fn service(&self) -> std::result::Result<&GeneratedService, String> {
        self.service
            .as_ref()
            .ok_or_else(|| "No generated service for this run".to_string())
    }
}

/// Runs deployments and answers status queries.
#[derive(Clone)]
pub struct Orchestrator {
    store: Arc<dyn DeploymentStore>,
    engine: Arc<dyn ProcessEngineClient>,
    vcs: VcsAdapter,
    build: BuildAdapter,
    container: ContainerAdapter,
    cluster: ClusterAdapter,
    workspaces: Workspaces,
}

impl Orchestrator {
    /// All adapters share `runner`.
    pub fn new(
        config: &DeployConfig,
        store: Arc<dyn DeploymentStore>,
        runner: Arc<dyn ProcessRunner>,
        engine: Arc<dyn ProcessEngineClient>,
    ) -> Self {
        Self {
            store,
            engine,
            vcs: VcsAdapter::new(runner.clone(), config.vcs.clone()),
            build: BuildAdapter::new(runner.clone(), config.build.clone()),
            container: ContainerAdapter::new(runner.clone(), config.container.clone()),
            cluster: ClusterAdapter::new(runner, config.cluster.clone()),
            workspaces: Workspaces::new(config.workspaces_dir()),
        }
    }

    pub fn store(&self) -> &Arc<dyn DeploymentStore> {
        &self.store
    }

    pub fn workspaces(&self) -> &Workspaces {
        &self.workspaces
    }

    /// Validate the workflow and create the `PENDING` record without running anything.
    ///
    /// Refusals leave no record behind.
    pub async fn prepare(&self, request: DeploymentRequest) -> Result<DeploymentRecord> {
        let workflow = self.load_workflow(&request.workflow_id).await?;

        if workflow.status == WorkflowStatus::Archived {
            return Err(Error::InvalidState(format!(
                "Workflow {} is archived",
                workflow.id
            )));
        }

        let report = flowship_bpmn::validate(&workflow.bpmn_xml);
        for warning in report.warning_messages() {
            warn!(workflow_id = %workflow.id, "{}", warning);
        }
        if !report.is_ok() {
            warn!(
                workflow_id = %workflow.id,
                errors = report.errors.len(),
                "Deployment refused: workflow failed validation"
            );
            return Err(Error::Validation(report));
        }

        self.store
            .update_workflow_status(&workflow.id, WorkflowStatus::Validated)
            .await?;

        let record = DeploymentRecord::pending(&request);
        self.store.insert_deployment(&record).await?;
        self.store
            .append_transition(&StatusTransition::now(&record.id, record.status))
            .await?;

        info!(
            deployment_id = %record.id,
            workflow_id = %record.workflow_id,
            workflow = %workflow.name,
            version = workflow.version,
            environment = %record.environment,
            initiated_by = %record.initiated_by,
            "Deployment accepted"
        );

        Ok(record)
    }

    /// Accept a deployment and run it in the background.
    ///
    /// Returns the `PENDING` record immediately; poll [`Orchestrator::status`] for progress.
    pub async fn trigger(&self, request: DeploymentRequest) -> Result<DeploymentRecord> {
        let record = self.prepare(request).await?;

        let orchestrator = self.clone();
        let pending = record.clone();
        tokio::spawn(async move {
            let deployment_id = pending.id.clone();
            if let Err(e) = orchestrator.run(pending).await {
                debug!(deployment_id = %deployment_id, error = %e, "Background deployment run ended with an error");
            }
        });

        Ok(record)
    }

    /// Run every stage of a `PENDING` deployment.
    ///
    /// A failing stage is not an error: the returned record is `FAILED` and carries
    /// the message. `Err` means the run could not be carried out at all (record not
    /// pending, workflow gone, store failure). Once a pending record is accepted,
    /// an aborted run still marks it `FAILED` when the store allows it.
    pub async fn run(&self, mut record: DeploymentRecord) -> Result<DeploymentRecord> {
        if record.status != DeploymentStatus::Pending {
            return Err(Error::InvalidState(format!(
                "Deployment {} is {}; only PENDING deployments can be run",
                record.id, record.status
            )));
        }

        match self.execute(&mut record).await {
            Ok(()) => Ok(record),
            Err(e) => {
                error!(
                    deployment_id = %record.id,
                    status = %record.status,
                    error = %e,
                    "Deployment run aborted"
                );
                if !record.status.is_terminal() {
                    let message = match record.error.take() {
                        Some(stage_error) => format!("{}\nDeployment aborted: {}", stage_error, e),
                        None => format!("Deployment aborted: {}", e),
                    };
                    if let Err(fail_error) = self.fail(&mut record, message).await {
                        error!(
                            deployment_id = %record.id,
                            error = %fail_error,
                            "Could not mark aborted deployment as failed"
                        );
                    }
                }
                Err(e)
            }
        }
    }

    async fn execute(&self, record: &mut DeploymentRecord) -> Result<()> {
        let workflow = self.load_workflow(&record.workflow_id).await?;
        let _guard = self.workspaces.lock(&workflow.name).await;

        let workdir = self
            .workspaces
            .path_for(&workflow.name, workflow.version, &record.id);
        let mut ctx = RunContext {
            workflow,
            workdir,
            service: None,
        };

        let started = Instant::now();
        record.started_at = Some(Utc::now());
        info!(
            deployment_id = %record.id,
            workdir = %ctx.workdir.display(),
            "Deployment started"
        );

        for stage in Stage::ALL {
            self.enter(record, stage.status()).await?;

            let stage_started = Instant::now();
            let outcome = match stage {
                Stage::GenerateCode => self.generate_code(record, &mut ctx).await,
                Stage::Build => self.build(record, &ctx).await,
                Stage::PushImage => self.push_image(record, &ctx).await,
                Stage::DeployWorkload => self.deploy_workload(record, &ctx).await,
                Stage::DeployProcessDefinition => {
                    self.deploy_process_definition(record, &ctx).await
                }
            };

            if let Err(message) = outcome {
                error!(
                    deployment_id = %record.id,
                    stage = stage.name(),
                    error = %first_line(&message),
                    "Deployment stage failed"
                );
                return self.fail(record, message).await;
            }

            if stage == Stage::GenerateCode {
                self.store
                    .update_workflow_status(&ctx.workflow.id, WorkflowStatus::Generated)
                    .await?;
            }

            debug!(
                deployment_id = %record.id,
                stage = stage.name(),
                elapsed_ms = stage_started.elapsed().as_millis() as u64,
                "Deployment stage completed"
            );
        }

        record.completed_at = Some(Utc::now());
        self.enter(record, DeploymentStatus::Success).await?;
        self.store
            .update_workflow_status(&ctx.workflow.id, WorkflowStatus::Deployed)
            .await?;

        info!(
            deployment_id = %record.id,
            image = record.artifacts.image_ref.as_deref().unwrap_or(""),
            release = record.artifacts.release_name.as_deref().unwrap_or(""),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Deployment succeeded"
        );
        Ok(())
    }

    /// Roll the cluster workload of a finished deployment back to its previous
    /// release. The commit, image and engine deployment stay where they are.
    pub async fn rollback(&self, deployment_id: &str) -> Result<DeploymentRecord> {
        let mut record = self.status(deployment_id).await?;

        if !record
            .status
            .can_transition_to(DeploymentStatus::RolledBack)
        {
            return Err(Error::InvalidState(format!(
                "Deployment {} is {}; only SUCCESS or FAILED deployments can be rolled back",
                record.id, record.status
            )));
        }

        let (Some(release), Some(namespace)) = (
            record.artifacts.release_name.clone(),
            record.artifacts.namespace.clone(),
        ) else {
            return Err(Error::InvalidState(format!(
                "Deployment {} has no workload release to roll back",
                record.id
            )));
        };

        info!(deployment_id = %record.id, release = %release, namespace = %namespace, "Rolling back deployment");
        let result = self.cluster.rollback(&release, &namespace).await;
        if !result.success {
            warn!(deployment_id = %record.id, "Rollback failed");
            return Err(Error::RollbackFailed(result.output));
        }

        self.enter(&mut record, DeploymentStatus::RolledBack).await?;
        info!(deployment_id = %record.id, "Deployment rolled back");
        Ok(record)
    }

    pub async fn status(&self, deployment_id: &str) -> Result<DeploymentRecord> {
        self.store
            .get_deployment(deployment_id)
            .await?
            .ok_or_else(|| Error::DeploymentNotFound(deployment_id.to_string()))
    }

    /// Newest first.
    pub async fn list(&self, workflow_id: Option<&str>) -> Result<Vec<DeploymentRecord>> {
        Ok(self.store.list_deployments(workflow_id).await?)
    }

    /// Status history of a deployment, oldest first.
    pub async fn transitions(&self, deployment_id: &str) -> Result<Vec<StatusTransition>> {
        self.status(deployment_id).await?;
        Ok(self.store.list_transitions(deployment_id).await?)
    }

    /// Poll until the deployment reaches a terminal status, giving up with
    /// [`Error::WaitTimedOut`] after `timeout`.
    pub async fn wait_for_completion(
        &self,
        deployment_id: &str,
        poll_interval: Duration,
        timeout: Duration,
    ) -> Result<DeploymentRecord> {
        let deadline = Instant::now() + timeout;
        loop {
            let record = self.status(deployment_id).await?;
            if record.status.is_terminal() {
                return Ok(record);
            }
            let now = Instant::now();
            if now >= deadline {
                warn!(deployment_id = %record.id, status = %record.status, "Gave up waiting for deployment");
                return Err(Error::WaitTimedOut {
                    deployment_id: record.id,
                    status: record.status,
                    waited: timeout,
                });
            }
            tokio::time::sleep(poll_interval.min(deadline - now)).await;
        }
    }

    // ========================================================================
    // Stages
    // ========================================================================

    async fn generate_code(
        &self,
        record: &mut DeploymentRecord,
        ctx: &mut RunContext,
    ) -> std::result::Result<(), String> {
        let model = flowship_bpmn::parse(&ctx.workflow.bpmn_xml).map_err(|e| e.to_string())?;
        let code = flowship_codegen::generate(&ctx.workflow.metadata(), &model)
            .map_err(|e| e.to_string())?;

        code.write_to(&ctx.workdir).map_err(|e| {
            format!(
                "Failed to write generated sources to {}: {}",
                ctx.workdir.display(),
                e
            )
        })?;

        let artifacts = &mut record.artifacts;
        artifacts.package_name = Some(code.package_name.clone());
        artifacts.generated_files = code.paths().into_iter().map(str::to_string).collect();
        artifacts.code_checksum = Some(code.checksum());
        artifacts.workspace_dir = Some(ctx.workdir.display().to_string());

        info!(
            deployment_id = %record.id,
            process_id = %code.process_id,
            package = %code.package_name,
            files = code.files.len(),
            "Generated service sources"
        );

        ctx.service = Some(GeneratedService {
            process_id: code.process_id.clone(),
            package_name: code.package_name.clone(),
        });

        let message = format!(
            "Deploy {} v{} to {}\n\nDeployment: {}\nInitiated-by: {}",
            ctx.workflow.name, ctx.workflow.version, record.environment, record.id, record.initiated_by
        );
        let branch = self.vcs.config().branch_for(&ctx.workflow.name);
        let result = self
            .vcs
            .commit_and_push(&ctx.workdir, &branch, &message)
            .await;
        if !result.success {
            return Err(format!("Version control failed: {}", result.output));
        }
        record.artifacts.commit_id = result.artifact_ref;
        record.artifacts.repo_url = self.vcs.config().remote_url.clone();
        record.artifacts.repo_branch = Some(branch);
        Ok(())
    }

    async fn build(
        &self,
        record: &mut DeploymentRecord,
        ctx: &RunContext,
    ) -> std::result::Result<(), String> {
        let service = ctx.service()?;
        let result = self.build.build(&ctx.workdir, &service.package_name).await;
        record.artifacts.build_log = Some(result.output.clone());
        if !result.success {
            return Err(result.output);
        }
        record.artifacts.build_artifact = result.artifact_ref;
        Ok(())
    }

    async fn push_image(
        &self,
        record: &mut DeploymentRecord,
        ctx: &RunContext,
    ) -> std::result::Result<(), String> {
        let service = ctx.service()?;
        let image = self.container.image_ref(
            &service.process_id,
            &record.environment,
            ctx.workflow.version,
        );
        let result = self
            .container
            .build_and_push(&ctx.workdir, &service.package_name, &image)
            .await;
        if !result.success {
            return Err(result.output);
        }
        record.artifacts.image_ref = Some(image);
        Ok(())
    }

    async fn deploy_workload(
        &self,
        record: &mut DeploymentRecord,
        ctx: &RunContext,
    ) -> std::result::Result<(), String> {
        let service = ctx.service()?;
        let image = record
            .artifacts
            .image_ref
            .clone()
            .ok_or_else(|| "No image was published for this deployment".to_string())?;
        let namespace = self
            .cluster
            .namespace_for(&record.environment, ctx.workflow.namespace_template.as_deref());
        let release = release_name(&service.process_id, &record.environment);

        // Kept even when the deploy fails so a half-applied release can be rolled back
        record.artifacts.namespace = Some(namespace.clone());
        record.artifacts.release_name = Some(release.clone());

        let workload = WorkloadSpec {
            release: &release,
            namespace: &namespace,
            image: &image,
            process_id: &service.process_id,
        };
        let result = self.cluster.deploy(&ctx.workdir, &workload).await;
        if !result.success {
            return Err(result.output);
        }
        Ok(())
    }

    async fn deploy_process_definition(
        &self,
        record: &mut DeploymentRecord,
        ctx: &RunContext,
    ) -> std::result::Result<(), String> {
        let service = ctx.service()?;
        let resource_name = format!("{}.bpmn", service.process_id);
        let key = self
            .engine
            .deploy_definition(ctx.workflow.bpmn_xml.as_bytes(), &resource_name)
            .await
            .map_err(|e| format!("Process definition deployment failed: {}", e))?;

        info!(
            deployment_id = %record.id,
            resource = %resource_name,
            deployment_key = %key,
            "Process definition deployed"
        );
        record.artifacts.engine_deployment_key = Some(key);
        Ok(())
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    async fn load_workflow(&self, workflow_id: &str) -> Result<WorkflowDefinition> {
        self.store
            .get_workflow(workflow_id)
            .await?
            .ok_or_else(|| Error::WorkflowNotFound(workflow_id.to_string()))
    }

    /// Move the record into `status` and persist it together with a transition row.
    ///
    /// The in-memory status is left unchanged when persisting fails.
    async fn enter(&self, record: &mut DeploymentRecord, status: DeploymentStatus) -> Result<()> {
        if !record.status.can_transition_to(status) {
            return Err(Error::InvalidState(format!(
                "Deployment {} cannot move from {} to {}",
                record.id, record.status, status
            )));
        }

        let previous = record.status;
        record.status = status;
        record.updated_at = Utc::now();
        if let Err(e) = self.persist_transition(record).await {
            record.status = previous;
            return Err(e);
        }

        debug!(deployment_id = %record.id, status = %status, "Deployment status changed");
        Ok(())
    }

    async fn persist_transition(&self, record: &DeploymentRecord) -> Result<()> {
        self.store.update_deployment(record).await?;
        self.store
            .append_transition(&StatusTransition::now(&record.id, record.status))
            .await?;
        Ok(())
    }

    async fn fail(&self, record: &mut DeploymentRecord, message: String) -> Result<()> {
        record.error = Some(message);
        record.completed_at = Some(Utc::now());
        self.enter(record, DeploymentStatus::Failed).await
    }
}

fn first_line(message: &str) -> &str {
    message.lines().next().unwrap_or(message)
}
