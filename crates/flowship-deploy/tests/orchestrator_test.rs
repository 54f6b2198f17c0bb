// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! End-to-end pipeline runs against mocked tools, engine and store.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use flowship_deploy::engine::MockEngineClient;
use flowship_deploy::runner::{MockResponse, MockRunner};
use flowship_deploy::store::{self, DeploymentStore, MemoryStore, SqliteStore, StoreError};
use flowship_deploy::{
    DeployConfig, DeploymentRecord, DeploymentRequest, DeploymentStatus, Error, Orchestrator,
    StatusTransition, WorkflowDefinition, WorkflowStatus,
};

const REVIEW: &str = include_str!("../../flowship-bpmn/tests/fixtures/review.bpmn");
const NO_EVENTS: &str = include_str!("../../flowship-bpmn/tests/fixtures/no_events.bpmn");

/// Tools that all succeed; cargo leaves a binary behind and git reports a commit.
fn working_tools() -> MockRunner {
    MockRunner::new()
        .on_arg("git", "rev-parse", MockResponse::success("4f2c9e1\n"))
        .on(
            "cargo",
            MockResponse::success("   Compiling documentreview v1.0.0\n    Finished release\n")
                .with_file("target/release/documentreview", "binary"),
        )
}

fn config(data_dir: &Path) -> DeployConfig {
    DeployConfig {
        data_dir: data_dir.to_path_buf(),
        ..DeployConfig::default()
    }
}

struct Harness {
    orchestrator: Orchestrator,
    store: Arc<dyn DeploymentStore>,
    runner: MockRunner,
    engine: MockEngineClient,
    _dir: tempfile::TempDir,
}

fn harness_with(runner: MockRunner, engine: MockEngineClient, configure: impl FnOnce(&mut DeployConfig)) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config(dir.path());
    configure(&mut config);
    let store: Arc<dyn DeploymentStore> = Arc::new(MemoryStore::new());
    let orchestrator = Orchestrator::new(
        &config,
        store.clone(),
        Arc::new(runner.clone()),
        Arc::new(engine.clone()),
    );
    Harness {
        orchestrator,
        store,
        runner,
        engine,
        _dir: dir,
    }
}

fn harness(runner: MockRunner) -> Harness {
    harness_with(runner, MockEngineClient::new(), |_| {})
}

async fn register(store: &Arc<dyn DeploymentStore>, xml: &str) -> WorkflowDefinition {
    let workflow = WorkflowDefinition::new("Document Review", 2, xml);
    store.save_workflow(&workflow).await.unwrap();
    workflow
}

fn request(workflow: &WorkflowDefinition) -> DeploymentRequest {
    DeploymentRequest {
        workflow_id: workflow.id.clone(),
        environment: "staging".to_string(),
        initiated_by: "alice".to_string(),
    }
}

#[tokio::test]
async fn test_successful_deployment_walks_every_stage() {
    let h = harness(working_tools());
    let workflow = register(&h.store, REVIEW).await;

    let pending = h.orchestrator.prepare(request(&workflow)).await.unwrap();
    assert_eq!(pending.status, DeploymentStatus::Pending);

    let record = h.orchestrator.run(pending).await.unwrap();
    assert_eq!(record.status, DeploymentStatus::Success, "{:?}", record.error);
    assert!(record.error.is_none());
    assert!(record.started_at.is_some());
    assert!(record.completed_at.is_some());

    let artifacts = &record.artifacts;
    assert_eq!(artifacts.package_name.as_deref(), Some("documentreview"));
    assert!(artifacts.generated_files.iter().any(|f| f == "src/main.rs"));
    assert!(artifacts.generated_files.iter().any(|f| f == "resources/document-review.bpmn"));
    assert_eq!(artifacts.code_checksum.as_ref().map(String::len), Some(64));
    assert_eq!(artifacts.commit_id.as_deref(), Some("4f2c9e1"));
    assert!(artifacts.repo_url.is_none());
    assert_eq!(artifacts.repo_branch.as_deref(), Some("flowship/document-review"));
    assert!(artifacts.build_artifact.as_deref().unwrap().ends_with("target/release/documentreview"));
    assert_eq!(
        artifacts.image_ref.as_deref(),
        Some("localhost:5000/flowship/document-review-staging:2")
    );
    assert_eq!(artifacts.release_name.as_deref(), Some("document-review-staging"));
    assert_eq!(artifacts.namespace.as_deref(), Some("flowship-staging"));
    assert_eq!(artifacts.engine_deployment_key.as_deref(), Some("mock-deployment-1"));

    // Sources landed in the per-deployment workspace
    let workdir = Path::new(artifacts.workspace_dir.as_deref().unwrap());
    assert!(workdir.ends_with(format!("workspaces/document-review/v2/{}", record.id)));
    assert!(workdir.join("Cargo.toml").exists());
    assert!(workdir.join("Dockerfile").exists());

    let statuses: Vec<_> = h
        .orchestrator
        .transitions(&record.id)
        .await
        .unwrap()
        .into_iter()
        .map(|t| t.status)
        .collect();
    assert_eq!(statuses, DeploymentStatus::FORWARD_ORDER.to_vec());

    let deployed = h.engine.deployments().await;
    assert_eq!(deployed.len(), 1);
    assert_eq!(deployed[0].resource_name, "document-review.bpmn");
    assert_eq!(deployed[0].content, REVIEW.as_bytes());

    let stored = h.store.get_workflow(&workflow.id).await.unwrap().unwrap();
    assert_eq!(stored.status, WorkflowStatus::Deployed);
    assert_eq!(h.orchestrator.status(&record.id).await.unwrap(), record);
}

#[tokio::test]
async fn test_tools_run_in_pipeline_order() {
    let h = harness(working_tools());
    let workflow = register(&h.store, REVIEW).await;
    let pending = h.orchestrator.prepare(request(&workflow)).await.unwrap();
    h.orchestrator.run(pending).await.unwrap();

    let programs: Vec<String> = h.runner.calls().await.into_iter().map(|c| c.program).collect();
    let first = |p: &str| programs.iter().position(|x| x == p).unwrap();
    assert!(first("git") < first("cargo"));
    assert!(first("cargo") < first("docker"));
    assert!(first("docker") < first("kubectl"));
    assert!(first("kubectl") < first("helm"));

    // No registry credentials configured: build only
    let lines = h.runner.command_lines().await;
    assert!(lines.iter().any(|l| l.starts_with("docker build -t")));
    assert!(!lines.iter().any(|l| l.starts_with("docker push")));
    assert!(lines.iter().any(|l| l.starts_with("helm upgrade --install document-review-staging")));
}

#[tokio::test]
async fn test_build_failure_stops_the_pipeline() {
    let runner = MockRunner::new()
        .on_arg("git", "rev-parse", MockResponse::success("4f2c9e1\n"))
        .on(
            "cargo",
            MockResponse::failure(101, "error[E0425]: cannot find value `x` in this scope\n"),
        );
    let h = harness(runner);
    let workflow = register(&h.store, REVIEW).await;
    let pending = h.orchestrator.prepare(request(&workflow)).await.unwrap();

    let record = h.orchestrator.run(pending).await.unwrap();
    assert_eq!(record.status, DeploymentStatus::Failed);
    let error = record.error.as_deref().unwrap();
    assert!(error.contains("exit code 101"), "{}", error);
    assert!(error.contains("error[E0425]"), "{}", error);
    assert!(record.completed_at.is_some());

    // Work done before the failure is kept
    assert_eq!(record.artifacts.commit_id.as_deref(), Some("4f2c9e1"));
    assert!(record.artifacts.build_log.is_some());
    assert!(record.artifacts.image_ref.is_none());

    assert_eq!(h.runner.call_count("docker").await, 0);
    assert_eq!(h.runner.call_count("kubectl").await, 0);
    assert_eq!(h.runner.call_count("helm").await, 0);
    assert!(h.engine.deployments().await.is_empty());

    let statuses: Vec<_> = h
        .orchestrator
        .transitions(&record.id)
        .await
        .unwrap()
        .into_iter()
        .map(|t| t.status)
        .collect();
    assert_eq!(
        statuses,
        vec![
            DeploymentStatus::Pending,
            DeploymentStatus::GeneratingCode,
            DeploymentStatus::Building,
            DeploymentStatus::Failed,
        ]
    );

    let stored = h.store.get_workflow(&workflow.id).await.unwrap().unwrap();
    assert_eq!(stored.status, WorkflowStatus::Generated);
}

#[tokio::test]
async fn test_build_timeout_is_reported() {
    let runner = MockRunner::new().on("cargo", MockResponse::timeout());
    let h = harness(runner);
    let workflow = register(&h.store, REVIEW).await;
    let pending = h.orchestrator.prepare(request(&workflow)).await.unwrap();

    let record = h.orchestrator.run(pending).await.unwrap();
    assert_eq!(record.status, DeploymentStatus::Failed);
    assert!(record.error.as_deref().unwrap().contains("timed out after 900s"));
}

#[tokio::test]
async fn test_engine_failure_fails_last_stage() {
    let h = harness_with(working_tools(), MockEngineClient::failing("broker unavailable"), |_| {});
    let workflow = register(&h.store, REVIEW).await;
    let pending = h.orchestrator.prepare(request(&workflow)).await.unwrap();

    let record = h.orchestrator.run(pending).await.unwrap();
    assert_eq!(record.status, DeploymentStatus::Failed);
    assert!(record.error.as_deref().unwrap().contains("broker unavailable"));
    assert_eq!(record.artifacts.release_name.as_deref(), Some("document-review-staging"));
    assert!(record.artifacts.engine_deployment_key.is_none());

    let last = h.orchestrator.transitions(&record.id).await.unwrap();
    assert_eq!(
        last[last.len() - 2].status,
        DeploymentStatus::DeployingProcessDefinition
    );
}

#[tokio::test]
async fn test_rollback_after_success() {
    let h = harness(working_tools());
    let workflow = register(&h.store, REVIEW).await;
    let pending = h.orchestrator.prepare(request(&workflow)).await.unwrap();
    let record = h.orchestrator.run(pending).await.unwrap();

    let rolled_back = h.orchestrator.rollback(&record.id).await.unwrap();
    assert_eq!(rolled_back.status, DeploymentStatus::RolledBack);

    let lines = h.runner.command_lines().await;
    assert!(lines.iter().any(|l| l.starts_with(
        "helm rollback document-review-staging --namespace flowship-staging"
    )));

    let transitions = h.orchestrator.transitions(&record.id).await.unwrap();
    assert_eq!(transitions.last().unwrap().status, DeploymentStatus::RolledBack);

    // Only once
    let again = h.orchestrator.rollback(&record.id).await.unwrap_err();
    assert!(matches!(again, Error::InvalidState(_)));
}

#[tokio::test]
async fn test_rollback_without_helm_leaves_record_unchanged() {
    let h = harness_with(working_tools(), MockEngineClient::new(), |config| {
        config.cluster.helm.enabled = false;
    });
    let workflow = register(&h.store, REVIEW).await;
    let pending = h.orchestrator.prepare(request(&workflow)).await.unwrap();
    let record = h.orchestrator.run(pending).await.unwrap();
    assert_eq!(record.status, DeploymentStatus::Success, "{:?}", record.error);
    assert_eq!(h.runner.call_count("helm").await, 0);

    let err = h.orchestrator.rollback(&record.id).await.unwrap_err();
    assert!(matches!(err, Error::RollbackFailed(_)));
    assert_eq!(
        h.orchestrator.status(&record.id).await.unwrap().status,
        DeploymentStatus::Success
    );
}

#[tokio::test]
async fn test_rollback_of_failed_run_without_release_is_refused() {
    let h = harness(MockRunner::new().on("cargo", MockResponse::failure(1, "boom")));
    let workflow = register(&h.store, REVIEW).await;
    let pending = h.orchestrator.prepare(request(&workflow)).await.unwrap();
    let record = h.orchestrator.run(pending).await.unwrap();
    assert_eq!(record.status, DeploymentStatus::Failed);

    let err = h.orchestrator.rollback(&record.id).await.unwrap_err();
    assert!(matches!(err, Error::InvalidState(_)));
}

#[tokio::test]
async fn test_unknown_ids() {
    let h = harness(working_tools());

    let err = h
        .orchestrator
        .trigger(DeploymentRequest {
            workflow_id: "missing".to_string(),
            environment: "dev".to_string(),
            initiated_by: "alice".to_string(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, Error::WorkflowNotFound(id) if id == "missing"));
    assert!(h.orchestrator.list(None).await.unwrap().is_empty());

    assert!(matches!(
        h.orchestrator.status("nope").await.unwrap_err(),
        Error::DeploymentNotFound(_)
    ));
    assert!(matches!(
        h.orchestrator.transitions("nope").await.unwrap_err(),
        Error::DeploymentNotFound(_)
    ));
    assert!(matches!(
        h.orchestrator.rollback("nope").await.unwrap_err(),
        Error::DeploymentNotFound(_)
    ));
}

#[tokio::test]
async fn test_invalid_workflow_is_refused_without_side_effects() {
    let h = harness(working_tools());
    let workflow = register(&h.store, NO_EVENTS).await;

    let err = h.orchestrator.trigger(request(&workflow)).await.unwrap_err();
    match err {
        Error::Validation(report) => {
            assert!(report.has_errors());
            assert!(report.error_messages().iter().any(|m| m.contains("E003")));
        }
        other => panic!("expected validation error, got {:?}", other),
    }

    assert!(h.orchestrator.list(None).await.unwrap().is_empty());
    assert!(h.runner.calls().await.is_empty());
    let stored = h.store.get_workflow(&workflow.id).await.unwrap().unwrap();
    assert_eq!(stored.status, WorkflowStatus::Draft);
}

#[tokio::test]
async fn test_archived_workflow_is_refused() {
    let h = harness(working_tools());
    let workflow = register(&h.store, REVIEW).await;
    h.store
        .update_workflow_status(&workflow.id, WorkflowStatus::Archived)
        .await
        .unwrap();

    let err = h.orchestrator.prepare(request(&workflow)).await.unwrap_err();
    assert!(matches!(err, Error::InvalidState(_)));
}

#[tokio::test]
async fn test_run_refuses_records_that_are_not_pending() {
    let h = harness(working_tools());
    let workflow = register(&h.store, REVIEW).await;
    let pending = h.orchestrator.prepare(request(&workflow)).await.unwrap();
    let finished = h.orchestrator.run(pending).await.unwrap();

    let err = h.orchestrator.run(finished).await.unwrap_err();
    assert!(matches!(err, Error::InvalidState(_)));
}

#[tokio::test]
async fn test_trigger_returns_pending_and_runs_in_background() {
    let h = harness(working_tools());
    let workflow = register(&h.store, REVIEW).await;

    let pending = h.orchestrator.trigger(request(&workflow)).await.unwrap();
    assert_eq!(pending.status, DeploymentStatus::Pending);

    let record = tokio::time::timeout(
        Duration::from_secs(10),
        h.orchestrator.wait_for_completion(
            &pending.id,
            Duration::from_millis(20),
            Duration::from_secs(5),
        ),
    )
    .await
    .unwrap()
    .unwrap();
    assert_eq!(record.status, DeploymentStatus::Success, "{:?}", record.error);

    let listed = h.orchestrator.list(Some(&workflow.id)).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, pending.id);
}

#[tokio::test]
async fn test_namespace_template_overrides_pattern() {
    let h = harness(working_tools());
    let workflow = WorkflowDefinition::new("Document Review", 1, REVIEW)
        .with_namespace_template("customs-{env}");
    h.store.save_workflow(&workflow).await.unwrap();

    let pending = h.orchestrator.prepare(request(&workflow)).await.unwrap();
    let record = h.orchestrator.run(pending).await.unwrap();
    assert_eq!(record.artifacts.namespace.as_deref(), Some("customs-staging"));
}

#[tokio::test]
async fn test_pipeline_on_sqlite_store() {
    let dir = tempfile::tempdir().unwrap();
    let store: Arc<dyn DeploymentStore> =
        Arc::new(SqliteStore::connect("sqlite::memory:").await.unwrap());
    let runner = working_tools();
    let orchestrator = Orchestrator::new(
        &config(dir.path()),
        store.clone(),
        Arc::new(runner),
        Arc::new(MockEngineClient::new()),
    );

    let workflow = register(&store, REVIEW).await;
    let pending = orchestrator.prepare(request(&workflow)).await.unwrap();
    let record = orchestrator.run(pending).await.unwrap();
    assert_eq!(record.status, DeploymentStatus::Success, "{:?}", record.error);

    let reloaded = orchestrator.status(&record.id).await.unwrap();
    assert_eq!(reloaded.status, DeploymentStatus::Success);
    assert_eq!(reloaded.artifacts, record.artifacts);
    assert_eq!(orchestrator.transitions(&record.id).await.unwrap().len(), 7);
}

// ============================================================================
// Failures in later stages
// ============================================================================

async fn statuses(orchestrator: &Orchestrator, deployment_id: &str) -> Vec<DeploymentStatus> {
    orchestrator
        .transitions(deployment_id)
        .await
        .unwrap()
        .into_iter()
        .map(|t| t.status)
        .collect()
}

#[tokio::test]
async fn test_image_push_failure_stops_before_the_cluster() {
    let runner = working_tools().on_arg(
        "docker",
        "build",
        MockResponse::failure(1, "failed to solve: rust:1-slim not found"),
    );
    let h = harness(runner);
    let workflow = register(&h.store, REVIEW).await;
    let pending = h.orchestrator.prepare(request(&workflow)).await.unwrap();

    let record = h.orchestrator.run(pending).await.unwrap();
    assert_eq!(record.status, DeploymentStatus::Failed);
    assert!(record.error.as_deref().unwrap().starts_with("Image build failed with exit code 1"));
    assert!(record.artifacts.build_artifact.is_some());
    assert!(record.artifacts.image_ref.is_none());
    assert!(record.artifacts.release_name.is_none());

    assert_eq!(
        statuses(&h.orchestrator, &record.id).await,
        vec![
            DeploymentStatus::Pending,
            DeploymentStatus::GeneratingCode,
            DeploymentStatus::Building,
            DeploymentStatus::PushingImage,
            DeploymentStatus::Failed,
        ]
    );
    assert_eq!(h.runner.call_count("docker").await, 1);
    assert_eq!(h.runner.call_count("kubectl").await, 0);
    assert_eq!(h.runner.call_count("helm").await, 0);
    assert!(h.engine.deployments().await.is_empty());

    // Nothing reached the cluster, so there is nothing to roll back
    let err = h.orchestrator.rollback(&record.id).await.unwrap_err();
    assert!(matches!(err, Error::InvalidState(_)));
}

#[tokio::test]
async fn test_workload_failure_can_be_rolled_back() {
    let runner = working_tools().on_arg(
        "helm",
        "upgrade",
        MockResponse::failure(1, "Error: UPGRADE FAILED: timed out waiting for the condition"),
    );
    let h = harness(runner);
    let workflow = register(&h.store, REVIEW).await;
    let pending = h.orchestrator.prepare(request(&workflow)).await.unwrap();

    let record = h.orchestrator.run(pending).await.unwrap();
    assert_eq!(record.status, DeploymentStatus::Failed);
    assert!(record.error.as_deref().unwrap().contains("UPGRADE FAILED"));
    assert!(record.artifacts.image_ref.is_some());
    assert_eq!(record.artifacts.release_name.as_deref(), Some("document-review-staging"));
    assert_eq!(record.artifacts.namespace.as_deref(), Some("flowship-staging"));

    let history = statuses(&h.orchestrator, &record.id).await;
    assert_eq!(
        history[history.len() - 2..],
        [DeploymentStatus::DeployingWorkload, DeploymentStatus::Failed]
    );
    assert!(h.engine.deployments().await.is_empty());

    let rolled_back = h.orchestrator.rollback(&record.id).await.unwrap();
    assert_eq!(rolled_back.status, DeploymentStatus::RolledBack);
    let lines = h.runner.command_lines().await;
    assert!(lines.iter().any(|l| l.starts_with(
        "helm rollback document-review-staging --namespace flowship-staging"
    )));

    let stored = h.store.get_workflow(&workflow.id).await.unwrap().unwrap();
    assert_eq!(stored.status, WorkflowStatus::Generated);
}

// ============================================================================
// Store faults during a run
// ============================================================================

/// Memory store that refuses one workflow status update.
struct FaultyStore {
    inner: MemoryStore,
    reject: WorkflowStatus,
}

#[async_trait]
impl DeploymentStore for FaultyStore {
    async fn save_workflow(&self, workflow: &WorkflowDefinition) -> store::Result<()> {
        self.inner.save_workflow(workflow).await
    }

    async fn get_workflow(&self, id: &str) -> store::Result<Option<WorkflowDefinition>> {
        self.inner.get_workflow(id).await
    }

    async fn list_workflows(&self) -> store::Result<Vec<WorkflowDefinition>> {
        self.inner.list_workflows().await
    }

    async fn update_workflow_status(&self, id: &str, status: WorkflowStatus) -> store::Result<()> {
        if status == self.reject {
            return Err(StoreError::Io(std::io::Error::other("disk full")));
        }
        self.inner.update_workflow_status(id, status).await
    }

    async fn insert_deployment(&self, record: &DeploymentRecord) -> store::Result<()> {
        self.inner.insert_deployment(record).await
    }

    async fn update_deployment(&self, record: &DeploymentRecord) -> store::Result<()> {
        self.inner.update_deployment(record).await
    }

    async fn get_deployment(&self, id: &str) -> store::Result<Option<DeploymentRecord>> {
        self.inner.get_deployment(id).await
    }

    async fn list_deployments(&self, workflow_id: Option<&str>) -> store::Result<Vec<DeploymentRecord>> {
        self.inner.list_deployments(workflow_id).await
    }

    async fn append_transition(&self, transition: &StatusTransition) -> store::Result<()> {
        self.inner.append_transition(transition).await
    }

    async fn list_transitions(&self, deployment_id: &str) -> store::Result<Vec<StatusTransition>> {
        self.inner.list_transitions(deployment_id).await
    }
}

fn faulty_orchestrator(dir: &Path, reject: WorkflowStatus) -> (Orchestrator, Arc<dyn DeploymentStore>, MockRunner) {
    let store: Arc<dyn DeploymentStore> = Arc::new(FaultyStore {
        inner: MemoryStore::new(),
        reject,
    });
    let runner = working_tools();
    let orchestrator = Orchestrator::new(
        &config(dir),
        store.clone(),
        Arc::new(runner.clone()),
        Arc::new(MockEngineClient::new()),
    );
    (orchestrator, store, runner)
}

#[tokio::test]
async fn test_store_fault_mid_run_marks_record_failed() {
    let dir = tempfile::tempdir().unwrap();
    let (orchestrator, store, runner) = faulty_orchestrator(dir.path(), WorkflowStatus::Generated);
    let workflow = register(&store, REVIEW).await;
    let pending = orchestrator.prepare(request(&workflow)).await.unwrap();

    let err = orchestrator.run(pending.clone()).await.unwrap_err();
    assert!(matches!(err, Error::Store(_)), "{:?}", err);

    let record = orchestrator.status(&pending.id).await.unwrap();
    assert_eq!(record.status, DeploymentStatus::Failed);
    let message = record.error.as_deref().unwrap();
    assert!(message.starts_with("Deployment aborted: Store error"), "{}", message);
    assert!(message.contains("disk full"));
    assert!(record.completed_at.is_some());

    assert_eq!(
        statuses(&orchestrator, &pending.id).await,
        vec![
            DeploymentStatus::Pending,
            DeploymentStatus::GeneratingCode,
            DeploymentStatus::Failed,
        ]
    );
    assert_eq!(runner.call_count("cargo").await, 0);
}

#[tokio::test]
async fn test_store_fault_after_last_stage_keeps_success() {
    let dir = tempfile::tempdir().unwrap();
    let (orchestrator, store, _runner) = faulty_orchestrator(dir.path(), WorkflowStatus::Deployed);
    let workflow = register(&store, REVIEW).await;
    let pending = orchestrator.prepare(request(&workflow)).await.unwrap();

    assert!(orchestrator.run(pending.clone()).await.is_err());
    let record = orchestrator.status(&pending.id).await.unwrap();
    assert_eq!(record.status, DeploymentStatus::Success);
    assert!(record.error.is_none());
}

#[tokio::test]
async fn test_waiting_on_an_aborted_background_run_returns() {
    let dir = tempfile::tempdir().unwrap();
    let (orchestrator, store, _runner) = faulty_orchestrator(dir.path(), WorkflowStatus::Generated);
    let workflow = register(&store, REVIEW).await;

    let pending = orchestrator.trigger(request(&workflow)).await.unwrap();
    let record = orchestrator
        .wait_for_completion(&pending.id, Duration::from_millis(20), Duration::from_secs(5))
        .await
        .unwrap();
    assert_eq!(record.status, DeploymentStatus::Failed);
    assert!(record.error.as_deref().unwrap().contains("disk full"));
}

#[tokio::test]
async fn test_wait_gives_up_after_timeout() {
    let h = harness(working_tools());
    let workflow = register(&h.store, REVIEW).await;
    // Accepted but never run
    let pending = h.orchestrator.prepare(request(&workflow)).await.unwrap();

    let started = std::time::Instant::now();
    let err = h
        .orchestrator
        .wait_for_completion(&pending.id, Duration::from_millis(20), Duration::from_millis(150))
        .await
        .unwrap_err();
    assert!(started.elapsed() < Duration::from_secs(5));
    match err {
        Error::WaitTimedOut {
            deployment_id,
            status,
            ..
        } => {
            assert_eq!(deployment_id, pending.id);
            assert_eq!(status, DeploymentStatus::Pending);
        }
        other => panic!("expected a wait timeout, got {:?}", other),
    }
}
