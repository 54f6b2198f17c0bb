// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! SQLite-backed store.

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;
use tracing::info;

use super::{DeploymentStore, Result, StoreError};
use crate::model::{
    DeploymentArtifacts, DeploymentRecord, StatusTransition, WorkflowDefinition, WorkflowStatus,
};
use crate::pipeline::DeploymentStatus;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations/sqlite");

/// SQLite-backed deployment store.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Create a store from an existing, already migrated pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a `sqlite:` URL and run migrations.
    ///
    /// In-memory databases get a single connection that is never recycled,
    /// since every connection would otherwise see its own empty database.
    pub async fn connect(url: &str) -> Result<Self> {
        let in_memory = url.contains(":memory:");
        let options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };

        let pool = options.connect(url).await?;
        MIGRATOR.run(&pool).await?;
        info!(url = %url, "Deployment store ready");

        Ok(Self { pool })
    }

    /// Open (creating if needed) a database file, including parent directories.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        Self::connect(&format!("sqlite:{}?mode=rwc", path.to_string_lossy())).await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[derive(sqlx::FromRow)]
struct WorkflowRow {
    id: String,
    name: String,
    version: i32,
    bpmn_xml: String,
    description: Option<String>,
    status: String,
    namespace_template: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<WorkflowRow> for WorkflowDefinition {
    type Error = StoreError;

    fn try_from(row: WorkflowRow) -> Result<Self> {
        Ok(Self {
            id: row.id,
            name: row.name,
            version: row.version,
            bpmn_xml: row.bpmn_xml,
            description: row.description,
            status: row.status.parse::<WorkflowStatus>().map_err(StoreError::Corrupt)?,
            namespace_template: row.namespace_template,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct DeploymentRow {
    id: String,
    workflow_id: String,
    environment: String,
    initiated_by: String,
    status: String,
    artifacts: String,
    error: Option<String>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<DeploymentRow> for DeploymentRecord {
    type Error = StoreError;

    fn try_from(row: DeploymentRow) -> Result<Self> {
        Ok(Self {
            id: row.id,
            workflow_id: row.workflow_id,
            environment: row.environment,
            initiated_by: row.initiated_by,
            status: row.status.parse::<DeploymentStatus>().map_err(StoreError::Corrupt)?,
            artifacts: serde_json::from_str::<DeploymentArtifacts>(&row.artifacts)?,
            error: row.error,
            started_at: row.started_at,
            completed_at: row.completed_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct TransitionRow {
    deployment_id: String,
    status: String,
    at: DateTime<Utc>,
}

const DEPLOYMENT_COLUMNS: &str = "id, workflow_id, environment, initiated_by, status, artifacts, \
     error, started_at, completed_at, created_at, updated_at";

#[async_trait]
impl DeploymentStore for SqliteStore {
    async fn save_workflow(&self, workflow: &WorkflowDefinition) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO workflow_definitions
                (id, name, version, bpmn_xml, description, status, namespace_template, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                version = excluded.version,
                bpmn_xml = excluded.bpmn_xml,
                description = excluded.description,
                status = excluded.status,
                namespace_template = excluded.namespace_template,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&workflow.id)
        .bind(&workflow.name)
        .bind(workflow.version)
        .bind(&workflow.bpmn_xml)
        .bind(&workflow.description)
        .bind(workflow.status.as_str())
        .bind(&workflow.namespace_template)
        .bind(workflow.created_at)
        .bind(workflow.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_workflow(&self, id: &str) -> Result<Option<WorkflowDefinition>> {
        let row = sqlx::query_as::<_, WorkflowRow>(
            r#"
            SELECT id, name, version, bpmn_xml, description, status, namespace_template,
                   created_at, updated_at
            FROM workflow_definitions
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(WorkflowDefinition::try_from).transpose()
    }

    async fn list_workflows(&self) -> Result<Vec<WorkflowDefinition>> {
        let rows = sqlx::query_as::<_, WorkflowRow>(
            r#"
            SELECT id, name, version, bpmn_xml, description, status, namespace_template,
                   created_at, updated_at
            FROM workflow_definitions
            ORDER BY created_at DESC, rowid DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(WorkflowDefinition::try_from).collect()
    }

    async fn update_workflow_status(&self, id: &str, status: WorkflowStatus) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE workflow_definitions
            SET status = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(status.as_str())
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                kind: "Workflow",
                id: id.to_string(),
            });
        }
        Ok(())
    }

    async fn insert_deployment(&self, record: &DeploymentRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO deployments
                (id, workflow_id, environment, initiated_by, status, artifacts, error,
                 started_at, completed_at, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.id)
        .bind(&record.workflow_id)
        .bind(&record.environment)
        .bind(&record.initiated_by)
        .bind(record.status.as_str())
        .bind(serde_json::to_string(&record.artifacts)?)
        .bind(&record.error)
        .bind(record.started_at)
        .bind(record.completed_at)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update_deployment(&self, record: &DeploymentRecord) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE deployments
            SET status = ?, artifacts = ?, error = ?, started_at = ?, completed_at = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(record.status.as_str())
        .bind(serde_json::to_string(&record.artifacts)?)
        .bind(&record.error)
        .bind(record.started_at)
        .bind(record.completed_at)
        .bind(record.updated_at)
        .bind(&record.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                kind: "Deployment",
                id: record.id.clone(),
            });
        }
        Ok(())
    }

    async fn get_deployment(&self, id: &str) -> Result<Option<DeploymentRecord>> {
        let row = sqlx::query_as::<_, DeploymentRow>(&format!(
            "SELECT {} FROM deployments WHERE id = ?",
            DEPLOYMENT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(DeploymentRecord::try_from).transpose()
    }

    async fn list_deployments(&self, workflow_id: Option<&str>) -> Result<Vec<DeploymentRecord>> {
        let rows = sqlx::query_as::<_, DeploymentRow>(&format!(
            "SELECT {} FROM deployments \
             WHERE ?1 IS NULL OR workflow_id = ?1 \
             ORDER BY created_at DESC, rowid DESC",
            DEPLOYMENT_COLUMNS
        ))
        .bind(workflow_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(DeploymentRecord::try_from).collect()
    }

    async fn append_transition(&self, transition: &StatusTransition) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO deployment_transitions (deployment_id, status, at)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(&transition.deployment_id)
        .bind(transition.status.as_str())
        .bind(transition.at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_transitions(&self, deployment_id: &str) -> Result<Vec<StatusTransition>> {
        let rows = sqlx::query_as::<_, TransitionRow>(
            r#"
            SELECT deployment_id, status, at
            FROM deployment_transitions
            WHERE deployment_id = ?
            ORDER BY seq
            "#,
        )
        .bind(deployment_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(StatusTransition {
                    deployment_id: row.deployment_id,
                    status: row
                        .status
                        .parse::<DeploymentStatus>()
                        .map_err(StoreError::Corrupt)?,
                    at: row.at,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DeploymentRequest;

    async fn test_store() -> SqliteStore {
        SqliteStore::connect("sqlite::memory:")
            .await
            .expect("Failed to create in-memory SQLite store")
    }

    fn request(workflow_id: &str) -> DeploymentRequest {
        DeploymentRequest {
            workflow_id: workflow_id.to_string(),
            environment: "staging".to_string(),
            initiated_by: "carol".to_string(),
        }
    }

    #[tokio::test]
    async fn test_workflow_round_trip_and_status_update() {
        let store = test_store().await;
        let workflow = WorkflowDefinition::new("Trade clearance", 2, "<definitions/>")
            .with_description("customs")
            .with_namespace_template("customs-{env}");
        store.save_workflow(&workflow).await.unwrap();

        let loaded = store.get_workflow(&workflow.id).await.unwrap().unwrap();
        assert_eq!(loaded.name, "Trade clearance");
        assert_eq!(loaded.version, 2);
        assert_eq!(loaded.status, WorkflowStatus::Draft);
        assert_eq!(loaded.namespace_template.as_deref(), Some("customs-{env}"));

        store
            .update_workflow_status(&workflow.id, WorkflowStatus::Validated)
            .await
            .unwrap();
        let loaded = store.get_workflow(&workflow.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, WorkflowStatus::Validated);

        let err = store
            .update_workflow_status("missing", WorkflowStatus::Deployed)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { kind: "Workflow", .. }));
    }

    #[tokio::test]
    async fn test_deployment_artifacts_persist_as_json() {
        let store = test_store().await;
        let workflow = WorkflowDefinition::new("review", 1, "<definitions/>");
        store.save_workflow(&workflow).await.unwrap();

        let mut record = DeploymentRecord::pending(&request(&workflow.id));
        store.insert_deployment(&record).await.unwrap();

        record.status = DeploymentStatus::Failed;
        record.error = Some("Build failed with exit code 101".to_string());
        record.started_at = Some(Utc::now());
        record.completed_at = Some(Utc::now());
        record.artifacts.commit_id = Some("4f2a9c1".to_string());
        record.artifacts.generated_files = vec!["Cargo.toml".to_string(), "src/main.rs".to_string()];
        store.update_deployment(&record).await.unwrap();

        let loaded = store.get_deployment(&record.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, DeploymentStatus::Failed);
        assert_eq!(loaded.error, record.error);
        assert_eq!(loaded.artifacts, record.artifacts);
        assert!(loaded.completed_at.is_some());
    }

    #[tokio::test]
    async fn test_list_deployments_newest_first_and_filtered() {
        let store = test_store().await;
        let first = DeploymentRecord::pending(&request("wf-a"));
        let second = DeploymentRecord::pending(&request("wf-b"));
        let third = DeploymentRecord::pending(&request("wf-a"));
        for record in [&first, &second, &third] {
            store.insert_deployment(record).await.unwrap();
        }

        let all: Vec<String> = store
            .list_deployments(None)
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.id)
            .collect();
        assert_eq!(all, vec![third.id.clone(), second.id.clone(), first.id.clone()]);

        let only_a: Vec<String> = store
            .list_deployments(Some("wf-a"))
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.id)
            .collect();
        assert_eq!(only_a, vec![third.id, first.id]);
    }

    #[tokio::test]
    async fn test_transitions_keep_append_order() {
        let store = test_store().await;
        let record = DeploymentRecord::pending(&request("wf"));
        store.insert_deployment(&record).await.unwrap();

        for status in [
            DeploymentStatus::Pending,
            DeploymentStatus::GeneratingCode,
            DeploymentStatus::Failed,
        ] {
            store
                .append_transition(&StatusTransition::now(&record.id, status))
                .await
                .unwrap();
        }

        let statuses: Vec<_> = store
            .list_transitions(&record.id)
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
                DeploymentStatus::Failed
            ]
        );
        assert!(store.list_transitions("other").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_from_path_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("flowship.db");
        let store = SqliteStore::from_path(&path).await.unwrap();
        store
            .save_workflow(&WorkflowDefinition::new("x", 1, "<d/>"))
            .await
            .unwrap();
        assert!(path.exists());
    }
}
