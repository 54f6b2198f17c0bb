// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Persisted entities: workflow definitions and deployment records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::pipeline::DeploymentStatus;

/// Lifecycle of a workflow definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowStatus {
    Draft,
    Validated,
    Generated,
    Deployed,
    Archived,
}

impl WorkflowStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Validated => "VALIDATED",
            Self::Generated => "GENERATED",
            Self::Deployed => "DEPLOYED",
            Self::Archived => "ARCHIVED",
        }
    }
}

impl std::fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkflowStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DRAFT" => Ok(Self::Draft),
            "VALIDATED" => Ok(Self::Validated),
            "GENERATED" => Ok(Self::Generated),
            "DEPLOYED" => Ok(Self::Deployed),
            "ARCHIVED" => Ok(Self::Archived),
            other => Err(format!("unknown workflow status '{}'", other)),
        }
    }
}

/// A BPMN workflow registered for deployment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowDefinition {
    pub id: String,
    pub name: String,
    pub version: i32,
    pub bpmn_xml: String,
    #[serde(default)]
    pub description: Option<String>,
    pub status: WorkflowStatus,
    /// Namespace pattern with an `{env}` placeholder; the cluster default applies when unset.
    #[serde(default)]
    pub namespace_template: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WorkflowDefinition {
    /// New draft with a fresh id.
    pub fn new(name: impl Into<String>, version: i32, bpmn_xml: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            version,
            bpmn_xml: bpmn_xml.into(),
            description: None,
            status: WorkflowStatus::Draft,
            namespace_template: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_namespace_template(mut self, template: impl Into<String>) -> Self {
        self.namespace_template = Some(template.into());
        self
    }

    pub fn metadata(&self) -> flowship_codegen::WorkflowMetadata {
        flowship_codegen::WorkflowMetadata {
            workflow_name: self.name.clone(),
            version: self.version,
            bpmn_xml: self.bpmn_xml.clone(),
            description: self.description.clone(),
        }
    }
}

/// Deployment trigger: which workflow, where, on whose behalf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentRequest {
    pub workflow_id: String,
    pub environment: String,
    pub initiated_by: String,
}

/// Everything the stages produced so far.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeploymentArtifacts {
    pub package_name: Option<String>,
    /// Relative paths of the generated bundle.
    pub generated_files: Vec<String>,
    pub code_checksum: Option<String>,
    pub workspace_dir: Option<String>,
    pub repo_url: Option<String>,
    pub repo_branch: Option<String>,
    pub commit_id: Option<String>,
    pub build_log: Option<String>,
    pub build_artifact: Option<String>,
    pub image_ref: Option<String>,
    pub release_name: Option<String>,
    pub namespace: Option<String>,
    pub engine_deployment_key: Option<String>,
}

/// One attempt to turn a workflow definition into a running service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentRecord {
    pub id: String,
    pub workflow_id: String,
    pub environment: String,
    pub initiated_by: String,
    pub status: DeploymentStatus,
    pub artifacts: DeploymentArtifacts,
    pub error: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DeploymentRecord {
    /// Fresh `PENDING` record for a request.
    pub fn pending(request: &DeploymentRequest) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            workflow_id: request.workflow_id.clone(),
            environment: request.environment.clone(),
            initiated_by: request.initiated_by.clone(),
            status: DeploymentStatus::Pending,
            artifacts: DeploymentArtifacts::default(),
            error: None,
            started_at: None,
            completed_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A status a deployment entered, and when.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusTransition {
    pub deployment_id: String,
    pub status: DeploymentStatus,
    pub at: DateTime<Utc>,
}

impl StatusTransition {
    pub fn now(deployment_id: impl Into<String>, status: DeploymentStatus) -> Self {
        Self {
            deployment_id: deployment_id.into(),
            status,
            at: Utc::now(),
        }
    }
}
