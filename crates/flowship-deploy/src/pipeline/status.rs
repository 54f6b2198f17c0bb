// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Deployment state machine.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Position of a deployment in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeploymentStatus {
    Pending,
    GeneratingCode,
    Building,
    PushingImage,
    DeployingWorkload,
    DeployingProcessDefinition,
    Success,
    Failed,
    RolledBack,
}

impl DeploymentStatus {
    /// The happy path, in order.
    pub const FORWARD_ORDER: [DeploymentStatus; 7] = [
        Self::Pending,
        Self::GeneratingCode,
        Self::Building,
        Self::PushingImage,
        Self::DeployingWorkload,
        Self::DeployingProcessDefinition,
        Self::Success,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::GeneratingCode => "GENERATING_CODE",
            Self::Building => "BUILDING",
            Self::PushingImage => "PUSHING_IMAGE",
            Self::DeployingWorkload => "DEPLOYING_WORKLOAD",
            Self::DeployingProcessDefinition => "DEPLOYING_PROCESS_DEFINITION",
            Self::Success => "SUCCESS",
            Self::Failed => "FAILED",
            Self::RolledBack => "ROLLED_BACK",
        }
    }

    /// Successor on the happy path.
    pub fn next(&self) -> Option<Self> {
        let position = Self::FORWARD_ORDER.iter().position(|s| s == self)?;
        Self::FORWARD_ORDER.get(position + 1).copied()
    }

    /// The pipeline is still running (or about to).
    pub fn is_in_progress(&self) -> bool {
        !self.is_terminal()
    }

    /// No stage will run any more.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Failed | Self::RolledBack)
    }

    /// Transition table.
    ///
    /// | From | To |
    /// |------|----|
    /// | any in-progress state | its forward successor, or `FAILED` |
    /// | `SUCCESS`, `FAILED` | `ROLLED_BACK` (explicit rollback only) |
    pub fn can_transition_to(&self, to: DeploymentStatus) -> bool {
        if self.is_in_progress() {
            return self.next() == Some(to) || to == Self::Failed;
        }
        matches!(
            (self, to),
            (Self::Success | Self::Failed, Self::RolledBack)
        )
    }
}

impl std::fmt::Display for DeploymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeploymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "GENERATING_CODE" => Ok(Self::GeneratingCode),
            "BUILDING" => Ok(Self::Building),
            "PUSHING_IMAGE" => Ok(Self::PushingImage),
            "DEPLOYING_WORKLOAD" => Ok(Self::DeployingWorkload),
            "DEPLOYING_PROCESS_DEFINITION" => Ok(Self::DeployingProcessDefinition),
            "SUCCESS" => Ok(Self::Success),
            "FAILED" => Ok(Self::Failed),
            "ROLLED_BACK" => Ok(Self::RolledBack),
            other => Err(format!("unknown deployment status '{}'", other)),
        }
    }
}

/// A unit of pipeline work. Each stage runs while the deployment is in its status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Parse, generate, materialize and commit the sources.
    GenerateCode,
    Build,
    PushImage,
    DeployWorkload,
    DeployProcessDefinition,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Self::GenerateCode,
        Self::Build,
        Self::PushImage,
        Self::DeployWorkload,
        Self::DeployProcessDefinition,
    ];

    pub fn status(&self) -> DeploymentStatus {
        match self {
            Self::GenerateCode => DeploymentStatus::GeneratingCode,
            Self::Build => DeploymentStatus::Building,
            Self::PushImage => DeploymentStatus::PushingImage,
            Self::DeployWorkload => DeploymentStatus::DeployingWorkload,
            Self::DeployProcessDefinition => DeploymentStatus::DeployingProcessDefinition,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::GenerateCode => "generate_code",
            Self::Build => "build",
            Self::PushImage => "push_image",
            Self::DeployWorkload => "deploy_workload",
            Self::DeployProcessDefinition => "deploy_process_definition",
        }
    }
}
