// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Deployment pipeline: state machine, working directories and the orchestrator.

pub mod orchestrator;
pub mod status;
pub mod workspace;

pub use orchestrator::Orchestrator;
pub use status::{DeploymentStatus, Stage};
pub use workspace::{WorkspaceLock, Workspaces};
