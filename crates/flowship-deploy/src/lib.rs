// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Flowship Deploy - BPMN to Running Service
//!
//! Takes a registered workflow definition, generates a service for it and ships
//! that service all the way into a cluster, then deploys the process definition
//! to the process engine.
//!
//! # Pipeline
//!
//! ```text
//!   trigger ──► PENDING
//!                  │
//!                  ▼
//!          GENERATING_CODE   parse + generate + write + git commit/push
//!                  │
//!                  ▼
//!              BUILDING       cargo build (+ tests)
//!                  │
//!                  ▼
//!            PUSHING_IMAGE    docker build + login + push
//!                  │
//!                  ▼
//!          DEPLOYING_WORKLOAD helm upgrade --install | kubectl apply
//!                  │
//!                  ▼
//!   DEPLOYING_PROCESS_DEFINITION   POST /v2/deployments
//!                  │
//!                  ▼
//!               SUCCESS ──rollback──► ROLLED_BACK
//! ```
//!
//! Any stage may end the run in `FAILED`; `FAILED` deployments can be rolled back
//! too. Each state entered is persisted with a timestamped transition row.
//!
//! # Seams
//!
//! | Trait | Production | Tests |
//! |-------|------------|-------|
//! | [`runner::ProcessRunner`] | [`runner::SystemRunner`] | [`runner::MockRunner`] |
//! | [`engine::ProcessEngineClient`] | [`engine::HttpEngineClient`] | [`engine::MockEngineClient`] |
//! | [`store::DeploymentStore`] | [`store::SqliteStore`] | [`store::MemoryStore`] |

pub mod adapters;
pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod runner;
pub mod store;
pub mod templates;

pub use config::DeployConfig;
pub use error::{Error, Result};
pub use model::{
    DeploymentArtifacts, DeploymentRecord, DeploymentRequest, StatusTransition,
    WorkflowDefinition, WorkflowStatus,
};
pub use pipeline::{DeploymentStatus, Orchestrator, Stage};
