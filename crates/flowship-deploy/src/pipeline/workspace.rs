// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Per-deployment working directories.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use tokio::sync::{Mutex, OwnedMutexGuard};

use flowship_codegen::kebab_case;

type LockMap = Arc<StdMutex<HashMap<String, Arc<Mutex<()>>>>>;

/// Lays out `{root}/{workflow}/v{version}/{deployment_id}` and serializes runs of the
/// same workflow within this process.
///
/// Runs of one workflow share its VCS branch, so they are serialized across versions.
#[derive(Debug, Clone)]
pub struct Workspaces {
    root: PathBuf,
    locks: LockMap,
}

/// Exclusive use of one workflow. Released on drop; the last holder removes the
/// workflow's entry from the lock table.
#[derive(Debug)]
pub struct WorkspaceLock {
    key: String,
    locks: LockMap,
    guard: OwnedMutexGuard<()>,
}

impl Drop for WorkspaceLock {
    fn drop(&mut self) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        // One reference in the table, one in this guard: nobody is waiting
        if Arc::strong_count(OwnedMutexGuard::mutex(&self.guard)) == 2 {
            locks.remove(&self.key);
        }
    }
}

impl Workspaces {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            locks: Arc::new(StdMutex::new(HashMap::new())),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, workflow_name: &str, version: i32, deployment_id: &str) -> PathBuf {
        self.root
            .join(kebab_case(workflow_name))
            .join(format!("v{}", version))
            .join(deployment_id)
    }

    /// Wait for exclusive use of `workflow_name`.
    pub async fn lock(&self, workflow_name: &str) -> WorkspaceLock {
        let key = kebab_case(workflow_name);
        let slot = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            locks.entry(key.clone()).or_default().clone()
        };
        WorkspaceLock {
            key,
            locks: self.locks.clone(),
            guard: slot.lock_owned().await,
        }
    }

    /// Workflows currently locked or waited on.
    pub fn active_locks(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}
