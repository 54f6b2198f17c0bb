// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Runner trait definitions.
//!
//! Defines the abstract interface every adapter uses to invoke external tools.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Timeout applied when a command does not set one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(600);

/// Errors from runner operations.
///
/// A process that starts and then fails or times out is not an error: that is
/// reported through [`ProcessOutput`]. These variants cover the cases where no
/// meaningful output exists.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RunnerError {
    /// Program was not found on PATH.
    #[error("Program not found: {0}")]
    ProgramNotFound(String),

    /// Process failed to start.
    #[error("Process start failed: {0}")]
    StartFailed(String),

    /// I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error.
    #[error("Other: {0}")]
    Other(String),
}

/// Result type for runner operations.
pub type Result<T> = std::result::Result<T, RunnerError>;

/// One external command invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    /// Working directory; inherits the caller's when unset.
    pub cwd: Option<PathBuf>,
    /// Extra environment variables layered over the inherited environment.
    pub env: BTreeMap<String, String>,
    pub timeout: Duration,
    /// Written to the child's stdin, which is then closed.
    pub stdin: Option<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            env: BTreeMap::new(),
            timeout: DEFAULT_TIMEOUT,
            stdin: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    /// `program arg1 arg2 ...`, for logs.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Outcome of a command that was started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    /// `None` when the process was killed by a signal (including on timeout).
    pub exit_code: Option<i32>,
    /// Captured stdout followed by captured stderr.
    pub output: String,
    pub timed_out: bool,
    pub duration: Duration,
    pub pid: Option<u32>,
}

impl ProcessOutput {
    /// Exited on its own with status 0.
    pub fn success(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0)
    }
}

/// Trait for external process runners.
///
/// Runners only execute commands. Interpreting output and mapping it to a stage
/// result is the adapter's job.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Runner type identifier (e.g., "system", "mock")
    fn runner_type(&self) -> &'static str;

    /// Run a command to completion or until its timeout expires.
    ///
    /// On expiry the process (and its process group, where supported) is killed
    /// and reaped before this returns, and the output has `timed_out = true`.
    async fn run(&self, spec: &CommandSpec) -> Result<ProcessOutput>;
}
