// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Mock runner for testing.
//!
//! Answers commands from a script of canned responses without spawning anything,
//! and records every command it receives.

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use super::traits::*;

/// Canned answer for a matched command.
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub exit_code: i32,
    pub output: String,
    pub timed_out: bool,
    /// Files written relative to the command's working directory before answering.
    pub files: Vec<(PathBuf, String)>,
    /// When set, `run` fails with [`RunnerError::StartFailed`].
    pub start_error: Option<String>,
}

impl MockResponse {
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            output: output.into(),
            timed_out: false,
            files: Vec::new(),
            start_error: None,
        }
    }

    pub fn failure(exit_code: i32, output: impl Into<String>) -> Self {
        Self {
            exit_code,
            ..Self::success(output)
        }
    }

    pub fn timeout() -> Self {
        Self {
            timed_out: true,
            ..Self::success("")
        }
    }

    pub fn start_error(message: impl Into<String>) -> Self {
        Self {
            start_error: Some(message.into()),
            ..Self::success("")
        }
    }

    /// Simulate a tool output file, e.g. a build artifact.
    pub fn with_file(mut self, path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        self.files.push((path.into(), content.into()));
        self
    }
}

#[derive(Debug, Clone)]
struct Rule {
    program: String,
    arg_contains: Option<String>,
    response: MockResponse,
}

impl Rule {
    fn matches(&self, spec: &CommandSpec) -> bool {
        self.program == spec.program
            && self
                .arg_contains
                .as_deref()
                .is_none_or(|needle| spec.args.iter().any(|a| a.contains(needle)))
    }
}

/// Mock runner for testing.
///
/// Rules are checked in the order they were added; the first match answers.
/// Unmatched commands get the default response.
#[derive(Debug, Clone)]
pub struct MockRunner {
    rules: Vec<Rule>,
    default: MockResponse,
    calls: Arc<Mutex<Vec<CommandSpec>>>,
}

impl Default for MockRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl MockRunner {
    /// Create a mock runner where every command succeeds with empty output.
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            default: MockResponse::success(""),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Create a mock runner where every unmatched command fails.
    pub fn failing() -> Self {
        Self {
            default: MockResponse::failure(1, "Mock failure"),
            ..Self::new()
        }
    }

    /// Answer every invocation of `program`.
    pub fn on(mut self, program: &str, response: MockResponse) -> Self {
        self.rules.push(Rule {
            program: program.to_string(),
            arg_contains: None,
            response,
        });
        self
    }

    /// Answer invocations of `program` having an argument that contains `needle`.
    pub fn on_arg(mut self, program: &str, needle: &str, response: MockResponse) -> Self {
        self.rules.push(Rule {
            program: program.to_string(),
            arg_contains: Some(needle.to_string()),
            response,
        });
        self
    }

    /// Every command received, in order.
    pub async fn calls(&self) -> Vec<CommandSpec> {
        self.calls.lock().await.clone()
    }

    /// Command lines received, in order.
    pub async fn command_lines(&self) -> Vec<String> {
        self.calls
            .lock()
            .await
            .iter()
            .map(CommandSpec::command_line)
            .collect()
    }

    /// Number of invocations of `program`.
    pub async fn call_count(&self, program: &str) -> usize {
        self.calls
            .lock()
            .await
            .iter()
            .filter(|c| c.program == program)
            .count()
    }
}

#[async_trait]
impl ProcessRunner for MockRunner {
    fn runner_type(&self) -> &'static str {
        "mock"
    }

    async fn run(&self, spec: &CommandSpec) -> Result<ProcessOutput> {
        self.calls.lock().await.push(spec.clone());

        let response = self
            .rules
            .iter()
            .find(|rule| rule.matches(spec))
            .map(|rule| &rule.response)
            .unwrap_or(&self.default);

        if let Some(message) = &response.start_error {
            return Err(RunnerError::StartFailed(message.clone()));
        }

        if let Some(cwd) = &spec.cwd {
            for (path, content) in &response.files {
                let target = cwd.join(path);
                if let Some(parent) = target.parent() {
                    tokio::fs::create_dir_all(parent).await?;
                }
                tokio::fs::write(&target, content).await?;
            }
        }

        Ok(ProcessOutput {
            exit_code: if response.timed_out {
                None
            } else {
                Some(response.exit_code)
            },
            output: response.output.clone(),
            timed_out: response.timed_out,
            duration: Duration::ZERO,
            pid: None,
        })
    }
}
