// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Build adapter: compiles (and optionally tests) the generated service.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tracing::{info, warn};

use super::{AdapterResult, describe_failure, invoke};
use crate::runner::{CommandSpec, ProcessRunner};

/// Build tool settings.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    pub program: String,
    pub build_args: Vec<String>,
    pub test_args: Vec<String>,
    pub run_tests: bool,
    /// Applied to each invocation.
    pub timeout: Duration,
    /// Where the artifact is looked up, relative to the working directory.
    pub output_dir: PathBuf,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            program: "cargo".to_string(),
            build_args: vec!["build".to_string(), "--release".to_string()],
            test_args: vec!["test".to_string(), "--release".to_string()],
            run_tests: false,
            timeout: Duration::from_secs(900),
            output_dir: PathBuf::from("target/release"),
        }
    }
}

impl BuildConfig {
    /// Split a command line such as `cargo build --release` into program and args.
    pub fn with_command(mut self, command_line: &str) -> Self {
        let mut parts = command_line.split_whitespace().map(str::to_string);
        if let Some(program) = parts.next() {
            self.program = program;
            self.build_args = parts.collect();
        }
        self
    }
}

/// Runs the build tool in a working directory.
#[derive(Clone)]
pub struct BuildAdapter {
    runner: Arc<dyn ProcessRunner>,
    config: BuildConfig,
}

impl BuildAdapter {
    pub fn new(runner: Arc<dyn ProcessRunner>, config: BuildConfig) -> Self {
        Self { runner, config }
    }

    /// Build, run tests when enabled, then locate the binary named after
    /// `package_name`.
    ///
    /// The output is the full captured log in both outcomes.
    pub async fn build(&self, workdir: &Path, package_name: &str) -> AdapterResult {
        let mut log = String::new();

        let mut invocations = vec![("Build", self.config.build_args.clone())];
        if self.config.run_tests {
            invocations.push(("Tests", self.config.test_args.clone()));
        }

        for (what, args) in invocations {
            let spec = CommandSpec::new(&self.config.program)
                .args(args)
                .cwd(workdir)
                .timeout(self.config.timeout);

            info!(command = %spec.command_line(), workdir = %workdir.display(), "Running build");
            let output = match invoke(self.runner.as_ref(), &spec, &mut log).await {
                Ok(output) => output,
                Err(message) => {
                    return AdapterResult::failed(format!("{} could not start: {}\n{}", what, message, log));
                }
            };

            if !output.success() {
                let mut message = describe_failure(what, &spec, &output);
                if !output.timed_out
                    && let Some(summary) = summarize_errors(&output.output)
                {
                    message.push_str(": ");
                    message.push_str(summary);
                }
                warn!(
                    exit_code = ?output.exit_code,
                    timed_out = output.timed_out,
                    "{}",
                    message
                );
                return AdapterResult::failed(format!("{}\n{}", message, log));
            }
        }

        let output_dir = workdir.join(&self.config.output_dir);
        match find_artifact(&output_dir, package_name).await {
            Some(artifact) => {
                info!(artifact = %artifact.display(), "Build artifact located");
                AdapterResult::ok(log, Some(artifact.display().to_string()))
            }
            None => AdapterResult::failed(format!(
                "Build succeeded but no artifact named '{}' was found in {}\n{}",
                package_name,
                output_dir.display(),
                log
            )),
        }
    }
}

/// First compiler error line, if any.
pub fn summarize_errors(output: &str) -> Option<&str> {
    output
        .lines()
        .map(str::trim)
        .find(|line| line.starts_with("error[") || line.starts_with("error:"))
}

/// The executable for `bin_name` in `dir`: `{bin_name}` or `{bin_name}.exe`.
///
/// Siblings sharing the name as a prefix (`{bin_name}.d` dep-info, `{bin_name}.pdb`)
/// are never picked. When both candidates exist the newer one wins.
pub async fn find_artifact(dir: &Path, bin_name: &str) -> Option<PathBuf> {
    let mut newest: Option<(SystemTime, PathBuf)> = None;

    for file_name in [bin_name.to_string(), format!("{}.exe", bin_name)] {
        let path = dir.join(file_name);
        let Ok(metadata) = tokio::fs::metadata(&path).await else {
            continue;
        };
        if !metadata.is_file() {
            continue;
        }
        let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        if newest.as_ref().is_none_or(|(time, _)| modified > *time) {
            newest = Some((modified, path));
        }
    }

    newest.map(|(_, path)| path)
}
