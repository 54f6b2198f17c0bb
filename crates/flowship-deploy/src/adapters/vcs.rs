// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Version-control adapter (git).

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use flowship_codegen::kebab_case;

use super::{AdapterResult, describe_failure, invoke, invoke_masked};
use crate::runner::{CommandSpec, ProcessRunner};

/// Git settings.
#[derive(Debug, Clone)]
pub struct VcsConfig {
    pub program: String,
    /// Remote to push to; commits stay local when unset.
    pub remote_url: Option<String>,
    /// Branch pattern; `{workflow}` is replaced by the kebab-case workflow name.
    pub branch: String,
    pub username: Option<String>,
    pub token: Option<String>,
    pub author_name: String,
    pub author_email: String,
    pub timeout: Duration,
}

impl Default for VcsConfig {
    fn default() -> Self {
        Self {
            program: "git".to_string(),
            remote_url: None,
            branch: "flowship/{workflow}".to_string(),
            username: None,
            token: None,
            author_name: "flowship".to_string(),
            author_email: "flowship@localhost".to_string(),
            timeout: Duration::from_secs(120),
        }
    }
}

impl VcsConfig {
    /// Branch the sources of `workflow_name` are committed to.
    pub fn branch_for(&self, workflow_name: &str) -> String {
        self.branch.replace("{workflow}", &kebab_case(workflow_name))
    }
}

/// Commits a working directory and optionally pushes it.
#[derive(Clone)]
pub struct VcsAdapter {
    runner: Arc<dyn ProcessRunner>,
    config: VcsConfig,
}

impl VcsAdapter {
    pub fn new(runner: Arc<dyn ProcessRunner>, config: VcsConfig) -> Self {
        Self { runner, config }
    }

    pub fn config(&self) -> &VcsConfig {
        &self.config
    }

    /// Init (if needed), stage everything and commit on `branch`, then push when a
    /// remote is set.
    ///
    /// With a remote, the commit is made on top of the remote `branch` when it
    /// already exists, so every push fast-forwards. The tree of the new commit is
    /// exactly the working directory. The artifact is the commit id.
    pub async fn commit_and_push(&self, workdir: &Path, branch: &str, message: &str) -> AdapterResult {
        let mut log = String::new();

        if workdir.join(".git").exists() {
            log.push_str("Repository already initialized\n");
        } else if let Err(failure) = self.step("git init", &self.git(workdir, ["init"]), &mut log).await {
            return failure;
        }

        let steps = [
            (
                "git symbolic-ref",
                self.git(
                    workdir,
                    [
                        "symbolic-ref".to_string(),
                        "HEAD".to_string(),
                        format!("refs/heads/{}", branch),
                    ],
                ),
            ),
            (
                "git config user.name",
                self.git(
                    workdir,
                    ["config", "user.name", self.config.author_name.as_str()],
                ),
            ),
            (
                "git config user.email",
                self.git(
                    workdir,
                    ["config", "user.email", self.config.author_email.as_str()],
                ),
            ),
        ];
        for (what, spec) in steps {
            if let Err(failure) = self.step(what, &spec, &mut log).await {
                return failure;
            }
        }

        if let Some(remote) = &self.config.remote_url
            && let Err(failure) = self.track_remote(workdir, remote, branch, &mut log).await
        {
            return failure;
        }

        let steps = [
            ("git add", self.git(workdir, ["add", "-A"])),
            (
                "git commit",
                self.git(workdir, ["commit", "--allow-empty", "-m", message]),
            ),
        ];
        for (what, spec) in steps {
            if let Err(failure) = self.step(what, &spec, &mut log).await {
                return failure;
            }
        }

        let rev_parse = self.git(workdir, ["rev-parse", "HEAD"]);
        let commit_id = match invoke(self.runner.as_ref(), &rev_parse, &mut log).await {
            Ok(output) if output.success() => output.output.trim().to_string(),
            Ok(output) => {
                return AdapterResult::failed(format!(
                    "{}\n{}",
                    describe_failure("git rev-parse", &rev_parse, &output),
                    log
                ));
            }
            Err(message) => return AdapterResult::failed(format!("{}\n{}", message, log)),
        };

        if let Some(remote) = &self.config.remote_url {
            let push = self.git(
                workdir,
                [
                    "push".to_string(),
                    "origin".to_string(),
                    format!("HEAD:refs/heads/{}", branch),
                ],
            );
            if let Err(failure) = self.step("git push", &push, &mut log).await {
                return failure;
            }
            info!(
                commit = %commit_id,
                remote = %remote,
                branch = %branch,
                "Pushed generated sources"
            );
        } else {
            info!(commit = %commit_id, branch = %branch, "Committed generated sources (no remote configured)");
        }

        AdapterResult::ok(log, Some(commit_id))
    }

    /// Point `origin` at `remote` and, when the remote already has `branch`, move
    /// the local branch onto its tip without touching the working tree.
    async fn track_remote(
        &self,
        workdir: &Path,
        remote: &str,
        branch: &str,
        log: &mut String,
    ) -> Result<(), AdapterResult> {
        let url = authenticated_url(
            remote,
            self.config.username.as_deref(),
            self.config.token.as_deref(),
        );

        let get_url = self.git(workdir, ["remote", "get-url", "origin"]);
        let has_origin = matches!(
            invoke(self.runner.as_ref(), &get_url, log).await,
            Ok(output) if output.success()
        );
        let remote_cmd = if has_origin { "set-url" } else { "add" };
        self.step(
            "git remote",
            &self.git(workdir, ["remote", remote_cmd, "origin", url.as_str()]),
            log,
        )
        .await?;

        let remote_ref = format!("refs/heads/{}", branch);
        let ls_remote = self.git(workdir, ["ls-remote", "--heads", "origin", remote_ref.as_str()]);
        let listing = self.step_output("git ls-remote", &ls_remote, log).await?;
        if listing.trim().is_empty() {
            log.push_str(&format!("Branch {} does not exist on the remote yet\n", branch));
            return Ok(());
        }

        let steps = [
            (
                "git fetch",
                self.git(workdir, ["fetch", "origin", remote_ref.as_str()]),
            ),
            (
                "git update-ref",
                self.git(workdir, ["update-ref", "HEAD", "FETCH_HEAD"]),
            ),
        ];
        for (what, spec) in steps {
            self.step(what, &spec, log).await?;
        }
        Ok(())
    }

    async fn step(&self, what: &str, spec: &CommandSpec, log: &mut String) -> Result<(), AdapterResult> {
        self.step_output(what, spec, log).await.map(|_| ())
    }

    /// Run one step with the token masked; the step's output on success.
    async fn step_output(
        &self,
        what: &str,
        spec: &CommandSpec,
        log: &mut String,
    ) -> Result<String, AdapterResult> {
        let secret = self.config.token.as_deref();
        match invoke_masked(self.runner.as_ref(), spec, log, secret).await {
            Ok(output) if output.success() => Ok(output.output),
            Ok(output) => {
                warn!(step = what, exit_code = ?output.exit_code, "Git step failed");
                Err(AdapterResult::failed(format!(
                    "{}\n{}",
                    describe_failure(what, spec, &output),
                    log
                )))
            }
            Err(message) => Err(AdapterResult::failed(format!("{}\n{}", message, log))),
        }
    }

    fn git<I, S>(&self, workdir: &Path, args: I) -> CommandSpec
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        CommandSpec::new(&self.config.program)
            .args(args)
            .cwd(workdir)
            .env("GIT_TERMINAL_PROMPT", "0")
            .timeout(self.config.timeout)
    }
}

/// Embed credentials into an `https://` remote. Other schemes are returned as-is.
pub fn authenticated_url(remote: &str, username: Option<&str>, token: Option<&str>) -> String {
    match (remote.strip_prefix("https://"), token) {
        (Some(rest), Some(token)) if !rest.contains('@') => {
            format!("https://{}:{}@{}", username.unwrap_or("oauth2"), token, rest)
        }
        _ => remote.to_string(),
    }
}
