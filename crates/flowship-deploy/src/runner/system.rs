// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Runner that executes commands as local child processes.
//!
//! Each child is placed in its own process group so that a timeout kills the
//! whole tree (build tools spawn compilers, container tools spawn helpers), not
//! just the direct child.

use async_trait::async_trait;
use nix::sys::signal::{Signal, killpg};
use nix::unistd::Pid;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tracing::{debug, warn};

use super::traits::*;

/// How long to keep draining pipes after a timeout kill.
const DRAIN_GRACE: Duration = Duration::from_secs(2);

/// Executes commands with `tokio::process`.
#[derive(Debug, Clone)]
pub struct SystemRunner {
    poll_interval: Duration,
}

impl Default for SystemRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemRunner {
    pub fn new() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
        }
    }

    /// Override the exit-status polling interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

#[async_trait]
impl ProcessRunner for SystemRunner {
    fn runner_type(&self) -> &'static str {
        "system"
    }

    async fn run(&self, spec: &CommandSpec) -> Result<ProcessOutput> {
        let mut command = Command::new(&spec.program);
        command
            .args(&spec.args)
            .envs(&spec.env)
            .stdin(if spec.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .process_group(0)
            .kill_on_drop(true);
        if let Some(cwd) = &spec.cwd {
            command.current_dir(cwd);
        }

        let start = Instant::now();
        let mut child = command.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                RunnerError::ProgramNotFound(spec.program.clone())
            } else {
                RunnerError::StartFailed(format!("{}: {}", spec.program, e))
            }
        })?;
        let pid = child.id();
        debug!(command = %spec.command_line(), pid = ?pid, "Process started");

        // Fed concurrently so a child that never reads its input still times out
        let stdin = match (&spec.stdin, child.stdin.take()) {
            (Some(input), Some(mut handle)) => {
                let input = input.clone().into_bytes();
                Some(tokio::spawn(async move {
                    if let Err(e) = handle.write_all(&input).await {
                        debug!(error = %e, "Child closed stdin before reading all input");
                    }
                }))
            }
            _ => None,
        };

        let stdout = tokio::spawn(drain(child.stdout.take()));
        let stderr = tokio::spawn(drain(child.stderr.take()));

        let (exit_code, timed_out) = loop {
            match child.try_wait() {
                Ok(Some(status)) => break (status.code(), false),
                Ok(None) => {
                    if start.elapsed() >= spec.timeout {
                        warn!(
                            command = %spec.command_line(),
                            pid = ?pid,
                            timeout_secs = spec.timeout.as_secs(),
                            "Process timed out, killing process group"
                        );
                        if let Some(pid) = pid {
                            kill_process_group(pid);
                        }
                        // Reap the direct child so no zombie is left behind
                        let _ = child.kill().await;
                        break (None, true);
                    }
                    tokio::time::sleep(self.poll_interval).await;
                }
                Err(e) => {
                    if let Some(pid) = pid {
                        kill_process_group(pid);
                    }
                    return Err(RunnerError::Io(e));
                }
            }
        };

        if let Some(writer) = stdin {
            writer.abort();
        }

        // A grandchild that left the group can hold the pipes open after a kill
        let (stdout, stderr) = if timed_out {
            (
                tokio::time::timeout(DRAIN_GRACE, stdout)
                    .await
                    .ok()
                    .and_then(|r| r.ok())
                    .unwrap_or_default(),
                tokio::time::timeout(DRAIN_GRACE, stderr)
                    .await
                    .ok()
                    .and_then(|r| r.ok())
                    .unwrap_or_default(),
            )
        } else {
            (
                stdout.await.unwrap_or_default(),
                stderr.await.unwrap_or_default(),
            )
        };

        let output = ProcessOutput {
            exit_code,
            output: combine(&stdout, &stderr),
            timed_out,
            duration: start.elapsed(),
            pid,
        };
        debug!(
            command = %spec.command_line(),
            exit_code = ?output.exit_code,
            timed_out = output.timed_out,
            duration_ms = output.duration.as_millis() as u64,
            "Process finished"
        );
        Ok(output)
    }
}

async fn drain<R: AsyncRead + Unpin>(pipe: Option<R>) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        let _ = pipe.read_to_end(&mut buf).await;
    }
    buf
}

fn combine(stdout: &[u8], stderr: &[u8]) -> String {
    let mut output = String::from_utf8_lossy(stdout).into_owned();
    if !stderr.is_empty() {
        if !output.is_empty() && !output.ends_with('\n') {
            output.push('\n');
        }
        output.push_str(&String::from_utf8_lossy(stderr));
    }
    output
}

fn kill_process_group(pid: u32) {
    match killpg(Pid::from_raw(pid as i32), Signal::SIGKILL) {
        Ok(()) | Err(nix::errno::Errno::ESRCH) => {}
        Err(e) => warn!(pid = pid, error = %e, "Failed to kill process group"),
    }
}
