// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Container adapter: builds the service image and pushes it to a registry.

use flowship_codegen::kebab_case;
use flowship_codegen::manifest::SERVICE_PORT;
use minijinja::context;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use super::{AdapterResult, describe_failure, invoke_masked};
use crate::runner::{CommandSpec, ProcessRunner};
use crate::templates;

/// Container registry coordinates.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Host (and optional port) of the registry; a scheme prefix is ignored.
    pub url: String,
    pub project: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            url: "localhost:5000".to_string(),
            project: "flowship".to_string(),
            username: None,
            password: None,
        }
    }
}

impl RegistryConfig {
    /// `registry.example.com:5000`, without scheme or trailing slash.
    pub fn host(&self) -> &str {
        let url = self.url.trim_end_matches('/');
        url.strip_prefix("https://")
            .or_else(|| url.strip_prefix("http://"))
            .unwrap_or(url)
    }

    /// Login and push happen only with both credentials present.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (&self.username, &self.password) {
            (Some(user), Some(password)) => Some((user.as_str(), password.as_str())),
            _ => None,
        }
    }
}

/// Container tool settings.
#[derive(Debug, Clone)]
pub struct ContainerConfig {
    /// `docker` or `podman`.
    pub tool: String,
    pub registry: RegistryConfig,
    pub timeout: Duration,
    pub builder_image: String,
    pub runtime_image: String,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            tool: "docker".to_string(),
            registry: RegistryConfig::default(),
            timeout: Duration::from_secs(600),
            builder_image: "rust:1-slim-bookworm".to_string(),
            runtime_image: "debian:bookworm-slim".to_string(),
        }
    }
}

/// Builds and publishes images.
#[derive(Clone)]
pub struct ContainerAdapter {
    runner: Arc<dyn ProcessRunner>,
    config: ContainerConfig,
}

impl ContainerAdapter {
    pub fn new(runner: Arc<dyn ProcessRunner>, config: ContainerConfig) -> Self {
        Self { runner, config }
    }

    /// `{registry}/{project}/{kebab(process)}-{env}:{version}`
    pub fn image_ref(&self, process_id: &str, environment: &str, version: i32) -> String {
        format!(
            "{}/{}/{}-{}:{}",
            self.config.registry.host(),
            self.config.registry.project,
            kebab_case(process_id),
            kebab_case(environment),
            version
        )
    }

    /// Write a `Dockerfile` and `.dockerignore` unless they exist, build `image`,
    /// then log in and push when registry credentials are configured. The artifact
    /// is `image`.
    pub async fn build_and_push(&self, workdir: &Path, package_name: &str, image: &str) -> AdapterResult {
        let mut log = String::new();

        let dockerfile = templates::render(
            "Dockerfile",
            templates::DOCKERFILE,
            context! {
                package_name => package_name,
                builder_image => &self.config.builder_image,
                runtime_image => &self.config.runtime_image,
                port => SERVICE_PORT,
            },
        )
        .map_err(|e| e.to_string());
        for (name, content) in [
            ("Dockerfile", dockerfile),
            (".dockerignore", Ok(templates::DOCKERIGNORE.to_string())),
        ] {
            if let Err(failure) = write_if_absent(workdir, name, content, &mut log).await {
                return failure;
            }
        }

        let build = self.command(workdir).args(["build", "-t", image, "."]);
        if let Err(failure) = self.step("Image build", &build, &mut log, None).await {
            return failure;
        }
        info!(image = %image, "Image built");

        let Some((username, password)) = self.config.registry.credentials() else {
            warn!(image = %image, "Registry credentials not configured; image not pushed");
            log.push_str("Registry credentials not configured; skipping push\n");
            return AdapterResult::ok(log, Some(image.to_string()));
        };

        let login = self
            .command(workdir)
            .args(["login", self.config.registry.host(), "-u", username, "--password-stdin"])
            .stdin(password);
        if let Err(failure) = self.step("Registry login", &login, &mut log, Some(password)).await {
            return failure;
        }

        let push = self.command(workdir).args(["push", image]);
        if let Err(failure) = self.step("Image push", &push, &mut log, Some(password)).await {
            return failure;
        }
        info!(image = %image, registry = %self.config.registry.host(), "Image pushed");

        AdapterResult::ok(log, Some(image.to_string()))
    }

    fn command(&self, workdir: &Path) -> CommandSpec {
        CommandSpec::new(&self.config.tool)
            .cwd(workdir)
            .timeout(self.config.timeout)
    }

    async fn step(
        &self,
        what: &str,
        spec: &CommandSpec,
        log: &mut String,
        secret: Option<&str>,
    ) -> Result<(), AdapterResult> {
        match invoke_masked(self.runner.as_ref(), spec, log, secret).await {
            Ok(output) if output.success() => Ok(()),
            Ok(output) => {
                let message = describe_failure(what, spec, &output);
                warn!(tool = %self.config.tool, "{}", message);
                Err(AdapterResult::failed(format!("{}\n{}", message, log)))
            }
            Err(message) => Err(AdapterResult::failed(format!("{}\n{}", message, log))),
        }
    }
}

/// Write `name` into `workdir` unless a file of that name is already there.
async fn write_if_absent(
    workdir: &Path,
    name: &str,
    content: Result<String, String>,
    log: &mut String,
) -> Result<(), AdapterResult> {
    let path = workdir.join(name);
    if path.exists() {
        log.push_str(&format!("Using existing {}\n", name));
        return Ok(());
    }
    let written = match content {
        Ok(content) => tokio::fs::write(&path, content).await.map_err(|e| e.to_string()),
        Err(e) => Err(e),
    };
    if let Err(e) = written {
        return Err(AdapterResult::failed(format!("Failed to write {}: {}", name, e)));
    }
    log.push_str(&format!("Generated {}\n", name));
    Ok(())
}
