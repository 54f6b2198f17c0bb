// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Cluster adapter: runs the service image on Kubernetes.
//!
//! Two deployment paths exist. With Helm enabled the chart is upgraded or
//! installed and waited on, and rollback is available. Without Helm a
//! Deployment + Service manifest is rendered and applied with `kubectl`; that
//! path has no rollback.

use flowship_codegen::kebab_case;
use flowship_codegen::manifest::SERVICE_PORT;
use minijinja::context;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use super::{AdapterResult, describe_failure, invoke};
use crate::runner::{CommandSpec, ProcessRunner};
use crate::templates;

/// Kubernetes release names are capped at Helm's limit.
pub const MAX_RELEASE_NAME: usize = 53;

/// Helm chart coordinates.
#[derive(Debug, Clone)]
pub struct HelmConfig {
    pub enabled: bool,
    pub program: String,
    pub chart: String,
    pub chart_version: Option<String>,
}

impl Default for HelmConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            program: "helm".to_string(),
            chart: "flowship/process-service".to_string(),
            chart_version: None,
        }
    }
}

/// Cluster settings.
#[derive(Debug, Clone)]
pub struct ClusterConfig {
    pub kubectl: String,
    /// Namespace name with an `{env}` placeholder.
    pub namespace_pattern: String,
    pub kube_context: Option<String>,
    pub timeout: Duration,
    pub service_port: u16,
    pub replicas: u32,
    /// Passed to the workload as `ENGINE_URL`.
    pub engine_url: String,
    pub helm: HelmConfig,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            kubectl: "kubectl".to_string(),
            namespace_pattern: "flowship-{env}".to_string(),
            kube_context: None,
            timeout: Duration::from_secs(300),
            service_port: SERVICE_PORT,
            replicas: 1,
            engine_url: "http://zeebe-gateway:8080".to_string(),
            helm: HelmConfig::default(),
        }
    }
}

/// Where and what to deploy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkloadSpec<'a> {
    pub release: &'a str,
    pub namespace: &'a str,
    pub image: &'a str,
    pub process_id: &'a str,
}

/// Deploys and rolls back service releases.
#[derive(Clone)]
pub struct ClusterAdapter {
    runner: Arc<dyn ProcessRunner>,
    config: ClusterConfig,
}

impl ClusterAdapter {
    pub fn new(runner: Arc<dyn ProcessRunner>, config: ClusterConfig) -> Self {
        Self { runner, config }
    }

    pub fn config(&self) -> &ClusterConfig {
        &self.config
    }

    /// Namespace for an environment. `pattern` overrides the configured one.
    pub fn namespace_for(&self, environment: &str, pattern: Option<&str>) -> String {
        pattern
            .unwrap_or(&self.config.namespace_pattern)
            .replace("{env}", &kebab_case(environment))
    }

    /// Make sure the namespace exists, then deploy through Helm or `kubectl apply`.
    /// The artifact is the release name.
    pub async fn deploy(&self, workdir: &Path, workload: &WorkloadSpec<'_>) -> AdapterResult {
        let mut log = String::new();

        if let Err(failure) = self.ensure_namespace(workload.namespace, &mut log).await {
            return failure;
        }

        let result = if self.config.helm.enabled {
            self.helm_upgrade(workload, &mut log).await
        } else {
            self.apply_manifest(workdir, workload, &mut log).await
        };

        match result {
            Ok(()) => {
                info!(
                    release = %workload.release,
                    namespace = %workload.namespace,
                    helm = self.config.helm.enabled,
                    "Workload deployed"
                );
                AdapterResult::ok(log, Some(workload.release.to_string()))
            }
            Err(failure) => failure,
        }
    }

    /// Roll a Helm release back to its previous revision.
    pub async fn rollback(&self, release: &str, namespace: &str) -> AdapterResult {
        if !self.config.helm.enabled {
            warn!(
                release = %release,
                namespace = %namespace,
                "Rollback unsupported for kubectl-applied workloads"
            );
            return AdapterResult::failed(format!(
                "Rollback unsupported: release '{}' was applied with kubectl, not Helm",
                release
            ));
        }

        let mut log = String::new();
        let spec = self
            .helm()
            .args(["rollback", release, "--namespace", namespace, "--wait"])
            .arg("--timeout")
            .arg(format!("{}s", self.config.timeout.as_secs()));

        match self.step("Helm rollback", &spec, &mut log).await {
            Ok(()) => {
                info!(release = %release, namespace = %namespace, "Release rolled back");
                AdapterResult::ok(log, Some(release.to_string()))
            }
            Err(failure) => failure,
        }
    }

    async fn ensure_namespace(&self, namespace: &str, log: &mut String) -> Result<(), AdapterResult> {
        let get = self.kubectl().args(["get", "namespace", namespace]);
        match invoke(self.runner.as_ref(), &get, log).await {
            Ok(output) if output.success() => return Ok(()),
            Ok(_) => {}
            Err(message) => return Err(AdapterResult::failed(format!("{}\n{}", message, log))),
        }

        info!(namespace = %namespace, "Creating namespace");
        let create = self.kubectl().args(["create", "namespace", namespace]);
        self.step("Namespace creation", &create, log).await
    }

    async fn helm_upgrade(&self, workload: &WorkloadSpec<'_>, log: &mut String) -> Result<(), AdapterResult> {
        let (repository, tag) = split_image(workload.image);
        let mut spec = self.helm().args([
            "upgrade",
            "--install",
            workload.release,
            self.config.helm.chart.as_str(),
            "--namespace",
            workload.namespace,
        ]);
        if let Some(version) = &self.config.helm.chart_version {
            spec = spec.args(["--version", version.as_str()]);
        }
        spec = spec
            .arg("--set")
            .arg(format!("image.repository={}", repository))
            .arg("--set")
            .arg(format!("image.tag={}", tag))
            .arg("--set")
            .arg(format!("service.port={}", self.config.service_port))
            .arg("--set-string")
            .arg(format!("env.ENGINE_URL={}", self.config.engine_url))
            .args(["--wait", "--timeout"])
            .arg(format!("{}s", self.config.timeout.as_secs()));

        self.step("Helm upgrade", &spec, log).await
    }

    async fn apply_manifest(
        &self,
        workdir: &Path,
        workload: &WorkloadSpec<'_>,
        log: &mut String,
    ) -> Result<(), AdapterResult> {
        let rendered = templates::render(
            "workload.yaml",
            templates::WORKLOAD_MANIFEST,
            context! {
                name => workload.release,
                namespace => workload.namespace,
                process_id => workload.process_id,
                replicas => self.config.replicas,
                image => workload.image,
                port => self.config.service_port,
                engine_url => &self.config.engine_url,
            },
        )
        .map_err(|e| AdapterResult::failed(format!("Failed to render manifest: {}", e)))?;

        let dir = workdir.join("k8s");
        let path = dir.join(format!("{}.yaml", workload.release));
        let written = match tokio::fs::create_dir_all(&dir).await {
            Ok(()) => tokio::fs::write(&path, rendered).await,
            Err(e) => Err(e),
        };
        written.map_err(|e| {
            AdapterResult::failed(format!("Failed to write {}: {}", path.display(), e))
        })?;
        log.push_str(&format!("Wrote {}\n", path.display()));

        let apply = self
            .kubectl()
            .args(["apply", "--namespace", workload.namespace, "-f"])
            .arg(path.display().to_string());
        self.step("kubectl apply", &apply, log).await
    }

    async fn step(&self, what: &str, spec: &CommandSpec, log: &mut String) -> Result<(), AdapterResult> {
        match invoke(self.runner.as_ref(), spec, log).await {
            Ok(output) if output.success() => Ok(()),
            Ok(output) => {
                let message = describe_failure(what, spec, &output);
                warn!("{}", message);
                Err(AdapterResult::failed(format!("{}\n{}", message, log)))
            }
            Err(message) => Err(AdapterResult::failed(format!("{}\n{}", message, log))),
        }
    }

    fn kubectl(&self) -> CommandSpec {
        let mut spec = CommandSpec::new(&self.config.kubectl).timeout(self.config.timeout);
        if let Some(context) = &self.config.kube_context {
            spec = spec.arg(format!("--context={}", context));
        }
        spec
    }

    fn helm(&self) -> CommandSpec {
        // Helm waits itself; leave headroom over its --timeout
        let mut spec = CommandSpec::new(&self.config.helm.program)
            .timeout(self.config.timeout + Duration::from_secs(30));
        if let Some(context) = &self.config.kube_context {
            spec = spec.arg(format!("--kube-context={}", context));
        }
        spec
    }
}

/// `{kebab(process)}-{kebab(env)}`, truncated to [`MAX_RELEASE_NAME`].
pub fn release_name(process_id: &str, environment: &str) -> String {
    let name = format!("{}-{}", kebab_case(process_id), kebab_case(environment));
    let truncated: String = name.chars().take(MAX_RELEASE_NAME).collect();
    truncated.trim_end_matches('-').to_string()
}

/// `host:5000/project/app:3` -> (`host:5000/project/app`, `3`). Missing tag -> `latest`.
pub fn split_image(image: &str) -> (&str, &str) {
    match image.rsplit_once(':') {
        Some((repository, tag)) if !tag.contains('/') => (repository, tag),
        _ => (image, "latest"),
    }
}
