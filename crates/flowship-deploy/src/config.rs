// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Configuration for flowship-deploy.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::adapters::{BuildConfig, ClusterConfig, ContainerConfig, HelmConfig, RegistryConfig, VcsConfig};
use crate::engine::EngineConfig;

/// Deployment pipeline configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct DeployConfig {
    /// `sqlite:` URL of the deployment store
    pub database_url: String,
    /// Data directory for the store and generated workspaces
    pub data_dir: PathBuf,
    pub vcs: VcsConfig,
    pub build: BuildConfig,
    pub container: ContainerConfig,
    pub cluster: ClusterConfig,
    pub engine: EngineConfig,
}

impl Default for DeployConfig {
    fn default() -> Self {
        let data_dir = PathBuf::from(".data");
        Self {
            database_url: default_database_url(&data_dir),
            data_dir,
            vcs: VcsConfig::default(),
            build: BuildConfig::default(),
            container: ContainerConfig::default(),
            cluster: ClusterConfig::default(),
            engine: EngineConfig::default(),
        }
    }
}

impl DeployConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through `lookup`; unset and empty values take defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let data_dir = get("DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir);
        let database_url = get("FLOWSHIP_DATABASE_URL").unwrap_or_else(|| default_database_url(&data_dir));

        let vcs = VcsConfig {
            remote_url: get("FLOWSHIP_VCS_REMOTE_URL"),
            branch: get("FLOWSHIP_VCS_BRANCH").unwrap_or(defaults.vcs.branch),
            username: get("FLOWSHIP_VCS_USERNAME"),
            token: get("FLOWSHIP_VCS_TOKEN"),
            author_name: get("FLOWSHIP_VCS_AUTHOR_NAME").unwrap_or(defaults.vcs.author_name),
            author_email: get("FLOWSHIP_VCS_AUTHOR_EMAIL").unwrap_or(defaults.vcs.author_email),
            ..defaults.vcs
        };

        let mut build = BuildConfig {
            run_tests: parse_bool("FLOWSHIP_BUILD_RUN_TESTS", get("FLOWSHIP_BUILD_RUN_TESTS"), false)?,
            timeout: parse_secs("FLOWSHIP_BUILD_TIMEOUT_SECS", get("FLOWSHIP_BUILD_TIMEOUT_SECS"), defaults.build.timeout)?,
            output_dir: get("FLOWSHIP_BUILD_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.build.output_dir.clone()),
            ..defaults.build
        };
        if let Some(command) = get("FLOWSHIP_BUILD_COMMAND") {
            build = build.with_command(&command);
        }

        let registry = RegistryConfig {
            url: get("FLOWSHIP_REGISTRY_URL").unwrap_or(defaults.container.registry.url.clone()),
            project: get("FLOWSHIP_REGISTRY_PROJECT").unwrap_or(defaults.container.registry.project.clone()),
            username: get("FLOWSHIP_REGISTRY_USERNAME"),
            password: get("FLOWSHIP_REGISTRY_PASSWORD"),
        };
        match (&registry.username, &registry.password) {
            (Some(_), None) => return Err(ConfigError::MissingEnvVar("FLOWSHIP_REGISTRY_PASSWORD")),
            (None, Some(_)) => return Err(ConfigError::MissingEnvVar("FLOWSHIP_REGISTRY_USERNAME")),
            _ => {}
        }
        let container = ContainerConfig {
            tool: get("FLOWSHIP_CONTAINER_TOOL").unwrap_or(defaults.container.tool.clone()),
            timeout: parse_secs(
                "FLOWSHIP_CONTAINER_TIMEOUT_SECS",
                get("FLOWSHIP_CONTAINER_TIMEOUT_SECS"),
                defaults.container.timeout,
            )?,
            registry,
            ..defaults.container
        };

        let engine = EngineConfig {
            url: get("FLOWSHIP_ENGINE_URL").unwrap_or(defaults.engine.url),
            token: get("FLOWSHIP_ENGINE_TOKEN"),
            timeout: parse_secs(
                "FLOWSHIP_ENGINE_TIMEOUT_SECS",
                get("FLOWSHIP_ENGINE_TIMEOUT_SECS"),
                defaults.engine.timeout,
            )?,
        };

        let helm = HelmConfig {
            enabled: parse_bool("FLOWSHIP_HELM_ENABLED", get("FLOWSHIP_HELM_ENABLED"), defaults.cluster.helm.enabled)?,
            chart: get("FLOWSHIP_HELM_CHART").unwrap_or(defaults.cluster.helm.chart.clone()),
            chart_version: get("FLOWSHIP_HELM_CHART_VERSION"),
            ..defaults.cluster.helm.clone()
        };
        let service_port = match get("FLOWSHIP_CLUSTER_SERVICE_PORT") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidPort)?,
            None => defaults.cluster.service_port,
        };
        let cluster = ClusterConfig {
            namespace_pattern: get("FLOWSHIP_CLUSTER_NAMESPACE_PATTERN")
                .unwrap_or(defaults.cluster.namespace_pattern.clone()),
            kube_context: get("FLOWSHIP_KUBE_CONTEXT"),
            timeout: parse_secs(
                "FLOWSHIP_CLUSTER_TIMEOUT_SECS",
                get("FLOWSHIP_CLUSTER_TIMEOUT_SECS"),
                defaults.cluster.timeout,
            )?,
            service_port,
            // The workload reaches the engine at the same address the pipeline uses
            engine_url: engine.url.clone(),
            helm,
            ..defaults.cluster
        };

        Ok(Self {
            database_url,
            data_dir,
            vcs,
            build,
            container,
            cluster,
            engine,
        })
    }

    /// Root of the per-deployment working directories.
    pub fn workspaces_dir(&self) -> PathBuf {
        self.data_dir.join("workspaces")
    }
}

fn default_database_url(data_dir: &std::path::Path) -> String {
    format!("sqlite:{}?mode=rwc", data_dir.join("flowship.db").display())
}

fn parse_secs(var: &'static str, raw: Option<String>, default: Duration) -> Result<Duration, ConfigError> {
    match raw {
        Some(raw) => u64::from_str(raw.trim())
            .map(Duration::from_secs)
            .map_err(|_| ConfigError::InvalidNumber { var, value: raw }),
        None => Ok(default),
    }
}

fn parse_bool(var: &'static str, raw: Option<String>, default: bool) -> Result<bool, ConfigError> {
    match raw.as_deref().map(str::trim) {
        None => Ok(default),
        Some("true" | "1" | "yes") => Ok(true),
        Some("false" | "0" | "no") => Ok(false),
        Some(other) => Err(ConfigError::InvalidBool {
            var,
            value: other.to_string(),
        }),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required environment variable is missing.
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(&'static str),
    /// The port number is invalid.
    #[error("Invalid port number")]
    InvalidPort,
    /// A numeric variable could not be parsed.
    #[error("Invalid number in {var}: '{value}'")]
    InvalidNumber { var: &'static str, value: String },
    /// A boolean variable could not be parsed.
    #[error("Invalid boolean in {var}: '{value}' (expected true/false)")]
    InvalidBool { var: &'static str, value: String },
}
