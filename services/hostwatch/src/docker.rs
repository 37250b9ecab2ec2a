//! Container monitor backed by the docker CLI

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::TimeDelta;
use serde::Deserialize;

use crate::config::Config;
use crate::monitor::{CheckReport, Monitor};

const DOCKER_TIMEOUT: Duration = Duration::from_secs(10);

/// A container as reported by the runtime
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerInfo {
    pub name: String,
    /// Lifecycle state, e.g. `running`, `exited`, `restarting`
    pub state: String,
}

/// Access to the container runtime
#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait ContainerRuntime: Send + Sync {
    /// List all containers, running or not
    async fn list_containers(&self) -> crate::Result<Vec<ContainerInfo>>;
}

/// One line of `docker ps --format '{{json .}}'`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PsLine {
    names: String,
    state: String,
}

/// Parse the line-delimited JSON produced by `docker ps --format '{{json .}}'`
pub fn parse_ps_output(stdout: &str) -> crate::Result<Vec<ContainerInfo>> {
    let mut containers = Vec::new();
    for line in stdout.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let parsed: PsLine = serde_json::from_str(line)?;
        // A container can carry several comma-separated names.
        for name in parsed.names.split(',') {
            containers.push(ContainerInfo {
                name: name.trim().to_string(),
                state: parsed.state.to_lowercase(),
            });
        }
    }
    Ok(containers)
}

/// Runtime that shells out to `docker ps`
#[derive(Debug, Clone)]
pub struct DockerCli {
    program: String,
    timeout: Duration,
}

impl Default for DockerCli {
    fn default() -> Self {
        Self {
            program: "docker".to_string(),
            timeout: DOCKER_TIMEOUT,
        }
    }
}

impl DockerCli {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }
}

#[async_trait]
impl ContainerRuntime for DockerCli {
    async fn list_containers(&self) -> crate::Result<Vec<ContainerInfo>> {
        tracing::debug!("Listing containers via '{} ps'", self.program);
        let output = tokio::time::timeout(
            self.timeout,
            tokio::process::Command::new(&self.program)
                // Stopped containers are listed too and report their state.
                .args(["ps", "--all", "--no-trunc", "--format", "{{json .}}"])
                .kill_on_drop(true)
                .output(),
        )
        .await
        .map_err(|_| {
            crate::HostwatchError::Probe(format!(
                "'{} ps' timed out after {:?}",
                self.program, self.timeout
            ))
        })?
        .map_err(|e| {
            crate::HostwatchError::Probe(format!("Failed to run '{}': {}", self.program, e))
        })?;

        if !output.status.success() {
            return Err(crate::HostwatchError::Probe(format!(
                "'{} ps' exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        parse_ps_output(&String::from_utf8_lossy(&output.stdout))
    }
}

/// Alerts when a target container is missing or not running
pub struct DockerMonitor {
    containers: Vec<String>,
    grace_period: TimeDelta,
    runtime: Arc<dyn ContainerRuntime>,
}

impl std::fmt::Debug for DockerMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DockerMonitor")
            .field("containers", &self.containers)
            .field("grace_period", &self.grace_period)
            .finish()
    }
}

impl DockerMonitor {
    pub fn new(config: &Config, runtime: Arc<dyn ContainerRuntime>) -> Self {
        Self {
            containers: config.docker.containers.clone(),
            grace_period: config.docker.grace_period(),
            runtime,
        }
    }

    pub fn check_id(name: &str) -> String {
        format!("docker_{}", name)
    }
}

#[async_trait]
impl Monitor for DockerMonitor {
    fn name(&self) -> &str {
        "docker"
    }

    fn grace_period(&self) -> Option<TimeDelta> {
        Some(self.grace_period)
    }

    async fn check(&self) -> crate::Result<Vec<CheckReport>> {
        let listed = self
            .runtime
            .list_containers()
            .await
            .map_err(|e| crate::HostwatchError::Monitor(format!("Docker unavailable: {}", e)))?;
        let states: HashMap<&str, &str> = listed
            .iter()
            .map(|c| (c.name.as_str(), c.state.as_str()))
            .collect();

        let reports = self
            .containers
            .iter()
            .map(|name| {
                let check_id = Self::check_id(name);
                match states.get(name.as_str()) {
                    None => CheckReport::unhealthy(
                        check_id,
                        "Container Down",
                        format!("Container '{}' is not running.", name),
                    ),
                    Some(&"running") => CheckReport::healthy(check_id),
                    Some(state) => CheckReport::unhealthy(
                        check_id,
                        "Container Unhealthy",
                        format!("Container '{}' status is '{}'.", name, state),
                    ),
                }
            })
            .collect();
        Ok(reports)
    }
}
