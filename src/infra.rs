//! Infrastructure control: the container runtime boundary.
//!
//! The harness acts on cluster nodes through whatever hosts them. That
//! capability is abstracted behind [`InfrastructureControl`] so the
//! runtime flavor (CLI shell-out, native client, or a test fake) is a
//! swappable adapter; one concrete adapter ships, [`DockerCli`], which
//! drives the `docker` binary.
//!
//! Address probes are soft: a unit whose address cannot be determined
//! reports `None` rather than failing, so a mapper scan can skip it and
//! continue. Stop/start are hard operations and do fail loudly.

use crate::error::{Result, RingfaultError};
use crate::types::{NodeAddress, UnitId};
use async_trait::async_trait;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Container health as reported by the runtime's healthcheck.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    Starting,
    Healthy,
    Unhealthy,
}

impl HealthStatus {
    /// Parse the runtime's status string. Unknown or empty strings map to
    /// `None`, the same as "no healthcheck configured".
    pub fn parse(status: &str) -> Option<Self> {
        match status {
            "starting" => Some(HealthStatus::Starting),
            "healthy" => Some(HealthStatus::Healthy),
            "unhealthy" => Some(HealthStatus::Unhealthy),
            _ => None,
        }
    }
}

/// Control surface over the infrastructure units hosting cluster nodes.
#[async_trait]
pub trait InfrastructureControl: Send + Sync {
    /// The unit's current network address, or `None` when it cannot be
    /// determined (stopped unit, runtime error). Never aborts a scan.
    async fn current_address(&self, unit: &UnitId) -> Result<Option<NodeAddress>>;

    /// Stop the unit, forcibly removing its node from the cluster.
    async fn stop(&self, unit: &UnitId) -> Result<()>;

    /// Start a previously stopped unit.
    async fn start(&self, unit: &UnitId) -> Result<()>;

    /// Healthcheck status; `None` when no healthcheck is configured.
    async fn health_status(&self, unit: &UnitId) -> Result<Option<HealthStatus>>;

    /// Whether the unit's process is currently running.
    async fn is_running(&self, unit: &UnitId) -> Result<bool>;
}

/// Poll a unit until its healthcheck reports healthy.
///
/// Units without a healthcheck fall back to a running check plus a short
/// grace period, matching how the store's containers behave before their
/// gossip settles. Returns `false` on timeout; callers typically log and
/// continue to the next probe rather than abort.
pub async fn wait_healthy<I: InfrastructureControl>(
    infra: &I,
    unit: &UnitId,
    max_wait: Duration,
) -> bool {
    info!(unit = %unit, "waiting for unit to become healthy");
    let deadline = tokio::time::Instant::now() + max_wait;

    while tokio::time::Instant::now() < deadline {
        match infra.health_status(unit).await {
            Ok(Some(HealthStatus::Healthy)) => {
                info!(unit = %unit, "unit is healthy");
                return true;
            }
            Ok(Some(HealthStatus::Unhealthy)) => {
                // Keep waiting in case it recovers.
                warn!(unit = %unit, "unit is unhealthy");
            }
            Ok(Some(HealthStatus::Starting)) => {
                info!(unit = %unit, "unit healthcheck is starting");
            }
            Ok(None) => {
                if let Ok(true) = infra.is_running(unit).await {
                    info!(unit = %unit, "unit is running (no healthcheck configured)");
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    return true;
                }
            }
            Err(e) => debug!(unit = %unit, error = %e, "could not get health status"),
        }

        tokio::time::sleep(Duration::from_secs(2)).await;
    }

    warn!(unit = %unit, "unit did not become healthy within {:?}", max_wait);
    false
}

/// Adapter that drives the `docker` CLI.
#[derive(Debug, Clone)]
pub struct DockerCli {
    binary: String,
    command_timeout: Duration,
    stop_timeout_secs: u32,
}

impl Default for DockerCli {
    fn default() -> Self {
        Self {
            binary: "docker".to_string(),
            command_timeout: Duration::from_secs(30),
            stop_timeout_secs: 30,
        }
    }
}

impl DockerCli {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different binary name or path (e.g. `podman`).
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    async fn run(&self, args: &[&str]) -> Result<String> {
        info!(target: "docker", "{} {}", self.binary, args.join(" "));

        let output = tokio::time::timeout(
            self.command_timeout,
            Command::new(&self.binary).args(args).output(),
        )
        .await
        .map_err(|_| {
            RingfaultError::Infrastructure(format!(
                "{} {} timed out after {:?}",
                self.binary, args[0], self.command_timeout
            ))
        })??;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RingfaultError::Infrastructure(format!(
                "{} {} failed: {}",
                self.binary,
                args[0],
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

#[async_trait]
impl InfrastructureControl for DockerCli {
    async fn current_address(&self, unit: &UnitId) -> Result<Option<NodeAddress>> {
        let template = "{{range .NetworkSettings.Networks}}{{.IPAddress}}{{end}}";
        match self
            .run(&["inspect", "-f", template, unit.as_str()])
            .await
        {
            Ok(ip) if ip.is_empty() => Ok(None),
            Ok(ip) => Ok(Some(NodeAddress::new(ip))),
            Err(e) => {
                debug!(unit = %unit, error = %e, "could not inspect unit");
                Ok(None)
            }
        }
    }

    async fn stop(&self, unit: &UnitId) -> Result<()> {
        info!(unit = %unit, "stopping container");
        let timeout = self.stop_timeout_secs.to_string();
        self.run(&["stop", "--time", &timeout, unit.as_str()]).await?;
        info!(unit = %unit, "container stopped");
        Ok(())
    }

    async fn start(&self, unit: &UnitId) -> Result<()> {
        info!(unit = %unit, "starting container");
        self.run(&["start", unit.as_str()]).await?;
        info!(unit = %unit, "container started");
        Ok(())
    }

    async fn health_status(&self, unit: &UnitId) -> Result<Option<HealthStatus>> {
        // Containers without a healthcheck make the template fail or
        // print nothing; both mean "no healthcheck".
        match self
            .run(&["inspect", "--format", "{{.State.Health.Status}}", unit.as_str()])
            .await
        {
            Ok(status) => Ok(HealthStatus::parse(&status)),
            Err(e) => {
                debug!(unit = %unit, error = %e, "no health status available");
                Ok(None)
            }
        }
    }

    async fn is_running(&self, unit: &UnitId) -> Result<bool> {
        let state = self
            .run(&["inspect", "--format", "{{.State.Running}}", unit.as_str()])
            .await?;
        Ok(state == "true")
    }
}
