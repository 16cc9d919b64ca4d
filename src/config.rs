//! Harness configuration.
//!
//! Everything an experiment run needs: how to reach the cluster, what to
//! name the probe keyspace/table/record, which containers are candidates
//! for the ownership mapping, and the timing knobs of the probe loops.
//! Loadable from a JSON file or from the environment (the
//! `CASSANDRA_*` variables the experiment scripts have always used).

use crate::error::{Result, RingfaultError};
use crate::types::UnitId;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Configuration for a node-failure experiment run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// Cluster contact points (hostnames or addresses).
    pub contact_points: Vec<String>,
    /// CQL port.
    pub port: u16,
    /// Optional authentication.
    pub username: Option<String>,
    pub password: Option<String>,
    /// Keyspace the experiment creates and tears through.
    pub keyspace: String,
    /// Probe table name.
    pub table: String,
    /// Partition key of the probe record.
    pub record_id: String,
    /// Replication factor for the experiment keyspace.
    pub replication_factor: u32,
    /// Candidate containers for ownership mapping, in priority order:
    /// the mapper returns the first match in this order.
    pub containers: Vec<UnitId>,
    /// Node count the cluster must reach before the experiment starts.
    pub expected_nodes: usize,
    /// How long to wait for the cluster to reach `expected_nodes`.
    pub cluster_wait: Duration,
    /// Pause after stopping the owner, letting the cluster notice.
    pub failure_detection_wait: Duration,
    /// How long to wait for the restarted container's healthcheck.
    pub health_wait: Duration,
    /// Probe attempts while the owner is down.
    pub outage_probe_retries: u32,
    /// Probe attempts after the owner restarts.
    pub restart_probe_retries: u32,
    /// Delay between probe attempts.
    pub probe_retry_delay: Duration,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            contact_points: vec!["localhost".to_string()],
            port: 9042,
            username: None,
            password: None,
            keyspace: "experiment_rf1".to_string(),
            table: "test_data".to_string(),
            record_id: "experiment-key-001".to_string(),
            replication_factor: 1,
            containers: vec![
                UnitId::from("cassandra-node1"),
                UnitId::from("cassandra-node2"),
                UnitId::from("cassandra-node3"),
            ],
            expected_nodes: 3,
            cluster_wait: Duration::from_secs(120),
            failure_detection_wait: Duration::from_secs(10),
            health_wait: Duration::from_secs(180),
            outage_probe_retries: 3,
            restart_probe_retries: 5,
            probe_retry_delay: Duration::from_secs(3),
        }
    }
}

impl HarnessConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| RingfaultError::Config(format!("failed to read config file: {}", e)))?;

        let config: Self = serde_json::from_str(&content)
            .map_err(|e| RingfaultError::Config(format!("failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Build configuration from the environment, with defaults for
    /// anything unset: `CASSANDRA_CONTACT_POINTS` (comma-separated),
    /// `CASSANDRA_PORT`, `CASSANDRA_USERNAME`, `CASSANDRA_PASSWORD`,
    /// `CASSANDRA_KEYSPACE`, `CASSANDRA_CONTAINERS` (comma-separated).
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(points) = std::env::var("CASSANDRA_CONTACT_POINTS") {
            config.contact_points = points.split(',').map(str::to_string).collect();
        }
        if let Ok(port) = std::env::var("CASSANDRA_PORT") {
            config.port = port.parse().map_err(|_| {
                RingfaultError::Config(format!("invalid CASSANDRA_PORT: '{}'", port))
            })?;
        }
        if let Ok(username) = std::env::var("CASSANDRA_USERNAME") {
            if !username.is_empty() {
                config.username = Some(username);
            }
        }
        if let Ok(password) = std::env::var("CASSANDRA_PASSWORD") {
            if !password.is_empty() {
                config.password = Some(password);
            }
        }
        if let Ok(keyspace) = std::env::var("CASSANDRA_KEYSPACE") {
            config.keyspace = keyspace;
        }
        if let Ok(containers) = std::env::var("CASSANDRA_CONTAINERS") {
            config.containers = containers.split(',').map(UnitId::from).collect();
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<()> {
        if self.contact_points.is_empty() {
            return Err(RingfaultError::Config(
                "at least one contact point is required".to_string(),
            ));
        }
        if self.keyspace.is_empty() {
            return Err(RingfaultError::Config("keyspace must not be empty".to_string()));
        }
        if self.containers.is_empty() {
            return Err(RingfaultError::Config(
                "at least one candidate container is required".to_string(),
            ));
        }
        if self.replication_factor == 0 {
            return Err(RingfaultError::Config(
                "replication factor must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Development preset: a local three-node compose cluster with short
    /// waits, for iterating on the harness itself.
    pub fn development() -> Self {
        Self {
            cluster_wait: Duration::from_secs(30),
            failure_detection_wait: Duration::from_secs(2),
            health_wait: Duration::from_secs(30),
            probe_retry_delay: Duration::from_secs(1),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        let config = HarnessConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.port, 9042);
        assert_eq!(config.keyspace, "experiment_rf1");
        assert_eq!(config.record_id, "experiment-key-001");
        assert_eq!(config.containers.len(), 3);
        assert_eq!(config.replication_factor, 1);
    }

    #[test]
    fn test_validate_rejects_empty_containers() {
        let config = HarnessConfig {
            containers: Vec::new(),
            ..HarnessConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_replication() {
        let config = HarnessConfig {
            replication_factor: 0,
            ..HarnessConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_file_round_trip() {
        let config = HarnessConfig::development();
        let json = serde_json::to_string_pretty(&config).unwrap();

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();

        let loaded = HarnessConfig::from_file(file.path()).unwrap();
        assert_eq!(loaded.keyspace, config.keyspace);
        assert_eq!(loaded.cluster_wait, config.cluster_wait);
        assert_eq!(loaded.containers, config.containers);
    }

    #[test]
    fn test_from_file_missing() {
        let err = HarnessConfig::from_file(Path::new("/nonexistent/ringfault.json"));
        assert!(err.is_err());
    }

    #[test]
    fn test_from_env_overrides() {
        std::env::set_var("CASSANDRA_CONTACT_POINTS", "cass1,cass2");
        std::env::set_var("CASSANDRA_KEYSPACE", "chaos_ks");
        std::env::set_var("CASSANDRA_CONTAINERS", "node-a,node-b");

        let config = HarnessConfig::from_env().unwrap();
        assert_eq!(config.contact_points, vec!["cass1", "cass2"]);
        assert_eq!(config.keyspace, "chaos_ks");
        assert_eq!(
            config.containers,
            vec![UnitId::from("node-a"), UnitId::from("node-b")]
        );

        std::env::remove_var("CASSANDRA_CONTACT_POINTS");
        std::env::remove_var("CASSANDRA_KEYSPACE");
        std::env::remove_var("CASSANDRA_CONTAINERS");
    }
}
