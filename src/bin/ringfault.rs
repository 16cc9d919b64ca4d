//! Ringfault CLI - offline pieces of the harness from the command line.
//!
//! The full experiment needs a store adapter wired in; what the CLI
//! exposes is everything that works without one: local token
//! computation, node-to-container mapping against the local Docker
//! daemon, and container stop/start passthrough.

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use ringfault::infra::{DockerCli, InfrastructureControl};
use ringfault::types::{ClusterTopologySnapshot, NodeAddress, UnitId};
use ringfault::{mapper, partitioner};
use std::collections::HashMap;
use tracing_subscriber::EnvFilter;

/// Fault-injection harness utilities for Cassandra-compatible clusters
#[derive(Parser)]
#[command(name = "ringfault")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the local ring token for a key
    Token {
        /// Partition key to hash
        key: String,

        /// Partitioner class name declared by the cluster
        #[arg(
            long,
            default_value = "org.apache.cassandra.dht.Murmur3Partitioner"
        )]
        partitioner: String,
    },

    /// Map a cluster node address to one of the given containers
    Locate {
        /// Node address as the cluster reports it
        address: String,

        /// Candidate container names, in priority order
        #[arg(long, value_delimiter = ',', required = true)]
        containers: Vec<String>,
    },

    /// Stop a container
    Stop {
        /// Container name
        container: String,
    },

    /// Start a container
    Start {
        /// Container name
        container: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    match cli.command {
        Commands::Token { key, partitioner } => match partitioner::compute_token(&key, &partitioner)
        {
            Some(token) => println!("{}", token),
            None => bail!("partitioner '{}' is not Murmur3, no local token", partitioner),
        },

        Commands::Locate {
            address,
            containers,
        } => {
            let docker = DockerCli::new();
            let target = NodeAddress::from(address);
            let units: Vec<UnitId> = containers.into_iter().map(UnitId::from).collect();

            // No cluster connection here, so the cross-reference fallback
            // gets an empty snapshot and only the direct probe applies.
            let snapshot = ClusterTopologySnapshot {
                partitioner: String::new(),
                nodes: Vec::new(),
                keyspaces: HashMap::new(),
                has_token_map: false,
            };

            match mapper::locate_unit(&docker, &target, &units, &snapshot).await {
                Some(unit) => println!("{}", unit),
                None => bail!("no container matched address {}", target),
            }
        }

        Commands::Stop { container } => {
            DockerCli::new().stop(&UnitId::from(container)).await?;
        }

        Commands::Start { container } => {
            DockerCli::new().start(&UnitId::from(container)).await?;
        }
    }

    Ok(())
}
