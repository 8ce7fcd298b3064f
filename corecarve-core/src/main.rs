//! Corecarve CLI
//!
//! Inspects the host topology via sysfs, runs the reservation engine, and
//! prints the breakdown table with recommended kernel parameters and Open
//! vSwitch overrides.

use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use corecarve_core::{reserve, Reporter, ReserveConfig, SysfsSource, Topology};

/// Recommend an OS / DPDK PMD / virtual machine cpu partitioning for this
/// host, with the matching affinity masks and kernel boot parameters.
#[derive(Debug, Parser)]
#[command(name = "corecarve", version)]
struct Cli {
    /// Sibling groups to reserve per NUMA node for OS housekeeping
    #[arg(long, default_value_t = 1)]
    os_cores_per_node: usize,

    /// Sibling groups to reserve per NUMA node for DPDK poll mode drivers
    #[arg(long, default_value_t = 1)]
    pmd_cores_per_node: usize,

    /// Memory to reserve per socket in MB (1024 for 1500 MTU, 4096 for
    /// 9000 MTU)
    #[arg(long, default_value_t = 4096)]
    host_memory_per_node_mb: usize,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Read topology from an alternate root containing node/ and cpu/
    /// trees instead of /sys/devices/system
    #[arg(long, value_name = "PATH")]
    sysfs_root: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = ReserveConfig {
        os_cores_per_node: cli.os_cores_per_node,
        pmd_cores_per_node: cli.pmd_cores_per_node,
        host_memory_per_node_mb: cli.host_memory_per_node_mb,
    };
    let color = !cli.no_color && std::io::stdout().is_terminal();
    let reporter = Reporter::new(color);

    let source = match &cli.sysfs_root {
        Some(root) => SysfsSource::with_root(root),
        None => SysfsSource::new(),
    };

    match Topology::probe(&source) {
        Ok(mut topology) => {
            reserve(&mut topology, &config)?;
            print!("{}", reporter.render(&topology, &config));
        }
        Err(error) => {
            // Discovery failure degrades to a textual report; the process
            // still exits 0 to match the original tool's behavior.
            tracing::warn!(%error, "topology discovery failed, degrading");
            print!("{}", reporter.render_degraded(&error));
        }
    }
    Ok(())
}
