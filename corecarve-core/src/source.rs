//! Topology sources
//!
//! A [`TopologySource`] supplies the raw per-node and per-cpu facts the
//! topology model is assembled from. The production implementation is
//! [`SysfsSource`], which walks `/sys/devices/system/node` and
//! `/sys/devices/system/cpu`; tests supply their own source.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Default location of the kernel's node topology tree.
pub const SYSFS_NODE_ROOT: &str = "/sys/devices/system/node";

/// Default location of the kernel's cpu topology tree.
pub const SYSFS_CPU_ROOT: &str = "/sys/devices/system/cpu";

/// Failure reading a topology source entry.
#[derive(Debug, Error)]
#[error("failed to read {path}: {source}")]
pub struct SourceError {
    /// Path (or logical name) of the entry that failed
    pub path: String,
    #[source]
    pub source: io::Error,
}

/// Raw facts for one NUMA node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRecord {
    /// Node index (`node3` -> 3)
    pub id: usize,
    /// Contents of the node's `cpulist` file, newline included
    pub cpulist: String,
}

/// Raw facts for one logical cpu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CpuRecord {
    /// Cpu index (`cpu12` -> 12)
    pub id: usize,
    /// Contents of `topology/physical_package_id`
    pub physical_package_id: String,
    /// Contents of `topology/core_siblings_list`
    pub core_siblings: String,
    /// Contents of `topology/thread_siblings_list`
    pub thread_siblings: String,
}

/// Supplies node and cpu topology facts as the kernel exposes them.
///
/// The two accessors correspond to the two independent assembly passes;
/// each returns every record it can enumerate or the first read failure.
pub trait TopologySource {
    /// Enumerate every NUMA node with its raw cpu list.
    fn nodes(&self) -> Result<Vec<NodeRecord>, SourceError>;

    /// Enumerate every logical cpu with its raw sibling lists.
    fn cpus(&self) -> Result<Vec<CpuRecord>, SourceError>;
}

/// Reads topology from the Linux sysfs trees.
#[derive(Debug, Clone)]
pub struct SysfsSource {
    node_root: PathBuf,
    cpu_root: PathBuf,
}

impl SysfsSource {
    /// Source backed by the live system trees.
    pub fn new() -> Self {
        Self {
            node_root: PathBuf::from(SYSFS_NODE_ROOT),
            cpu_root: PathBuf::from(SYSFS_CPU_ROOT),
        }
    }

    /// Source backed by an alternate root containing `node/` and `cpu/`
    /// subtrees. Used for offline captures and tests.
    pub fn with_root(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            node_root: root.join("node"),
            cpu_root: root.join("cpu"),
        }
    }

    fn read_entry(path: &Path) -> Result<String, SourceError> {
        fs::read_to_string(path).map_err(|source| SourceError {
            path: path.display().to_string(),
            source,
        })
    }

    /// List the indices of entries named `<prefix><digits>` in a directory,
    /// sorted ascending. Skips names like `cpufreq` where the suffix is not
    /// purely numeric.
    fn indexed_entries(dir: &Path, prefix: &str) -> Result<Vec<usize>, SourceError> {
        let entries = fs::read_dir(dir).map_err(|source| SourceError {
            path: dir.display().to_string(),
            source,
        })?;

        let mut ids = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| SourceError {
                path: dir.display().to_string(),
                source,
            })?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if let Some(suffix) = name.strip_prefix(prefix) {
                if let Ok(id) = suffix.parse::<usize>() {
                    ids.push(id);
                }
            }
        }
        ids.sort_unstable();
        Ok(ids)
    }
}

impl Default for SysfsSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TopologySource for SysfsSource {
    fn nodes(&self) -> Result<Vec<NodeRecord>, SourceError> {
        let mut records = Vec::new();
        for id in Self::indexed_entries(&self.node_root, "node")? {
            let path = self.node_root.join(format!("node{}", id)).join("cpulist");
            records.push(NodeRecord {
                id,
                cpulist: Self::read_entry(&path)?,
            });
        }
        Ok(records)
    }

    fn cpus(&self) -> Result<Vec<CpuRecord>, SourceError> {
        let mut records = Vec::new();
        for id in Self::indexed_entries(&self.cpu_root, "cpu")? {
            let topo = self.cpu_root.join(format!("cpu{}", id)).join("topology");
            records.push(CpuRecord {
                id,
                physical_package_id: Self::read_entry(&topo.join("physical_package_id"))?,
                core_siblings: Self::read_entry(&topo.join("core_siblings_list"))?,
                thread_siblings: Self::read_entry(&topo.join("thread_siblings_list"))?,
            });
        }
        Ok(records)
    }
}
