//! Core reservation engine
//!
//! Carves whole thread-sibling groups out of each node's available cpu
//! list, OS pool first across every node, then PMD pool. Seeds are always
//! the smallest remaining cpu id, so the carve is deterministic and
//! auditable. Counts are in sibling groups, not raw cpu ids.

use std::collections::BTreeSet;
use std::fmt;

use thiserror::Error;

use crate::topology::Topology;

/// Which pool a reservation round is filling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolKind {
    Os,
    Pmd,
}

impl fmt::Display for PoolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Os => f.write_str("OS"),
            Self::Pmd => f.write_str("PMD"),
        }
    }
}

/// A node ran out of cpus mid-reservation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error(
    "node{node} ran out of cpus while reserving {kind} sibling group {selected} of {requested}; \
     reduce the per-node reservation counts"
)]
pub struct InsufficientCoresError {
    /// Node that could not supply another group
    pub node: usize,
    /// Pool being filled when the node ran dry
    pub kind: PoolKind,
    /// Groups already taken from this node for this pool
    pub selected: usize,
    /// Groups requested per node for this pool
    pub requested: usize,
}

/// Reservation tunables. An explicit value object: the engine has no
/// process-wide state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReserveConfig {
    /// Sibling groups reserved per node for OS housekeeping
    pub os_cores_per_node: usize,
    /// Sibling groups reserved per node for DPDK PMDs
    pub pmd_cores_per_node: usize,
    /// Memory reserved per socket in MB, surfaced verbatim in the report.
    /// 1024 suits a 1500 MTU, 4096 a 9000 MTU.
    pub host_memory_per_node_mb: usize,
}

impl Default for ReserveConfig {
    fn default() -> Self {
        Self {
            os_cores_per_node: 1,
            pmd_cores_per_node: 1,
            host_memory_per_node_mb: 4096,
        }
    }
}

/// Run both reservation phases: the OS pool for every node, then the PMD
/// pool for every node. PMD reservation sees each node's cpu list after
/// the OS carve, so the phase order is load-bearing.
pub fn reserve(topology: &mut Topology, config: &ReserveConfig) -> Result<(), InsufficientCoresError> {
    topology.reserve_os_cores(config.os_cores_per_node)?;
    topology.reserve_pmd_cores(config.pmd_cores_per_node)?;
    Ok(())
}

impl Topology {
    /// Reserve `groups` thread-sibling groups per node for the OS pool.
    pub fn reserve_os_cores(&mut self, groups: usize) -> Result<(), InsufficientCoresError> {
        self.reserve_pool(PoolKind::Os, groups)
    }

    /// Reserve `groups` thread-sibling groups per node for the PMD pool.
    /// Call after [`reserve_os_cores`](Self::reserve_os_cores).
    pub fn reserve_pmd_cores(&mut self, groups: usize) -> Result<(), InsufficientCoresError> {
        self.reserve_pool(PoolKind::Pmd, groups)
    }

    fn reserve_pool(&mut self, kind: PoolKind, groups: usize) -> Result<(), InsufficientCoresError> {
        for idx in 0..self.nodes.len() {
            let node_id = self.nodes[idx].id;
            let mut available = self.nodes[idx].cpu_list.clone();
            available.sort_unstable();
            let mut reserved: BTreeSet<usize> = BTreeSet::new();

            for selected in 0..groups {
                // Smallest remaining id seeds the next group
                let Some(&seed) = available.first() else {
                    return Err(InsufficientCoresError {
                        node: node_id,
                        kind,
                        selected,
                        requested: groups,
                    });
                };
                let group = self.sibling_group(seed);
                // The whole group leaves the node together; a lone reserved
                // thread whose sibling stayed schedulable would leak noise
                // into the guest pool
                available.retain(|cpu| !group.contains(cpu));
                reserved.extend(group);
            }

            let node = &mut self.nodes[idx];
            node.cpu_list = available;
            let pool: Vec<usize> = reserved.into_iter().collect();
            tracing::debug!(node = node_id, %kind, cores = ?pool, "reserved sibling groups");
            match kind {
                PoolKind::Os => node.os_cores = pool,
                PoolKind::Pmd => node.pmd_cores = pool,
            }
        }
        Ok(())
    }
}
