//! Topology model
//!
//! In-memory aggregate assembled from a [`TopologySource`]: NUMA nodes with
//! their unassigned cpu lists, per-cpu sibling facts, and the running OS /
//! PMD pools the reservation engine fills in. Built once per run, mutated
//! only by the reservation engine, then read by the reporter.

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use thiserror::Error;

use crate::ranges::{parse_range_list, RangeParseError};
use crate::source::{SourceError, TopologySource};

/// Topology discovery failed; the caller should fall back to plain cpu
/// counts instead of attempting any reservation.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// The node pass could not be completed
    #[error("Error constructing node topology: {0}")]
    NodePass(#[source] PassError),

    /// The cpu pass could not be completed
    #[error("Error constructing cpu topology: {0}")]
    CpuPass(#[source] PassError),

    /// A cpu is claimed by zero or several nodes' cpu lists
    #[error("cpu {cpu} is claimed by {claims} numa nodes, expected exactly one")]
    NodeMembership { cpu: usize, claims: usize },

    /// A node's cpu list names a cpu with no topology entry
    #[error("cpu {cpu} appears in a node cpu list but has no cpu topology entry")]
    MissingCpu { cpu: usize },
}

/// Underlying cause of a failed discovery pass.
#[derive(Debug, Error)]
pub enum PassError {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Range(#[from] RangeParseError),
}

/// One logical cpu and its sibling relationships.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalCpu {
    /// Logical cpu id
    pub id: usize,
    /// Physical package (socket) this cpu belongs to, as reported
    pub physical_package_id: String,
    /// NUMA node owning this cpu
    pub numa_node: usize,
    /// Cpus sharing this cpu's physical package
    pub core_siblings: Vec<usize>,
    /// Hardware threads of this cpu's physical core, this cpu included
    pub thread_siblings: Vec<usize>,
}

/// One NUMA node and its cpu pools.
///
/// `cpu_list`, `os_cores` and `pmd_cores` stay pairwise disjoint; their
/// union is always the node's original cpu list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumaNode {
    /// Node index
    pub id: usize,
    /// Cpus not yet assigned to any pool, ascending
    pub cpu_list: Vec<usize>,
    /// Cpus reserved for OS housekeeping, ascending
    pub os_cores: Vec<usize>,
    /// Cpus reserved for DPDK PMDs, ascending
    pub pmd_cores: Vec<usize>,
}

impl NumaNode {
    /// Display name matching the sysfs directory (`node0`, `node1`, ...).
    pub fn name(&self) -> String {
        format!("node{}", self.id)
    }
}

/// The assembled host topology.
#[derive(Debug, Clone, Default)]
pub struct Topology {
    /// NUMA nodes in discovery order
    pub nodes: Vec<NumaNode>,
    /// Logical cpus keyed by id
    pub cpus: BTreeMap<usize, LogicalCpu>,
    /// Every cpu local to any node, ascending
    pub host_cores: Vec<usize>,
}

impl Topology {
    /// Assemble a topology from two passes over the source.
    ///
    /// The node pass collects each node's cpu list; the cpu pass collects
    /// per-cpu package and sibling facts and derives each cpu's owning node
    /// from the node pass membership. Any failure in either pass discards
    /// the whole topology.
    pub fn probe<S: TopologySource>(source: &S) -> Result<Self, DiscoveryError> {
        let mut topology = Topology::default();

        // Node pass
        let node_records = source.nodes().map_err(|e| DiscoveryError::NodePass(e.into()))?;
        for record in node_records {
            let cpus = parse_range_list(record.cpulist.trim())
                .map_err(|e| DiscoveryError::NodePass(e.into()))?;
            topology.host_cores.extend(cpus.iter().copied());
            topology.nodes.push(NumaNode {
                id: record.id,
                cpu_list: cpus.into_iter().collect(),
                os_cores: Vec::new(),
                pmd_cores: Vec::new(),
            });
        }
        topology.host_cores.sort_unstable();

        // Cpu pass
        let cpu_records = source.cpus().map_err(|e| DiscoveryError::CpuPass(e.into()))?;
        for record in cpu_records {
            let thread_siblings = parse_range_list(record.thread_siblings.trim())
                .map_err(|e| DiscoveryError::CpuPass(e.into()))?;
            let core_siblings = parse_range_list(record.core_siblings.trim())
                .map_err(|e| DiscoveryError::CpuPass(e.into()))?;

            let owners: Vec<usize> = topology
                .nodes
                .iter()
                .filter(|node| node.cpu_list.contains(&record.id))
                .map(|node| node.id)
                .collect();
            let numa_node = match owners.as_slice() {
                [node] => *node,
                _ => {
                    return Err(DiscoveryError::NodeMembership {
                        cpu: record.id,
                        claims: owners.len(),
                    })
                }
            };

            topology.cpus.insert(
                record.id,
                LogicalCpu {
                    id: record.id,
                    physical_package_id: record.physical_package_id.trim().to_string(),
                    numa_node,
                    core_siblings: core_siblings.into_iter().collect(),
                    thread_siblings: thread_siblings.into_iter().collect(),
                },
            );
        }

        // Every cpu a node claims must have a topology entry, otherwise the
        // reservation engine could not look up its sibling group.
        for &cpu in &topology.host_cores {
            if !topology.cpus.contains_key(&cpu) {
                return Err(DiscoveryError::MissingCpu { cpu });
            }
        }

        tracing::debug!(
            nodes = topology.nodes.len(),
            cpus = topology.cpus.len(),
            "assembled host topology"
        );
        Ok(topology)
    }

    /// All cpus reserved for the OS across nodes, ascending.
    pub fn os_cores(&self) -> Vec<usize> {
        self.pool(|node| &node.os_cores)
    }

    /// All cpus reserved for PMDs across nodes, ascending.
    pub fn pmd_cores(&self) -> Vec<usize> {
        self.pool(|node| &node.pmd_cores)
    }

    /// Host cores the kernel should not schedule on: everything except the
    /// OS pool. This is the value for `isolcpus` and friends.
    pub fn non_scheduled_cores(&self) -> Vec<usize> {
        let os: BTreeSet<usize> = self.os_cores().into_iter().collect();
        self.host_cores
            .iter()
            .copied()
            .filter(|cpu| !os.contains(cpu))
            .collect()
    }

    fn pool<F>(&self, select: F) -> Vec<usize>
    where
        F: Fn(&NumaNode) -> &Vec<usize>,
    {
        let mut cpus: Vec<usize> = self
            .nodes
            .iter()
            .flat_map(|node| select(node).iter().copied())
            .collect();
        cpus.sort_unstable();
        cpus
    }

    /// Thread-sibling group of `seed`, `seed` included.
    pub(crate) fn sibling_group(&self, seed: usize) -> Vec<usize> {
        match self.cpus.get(&seed) {
            Some(cpu) => cpu.thread_siblings.clone(),
            // Probe guarantees coverage; a cpu without an entry forms its
            // own group so the pass stays total.
            None => vec![seed],
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::MockSource;
    use super::*;

    #[test]
    fn test_probe_two_node_host() {
        let topology = Topology::probe(&MockSource::two_node_host()).unwrap();

        assert_eq!(topology.nodes.len(), 2);
        assert_eq!(topology.nodes[0].cpu_list, vec![0, 1, 2, 3]);
        assert_eq!(topology.nodes[1].cpu_list, vec![4, 5, 6, 7]);
        assert_eq!(topology.host_cores, vec![0, 1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(topology.cpus.len(), 8);

        let cpu5 = &topology.cpus[&5];
        assert_eq!(cpu5.numa_node, 1);
        assert_eq!(cpu5.physical_package_id, "1");
        assert_eq!(cpu5.thread_siblings, vec![5, 7]);
        assert_eq!(cpu5.core_siblings, vec![4, 5, 6, 7]);
    }

    #[test]
    fn test_thread_siblings_are_symmetric() {
        let topology = Topology::probe(&MockSource::two_node_host()).unwrap();
        for cpu in topology.cpus.values() {
            for &sibling in &cpu.thread_siblings {
                assert!(
                    topology.cpus[&sibling].thread_siblings.contains(&cpu.id),
                    "cpu {} lists {} as sibling but not vice versa",
                    cpu.id,
                    sibling
                );
            }
        }
    }

    #[test]
    fn test_failed_node_pass_discards_topology() {
        let mut source = MockSource::two_node_host();
        source.fail_nodes = true;
        assert!(matches!(
            Topology::probe(&source),
            Err(DiscoveryError::NodePass(_))
        ));
    }

    #[test]
    fn test_failed_cpu_pass_discards_topology() {
        let mut source = MockSource::two_node_host();
        source.fail_cpus = true;
        assert!(matches!(
            Topology::probe(&source),
            Err(DiscoveryError::CpuPass(_))
        ));
    }

    #[test]
    fn test_malformed_cpulist_is_a_node_pass_error() {
        let source = MockSource::new(&[(0, "0-x")], &[]);
        assert!(matches!(
            Topology::probe(&source),
            Err(DiscoveryError::NodePass(PassError::Range(_)))
        ));
    }

    #[test]
    fn test_cpu_claimed_by_no_node_is_rejected() {
        let source = MockSource::new(&[(0, "0-1")], &[(2, "0", "0-2", "2")]);
        assert!(matches!(
            Topology::probe(&source),
            Err(DiscoveryError::NodeMembership { cpu: 2, claims: 0 })
        ));
    }

    #[test]
    fn test_node_cpu_without_topology_entry_is_rejected() {
        let source = MockSource::new(
            &[(0, "0-1")],
            &[(0, "0", "0-1", "0")], // cpu1 never enumerated
        );
        assert!(matches!(
            Topology::probe(&source),
            Err(DiscoveryError::MissingCpu { cpu: 1 })
        ));
    }

    #[test]
    fn test_non_scheduled_cores_excludes_os_pool() {
        let mut topology = Topology::probe(&MockSource::two_node_host()).unwrap();
        topology.nodes[0].os_cores = vec![0, 2];
        topology.nodes[0].cpu_list = vec![1, 3];
        topology.nodes[1].os_cores = vec![4, 6];
        topology.nodes[1].cpu_list = vec![5, 7];
        assert_eq!(topology.os_cores(), vec![0, 2, 4, 6]);
        assert_eq!(topology.non_scheduled_cores(), vec![1, 3, 5, 7]);
    }
}
