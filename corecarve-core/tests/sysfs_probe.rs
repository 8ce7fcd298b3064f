//! End-to-end test against an on-disk sysfs capture: probe, reserve, and
//! render for a two-node host with paired hardware threads.

use std::path::PathBuf;

use corecarve_core::{reserve, CpuMask, Reporter, ReserveConfig, SysfsSource, Topology};

fn fixture_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/sysfs")
}

#[test]
fn probe_reads_fixture_tree() {
    let source = SysfsSource::with_root(fixture_root());
    let topology = Topology::probe(&source).unwrap();

    assert_eq!(topology.nodes.len(), 2);
    assert_eq!(topology.nodes[0].name(), "node0");
    assert_eq!(topology.nodes[0].cpu_list, vec![0, 1, 2, 3]);
    assert_eq!(topology.nodes[1].cpu_list, vec![4, 5, 6, 7]);
    // Non-numeric entries like `cpufreq` and `possible` are skipped
    assert_eq!(topology.cpus.len(), 8);
    assert_eq!(topology.cpus[&6].thread_siblings, vec![4, 6]);
    assert_eq!(topology.cpus[&6].numa_node, 1);
    assert_eq!(topology.cpus[&6].physical_package_id, "1");
}

#[test]
fn reservation_and_report_from_fixture() {
    let source = SysfsSource::with_root(fixture_root());
    let mut topology = Topology::probe(&source).unwrap();
    reserve(&mut topology, &ReserveConfig::default()).unwrap();

    assert_eq!(topology.os_cores(), vec![0, 2, 4, 6]);
    assert_eq!(topology.pmd_cores(), vec![1, 3, 5, 7]);
    assert_eq!(CpuMask::from_cpus(topology.os_cores()).to_hex(), "55");
    assert_eq!(CpuMask::from_cpus(topology.pmd_cores()).to_hex(), "aa");

    let report = Reporter::new(false).render(&topology, &ReserveConfig::default());
    assert!(report.contains("| Reserved Cores |        Purpose        | Mask | node0 | node1 |"));
    assert!(report.contains("isolcpus=1,3,5,7 nohz_full=1,3,5,7 rcu_nocbs=1,3,5,7"));
    assert!(report.contains("ovs_dpdk_lcore_mask: 55"));
    assert!(report.contains("ovs_dpdk_pmd_cpu_mask: aa"));
    assert!(report.contains("ovs_dpdk_socket_mem: 4096,4096"));
}

#[test]
fn missing_tree_degrades_with_node_pass_error() {
    let source = SysfsSource::with_root(fixture_root().join("does-not-exist"));
    let error = Topology::probe(&source).unwrap_err();
    assert!(error.to_string().contains("Error constructing node topology"));
}
