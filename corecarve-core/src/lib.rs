//! Corecarve Core - NUMA core partitioning advisor
//!
//! This library inspects a host's CPU/NUMA topology and recommends how to
//! split logical cpus between OS housekeeping, DPDK poll mode drivers, and
//! virtual machines, deriving the affinity masks Open vSwitch expects.

/// Cpu-list range notation parsing and formatting
pub mod ranges;

/// Topology sources (sysfs adapter and the source trait)
pub mod source;

/// The in-memory topology model and its assembly
pub mod topology;

/// The sibling-group reservation engine
pub mod reserve;

/// Hexadecimal cpu affinity masks
pub mod mask;

/// Table and override rendering
pub mod report;

pub use mask::CpuMask;
pub use ranges::{format_ranges, parse_range_list, RangeParseError};
pub use report::Reporter;
pub use reserve::{reserve, InsufficientCoresError, PoolKind, ReserveConfig};
pub use source::{SysfsSource, TopologySource};
pub use topology::{DiscoveryError, LogicalCpu, NumaNode, Topology};
