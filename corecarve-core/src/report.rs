//! Report rendering
//!
//! Turns a finished [`Topology`] into the human-readable breakdown table,
//! the recommended kernel boot parameters, and the Open vSwitch override
//! values. Presentation only: the topology model never carries color codes
//! or formatted text.

use crate::mask::CpuMask;
use crate::ranges::format_ranges;
use crate::reserve::ReserveConfig;
use crate::topology::{DiscoveryError, Topology};

const GREEN: &str = "\x1b[92m";
const RESET: &str = "\x1b[0m";

/// Renders reports, optionally colorizing the mask cells.
#[derive(Debug, Clone)]
pub struct Reporter {
    color: bool,
}

/// One table cell: its text and whether it gets the highlight color.
struct Cell {
    text: String,
    green: bool,
}

impl Cell {
    fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            green: false,
        }
    }

    fn mask(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            green: true,
        }
    }
}

impl Reporter {
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    /// Render the full report for a topology that completed reservation.
    pub fn render(&self, topology: &Topology, config: &ReserveConfig) -> String {
        let os_cores = topology.os_cores();
        let pmd_cores = topology.pmd_cores();
        let host_mask = CpuMask::from_cpus(os_cores.iter().copied()).to_hex();
        let pmd_mask = CpuMask::from_cpus(pmd_cores.iter().copied()).to_hex();

        let mut header = vec!["Reserved Cores".to_string(), "Purpose".to_string(), "Mask".to_string()];
        header.extend(topology.nodes.iter().map(|node| node.name()));

        let mut os_row = vec![
            Cell::plain(pool_cell(&os_cores)),
            Cell::plain("Host Operating System"),
            Cell::mask(host_mask.clone()),
        ];
        os_row.extend(topology.nodes.iter().map(|n| Cell::plain(pool_cell(&n.os_cores))));

        let mut pmd_row = vec![
            Cell::plain(pool_cell(&pmd_cores)),
            Cell::plain("DPDK PMDs"),
            Cell::mask(pmd_mask.clone()),
        ];
        pmd_row.extend(topology.nodes.iter().map(|n| Cell::plain(pool_cell(&n.pmd_cores))));

        let mut vm_row = vec![
            Cell::plain("N/A"),
            Cell::plain("Virtual Machines"),
            Cell::plain("None"),
        ];
        vm_row.extend(topology.nodes.iter().map(|n| Cell::plain(pool_cell(&n.cpu_list))));

        let rows = [os_row, pmd_row, vm_row];
        let widths = column_widths(&header, &rows);

        let mut out = String::new();
        out.push_str(
            "\nThe following table provides the breakdown of cores/threads per numa node\n\
             reserved for their respective function.\n",
        );
        let rule = rule_line(&widths);
        out.push_str(&rule);
        out.push('\n');
        out.push_str(&self.header_line(&header, &widths));
        out.push('\n');
        out.push_str(&rule);
        out.push('\n');
        for row in &rows {
            out.push_str(&self.row_line(row, &widths));
            out.push('\n');
        }
        out.push_str(&rule);
        out.push('\n');

        let isolated = format_ranges(topology.non_scheduled_cores());
        out.push_str("\nRecommended kernel parameters:\n");
        out.push_str(&format!(
            "\"GRUB_CMDLINE_LINUX=\"... isolcpus={r} nohz_full={r} rcu_nocbs={r}\n",
            r = isolated
        ));

        let socket_mem = vec![config.host_memory_per_node_mb.to_string(); topology.nodes.len()];
        out.push_str("\nOverrides:\n");
        out.push_str(&format!("ovs_dpdk_lcore_mask: {}\n", self.painted(&host_mask)));
        out.push_str(&format!("ovs_dpdk_pmd_cpu_mask: {}\n", self.painted(&pmd_mask)));
        out.push_str("ovs_dpdk_pci_addresses: TBD\n");
        out.push_str(&format!("ovs_dpdk_socket_mem: {}\n", socket_mem.join(",")));
        out
    }

    /// Render the degraded report used when discovery failed: the error,
    /// plus the cpu counts that are still knowable without sysfs.
    pub fn render_degraded(&self, error: &DiscoveryError) -> String {
        let logical = num_cpus::get();
        let physical = num_cpus::get_physical();
        let mut out = String::new();
        out.push_str(&format!("\n{}\n", error));
        out.push_str("Falling back to plain cpu counts; no cores were reserved.\n");
        out.push_str(&format!(
            "\nDetected {} logical cpus on {} physical cores.\n",
            logical, physical
        ));
        out
    }

    fn painted(&self, text: &str) -> String {
        if self.color {
            format!("{}{}{}", GREEN, text, RESET)
        } else {
            text.to_string()
        }
    }

    fn header_line(&self, header: &[String], widths: &[usize]) -> String {
        let cells: Vec<Cell> = header.iter().map(|h| Cell::plain(h.clone())).collect();
        self.row_line(&cells, widths)
    }

    fn row_line(&self, cells: &[Cell], widths: &[usize]) -> String {
        let mut line = String::from("|");
        for (cell, &width) in cells.iter().zip(widths) {
            let padded = center(&cell.text, width);
            let padded = if cell.green && self.color {
                padded.replace(&cell.text, &self.painted(&cell.text))
            } else {
                padded
            };
            line.push(' ');
            line.push_str(&padded);
            line.push_str(" |");
        }
        line
    }
}

/// Python-list style cell contents: `[0,2]`, `[]` when empty.
fn pool_cell(cpus: &[usize]) -> String {
    let ids: Vec<String> = cpus.iter().map(|cpu| cpu.to_string()).collect();
    format!("[{}]", ids.join(","))
}

fn column_widths(header: &[String], rows: &[Vec<Cell>; 3]) -> Vec<usize> {
    let mut widths: Vec<usize> = header.iter().map(|h| h.len()).collect();
    for row in rows {
        for (cell, width) in row.iter().zip(widths.iter_mut()) {
            *width = (*width).max(cell.text.len());
        }
    }
    widths
}

fn rule_line(widths: &[usize]) -> String {
    let mut line = String::from("+");
    for &width in widths {
        line.push_str(&"-".repeat(width + 2));
        line.push('+');
    }
    line
}

/// Center `text` in `width` columns, extra space on the right.
fn center(text: &str, width: usize) -> String {
    let pad = width.saturating_sub(text.len());
    let left = pad / 2;
    format!("{}{}{}", " ".repeat(left), text, " ".repeat(pad - left))
}
