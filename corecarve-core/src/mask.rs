//! CPU affinity bitmasks
//!
//! Builds the hexadecimal masks consumed by Open vSwitch
//! (`ovs_dpdk_lcore_mask` and friends): bit *n* set means cpu *n* is
//! reserved. Backed by u64 limbs so hosts with more than 64 logical cpus
//! never truncate the high bits.

use std::fmt;

/// A bitmask over logical cpu ids of arbitrary width.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CpuMask {
    /// Little-endian limbs: bit `n` lives in `limbs[n / 64]`
    limbs: Vec<u64>,
}

impl CpuMask {
    /// Build a mask with the bit for every cpu id in `cpus` set.
    pub fn from_cpus<I>(cpus: I) -> Self
    where
        I: IntoIterator<Item = usize>,
    {
        let mut mask = Self::default();
        for cpu in cpus {
            mask.set(cpu);
        }
        mask
    }

    /// Set the bit for a single cpu id.
    pub fn set(&mut self, cpu: usize) {
        let limb = cpu / 64;
        if limb >= self.limbs.len() {
            self.limbs.resize(limb + 1, 0);
        }
        self.limbs[limb] |= 1u64 << (cpu % 64);
    }

    /// Render as lowercase hex with no `0x` prefix, zero-padded to at
    /// least two digits. The empty mask renders as `"00"`.
    pub fn to_hex(&self) -> String {
        let mut limbs = self.limbs.iter().rev().skip_while(|&&l| l == 0);

        let mut hex = match limbs.next() {
            Some(top) => format!("{:x}", top),
            None => return "00".to_string(),
        };
        for limb in limbs {
            hex.push_str(&format!("{:016x}", limb));
        }
        if hex.len() < 2 {
            hex.insert(0, '0');
        }
        hex
    }
}

impl fmt::Display for CpuMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_masks() {
        assert_eq!(CpuMask::from_cpus([0, 1]).to_hex(), "03");
        assert_eq!(CpuMask::from_cpus([0, 4, 8, 12]).to_hex(), "1111");
        assert_eq!(CpuMask::from_cpus([]).to_hex(), "00");
        assert_eq!(CpuMask::from_cpus([0, 2, 4, 6]).to_hex(), "55");
        assert_eq!(CpuMask::from_cpus([1, 3, 5, 7]).to_hex(), "aa");
    }

    #[test]
    fn test_wide_masks_keep_high_bits() {
        // Bit 64 lands in the second limb
        assert_eq!(CpuMask::from_cpus([0, 64]).to_hex(), "10000000000000001");
        assert_eq!(CpuMask::from_cpus([64]).to_hex(), "10000000000000000");
        // 192 cpus, all set, spans three limbs
        let all: Vec<usize> = (0..192).collect();
        assert_eq!(CpuMask::from_cpus(all).to_hex(), "f".repeat(48));
    }

    #[test]
    fn test_interior_zero_limb_is_padded() {
        // Bits 0 and 130: the middle limb is all zero and must still
        // occupy 16 hex digits
        let hex = CpuMask::from_cpus([0, 130]).to_hex();
        assert_eq!(hex, format!("4{}{:016x}", "0".repeat(16), 1u64));
        assert_eq!(hex.len(), 33);
    }

    #[test]
    fn test_display_matches_to_hex() {
        let mask = CpuMask::from_cpus([0, 2]);
        assert_eq!(format!("{}", mask), mask.to_hex());
    }
}
