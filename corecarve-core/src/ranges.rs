//! Linux cpu-list range notation
//!
//! Parses and formats the comma-separated range lists the kernel exposes in
//! sysfs (`cpulist`, `thread_siblings_list`, ...). Known input shapes:
//! `0`, `0-3`, `0,4,8,12`, `0-7,64-71`.

use std::collections::BTreeSet;

use thiserror::Error;

/// A malformed token in a cpu range list.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RangeParseError {
    /// Token is not an integer or a `lo-hi` pair
    #[error("invalid cpu list token {0:?}")]
    InvalidToken(String),

    /// Range with `hi < lo`
    #[error("descending cpu range {0:?}")]
    DescendingRange(String),
}

/// Parse a range list like `"0-3,8,12-15"` into the set of cpu ids it names.
pub fn parse_range_list(text: &str) -> Result<BTreeSet<usize>, RangeParseError> {
    let mut cpus = BTreeSet::new();

    for token in text.split(',') {
        let token = token.trim();
        match token.split_once('-') {
            Some((lo, hi)) => {
                let lo: usize = lo
                    .trim()
                    .parse()
                    .map_err(|_| RangeParseError::InvalidToken(token.to_string()))?;
                let hi: usize = hi
                    .trim()
                    .parse()
                    .map_err(|_| RangeParseError::InvalidToken(token.to_string()))?;
                if hi < lo {
                    return Err(RangeParseError::DescendingRange(token.to_string()));
                }
                cpus.extend(lo..=hi);
            }
            None => {
                let cpu: usize = token
                    .parse()
                    .map_err(|_| RangeParseError::InvalidToken(token.to_string()))?;
                cpus.insert(cpu);
            }
        }
    }

    Ok(cpus)
}

/// Format a set of cpu ids as a canonical range list.
///
/// Ids are sorted ascending and consecutive runs are merged into `lo-hi`
/// (bare `lo` for runs of one). Re-parsing the result yields the input set.
pub fn format_ranges<I>(cpus: I) -> String
where
    I: IntoIterator<Item = usize>,
{
    let sorted: BTreeSet<usize> = cpus.into_iter().collect();
    let mut runs: Vec<(usize, usize)> = Vec::new();

    for cpu in sorted {
        match runs.last_mut() {
            Some((_, hi)) if *hi + 1 == cpu => *hi = cpu,
            _ => runs.push((cpu, cpu)),
        }
    }

    runs.iter()
        .map(|&(lo, hi)| {
            if lo == hi {
                lo.to_string()
            } else {
                format!("{}-{}", lo, hi)
            }
        })
        .collect::<Vec<_>>()
        .join(",")
}
