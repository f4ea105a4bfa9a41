//! IPv4 geolocation from a range table.
//!
//! The table is a plain-text export with one range per line:
//!
//! ```text
//! 1.0.1.0 1.0.3.255 Fuzhou, Fujian
//! ```
//!
//! Lines that do not start with two addresses are skipped.

use std::net::Ipv4Addr;
use std::path::Path;

use tracing::{info, warn};

use super::WxError;

/// Resolves an address to a human-readable location.
pub trait IpLocator: Send + Sync {
    fn locate(&self, ip: Ipv4Addr) -> Option<String>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Range {
    start: u32,
    end: u32,
    location: String,
}

/// Sorted, non-overlapping address ranges searched by bisection.
#[derive(Debug, Clone, Default)]
pub struct RangeTable {
    ranges: Vec<Range>,
}

impl RangeTable {
    /// An empty table; every lookup misses.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn load(path: &Path) -> Result<Self, WxError> {
        let text = std::fs::read_to_string(path)?;
        let table = Self::parse(&text);
        info!(path = %path.display(), ranges = table.len(), "IP table loaded");
        Ok(table)
    }

    pub fn parse(text: &str) -> Self {
        let mut ranges = Vec::new();
        for (lineno, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match parse_line(line) {
                Some(range) => ranges.push(range),
                None => warn!(line = lineno + 1, "skipping malformed IP range"),
            }
        }
        ranges.sort_by_key(|r| r.start);
        Self { ranges }
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}

fn parse_line(line: &str) -> Option<Range> {
    let mut parts = line.split_whitespace();
    let start: Ipv4Addr = parts.next()?.parse().ok()?;
    let end: Ipv4Addr = parts.next()?.parse().ok()?;
    let location = parts.collect::<Vec<_>>().join(" ");
    let (start, end) = (u32::from(start), u32::from(end));
    if start > end || location.is_empty() {
        return None;
    }
    Some(Range { start, end, location })
}

impl IpLocator for RangeTable {
    fn locate(&self, ip: Ipv4Addr) -> Option<String> {
        let ip = u32::from(ip);
        let idx = self.ranges.partition_point(|r| r.start <= ip);
        let range = self.ranges.get(idx.checked_sub(1)?)?;
        (ip <= range.end).then(|| range.location.clone())
    }
}
