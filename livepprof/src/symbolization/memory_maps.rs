//! Memory mapping utilities for process address space analysis
//!
//! Parses `/proc/<pid>/maps` to find where an executable is loaded, which is
//! needed to turn runtime instruction pointers of position-independent
//! executables (PIE) into the file-relative addresses DWARF understands.

use anyhow::{Context, Result};
use log::info;
use std::fs;

/// Memory range of a loaded binary in a process's address space
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryRange {
    pub start: u64,
    pub end: u64,
}

impl MemoryRange {
    /// Check if an address falls within this memory range
    #[must_use]
    pub fn contains(&self, addr: u64) -> bool {
        addr >= self.start && addr < self.end
    }
}

/// Parse /proc/pid/maps to find the memory range of a specific binary
///
/// # Errors
/// Returns an error if /proc/pid/maps cannot be read or if the binary is not mapped
pub fn parse_memory_maps(pid: i32, binary_path: &str) -> Result<MemoryRange> {
    let maps_path = format!("/proc/{pid}/maps");
    let maps = fs::read_to_string(&maps_path).context(format!("Failed to read {maps_path}"))?;

    let range = memory_range_in(&maps, binary_path)?
        .ok_or_else(|| anyhow::anyhow!("Could not find memory range for {binary_path}"))?;

    info!(
        "Executable memory range: 0x{:x} - 0x{:x} (size: {} KB)",
        range.start,
        range.end,
        (range.end - range.start) / 1024
    );
    Ok(range)
}

/// Span from the lowest start to the highest end of every mapping of `binary_path`
///
/// # Errors
/// Returns an error if a matching line carries a malformed address range
pub fn memory_range_in(maps: &str, binary_path: &str) -> Result<Option<MemoryRange>> {
    let mut found: Option<MemoryRange> = None;

    // Line format: "start-end perms offset dev inode pathname"
    for line in maps.lines() {
        let mut parts = line.split_whitespace();
        let Some(range) = parts.next() else {
            continue;
        };
        if parts.nth(4) != Some(binary_path) {
            continue;
        }

        let (start, end) = range.split_once('-').context("Malformed maps range")?;
        let start = u64::from_str_radix(start, 16).context("Failed to parse range start")?;
        let end = u64::from_str_radix(end, 16).context("Failed to parse range end")?;

        found = Some(match found {
            Some(r) => MemoryRange { start: r.start.min(start), end: r.end.max(end) },
            None => MemoryRange { start, end },
        });
    }

    Ok(found)
}
