//! Ranking of raw per-location measurements into a bounded report.
//!
//! # Ordering
//!
//! Entries are sorted by value, highest first. Equal values are ordered by
//! ascending `(function, file, stack)` so that two snapshots of the same data
//! always come out identical, whatever the hash map iteration order was.
//!
//! # Performance
//!
//! O(n log n) in the number of distinct locations, which the symbol resolver
//! already bounds to the number of distinct call paths.

use std::cmp::Ordering;
use std::time::SystemTime;

use crate::collector::RawData;
use crate::domain::{truncate_to_millis, Data, Entry};

/// Build a timestamped report keeping the `limit` highest-ranked entries.
///
/// A `limit` of 0 yields an empty report.
#[must_use]
pub fn build_data(timestamp: SystemTime, raw: RawData, limit: usize) -> Data {
    let timestamp = truncate_to_millis(timestamp);

    if limit == 0 {
        return Data { timestamp, entries: Vec::new() };
    }

    let mut entries: Vec<Entry> =
        raw.into_iter().map(|(key, value)| Entry { key, value }).collect();
    entries.sort_unstable_by(rank);
    entries.truncate(limit);

    Data { timestamp, entries }
}

fn rank(a: &Entry, b: &Entry) -> Ordering {
    b.value.total_cmp(&a.value).then_with(|| a.key.cmp(&b.key))
}
