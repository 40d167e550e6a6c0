//! Value objects produced by the profiler
//!
//! A [`Location`] is an aggregation bucket, an [`Entry`] one ranked row and a
//! [`Data`] one snapshot for one signal type at one tick. All of them are
//! created fresh on every tick and handed over to the consumer.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Identifies a place in the code, used as the aggregation key.
///
/// There is no raw address and no line number here: different
/// points of the same function must land in the same bucket. The call stack
/// is part of the key so that the same function reached from two different
/// callers is reported twice.
///
/// The derived ordering compares `function`, then `file`, then `stack`,
/// which is the tie-break used when ranking entries of equal value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Location {
    /// Qualified function name at the leaf.
    pub function: String,
    /// Source file of the leaf function.
    pub file: String,
    /// Caller chain from near-root down to the leaf, separated by `/`.
    pub stack: String,
}

impl Location {
    #[must_use]
    pub fn new(
        function: impl Into<String>,
        file: impl Into<String>,
        stack: impl Into<String>,
    ) -> Self {
        Self { function: function.into(), file: file.into(), stack: stack.into() }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(self) {
            Ok(js) => f.write_str(&js),
            Err(_) => f.write_str("{}"),
        }
    }
}

/// One ranked row of a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub key: Location,
    pub value: f64,
}

/// One profiling snapshot for one signal type.
///
/// `entries` is sorted by descending value and capped at the configured limit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Data {
    /// Collection time, truncated to the millisecond.
    pub timestamp: SystemTime,
    pub entries: Vec<Entry>,
}

impl Data {
    /// Milliseconds since the Unix epoch, 0 for pre-epoch clocks.
    #[must_use]
    pub fn timestamp_millis(&self) -> u128 {
        self.timestamp.duration_since(UNIX_EPOCH).map_or(0, |d| d.as_millis())
    }
}

/// Truncate a wall-clock time to millisecond precision.
#[must_use]
pub fn truncate_to_millis(ts: SystemTime) -> SystemTime {
    match ts.duration_since(UNIX_EPOCH) {
        Ok(since_epoch) => {
            let millis = u64::try_from(since_epoch.as_millis()).unwrap_or(u64::MAX);
            UNIX_EPOCH + Duration::from_millis(millis)
        }
        Err(_) => ts,
    }
}

/// Kind of profiling data stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Signal {
    /// CPU time, reported as a rate (time units per wall-clock second)
    Cpu,
    /// In-use heap bytes, reported as an instantaneous size
    Heap,
}

impl Signal {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Signal::Cpu => "cpu",
            Signal::Heap => "heap",
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_display_is_json() {
        let loc = Location::new("app::work", "src/work.rs", "main/run/work");
        let js: serde_json::Value = serde_json::from_str(&loc.to_string()).unwrap();
        assert_eq!(js["function"], "app::work");
        assert_eq!(js["file"], "src/work.rs");
        assert_eq!(js["stack"], "main/run/work");
    }

    #[test]
    fn test_location_equality_is_by_value() {
        let a = Location::new("f", "file.rs", "a/b");
        let b = Location::new(String::from("f"), String::from("file.rs"), "a/b");
        assert_eq!(a, b);
        assert_ne!(a, Location::new("f", "file.rs", "a/c"));
    }

    #[test]
    fn test_location_ordering_priority() {
        let by_function = Location::new("a", "z", "z");
        let by_file = Location::new("b", "a", "z");
        let by_stack = Location::new("b", "a", "a");
        assert!(by_function < by_file);
        assert!(by_stack < by_file);
    }

    #[test]
    fn test_truncate_to_millis() {
        let ts = UNIX_EPOCH + Duration::new(12, 345_678_901);
        let truncated = truncate_to_millis(ts);
        assert_eq!(truncated, UNIX_EPOCH + Duration::from_millis(12_345));
    }

    #[test]
    fn test_signal_display() {
        assert_eq!(Signal::Cpu.to_string(), "cpu");
        assert_eq!(Signal::Heap.to_string(), "heap");
    }
}
