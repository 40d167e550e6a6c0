//! Replay backend: recorded raw samples loaded from a JSON file.
//!
//! ```json
//! {
//!   "cpu":  [{ "addrs": [4198400, 4198912], "values": [10000000, 1] }],
//!   "heap": [{ "addrs": [4198400, 4198912], "labels": { "bytes": [4096] } }]
//! }
//! ```
//!
//! Every CPU capture replays the whole `cpu` list. A file without a `heap`
//! section behaves like a process with no heap profile.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::collector::{CpuBackend, HeapBackend, RawSample};

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct SampleFile {
    #[serde(default)]
    pub cpu: Vec<RawSample>,
    #[serde(default)]
    pub heap: Option<Vec<RawSample>>,
    #[serde(skip)]
    capturing: AtomicBool,
}

impl SampleFile {
    /// Parse a sample file.
    ///
    /// # Errors
    /// Fails if the file cannot be read or is not a valid sample file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read sample file: {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Invalid sample file: {}", path.display()))
    }
}

impl CpuBackend for SampleFile {
    fn start(&self) -> Result<()> {
        if self.capturing.swap(true, Ordering::SeqCst) {
            anyhow::bail!("cpu capture already running");
        }
        Ok(())
    }

    fn stop(&self) -> Result<Vec<RawSample>> {
        if !self.capturing.swap(false, Ordering::SeqCst) {
            anyhow::bail!("cpu capture not running");
        }
        Ok(self.cpu.clone())
    }
}

impl HeapBackend for SampleFile {
    fn snapshot(&self) -> Result<Option<Vec<RawSample>>> {
        Ok(self.heap.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_from_file() {
        let file = write(
            r#"{
                "cpu": [{"addrs": [1, 2], "values": [10, 1]}],
                "heap": [{"addrs": [3], "labels": {"bytes": [64, 64]}}]
            }"#,
        );
        let samples = SampleFile::from_file(file.path()).unwrap();
        assert_eq!(samples.cpu.len(), 1);
        assert_eq!(samples.cpu[0].addrs, vec![1, 2]);
        assert_eq!(samples.cpu[0].values, vec![10, 1]);

        let heap = samples.snapshot().unwrap().unwrap();
        assert_eq!(heap[0].labels["bytes"], vec![64, 64]);
        assert!(heap[0].values.is_empty());
    }

    #[test]
    fn test_missing_heap_section() {
        let file = write(r#"{"cpu": []}"#);
        let samples = SampleFile::from_file(file.path()).unwrap();
        assert!(samples.snapshot().unwrap().is_none());
    }

    #[test]
    fn test_capture_cycle() {
        let file = write(r#"{"cpu": [{"addrs": [7], "values": [5, 1]}]}"#);
        let samples = SampleFile::from_file(file.path()).unwrap();

        assert!(samples.stop().is_err());
        samples.start().unwrap();
        assert!(samples.start().is_err());
        assert_eq!(samples.stop().unwrap().len(), 1);
        samples.start().unwrap();
        assert_eq!(samples.stop().unwrap().len(), 1);
    }

    #[test]
    fn test_invalid_file() {
        let file = write("not json");
        let err = SampleFile::from_file(file.path()).unwrap_err();
        assert!(err.to_string().contains("Invalid sample file"));
        assert!(SampleFile::from_file("/nonexistent/samples.json").is_err());
    }
}
