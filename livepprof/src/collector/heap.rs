//! Heap collector: in-use bytes per location from a point-in-time snapshot.

use std::sync::Arc;

use super::{accumulate, Collector, ExitSignal, HeapBackend, RawData};
use crate::domain::{ProfilerError, Result};
use crate::symbolization::SymbolResolver;

/// Numeric label carrying the allocation size of a heap sample
pub const BYTES_LABEL: &str = "bytes";

pub struct HeapCollector {
    resolver: Arc<SymbolResolver>,
    backend: Arc<dyn HeapBackend>,
    filter: String,
}

impl HeapCollector {
    #[must_use]
    pub fn new(
        resolver: Arc<SymbolResolver>,
        backend: Arc<dyn HeapBackend>,
        filter: impl Into<String>,
    ) -> Self {
        Self { resolver, backend, filter: filter.into() }
    }
}

impl Collector for HeapCollector {
    #[allow(clippy::cast_precision_loss)]
    fn collect(&self, _exit: &ExitSignal) -> Result<RawData> {
        let samples = self.backend.snapshot()?.ok_or(ProfilerError::NoHeapProfile)?;

        accumulate(&self.resolver, &self.filter, &samples, |sample| {
            Ok(sample.labels.get(BYTES_LABEL).map_or(0.0, |values| {
                values.iter().map(|&v| v as f64).sum()
            }))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::{testing, RawSample};
    use crate::domain::Location;
    use std::collections::HashMap;

    struct Snapshot(Option<Vec<RawSample>>);

    impl HeapBackend for Snapshot {
        fn snapshot(&self) -> anyhow::Result<Option<Vec<RawSample>>> {
            Ok(self.0.clone())
        }
    }

    fn sample(addrs: &[u64], bytes: &[i64]) -> RawSample {
        RawSample {
            addrs: addrs.to_vec(),
            labels: HashMap::from([(BYTES_LABEL.to_string(), bytes.to_vec())]),
            ..Default::default()
        }
    }

    #[test]
    fn test_collect_sums_bytes_labels() {
        let collector = HeapCollector::new(
            testing::resolver(),
            Arc::new(Snapshot(Some(vec![
                sample(&[1, 2, 9], &[1_000, 24]),
                sample(&[1, 2, 9], &[2_000_000]),
                sample(&[3, 9], &[100_000]),
                sample(&[4, 9], &[]),
            ]))),
            "",
        );

        let data = collector.collect(&ExitSignal::never()).unwrap();
        assert_eq!(data.len(), 2);
        assert_eq!(data[&Location::new("fn1", "src/app/mod1.rs", "fn2/fn1")], 2_001_024.0);
        assert_eq!(data[&Location::new("fn3", "src/app/mod3.rs", "fn3")], 100_000.0);
    }

    #[test]
    fn test_collect_uses_filter_for_leaf() {
        let collector = HeapCollector::new(
            testing::resolver(),
            Arc::new(Snapshot(Some(vec![sample(&[1, 2, 3, 9], &[64])]))),
            "mod2",
        );
        let data = collector.collect(&ExitSignal::never()).unwrap();
        assert_eq!(data[&Location::new("fn2", "src/app/mod2.rs", "fn3/fn2")], 64.0);
    }

    #[test]
    fn test_collect_without_snapshot() {
        let collector = HeapCollector::new(testing::resolver(), Arc::new(Snapshot(None)), "");
        let err = collector.collect(&ExitSignal::never()).unwrap_err();
        assert!(matches!(err, ProfilerError::NoHeapProfile));
    }

    #[test]
    fn test_collect_rejects_empty_chain() {
        let collector = HeapCollector::new(
            testing::resolver(),
            Arc::new(Snapshot(Some(vec![sample(&[], &[10])]))),
            "",
        );
        let err = collector.collect(&ExitSignal::never()).unwrap_err();
        assert!(matches!(err, ProfilerError::NoLocation));
    }
}
