//! Sampling collectors
//!
//! A [`Collector`] captures one kind of raw profile and reduces it, through a
//! [`SymbolResolver`], to a value per [`Location`]. The profiler treats every
//! collector the same way, so a new signal type only needs a new collector.
//!
//! The native profiling machinery itself sits behind [`CpuBackend`] and
//! [`HeapBackend`]: they hand over already-decoded [`RawSample`]s.

pub mod cpu;
pub mod heap;

use crossbeam_channel::{Receiver, Sender};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::domain::{Location, ProfilerError, Result};
use crate::symbolization::SymbolResolver;

pub use cpu::CpuCollector;
pub use heap::HeapCollector;

/// Raw measurements keyed by aggregation bucket
pub type RawData = HashMap<Location, f64>;

/// Collects one signal type.
pub trait Collector: Send + Sync {
    /// Capture and reduce one profile.
    ///
    /// Implementations that wait must return early once `exit` fires.
    ///
    /// # Errors
    /// Any error aborts this collection only; the caller decides what to do.
    fn collect(&self, exit: &ExitSignal) -> Result<RawData>;
}

/// One decoded profile sample
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSample {
    /// Code addresses, leaf call first
    pub addrs: Vec<u64>,
    /// Sample values; CPU samples carry exactly two, the first being CPU time
    #[serde(default)]
    pub values: Vec<i64>,
    /// Numeric labels, heap samples carry their size under `"bytes"`
    #[serde(default)]
    pub labels: HashMap<String, Vec<i64>>,
}

/// Native CPU profiling backend
pub trait CpuBackend: Send + Sync {
    /// Start sampling.
    ///
    /// # Errors
    /// Fails if sampling cannot start, e.g. another capture is running.
    fn start(&self) -> anyhow::Result<()>;

    /// Stop sampling and return everything captured since [`CpuBackend::start`].
    ///
    /// # Errors
    /// Fails if the captured profile cannot be decoded.
    fn stop(&self) -> anyhow::Result<Vec<RawSample>>;
}

/// Native heap profiling backend
pub trait HeapBackend: Send + Sync {
    /// Current heap snapshot, `None` when no heap profile is available.
    ///
    /// # Errors
    /// Fails if the snapshot cannot be decoded.
    fn snapshot(&self) -> anyhow::Result<Option<Vec<RawSample>>>;
}

/// Receiving side of the shared cancellation signal.
///
/// Fires once, when the paired [`ExitHandle`] is fired or dropped, and stays
/// fired. Cheap to clone; every scheduling loop and in-flight collection
/// holds one.
#[derive(Debug, Clone)]
pub struct ExitSignal {
    pub(crate) rx: Receiver<()>,
}

/// Firing side of the shared cancellation signal
#[derive(Debug)]
pub struct ExitHandle {
    _tx: Sender<()>,
}

impl ExitHandle {
    /// Fire the signal. Dropping the handle has the same effect.
    pub fn fire(self) {}
}

/// Create a fresh, unfired cancellation signal.
#[must_use]
pub fn exit_signal() -> (ExitHandle, ExitSignal) {
    // Nothing is ever sent: disconnection is the signal, so it reaches
    // every clone at once and cannot be missed.
    let (tx, rx) = crossbeam_channel::bounded(0);
    (ExitHandle { _tx: tx }, ExitSignal { rx })
}

impl ExitSignal {
    /// A signal that never fires, for one-off collections.
    #[must_use]
    pub fn never() -> Self {
        Self { rx: crossbeam_channel::never() }
    }

    #[must_use]
    pub fn is_fired(&self) -> bool {
        matches!(self.rx.try_recv(), Err(crossbeam_channel::TryRecvError::Disconnected))
    }

    /// Sleep for `timeout` unless the signal fires first.
    ///
    /// Returns `true` if the signal fired.
    #[must_use]
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        matches!(self.rx.recv_timeout(timeout), Err(crossbeam_channel::RecvTimeoutError::Disconnected))
    }
}

/// Resolve every sample and sum its weight into its bucket.
///
/// `weight` validates a sample and extracts its contribution; non-positive
/// contributions are skipped.
pub(crate) fn accumulate<F>(
    resolver: &SymbolResolver,
    filter: &str,
    samples: &[RawSample],
    weight: F,
) -> Result<RawData>
where
    F: Fn(&RawSample) -> Result<f64>,
{
    let mut ret = RawData::new();
    for sample in samples {
        if sample.addrs.is_empty() {
            return Err(ProfilerError::NoLocation);
        }
        let value = weight(sample)?;
        let location = resolver.resolve(filter, &sample.addrs)?;
        if value > 0.0 {
            *ret.entry(location).or_insert(0.0) += value;
        }
    }
    Ok(ret)
}

#[cfg(test)]
pub(crate) mod testing {
    //! Collaborator doubles shared by the collector tests.

    use std::sync::Arc;

    use crate::symbolization::{FrameSource, InlinedFrame, SymbolResolver};

    /// Symbolizes address `n` as function `fn{n}` in `src/app/mod{n}.rs`.
    pub(crate) struct NumberedFrames;

    impl FrameSource for NumberedFrames {
        fn source_line(&self, addr: u64) -> anyhow::Result<Vec<InlinedFrame>> {
            Ok(vec![InlinedFrame::new(format!("fn{addr}"), format!("src/app/mod{addr}.rs"), 1)])
        }
    }

    pub(crate) fn resolver() -> Arc<SymbolResolver> {
        Arc::new(SymbolResolver::new(Arc::new(NumberedFrames)))
    }
}
