//! CPU collector
//!
//! Runs one timed capture per call and reports CPU time per wall-clock
//! second, so that a capture cut short by cancellation stays comparable with
//! a full one.

use log::debug;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::{accumulate, Collector, CpuBackend, ExitSignal, RawData, RawSample};
use crate::domain::{ProfilerError, Result};
use crate::symbolization::SymbolResolver;

/// Values carried by every CPU sample: CPU time, then sample count
const CPU_SAMPLE_VALUES: usize = 2;

/// Substituted for a zero elapsed measurement
const MIN_ELAPSED: Duration = Duration::from_nanos(1);

pub struct CpuCollector {
    resolver: Arc<SymbolResolver>,
    backend: Arc<dyn CpuBackend>,
    filter: String,
    delay: Duration,
}

impl CpuCollector {
    #[must_use]
    pub fn new(
        resolver: Arc<SymbolResolver>,
        backend: Arc<dyn CpuBackend>,
        filter: impl Into<String>,
        delay: Duration,
    ) -> Self {
        Self { resolver, backend, filter: filter.into(), delay }
    }

    #[allow(clippy::cast_precision_loss)]
    fn reduce(&self, samples: &[RawSample]) -> Result<RawData> {
        accumulate(&self.resolver, &self.filter, samples, |sample| {
            if sample.values.len() != CPU_SAMPLE_VALUES {
                return Err(ProfilerError::UnexpectedValueLen {
                    expected: CPU_SAMPLE_VALUES,
                    got: sample.values.len(),
                });
            }
            Ok(sample.values[0] as f64)
        })
    }
}

impl Collector for CpuCollector {
    fn collect(&self, exit: &ExitSignal) -> Result<RawData> {
        if self.delay.is_zero() {
            return Err(ProfilerError::DelayTooShort(self.delay));
        }

        self.backend.start()?;
        let started = Instant::now();
        let interrupted = exit.wait_timeout(self.delay);
        let elapsed = started.elapsed();
        let samples = self.backend.stop()?;

        if interrupted {
            debug!("cpu capture interrupted after {elapsed:?} of {:?}", self.delay);
        }

        let mut data = self.reduce(&samples)?;
        normalize(&mut data, elapsed);
        Ok(data)
    }
}

/// Scale accumulated values to a per-second rate.
pub(crate) fn normalize(data: &mut RawData, elapsed: Duration) {
    let factor = 1.0 / elapsed.max(MIN_ELAPSED).as_secs_f64();
    for value in data.values_mut() {
        *value *= factor;
    }
}
