//! Profiler configuration
//!
//! [`Options`] is a plain value: start from [`Options::default`] and apply
//! `with_*` settings. Settings that validate their input return a `Result`,
//! so an invalid configuration never reaches a running profiler.
//!
//! ```
//! use std::time::Duration;
//! use livepprof::Options;
//!
//! let options = Options::default()
//!     .with_filter("myapp")
//!     .with_delay(Duration::from_secs(10))?
//!     .with_jitter(0.1)?
//!     .with_limit(5)?;
//! assert_eq!(options.limit(), 5);
//! # Ok::<(), livepprof::ProfilerError>(())
//! ```

use log::debug;
use rand::Rng;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::domain::{ProfilerError, Result};

/// Tick period used when none is configured
pub const DEFAULT_DELAY: Duration = Duration::from_secs(60);

/// Entries kept per report when no limit is configured
pub const DEFAULT_LIMIT: usize = 20;

/// Dynamic enable/disable predicate, polled on every tick
pub type EnabledFunc = Arc<dyn Fn() -> bool + Send + Sync>;

/// Sink for errors raised in the background
pub type ErrorHandler = Arc<dyn Fn(ProfilerError) + Send + Sync>;

#[derive(Clone)]
pub struct Options {
    filter: String,
    delay: Duration,
    jitter: f64,
    limit: usize,
    disabled: bool,
    enabled_func: Option<EnabledFunc>,
    error_handler: Option<ErrorHandler>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            filter: String::new(),
            delay: DEFAULT_DELAY,
            jitter: 0.0,
            limit: DEFAULT_LIMIT,
            disabled: false,
            enabled_func: None,
            error_handler: None,
        }
    }
}

impl Options {
    /// Report functions from source files containing `filter`.
    ///
    /// Samples are aggregated on the first frame whose file matches, so with
    /// a filter such as `"myapp/src"` the time spent deep inside libraries
    /// is attributed to the application function that called them.
    #[must_use]
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = filter.into();
        self
    }

    /// Tick period, which is also the CPU capture window.
    ///
    /// # Errors
    /// [`ProfilerError::InvalidOption`] if `delay` is zero
    pub fn with_delay(mut self, delay: Duration) -> Result<Self> {
        if delay.is_zero() {
            return Err(ProfilerError::InvalidOption(format!("invalid delay: {delay:?}")));
        }
        self.delay = delay;
        Ok(self)
    }

    /// Randomized spread of the tick period, as a fraction of the delay.
    ///
    /// # Errors
    /// [`ProfilerError::InvalidOption`] if `jitter` is outside `[0, 1]`
    pub fn with_jitter(mut self, jitter: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&jitter) {
            return Err(ProfilerError::InvalidOption(format!("invalid jitter: {jitter}")));
        }
        self.jitter = jitter;
        Ok(self)
    }

    /// Maximum number of entries per report.
    ///
    /// # Errors
    /// [`ProfilerError::InvalidOption`] if `limit` is zero
    pub fn with_limit(mut self, limit: usize) -> Result<Self> {
        if limit == 0 {
            return Err(ProfilerError::InvalidOption(format!("invalid limit: {limit}")));
        }
        self.limit = limit;
        Ok(self)
    }

    /// Static switch; a disabled profiler keeps ticking but collects nothing.
    #[must_use]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.disabled = !enabled;
        self
    }

    /// Dynamic switch, takes precedence over [`Options::with_enabled`].
    #[must_use]
    pub fn with_enabled_func<F>(mut self, enabled: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        self.enabled_func = Some(Arc::new(enabled));
        self
    }

    /// Receive errors from collection and delivery.
    #[must_use]
    pub fn with_error_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(ProfilerError) + Send + Sync + 'static,
    {
        self.error_handler = Some(Arc::new(handler));
        self
    }

    #[must_use]
    pub fn filter(&self) -> &str {
        &self.filter
    }

    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }

    #[must_use]
    pub fn jitter(&self) -> f64 {
        self.jitter
    }

    #[must_use]
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Whether the next tick should collect.
    #[must_use]
    pub fn enabled(&self) -> bool {
        match &self.enabled_func {
            Some(enabled) => enabled(),
            None => !self.disabled,
        }
    }

    /// Period of the next wait, uniform in `delay * [1 - jitter/2, 1 + jitter/2]`.
    pub fn jittered_delay<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        if self.jitter <= 0.0 {
            return self.delay;
        }
        let factor = 1.0 + self.jitter * (rng.random::<f64>() - 0.5);
        // Saturates instead of overflowing for delays near Duration::MAX
        Duration::try_from_secs_f64(self.delay.as_secs_f64() * factor).unwrap_or(Duration::MAX)
    }

    /// Hand an error to the configured handler, or drop it.
    pub fn report_error(&self, err: ProfilerError) {
        match &self.error_handler {
            Some(handler) => handler(err),
            None => debug!("discarding profiler error: {err}"),
        }
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("filter", &self.filter)
            .field("delay", &self.delay)
            .field("jitter", &self.jitter)
            .field("limit", &self.limit)
            .field("disabled", &self.disabled)
            .field("enabled_func", &self.enabled_func.is_some())
            .field("error_handler", &self.error_handler.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_defaults() {
        let o = Options::default();
        assert_eq!(o.filter(), "");
        assert_eq!(o.delay(), Duration::from_secs(60));
        assert_eq!(o.limit(), 20);
        assert!(o.jitter().abs() < f64::EPSILON);
        assert!(o.enabled());
    }

    #[test]
    fn test_enabled_resolution() {
        let o = Options::default();
        assert!(o.enabled());
        let o = o.with_enabled(false);
        assert!(!o.enabled());
        let o = o.with_enabled_func(|| true);
        assert!(o.enabled(), "predicate overrides static flag");
        let o = o.with_enabled_func(|| false);
        assert!(!o.enabled());
    }

    #[test]
    fn test_with_filter() {
        assert_eq!(Options::default().with_filter("toto").filter(), "toto");
    }

    #[test]
    fn test_with_delay() {
        let o = Options::default().with_delay(Duration::from_secs(1)).unwrap();
        assert_eq!(o.delay(), Duration::from_secs(1));
        let err = o.with_delay(Duration::ZERO).unwrap_err();
        assert!(matches!(err, ProfilerError::InvalidOption(_)));
        assert!(err.to_string().contains("invalid delay"));
    }

    #[test]
    fn test_with_jitter() {
        for ok in [0.0, 0.5, 1.0] {
            assert!((Options::default().with_jitter(ok).unwrap().jitter() - ok).abs() < f64::EPSILON);
        }
        for bad in [-0.1, 1.1, f64::NAN] {
            assert!(matches!(
                Options::default().with_jitter(bad),
                Err(ProfilerError::InvalidOption(_))
            ));
        }
    }

    #[test]
    fn test_with_limit() {
        assert_eq!(Options::default().with_limit(100).unwrap().limit(), 100);
        assert!(matches!(Options::default().with_limit(0), Err(ProfilerError::InvalidOption(_))));
    }

    #[test]
    fn test_report_error() {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        let o = Options::default().with_error_handler(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        o.report_error(ProfilerError::NoAddr);
        o.report_error(ProfilerError::NoLocation);
        assert_eq!(count.load(Ordering::SeqCst), 2);

        // No handler: silently dropped
        Options::default().report_error(ProfilerError::NoAddr);
    }

    #[test]
    fn test_jittered_delay_without_jitter_is_exact() {
        let o = Options::default();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            assert_eq!(o.jittered_delay(&mut rng), Duration::from_secs(60));
        }
    }

    #[test]
    fn test_jittered_delay_saturates_huge_delays() {
        let o = Options::default().with_delay(Duration::MAX).unwrap().with_jitter(1.0).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        let draws: Vec<Duration> = (0..1_000).map(|_| o.jittered_delay(&mut rng)).collect();
        assert!(draws.iter().all(|d| *d >= Duration::MAX / 3));
        assert!(draws.contains(&Duration::MAX), "upper half of the spread saturates");
    }

    #[test]
    #[allow(clippy::cast_precision_loss)]
    fn test_jittered_delay_statistics() {
        const N: usize = 10_000;
        let jitter = 0.1;
        let o = Options::default().with_jitter(jitter).unwrap();
        let delay = o.delay().as_secs_f64();
        let mut rng = StdRng::seed_from_u64(42);

        let draws: Vec<f64> = (0..N).map(|_| o.jittered_delay(&mut rng).as_secs_f64()).collect();
        let mean = draws.iter().sum::<f64>() / N as f64;
        let variance = draws.iter().map(|d| (d - mean).powi(2)).sum::<f64>() / N as f64;

        assert!((mean - delay).abs() / delay < 0.01, "mean = {mean}");
        let expected_dev = delay * jitter / 12f64.sqrt();
        assert!((variance.sqrt() - expected_dev).abs() / expected_dev < 0.05);
        assert!(draws.iter().all(|d| *d >= delay * 0.95 && *d <= delay * 1.05));
    }
}
