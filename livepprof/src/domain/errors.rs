//! Structured error types for livepprof
//!
//! Using thiserror for automatic Display implementation and error chaining.

use super::types::Signal;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProfilerError {
    #[error("no location")]
    NoLocation,

    #[error("unexpected value len: expected {expected}, got {got}")]
    UnexpectedValueLen { expected: usize, got: usize },

    #[error("delay too short: {0:?}")]
    DelayTooShort(Duration),

    #[error("no heap profile")]
    NoHeapProfile,

    #[error("no frame[0] for address 0x{addr:x}")]
    NoFrame0 { addr: u64 },

    #[error("no addr")]
    NoAddr,

    #[error("invalid option: {0}")]
    InvalidOption(String),

    #[error("{signal} report dropped, not received within {timeout:?}")]
    SendTimeout { signal: Signal, timeout: Duration },

    #[error("failed to spawn scheduling loop: {0}")]
    Spawn(#[from] std::io::Error),

    /// Errors raised by the profiling backend or the symbolizer, unchanged.
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

pub type Result<T, E = ProfilerError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profiler_error_display() {
        assert_eq!(ProfilerError::NoLocation.to_string(), "no location");
        assert_eq!(ProfilerError::NoFrame0 { addr: 0x2a }.to_string(), "no frame[0] for address 0x2a");
        let err = ProfilerError::UnexpectedValueLen { expected: 2, got: 3 };
        assert!(err.to_string().contains("expected 2, got 3"));
    }

    #[test]
    fn test_backend_error_is_transparent() {
        let err = ProfilerError::from(anyhow::anyhow!("symbolizer exploded"));
        assert_eq!(err.to_string(), "symbolizer exploded");
    }

    #[test]
    fn test_send_timeout_names_signal() {
        let err =
            ProfilerError::SendTimeout { signal: Signal::Heap, timeout: Duration::from_secs(1) };
        assert!(err.to_string().starts_with("heap report dropped"));
    }
}
