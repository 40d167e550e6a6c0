//! Profiler lifecycle and scheduling
//!
//! - `profiler`: the public [`Profiler`] handle, its state machine and streams
//! - `scheduler`: the per-signal loop (wait, collect, rank, deliver)

pub mod profiler;
mod scheduler;

pub use profiler::{Profiler, ProfilerState};
