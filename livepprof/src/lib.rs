//! # livepprof - Live In-Process Profiling
//!
//! livepprof periodically samples CPU time and in-use heap of the running
//! process, attributes every sample to a code [`Location`] and streams a
//! ranked top-N report per signal type to the embedding application.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                  Native profiling backends                      │
//! │        CpuBackend (timed capture)  HeapBackend (snapshot)       │
//! └───────────────────────┬─────────────────────────────────────────┘
//!                         │ raw samples (address chains, values)
//!                         ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    livepprof (this crate)                       │
//! │                                                                 │
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────┐         │
//! │  │  Collector   │──▶│   Ranking    │──▶│   Streams    │──▶ app  │
//! │  │ (cpu, heap)  │   │ (build_data) │   │ (Receiver)   │         │
//! │  └──────┬───────┘   └──────────────┘   └──────────────┘         │
//! │         │                                                       │
//! │         ▼                                                       │
//! │  ┌──────────────┐   ┌──────────────┐                            │
//! │  │SymbolResolver│──▶│  Symbolizer  │                            │
//! │  │   (+cache)   │   │   (DWARF)    │                            │
//! │  └──────────────┘   └──────────────┘                            │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Structure
//!
//! - [`profiling`]: [`Profiler`] lifecycle and the per-signal scheduling loop
//! - [`collector`]: the [`Collector`](collector::Collector) abstraction, CPU
//!   and heap collectors, backend traits and the cancellation signal
//! - [`symbolization`]: address chain to [`Location`], with caching
//! - [`analysis`]: ranking and truncation of raw measurements
//! - [`options`]: [`Options`] and its validation
//! - [`domain`]: value objects and [`ProfilerError`]
//! - [`sample_file`]: JSON replay backend
//! - [`cli`]: arguments of the demo binary
//!
//! ## Typical Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use livepprof::sample_file::SampleFile;
//! use livepprof::symbolization::{SymbolResolver, Symbolizer};
//! use livepprof::{Options, Profiler};
//!
//! # fn main() -> anyhow::Result<()> {
//! let options = Options::default()
//!     .with_filter("myapp/src")
//!     .with_delay(Duration::from_secs(10))?
//!     .with_error_handler(|err| eprintln!("profiler: {err}"));
//! let resolver = Arc::new(SymbolResolver::new(Arc::new(Symbolizer::for_current_process()?)));
//! let backend = Arc::new(SampleFile::from_file("samples.json")?);
//!
//! let profiler = Profiler::new(options, resolver, backend.clone(), backend);
//! let cpu = profiler.cpu().expect("open stream");
//! profiler.start()?;
//! for report in cpu.iter().take(3) {
//!     for entry in &report.entries {
//!         println!("{:>12.0} {}", entry.value, entry.key);
//!     }
//! }
//! profiler.close();
//! # Ok(())
//! # }
//! ```

pub mod analysis;
pub mod cli;
pub mod collector;
pub mod domain;
pub mod options;
pub mod profiling;
pub mod sample_file;
pub mod symbolization;

pub use domain::{Data, Entry, Location, ProfilerError, Signal};
pub use options::Options;
pub use profiling::{Profiler, ProfilerState};
