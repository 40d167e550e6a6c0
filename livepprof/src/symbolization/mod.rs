//! # Symbol Resolution and Address Translation
//!
//! Turns the raw instruction pointers found in profile samples into the
//! aggregation keys ([`Location`](crate::domain::Location)) reported to
//! consumers.
//!
//! ## Layers
//!
//! ```text
//!  sample address chain (leaf first)
//!            │
//!            ▼
//!  ┌──────────────────┐  hit   ┌───────────────┐
//!  │  SymbolResolver  │◀──────▶│ LocationCache │  FNV-1 keyed, append-only
//!  └────────┬─────────┘        └───────────────┘
//!           │ miss: one lookup per address
//!           ▼
//!  ┌──────────────────┐
//!  │   FrameSource    │  external symbolizer (trait)
//!  └────────┬─────────┘
//!           │ default implementation
//!           ▼
//!  ┌──────────────────┐
//!  │    Symbolizer    │  DWARF via addr2line, ELF symtab fallback,
//!  └──────────────────┘  PIE adjustment from /proc/<pid>/maps
//! ```
//!
//! ## PIE (Position Independent Executable)
//!
//! Modern Linux executables are loaded at a randomized base address. DWARF
//! line tables use file-relative addresses, so a runtime address must be
//! translated first:
//!
//! ```text
//! File Offset = Runtime Address - Base Address
//! ```
//!
//! [`Symbolizer::for_current_process`] reads the base address from
//! `/proc/self/maps`. Addresses outside the executable (shared libraries)
//! resolve to a single `<unknown>` frame rather than failing the sample.
//!
//! ## Sharing
//!
//! Nothing here is global. A process that runs several profilers and wants
//! a single symbol table wraps one [`Symbolizer`] (or one [`SymbolResolver`])
//! in an `Arc` and hands it to each of them.
//!
//! ## Limitations
//!
//! - **Requires debug symbols** for file names: build with `debug = true`
//! - **Inlining**: optimized code may inline functions; the innermost inlined
//!   frame is the one used for aggregation

pub mod binary_path;
pub mod cache;
pub mod memory_maps;
pub mod resolver;
pub mod symbolizer;

pub use binary_path::{check_target, current_binary};
pub use cache::{cache_key, LocationCache};
pub use memory_maps::{parse_memory_maps, MemoryRange};
pub use resolver::SymbolResolver;
pub use symbolizer::{InlinedFrame, ResolvedFrame, SourceLocation, Symbolizer};

/// External symbolizer: maps one code address to its source frames.
///
/// Frames are ordered innermost first; more than one frame means the address
/// sits inside inlined code.
pub trait FrameSource: Send + Sync {
    /// Source frames for `addr`
    ///
    /// # Errors
    /// Implementation specific; errors are propagated unchanged to the
    /// profiler's error handler.
    fn source_line(&self, addr: u64) -> anyhow::Result<Vec<InlinedFrame>>;
}
