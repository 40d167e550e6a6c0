//! Domain model for livepprof
//!
//! This module contains core domain types and errors that provide:
//! - Value objects handed to consumers (`Location`, `Entry`, `Data`)
//! - The signal type naming each output stream
//! - Structured error handling

pub mod errors;
pub mod types;

// Re-export common types for convenience
pub use types::{truncate_to_millis, Data, Entry, Location, Signal};

pub use errors::{ProfilerError, Result};
