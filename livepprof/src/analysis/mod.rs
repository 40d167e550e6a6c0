//! Analysis logic for profiling data
//!
//! This module contains pure ranking logic, separated from collection and
//! scheduling.

pub mod ranking;

pub use ranking::build_data;
