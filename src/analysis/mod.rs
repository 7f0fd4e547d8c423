//! Analysis modules.
//!
//! Reduces the lines of a batch into per-type counts and summary
//! statistics.

pub mod aggregator;

pub use aggregator::*;
