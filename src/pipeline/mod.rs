//! Line analysis pipeline.
//!
//! Sends each line of a batch to the annotation provider, one at a time,
//! and collects the lines that were annotated successfully.

pub mod orchestrator;

pub use orchestrator::{BatchOutcome, LineAnalyzer};
