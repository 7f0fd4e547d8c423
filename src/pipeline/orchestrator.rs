//! Sequential per-line analysis.
//!
//! A batch moves through `Idle -> Running -> Completed`. While running,
//! exactly one provider call is outstanding: each line is awaited before
//! the next one is sent, so results are appended in input order.
//!
//! Starting a new batch bumps a generation counter. A batch that finds its
//! generation is no longer current when a call returns stops there and
//! discards what it has, so late results never leak into the newer batch.

use crate::models::{LineResult, Notice};
use crate::provider::{AnnotationProvider, Retrying};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

/// Lifecycle of the current batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
    Idle,
    Running,
    Completed,
}

/// Progress of a running batch, reported after every line.
#[derive(Debug, Clone, Copy)]
pub struct LineProgress<'a> {
    /// Zero-based index of the line just attempted.
    pub index: usize,
    pub total: usize,
    pub line: &'a str,
    pub succeeded: bool,
}

/// Everything a finished batch produced.
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    /// Generation number of the batch.
    pub generation: u64,
    /// Successful lines in input order.
    pub results: Vec<LineResult>,
    /// Failure notices, then the success notice if any line succeeded.
    pub notices: Vec<Notice>,
    /// Number of lines that were sent to the provider.
    pub attempted: usize,
    /// True when a newer batch started before this one finished.
    pub superseded: bool,
}

impl BatchOutcome {
    pub fn failures(&self) -> impl Iterator<Item = &Notice> {
        self.notices.iter().filter(|n| n.is_failure())
    }

    pub fn failure_count(&self) -> usize {
        self.failures().count()
    }
}

#[derive(Debug)]
struct Shared {
    generation: u64,
    state: BatchState,
    results: Vec<LineResult>,
}

/// Drives one annotation request per line against a provider.
pub struct LineAnalyzer<P> {
    provider: Retrying<P>,
    shared: Mutex<Shared>,
}

impl<P: AnnotationProvider> LineAnalyzer<P> {
    /// Wrap `provider` in the retry adapter and start idle.
    pub fn new(provider: P) -> Self {
        Self::with_retrying(Retrying::new(provider))
    }

    /// Same as [`LineAnalyzer::new`] with a custom pause before retries.
    #[cfg(test)]
    pub fn with_retry_delay(provider: P, delay: std::time::Duration) -> Self {
        Self::with_retrying(Retrying::new(provider).with_delay(delay))
    }

    fn with_retrying(provider: Retrying<P>) -> Self {
        Self {
            provider,
            shared: Mutex::new(Shared {
                generation: 0,
                state: BatchState::Idle,
                results: Vec::new(),
            }),
        }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    #[allow(dead_code)] // Query API; the CLI reads the returned outcome instead
    pub fn state(&self) -> BatchState {
        self.lock().state
    }

    /// True strictly while a batch is running.
    #[allow(dead_code)] // Query API; the CLI reads the returned outcome instead
    pub fn is_processing(&self) -> bool {
        self.state() == BatchState::Running
    }

    /// Snapshot of the current batch's results.
    #[allow(dead_code)] // Query API; the CLI reads the returned outcome instead
    pub fn results(&self) -> Vec<LineResult> {
        self.lock().results.clone()
    }

    /// Error flag of the most recent provider call.
    pub fn last_call_failed(&self) -> bool {
        self.provider.last_call_failed()
    }

    /// Run a batch without progress reporting.
    #[allow(dead_code)] // The CLI always drives a progress bar
    pub async fn run_batch(&self, lines: &[String]) -> BatchOutcome {
        self.run_batch_with(lines, |_| {}).await
    }

    /// Run a batch, calling `on_progress` after every attempted line.
    ///
    /// Lines are expected to be non-empty and trimmed already. Per-line
    /// failures are recorded as notices; this never fails as a whole.
    pub async fn run_batch_with<F>(&self, lines: &[String], mut on_progress: F) -> BatchOutcome
    where
        F: FnMut(LineProgress<'_>),
    {
        let generation = self.begin_batch();
        info!(
            "Starting batch {} with {} lines via {}",
            generation,
            lines.len(),
            self.provider.name()
        );

        let mut notices = Vec::new();
        let mut attempted = 0;

        for (index, line) in lines.iter().enumerate() {
            let outcome = self.provider.annotate(line).await;
            attempted += 1;

            let succeeded = {
                let mut shared = self.lock();
                if shared.generation != generation {
                    warn!(
                        "Batch {} superseded by batch {}; discarding its results",
                        generation, shared.generation
                    );
                    return BatchOutcome {
                        generation,
                        results: Vec::new(),
                        notices,
                        attempted,
                        superseded: true,
                    };
                }

                match outcome {
                    Ok(response) => {
                        let entities = response.into_entities();
                        debug!("Line {} produced {} entities", index + 1, entities.len());
                        shared.results.push(LineResult {
                            text: line.clone(),
                            entities,
                        });
                        true
                    }
                    Err(e) => {
                        warn!("Failed to process line {}: {}", index + 1, e);
                        notices.push(Notice::LineFailed {
                            line: line.clone(),
                            reason: e.to_string(),
                        });
                        false
                    }
                }
            };

            on_progress(LineProgress {
                index,
                total: lines.len(),
                line,
                succeeded,
            });
        }

        let results = {
            let mut shared = self.lock();
            if shared.generation != generation {
                return BatchOutcome {
                    generation,
                    results: Vec::new(),
                    notices,
                    attempted,
                    superseded: true,
                };
            }
            shared.state = BatchState::Completed;
            shared.results.clone()
        };

        if !results.is_empty() {
            notices.push(Notice::BatchSucceeded {
                processed: results.len(),
            });
        }

        info!(
            "Batch {} completed: {} of {} lines processed",
            generation,
            results.len(),
            lines.len()
        );

        BatchOutcome {
            generation,
            results,
            notices,
            attempted,
            superseded: false,
        }
    }

    /// Replace any previous batch and enter `Running`.
    fn begin_batch(&self) -> u64 {
        let mut shared = self.lock();
        shared.generation += 1;
        shared.state = BatchState::Running;
        shared.results.clear();
        shared.generation
    }

    fn lock(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
