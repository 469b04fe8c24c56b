//! Progress Monitoring
//!
//! Process-wide counter of completed documents, incremented by every
//! worker and observed only for logging. Purely observational; nothing in
//! the pipeline gates on it.

use std::sync::atomic::{AtomicU64, Ordering};

use tracing::info;

/// How many completions between progress log lines.
pub const DEFAULT_LOG_INTERVAL: u64 = 1_000;

/// Monotonically increasing completion counter.
#[derive(Debug)]
pub struct ProgressCounter {
    completed: AtomicU64,
    log_interval: u64,
}

impl ProgressCounter {
    pub fn new(log_interval: u64) -> Self {
        Self {
            completed: AtomicU64::new(0),
            log_interval: log_interval.max(1),
        }
    }

    /// Record one completed document; returns the new total.
    pub fn record_document(&self) -> u64 {
        let done = self.completed.fetch_add(1, Ordering::Relaxed) + 1;
        if done % self.log_interval == 0 {
            info!("Processed {} documents", done);
        }
        done
    }

    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }
}

impl Default for ProgressCounter {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_INTERVAL)
    }
}
