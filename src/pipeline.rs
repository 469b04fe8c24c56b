//! Concurrent Flattening Pipeline
//!
//! Orchestration of the whole run: discover shards, create the sink,
//! dispatch one semaphore-bounded tokio task per shard, and aggregate the
//! run summary. Each worker owns its shard start-to-finish and processes
//! the shard's documents strictly sequentially; only the sink append and
//! the progress increment touch shared state. A cancellation flag is
//! observed when a worker starts and again at every document boundary, so
//! a stop request drains in-flight work without corrupting the sink.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::discovery::{Shard, ShardDiscoverer};
use crate::error::{FlattenError, Result};
use crate::flatten::flatten_document;
use crate::progress::{DEFAULT_LOG_INTERVAL, ProgressCounter};
use crate::row::{DEFAULT_MULTI_VALUE_DELIMITER, RowMaterializer};
use crate::schema::Header;
use crate::sink::CsvSink;

/// Default bound on concurrently processed shards.
pub const DEFAULT_MAX_CONCURRENT_SHARDS: usize = 12;

/// Pipeline tuning knobs.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// At most this many shard workers run at once.
    pub max_concurrent_shards: usize,
    /// Delimiter between repeated values sharing one cell.
    pub multi_value_delimiter: String,
    /// Completions between progress log lines.
    pub progress_log_interval: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_concurrent_shards: DEFAULT_MAX_CONCURRENT_SHARDS,
            multi_value_delimiter: DEFAULT_MULTI_VALUE_DELIMITER.to_string(),
            progress_log_interval: DEFAULT_LOG_INTERVAL,
        }
    }
}

/// Shared stop signal. Cancelling halts dispatch of new shards and stops
/// in-flight workers at their next document boundary.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Skip and reconciliation counters shared by all workers.
#[derive(Debug, Default)]
struct RunStats {
    documents_skipped: AtomicU64,
    unmapped_paths: AtomicU64,
}

/// Final accounting for one batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    /// Shards discovered and dispatched.
    pub shards: usize,
    /// Shards dropped at discovery because their listing failed.
    pub shards_skipped: usize,
    /// Documents flattened, materialized, and written.
    pub documents_processed: u64,
    /// Documents skipped for open or decode failures.
    pub documents_skipped: u64,
    /// Rows appended to the sink (one per processed document).
    pub rows_written: u64,
    /// Record paths observed with no header column, summed over all rows.
    pub unmapped_paths: u64,
    /// Whether the run was stopped early by the cancellation flag.
    pub cancelled: bool,
    pub duration: Duration,
}

impl RunSummary {
    pub fn throughput_documents_per_second(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.documents_processed as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }
}

/// Bounded-concurrency engine driving Flattener → Materializer → Sink.
pub struct FlattenEngine {
    header: Arc<Header>,
    config: PipelineConfig,
}

impl FlattenEngine {
    pub fn new(header: Header, config: PipelineConfig) -> Self {
        Self {
            header: Arc::new(header),
            config,
        }
    }

    pub fn header(&self) -> &Arc<Header> {
        &self.header
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run the full pipeline over `root`, writing the table to `output`.
    pub async fn run(&self, root: &Path, output: &Path) -> Result<RunSummary> {
        self.run_with_cancel(root, output, CancelFlag::new()).await
    }

    /// Like [`run`](Self::run), observing an external cancellation flag.
    pub async fn run_with_cancel(
        &self,
        root: &Path,
        output: &Path,
        cancel: CancelFlag,
    ) -> Result<RunSummary> {
        let started = Instant::now();

        let discovered = ShardDiscoverer::new().discover(root).await?;
        let shard_count = discovered.shards.len();
        info!(
            "Discovered {} shard(s) under {} ({} skipped)",
            shard_count,
            root.display(),
            discovered.skipped_shards
        );

        // The initiating sequence writes the header row before any worker
        // starts; workers only ever append data rows.
        let sink = Arc::new(CsvSink::create(output, &self.header)?);
        let materializer = Arc::new(RowMaterializer::new(
            Arc::clone(&self.header),
            self.config.multi_value_delimiter.clone(),
        ));
        let progress = Arc::new(ProgressCounter::new(self.config.progress_log_interval));
        let stats = Arc::new(RunStats::default());
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_shards.max(1)));

        let tasks: Vec<_> = discovered
            .shards
            .into_iter()
            .map(|shard| {
                let sink = Arc::clone(&sink);
                let materializer = Arc::clone(&materializer);
                let progress = Arc::clone(&progress);
                let stats = Arc::clone(&stats);
                let semaphore = Arc::clone(&semaphore);
                let cancel = cancel.clone();

                tokio::spawn(async move {
                    let _permit =
                        semaphore
                            .acquire()
                            .await
                            .map_err(|_| FlattenError::Concurrency {
                                details: "shard semaphore closed".to_string(),
                            })?;

                    if cancel.is_cancelled() {
                        return Ok(());
                    }

                    process_shard(&shard, &materializer, &sink, &progress, &stats, &cancel)
                        .await
                })
            })
            .collect();

        let joined = try_join_all(tasks)
            .await
            .map_err(|e| FlattenError::Concurrency {
                details: format!("task join error: {}", e),
            })?;
        for worker_result in joined {
            worker_result?;
        }

        let summary = RunSummary {
            shards: shard_count,
            shards_skipped: discovered.skipped_shards,
            documents_processed: progress.completed(),
            documents_skipped: stats.documents_skipped.load(Ordering::Relaxed),
            rows_written: progress.completed(),
            unmapped_paths: stats.unmapped_paths.load(Ordering::Relaxed),
            cancelled: cancel.is_cancelled(),
            duration: started.elapsed(),
        };

        info!(
            "Run complete: {} processed, {} skipped, {} unmapped path(s) in {:.2}s",
            summary.documents_processed,
            summary.documents_skipped,
            summary.unmapped_paths,
            summary.duration.as_secs_f64()
        );

        Ok(summary)
    }
}

/// Drive one shard's documents through Flattener → Materializer → Sink,
/// strictly in listing order. Document-level failures are logged and
/// skipped; only sink failures propagate.
async fn process_shard(
    shard: &Shard,
    materializer: &RowMaterializer,
    sink: &CsvSink,
    progress: &ProgressCounter,
    stats: &RunStats,
    cancel: &CancelFlag,
) -> Result<()> {
    for document in &shard.documents {
        if cancel.is_cancelled() {
            info!(
                "stop requested, leaving shard {} before {}",
                shard.path.display(),
                document.display()
            );
            return Ok(());
        }

        let bytes = match tokio::fs::read(document).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("cannot open document {}: {}", document.display(), e);
                stats.documents_skipped.fetch_add(1, Ordering::Relaxed);
                continue;
            }
        };

        let record = match flatten_document(&bytes) {
            Ok(record) => record,
            Err(e) => {
                warn!(
                    "skipping malformed document {} in shard {}: {}",
                    document.display(),
                    shard.path.display(),
                    e
                );
                stats.documents_skipped.fetch_add(1, Ordering::Relaxed);
                continue;
            }
        };

        let document_name = document
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let row = materializer.materialize(&record, &document_name);
        stats
            .unmapped_paths
            .fetch_add(row.unmapped_paths as u64, Ordering::Relaxed);

        sink.append(&row.cells).await?;
        progress.record_document();
    }

    Ok(())
}
