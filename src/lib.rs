//! # flatten-xml Library
//!
//! A concurrent XML-flattening and row-materialization engine: it walks a
//! tree of extracted filing directories, flattens each document's element
//! tree into a path-keyed record, reconciles the record against a fixed
//! output header, and appends one CSV row per document through a single
//! serialized sink under bounded concurrency.

pub mod cli;
pub mod discovery;
pub mod error;
pub mod flatten;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod row;
pub mod schema;
pub mod sink;

pub use cli::{Cli, Config, VerbosityLevel};
pub use discovery::{Shard, ShardDiscoverer, ShardSet};
pub use error::{FlattenError, Result};
pub use flatten::{FlatRecord, PATH_SEPARATOR, flatten_document};
pub use output::Output;
pub use pipeline::{
    CancelFlag, DEFAULT_MAX_CONCURRENT_SHARDS, FlattenEngine, PipelineConfig, RunSummary,
};
pub use progress::{DEFAULT_LOG_INTERVAL, ProgressCounter};
pub use row::{DEFAULT_MULTI_VALUE_DELIMITER, MaterializedRow, RowMaterializer};
pub use schema::{Column, Header};
pub use sink::CsvSink;
