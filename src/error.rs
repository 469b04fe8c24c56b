use std::path::PathBuf;

use thiserror::Error;

/// Main application error type that encompasses all possible failure modes
#[derive(Error, Debug)]
pub enum FlattenError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot list root directory {path}: {source}")]
    RootUnreadable {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot list shard directory {path}: {source}")]
    ShardUnreadable {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("XML syntax error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("unexpected end of document: {depth} unclosed element(s)")]
    TruncatedDocument { depth: usize },

    #[error("malformed document: {path} - {details}")]
    MalformedDocument { path: PathBuf, details: String },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("sink write failed: {path} - {details}")]
    Sink { path: PathBuf, details: String },

    #[error("invalid header schema: {0}")]
    Schema(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("concurrent operation error: {details}")]
    Concurrency { details: String },
}

impl FlattenError {
    /// True for errors that must abort the whole run rather than skip one
    /// document or shard.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            FlattenError::RootUnreadable { .. }
                | FlattenError::Csv(_)
                | FlattenError::Sink { .. }
                | FlattenError::Schema(_)
                | FlattenError::Config(_)
                | FlattenError::Concurrency { .. }
        )
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, FlattenError>;
