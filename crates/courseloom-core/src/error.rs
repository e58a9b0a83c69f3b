//! Error types for CourseLoom.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// A graph snapshot violated a structural invariant (dangling edge or
    /// data key, duplicate node id). Indicates a corrupted snapshot from
    /// the caller; never recovered, always propagated.
    #[error("Invalid graph: {0}")]
    InvalidGraph(String),

    /// A required collaborator is unavailable or misconfigured. Raised
    /// before any partial work is done.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A retrieval or generation call failed mid-run. Aborts the
    /// enclosing build or analytics run without partial persistence.
    #[error("Collaborator failure: {0}")]
    Collaborator(String),

    /// Cluster-count auto-detection cannot proceed (fewer than two
    /// distinct vectors). The caller decides the fallback.
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;
