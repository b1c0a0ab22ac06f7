//! Error types for persistent blob storage and the in-memory LRU cache.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BlobError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("blob store entry corrupt at {key}: {reason}")]
    Corrupt { key: String, reason: String },

    #[error("storage quota exceeded: {used} of {total} bytes used")]
    QuotaExceeded { used: u64, total: u64 },

    #[error("precondition violated: {0}")]
    PreconditionViolation(String),
}

pub type Result<T> = std::result::Result<T, BlobError>;
