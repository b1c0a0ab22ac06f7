//! Error kinds the download engine and cache manager distinguish (§7).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Connection, DNS, or timeout failure reaching the origin.
    #[error("network error fetching {file_id}: {source}")]
    Network {
        file_id: String,
        #[source]
        source: reqwest::Error,
    },

    /// A non-2xx, non-202 response.
    #[error("HTTP {status} fetching {file_id}")]
    HttpStatus { file_id: String, status: u16 },

    /// Origin returned 202 Accepted: the file is still being prepared
    /// upstream and must not be cached.
    #[error("{file_id} deferred by origin (202 Accepted), retry next cycle")]
    Deferred { file_id: String },

    /// Streaming MD5 didn't match the descriptor's declared digest.
    #[error("MD5 mismatch for {file_id}: expected {expected}, got {actual}")]
    Md5Mismatch {
        file_id: String,
        expected: String,
        actual: String,
    },

    /// A previously-stored entry failed the corruption heuristic on read.
    #[error("corrupt cache entry for {file_id}: {reason}")]
    CorruptCache { file_id: String, reason: String },

    /// Local storage quota exhausted; no automatic eviction is attempted.
    #[error("quota exceeded storing {file_id}: {used} of {total} bytes used")]
    QuotaExceeded {
        file_id: String,
        used: u64,
        total: u64,
    },

    /// An invariant this crate never expects to violate (e.g. `read_range`
    /// called against a task that was never dispatched).
    #[error("precondition violated: {0}")]
    PreconditionViolation(String),

    #[error(transparent)]
    Blob(#[from] signage_blobstore::BlobError),
}

impl Error {
    pub fn network(file_id: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            file_id: file_id.into(),
            source,
        }
    }

    pub fn http_status(file_id: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            file_id: file_id.into(),
            status,
        }
    }

    pub fn deferred(file_id: impl Into<String>) -> Self {
        Self::Deferred {
            file_id: file_id.into(),
        }
    }

    pub fn md5_mismatch(
        file_id: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::Md5Mismatch {
            file_id: file_id.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Whether a task that failed with this error is worth retrying on the
    /// next collection cycle (everything except a programming-error
    /// precondition violation is).
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::PreconditionViolation(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
