//! Error kinds the orchestrator distinguishes (§7's `TransportFault` and
//! `PreconditionViolation` rows; cache errors pass through from
//! `signage-download`).

use signage_model::FileId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// A `Transport` call failed (register, required_files, schedule, ...).
    /// §7 `TransportFault`: logged, the collection cycle aborts cleanly.
    #[error("transport call failed: {0}")]
    Transport(String),

    /// The push channel itself could not be established or torn down
    /// cleanly; reconnection logic is expected to recover from this.
    #[error("push channel error: {0}")]
    PushChannel(String),

    /// A download failed after retries exhausted within this cycle.
    #[error("cache error fetching {file_id}: {source}")]
    Cache {
        file_id: FileId,
        #[source]
        source: std::sync::Arc<signage_download::Error>,
    },

    /// An invariant this crate never expects to violate, e.g. a
    /// pending-layout scan against a layout that was never recorded.
    #[error("precondition violated: {0}")]
    PreconditionViolation(String),
}

impl Error {
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    pub fn push_channel(msg: impl Into<String>) -> Self {
        Self::PushChannel(msg.into())
    }

    pub fn cache(file_id: FileId, source: std::sync::Arc<signage_download::Error>) -> Self {
        Self::Cache { file_id, source }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
