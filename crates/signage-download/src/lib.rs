//! Content fetch engine for the signage player core: the download task
//! state machine, the bounded-concurrency queue, and the tiered cache
//! manager built on top of `signage-blobstore` (§4.3, §4.4, §4.5).

mod error;
mod manager;
#[cfg(feature = "metrics")]
mod metrics;
mod queue;
mod task;
mod tier;

pub use error::{Error, Result};
pub use manager::{CacheManager, CacheManagerConfig, CacheStats};
#[cfg(feature = "metrics")]
pub use metrics::DownloadMetrics;
pub use queue::{DownloadQueue, Fetcher};
pub use task::{ProgressSink, TaskHandle, TaskStatus};
pub use tier::{should_chunk, tier_for_device_memory, StorageTier, FALLBACK_DEVICE_MEMORY_BYTES};
