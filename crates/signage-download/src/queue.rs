//! Bounded-concurrency download pool (§4.4).

use crate::task::{ProgressSink, TaskHandle, TaskStatus};
use async_trait::async_trait;
use dashmap::DashMap;
use signage_model::{FileId, RequiredFileDescriptor};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

/// Executes the actual fetch for one descriptor. `CacheManager`'s inner
/// core implements this; the queue only owns scheduling.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch_one(&self, descriptor: &RequiredFileDescriptor, progress: &ProgressSink);
}

/// Bounded-concurrency pool: at most `concurrency_limit` tasks observed
/// `Downloading` at any time (§4.4, §8 property 2). Enqueueing the same
/// `FileId` while a task is live is idempotent; enqueueing it again after
/// `Failed` starts a fresh task (§4.3's "may be retried").
pub struct DownloadQueue {
    concurrency_limit: usize,
    semaphore: Arc<Semaphore>,
    registry: DashMap<FileId, TaskHandle>,
    fetcher: Arc<dyn Fetcher>,
}

impl DownloadQueue {
    pub fn new(concurrency_limit: usize, fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            concurrency_limit,
            semaphore: Arc::new(Semaphore::new(concurrency_limit)),
            registry: DashMap::new(),
            fetcher,
        }
    }

    pub fn concurrency_limit(&self) -> usize {
        self.concurrency_limit
    }

    /// Number of permits currently checked out. An approximation useful
    /// for stats surfaces, not for correctness.
    pub fn in_flight(&self) -> usize {
        self.concurrency_limit - self.semaphore.available_permits()
    }

    pub fn enqueue(&self, descriptor: RequiredFileDescriptor) -> TaskHandle {
        if let Some(existing) = self.registry.get(&descriptor.file_id) {
            if !matches!(existing.status(), TaskStatus::Failed(_)) {
                debug!(file_id = %descriptor.file_id, "enqueue coalesced into live task");
                return existing.clone();
            }
        }

        let (handle, progress) = TaskHandle::new(descriptor.file_id.clone());
        self.registry.insert(descriptor.file_id.clone(), handle.clone());

        let semaphore = self.semaphore.clone();
        let fetcher = self.fetcher.clone();
        let file_id = descriptor.file_id.clone();

        tokio::spawn(async move {
            // `acquire_owned` queues FIFO among waiters for a slot; running
            // tasks complete in non-deterministic order (§5).
            let permit = match semaphore.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => return,
            };
            info!(file_id = %file_id, "download dispatched");
            fetcher.fetch_one(&descriptor, &progress).await;
            drop(permit);
        });

        handle
    }

    /// Drops the registry entry for `file_id` if it is currently terminal,
    /// so a later `enqueue` starts clean rather than hitting the `Failed`
    /// coalescing branch forever.
    pub fn forget(&self, file_id: &FileId) {
        if let Some(entry) = self.registry.get(file_id) {
            if entry.status().is_terminal() {
                drop(entry);
                self.registry.remove(file_id);
            }
        }
    }

    pub fn handle_for(&self, file_id: &FileId) -> Option<TaskHandle> {
        self.registry.get(file_id).map(|e| e.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct SlowFetcher {
        concurrent: Arc<AtomicUsize>,
        max_seen: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Fetcher for SlowFetcher {
        async fn fetch_one(&self, _descriptor: &RequiredFileDescriptor, progress: &ProgressSink) {
            let now = self.concurrent.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_seen.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(30)).await;
            self.concurrent.fetch_sub(1, Ordering::SeqCst);
            progress.complete();
        }
    }

    fn descriptor(id: u64) -> RequiredFileDescriptor {
        RequiredFileDescriptor {
            file_id: FileId::media(id),
            md5: None,
            size: 10,
            source: signage_model::FileSource::Http {
                url: format!("http://example.invalid/{id}"),
            },
            priority_hint: None,
        }
    }

    #[tokio::test]
    async fn concurrency_never_exceeds_the_limit() {
        let max_seen = Arc::new(AtomicUsize::new(0));
        let fetcher = Arc::new(SlowFetcher {
            concurrent: Arc::new(AtomicUsize::new(0)),
            max_seen: max_seen.clone(),
        });
        let queue = DownloadQueue::new(2, fetcher);

        let handles: Vec<_> = (0..8).map(|i| queue.enqueue(descriptor(i))).collect();
        for h in handles {
            h.wait().await.unwrap();
        }

        assert!(max_seen.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn repeat_enqueue_of_live_task_coalesces() {
        let fetcher = Arc::new(SlowFetcher {
            concurrent: Arc::new(AtomicUsize::new(0)),
            max_seen: Arc::new(AtomicUsize::new(0)),
        });
        let queue = DownloadQueue::new(4, fetcher);

        let a = queue.enqueue(descriptor(42));
        let b = queue.enqueue(descriptor(42));
        a.wait().await.unwrap();
        b.wait().await.unwrap();
        assert!(matches!(a.status(), TaskStatus::Complete));
        assert!(matches!(b.status(), TaskStatus::Complete));
    }
}
