//! `CacheManager`: the policy layer tying `BlobStore`, `BlobCache`, and
//! `DownloadQueue` together (§4.5).

use crate::error::{Error, Result};
use crate::queue::{DownloadQueue, Fetcher};
use crate::task::{ProgressSink, TaskHandle};
use crate::tier::{should_chunk, tier_for_device_memory, StorageTier, FALLBACK_DEVICE_MEMORY_BYTES};
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, StreamExt};
use md5::{Digest, Md5};
use signage_blobstore::{BlobCache, BlobStore, StoreKey};
use signage_model::{FileEntry, FileFormat, FileId, FileKind, RequiredFileDescriptor};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Construction parameters for a [`CacheManager`].
#[derive(Debug, Clone, Copy)]
pub struct CacheManagerConfig {
    pub concurrency_limit: usize,
    pub device_memory_bytes: u64,
}

impl Default for CacheManagerConfig {
    fn default() -> Self {
        Self {
            concurrency_limit: 4,
            device_memory_bytes: FALLBACK_DEVICE_MEMORY_BYTES,
        }
    }
}

/// The actual fetch logic, held behind an `Arc` so `DownloadQueue` can own
/// a handle to it without a reference cycle back to `CacheManager`.
struct Core {
    store: Arc<dyn BlobStore>,
    cache: BlobCache,
    http: reqwest::Client,
    tier: StorageTier,
    concurrency_limit: usize,
}

fn looks_corrupt(kind: FileKind, content_type: &str, body_len: usize) -> bool {
    matches!(kind, FileKind::Media) && (content_type == "text/plain" || body_len < 100)
}

impl Core {
    async fn write_meta(&self, entry: &FileEntry) -> Result<()> {
        let json = serde_json::to_vec(entry)
            .map_err(|e| Error::PreconditionViolation(format!("failed to encode metadata: {e}")))?;
        self.store
            .put(&StoreKey::meta(&entry.file_id), Bytes::from(json), "application/json")
            .await?;
        Ok(())
    }

    async fn read_meta(&self, file_id: &FileId) -> Result<Option<FileEntry>> {
        match self.store.get(&StoreKey::meta(file_id)).await? {
            Some((bytes, _)) => {
                let entry = serde_json::from_slice(&bytes).map_err(|e| Error::CorruptCache {
                    file_id: file_id.to_string(),
                    reason: format!("metadata decode failed: {e}"),
                })?;
                Ok(Some(entry))
            }
            None => Ok(None),
        }
    }

    async fn invalidate(&self, file_id: &FileId) -> Result<()> {
        let prefix = StoreKey::prefix(file_id);
        self.store.delete_prefix(&prefix).await?;
        self.cache.invalidate_prefix(&prefix);
        Ok(())
    }

    async fn fetch_whole(&self, descriptor: &RequiredFileDescriptor, progress: &ProgressSink) -> Result<()> {
        let url = descriptor.url().ok_or_else(|| {
            Error::PreconditionViolation(format!("{} has no HTTP source", descriptor.file_id))
        })?;

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| Error::network(descriptor.file_id.to_string(), e))?;

        let status = response.status();
        if status.as_u16() == 202 {
            return Err(Error::deferred(descriptor.file_id.to_string()));
        }
        if !status.is_success() {
            return Err(Error::http_status(descriptor.file_id.to_string(), status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_string();

        let mut hasher = Md5::new();
        let mut buf = Vec::with_capacity(descriptor.size.min(64 * 1024 * 1024) as usize);
        let mut received = 0u64;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| Error::network(descriptor.file_id.to_string(), e))?;
            hasher.update(&chunk);
            buf.extend_from_slice(&chunk);
            received += chunk.len() as u64;
            progress.report(received, descriptor.size);
        }

        let digest = hex::encode(hasher.finalize());
        if let Some(expected) = &descriptor.md5 {
            if expected != &digest {
                return Err(Error::md5_mismatch(descriptor.file_id.to_string(), expected.clone(), digest));
            }
        }

        self.store
            .put(&StoreKey::data(&descriptor.file_id), Bytes::from(buf), &content_type)
            .await?;

        self.write_meta(&FileEntry {
            file_id: descriptor.file_id.clone(),
            md5: descriptor.md5.clone(),
            size: received,
            cached_at: chrono::Utc::now().timestamp(),
            format: FileFormat::Whole,
            content_type,
        })
        .await
    }

    async fn fetch_chunked(&self, descriptor: &RequiredFileDescriptor, progress: &ProgressSink) -> Result<()> {
        let chunk_size = self.tier.chunk_size;
        let size = descriptor.size;
        let n_chunks = u32::try_from(size.div_ceil(chunk_size)).unwrap_or(u32::MAX);
        let url = descriptor
            .url()
            .ok_or_else(|| {
                Error::PreconditionViolation(format!("{} has no HTTP source", descriptor.file_id))
            })?
            .to_string();

        let received = Arc::new(AtomicU64::new(0));
        let concurrency = self.concurrency_limit.min(n_chunks.max(1) as usize).max(1);

        let results: Vec<Result<String>> = stream::iter(0..n_chunks)
            .map(|index| {
                let url = url.clone();
                let received = received.clone();
                let file_id = descriptor.file_id.clone();
                async move {
                    let start = u64::from(index) * chunk_size;
                    let end = (start + chunk_size - 1).min(size.saturating_sub(1));
                    let resp = self
                        .http
                        .get(&url)
                        .header(reqwest::header::RANGE, format!("bytes={start}-{end}"))
                        .send()
                        .await
                        .map_err(|e| Error::network(file_id.to_string(), e))?;

                    let status = resp.status();
                    if status.as_u16() == 202 {
                        return Err(Error::deferred(file_id.to_string()));
                    }
                    if !status.is_success() {
                        return Err(Error::http_status(file_id.to_string(), status.as_u16()));
                    }
                    let content_type = resp
                        .headers()
                        .get(reqwest::header::CONTENT_TYPE)
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("application/octet-stream")
                        .to_string();
                    let bytes = resp.bytes().await.map_err(|e| Error::network(file_id.to_string(), e))?;
                    let so_far = received.fetch_add(bytes.len() as u64, Ordering::Relaxed) + bytes.len() as u64;
                    progress.report(so_far, size);

                    self.store.put(&StoreKey::chunk(&file_id, index), bytes, &content_type).await?;
                    Ok(content_type)
                }
            })
            .buffer_unordered(concurrency)
            .collect()
            .await;

        let mut content_type = "application/octet-stream".to_string();
        for r in results {
            content_type = r?;
        }

        let digest = self.hash_chunks(&descriptor.file_id, n_chunks).await?;
        if let Some(expected) = &descriptor.md5 {
            if expected != &digest {
                self.invalidate(&descriptor.file_id).await?;
                return Err(Error::md5_mismatch(descriptor.file_id.to_string(), expected.clone(), digest));
            }
        }

        self.write_meta(&FileEntry {
            file_id: descriptor.file_id.clone(),
            md5: descriptor.md5.clone(),
            size,
            cached_at: chrono::Utc::now().timestamp(),
            format: FileFormat::Chunked {
                chunk_bytes: chunk_size,
                n_chunks,
                content_type,
            },
            content_type: "application/octet-stream".to_string(),
        })
        .await
    }

    /// Streaming MD5 over chunks `0..n_chunks` in order; hash state stays
    /// bounded regardless of file size (§4.5 "keep hash state bounded").
    async fn hash_chunks(&self, file_id: &FileId, n_chunks: u32) -> Result<String> {
        let mut hasher = Md5::new();
        for index in 0..n_chunks {
            let key = StoreKey::chunk(file_id, index);
            let (bytes, _) = self.store.get(&key).await?.ok_or_else(|| Error::CorruptCache {
                file_id: file_id.to_string(),
                reason: format!("chunk {index} missing during verification"),
            })?;
            hasher.update(&bytes);
        }
        Ok(hex::encode(hasher.finalize()))
    }
}

#[async_trait]
impl Fetcher for Core {
    async fn fetch_one(&self, descriptor: &RequiredFileDescriptor, progress: &ProgressSink) {
        let outcome = if should_chunk(descriptor.size, &self.tier) {
            self.fetch_chunked(descriptor, progress).await
        } else {
            self.fetch_whole(descriptor, progress).await
        };

        match outcome {
            Ok(()) => progress.complete(),
            Err(e) => {
                warn!(file_id = %descriptor.file_id, error = %e, "download failed");
                progress.fail(e);
            }
        }
    }
}

/// The cache manager: ensures descriptors are locally present and
/// MD5-valid, downloading through a bounded [`DownloadQueue`], and serves
/// reads (whole or ranged) back out through the [`BlobCache`].
pub struct CacheManager {
    core: Arc<Core>,
    queue: DownloadQueue,
}

impl CacheManager {
    pub fn new(store: Arc<dyn BlobStore>, http: reqwest::Client, config: CacheManagerConfig) -> Self {
        let tier = tier_for_device_memory(config.device_memory_bytes);
        let core = Arc::new(Core {
            store,
            cache: BlobCache::new(tier.cache_budget),
            http,
            tier,
            concurrency_limit: config.concurrency_limit,
        });
        let queue = DownloadQueue::new(config.concurrency_limit, core.clone());
        debug!(?tier, "cache manager initialised");
        Self { core, queue }
    }

    /// Ensures `descriptor.file_id` is locally present and MD5-valid,
    /// downloading as needed. Reuses an in-flight download for the same
    /// `FileId` (§8 property 1).
    ///
    /// Errors are shared via `Arc` since multiple waiters may observe the
    /// same task's terminal failure simultaneously (§4.3 "multiple waiters").
    pub async fn fetch(&self, descriptor: RequiredFileDescriptor) -> std::result::Result<(), Arc<Error>> {
        let handle = self.queue.enqueue(descriptor);
        handle.wait().await
    }

    pub fn handle_for(&self, file_id: &FileId) -> Option<TaskHandle> {
        self.queue.handle_for(file_id)
    }

    pub async fn exists(&self, file_id: &FileId) -> Result<bool> {
        Ok(self.core.read_meta(file_id).await?.is_some())
    }

    pub async fn read_whole(&self, file_id: &FileId) -> Result<Option<Bytes>> {
        let Some(entry) = self.core.read_meta(file_id).await? else {
            return Ok(None);
        };
        self.read_range_with_entry(file_id, &entry, 0, entry.size).await
    }

    /// Serves `[start, end)`. For chunked entries, only chunks intersecting
    /// the range are materialised through the `BlobCache` (§4.5 "Range
    /// serving for chunked entries").
    pub async fn read_range(&self, file_id: &FileId, start: u64, end: u64) -> Result<Option<Bytes>> {
        let Some(entry) = self.core.read_meta(file_id).await? else {
            return Ok(None);
        };
        self.read_range_with_entry(file_id, &entry, start, end).await
    }

    async fn read_range_with_entry(
        &self,
        file_id: &FileId,
        entry: &FileEntry,
        start: u64,
        end: u64,
    ) -> Result<Option<Bytes>> {
        match &entry.format {
            FileFormat::Whole => {
                let Some((bytes, content_type)) = self.core.store.get(&StoreKey::data(file_id)).await? else {
                    return Ok(None);
                };
                if looks_corrupt(file_id.kind, &content_type, bytes.len()) {
                    warn!(file_id = %file_id, "corrupt whole-file entry detected on read, invalidating");
                    self.core.invalidate(file_id).await?;
                    return Ok(None);
                }
                let start = (start as usize).min(bytes.len());
                let end = (end as usize).min(bytes.len());
                Ok(Some(bytes.slice(start..end)))
            }
            FileFormat::Chunked { chunk_bytes, n_chunks, .. } => {
                if end <= start {
                    return Ok(Some(Bytes::new()));
                }
                let chunk_bytes = *chunk_bytes;
                let last_index = n_chunks.saturating_sub(1);
                let first = (start / chunk_bytes) as u32;
                let last = (((end - 1) / chunk_bytes) as u32).min(last_index);

                let mut out = Vec::with_capacity((end - start) as usize);
                for index in first..=last {
                    let key = StoreKey::chunk(file_id, index);
                    let store = self.core.store.clone();
                    let data = self
                        .core
                        .cache
                        .get_or_load(&key, || {
                            let key = key.clone();
                            let store = store.clone();
                            async move {
                                match store.get(&key).await? {
                                    Some((bytes, _)) => Ok(bytes),
                                    None => Err(signage_blobstore::BlobError::Corrupt {
                                        key: key.to_string(),
                                        reason: "chunk missing during range read".into(),
                                    }),
                                }
                            }
                        })
                        .await?;

                    let chunk_start = u64::from(index) * chunk_bytes;
                    let lo = if index == first { (start - chunk_start) as usize } else { 0 };
                    let hi = if index == last {
                        ((end - chunk_start) as usize).min(data.len())
                    } else {
                        data.len()
                    };
                    if lo < hi {
                        out.extend_from_slice(&data[lo..hi]);
                    }
                }
                Ok(Some(Bytes::from(out)))
            }
        }
    }

    pub async fn invalidate(&self, file_id: &FileId) -> Result<()> {
        self.core.invalidate(file_id).await
    }

    pub async fn purge_all(&self) -> Result<()> {
        self.core.store.delete_prefix("").await?;
        self.core.cache.clear();
        Ok(())
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            cache_used_bytes: self.core.cache.used_bytes(),
            cache_budget_bytes: self.core.cache.budget_bytes(),
            in_flight: self.queue.in_flight(),
            concurrency_limit: self.queue.concurrency_limit(),
        }
    }
}

/// Point-in-time counters for dashboards, mirroring the teacher's
/// plain-struct stats surface (no `prometheus` dependency unless the
/// `metrics` feature is enabled).
#[derive(Debug, Clone, Copy)]
pub struct CacheStats {
    pub cache_used_bytes: u64,
    pub cache_budget_bytes: u64,
    pub in_flight: usize,
    pub concurrency_limit: usize,
}
