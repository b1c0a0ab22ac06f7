//! Bounded in-memory LRU over [`crate::BlobStore`] entries.

use crate::error::Result;
use crate::key::StoreKey;
use bytes::Bytes;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, trace};

struct Inner {
    order: VecDeque<StoreKey>,
    map: HashMap<StoreKey, Bytes>,
    used_bytes: u64,
    budget_bytes: u64,
}

impl Inner {
    fn touch(&mut self, key: &StoreKey) {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            let key = self.order.remove(pos).expect("position was just found");
            self.order.push_back(key);
        }
    }

    fn insert(&mut self, key: StoreKey, bytes: Bytes) {
        if let Some(old) = self.map.insert(key.clone(), bytes.clone()) {
            self.used_bytes = self.used_bytes.saturating_sub(old.len() as u64);
            self.order.retain(|k| k != &key);
        }
        self.used_bytes += bytes.len() as u64;
        self.order.push_back(key);
        self.evict_to_budget();
    }

    fn evict_to_budget(&mut self) {
        while self.used_bytes > self.budget_bytes {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            if let Some(evicted) = self.map.remove(&oldest) {
                self.used_bytes = self.used_bytes.saturating_sub(evicted.len() as u64);
                trace!(key = %oldest, "evicted blob from cache");
            }
        }
    }
}

/// An in-process LRU cache in front of a [`crate::BlobStore`], bounded by a
/// total byte budget rather than an entry count (spec §4.2).
///
/// Concurrent misses for the same key are coalesced: only one loader call
/// runs per key at a time, and other callers wait on its result rather than
/// all hitting the backing store.
pub struct BlobCache {
    inner: Mutex<Inner>,
    in_flight: DashMap<StoreKey, Arc<AsyncMutex<()>>>,
}

impl BlobCache {
    pub fn new(budget_bytes: u64) -> Self {
        Self {
            inner: Mutex::new(Inner {
                order: VecDeque::new(),
                map: HashMap::new(),
                used_bytes: 0,
                budget_bytes,
            }),
            in_flight: DashMap::new(),
        }
    }

    pub fn used_bytes(&self) -> u64 {
        self.inner.lock().used_bytes
    }

    pub fn budget_bytes(&self) -> u64 {
        self.inner.lock().budget_bytes
    }

    pub fn contains(&self, key: &StoreKey) -> bool {
        self.inner.lock().map.contains_key(key)
    }

    /// Returns the cached bytes for `key`, loading and inserting them via
    /// `loader` on a miss. Concurrent calls for the same `key` share a
    /// single `loader` invocation.
    pub async fn get_or_load<F, Fut>(&self, key: &StoreKey, loader: F) -> Result<Bytes>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Bytes>>,
    {
        if let Some(hit) = self.try_get(key) {
            return Ok(hit);
        }

        let lock = self
            .in_flight
            .entry(key.clone())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        // Re-check: another caller may have populated the entry while we
        // waited for the lock.
        if let Some(hit) = self.try_get(key) {
            self.cleanup_in_flight(key, &lock);
            return Ok(hit);
        }

        let loaded = loader().await;
        if let Ok(bytes) = &loaded {
            self.inner.lock().insert(key.clone(), bytes.clone());
            debug!(key = %key, len = bytes.len(), "cached blob after load");
        }
        self.cleanup_in_flight(key, &lock);
        loaded
    }

    fn try_get(&self, key: &StoreKey) -> Option<Bytes> {
        let mut inner = self.inner.lock();
        let hit = inner.map.get(key).cloned();
        if hit.is_some() {
            inner.touch(key);
        }
        hit
    }

    /// Drops the in-flight lock entry once nobody else holds a clone of it,
    /// so the `in_flight` map doesn't grow unboundedly over the cache's
    /// lifetime.
    fn cleanup_in_flight(&self, key: &StoreKey, lock: &Arc<AsyncMutex<()>>) {
        if Arc::strong_count(lock) <= 2 {
            self.in_flight.remove_if(key, |_, v| Arc::strong_count(v) <= 1);
        }
    }

    pub fn invalidate(&self, key: &StoreKey) {
        let mut inner = self.inner.lock();
        if let Some(bytes) = inner.map.remove(key) {
            inner.used_bytes = inner.used_bytes.saturating_sub(bytes.len() as u64);
            inner.order.retain(|k| k != key);
        }
    }

    /// Drops every cached entry whose key starts with `prefix`, e.g. all
    /// chunks belonging to a file being invalidated.
    pub fn invalidate_prefix(&self, prefix: &str) {
        let mut inner = self.inner.lock();
        let doomed: Vec<StoreKey> = inner
            .map
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        for key in doomed {
            if let Some(bytes) = inner.map.remove(&key) {
                inner.used_bytes = inner.used_bytes.saturating_sub(bytes.len() as u64);
            }
            inner.order.retain(|k| k != &key);
        }
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.map.clear();
        inner.order.clear();
        inner.used_bytes = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use signage_model::FileId;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn evicts_oldest_entry_once_budget_exceeded() {
        let cache = BlobCache::new(10);
        let a = StoreKey::data(&FileId::media(1));
        let b = StoreKey::data(&FileId::media(2));
        let c = StoreKey::data(&FileId::media(3));

        cache
            .get_or_load(&a, || async { Ok(Bytes::from_static(b"aaaaa")) })
            .await
            .unwrap();
        cache
            .get_or_load(&b, || async { Ok(Bytes::from_static(b"bbbbb")) })
            .await
            .unwrap();
        // Budget is 10 bytes; inserting c (5 bytes) must evict a (the LRU entry).
        cache
            .get_or_load(&c, || async { Ok(Bytes::from_static(b"ccccc")) })
            .await
            .unwrap();

        assert!(!cache.contains(&a));
        assert!(cache.contains(&b));
        assert!(cache.contains(&c));
    }

    #[tokio::test]
    async fn concurrent_misses_for_same_key_coalesce_to_one_load() {
        let cache = Arc::new(BlobCache::new(1024));
        let key = StoreKey::data(&FileId::media(9));
        let load_count = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = cache.clone();
            let key = key.clone();
            let load_count = load_count.clone();
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_load(&key, || async move {
                        load_count.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
                        Ok(Bytes::from_static(b"payload"))
                    })
                    .await
                    .unwrap()
            }));
        }

        for h in handles {
            assert_eq!(h.await.unwrap().as_ref(), b"payload");
        }
        assert_eq!(load_count.load(Ordering::SeqCst), 1);
    }
}
