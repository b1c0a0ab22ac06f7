//! Persistent content-addressed storage.

use crate::error::{BlobError, Result};
use crate::key::StoreKey;
use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, warn};

/// Key/value persistent store mapping a [`StoreKey`] to bytes plus a
/// content-type.
///
/// `put` is atomic from the observer's standpoint: a concurrent `get`
/// either returns the old value, the new value, or `None`, never a
/// truncated body (§4.1). [`FsBlobStore`] achieves this by staging to a
/// temporary file and renaming.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, key: &StoreKey, bytes: Bytes, content_type: &str) -> Result<()>;
    async fn get(&self, key: &StoreKey) -> Result<Option<(Bytes, String)>>;
    async fn exists(&self, key: &StoreKey) -> Result<bool>;
    async fn delete(&self, key: &StoreKey) -> Result<()>;
    async fn delete_prefix(&self, prefix: &str) -> Result<()>;
    /// `(used_bytes, total_bytes)`. Falls back to a conservative estimate
    /// when the platform can't report free space.
    async fn estimate_quota(&self) -> Result<(u64, u64)>;
}

/// An on-disk [`BlobStore`].
///
/// Each entry is stored as a single file framed as `[u32 content-type
/// length][content-type bytes][payload]`, so the content-type travels with
/// the payload inside the same atomically-renamed file rather than a
/// separate sidecar that could race with it.
pub struct FsBlobStore {
    base_dir: PathBuf,
}

const MAGIC_LEN_BYTES: usize = 4;

impl FsBlobStore {
    pub async fn new(base_dir: impl AsRef<Path>) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        fs::create_dir_all(&base_dir).await?;
        debug!(path = ?base_dir, "initialised blob store");
        Ok(Self { base_dir })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn path_for(&self, key: &StoreKey) -> PathBuf {
        self.base_dir.join(key.as_str())
    }

    fn frame(content_type: &str, bytes: &Bytes) -> Vec<u8> {
        let ct = content_type.as_bytes();
        let mut out = Vec::with_capacity(MAGIC_LEN_BYTES + ct.len() + bytes.len());
        out.extend_from_slice(&(ct.len() as u32).to_be_bytes());
        out.extend_from_slice(ct);
        out.extend_from_slice(bytes);
        out
    }

    fn unframe(buf: &[u8]) -> Result<(String, Bytes)> {
        if buf.len() < MAGIC_LEN_BYTES {
            return Err(BlobError::Corrupt {
                key: String::new(),
                reason: "truncated frame header".into(),
            });
        }
        let len = u32::from_be_bytes(buf[0..4].try_into().expect("4-byte slice")) as usize;
        let ct_start = MAGIC_LEN_BYTES;
        let ct_end = ct_start
            .checked_add(len)
            .filter(|&e| e <= buf.len())
            .ok_or_else(|| BlobError::Corrupt {
                key: String::new(),
                reason: "content-type length exceeds frame".into(),
            })?;
        let content_type = String::from_utf8_lossy(&buf[ct_start..ct_end]).into_owned();
        let payload = Bytes::copy_from_slice(&buf[ct_end..]);
        Ok((content_type, payload))
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn put(&self, key: &StoreKey, bytes: Bytes, content_type: &str) -> Result<()> {
        let final_path = self.path_for(key);
        if let Some(parent) = final_path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let tmp_path = final_path.with_extension(format!(
            "tmp-{}",
            std::process::id() as u64 ^ rand_salt()
        ));

        let framed = Self::frame(content_type, &bytes);
        {
            let mut tmp = File::create(&tmp_path).await?;
            tmp.write_all(&framed).await?;
            tmp.flush().await?;
            tmp.sync_all().await?;
        }
        fs::rename(&tmp_path, &final_path).await?;
        Ok(())
    }

    async fn get(&self, key: &StoreKey) -> Result<Option<(Bytes, String)>> {
        let path = self.path_for(key);
        let mut file = match File::open(&path).await {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let mut buf = Vec::new();
        file.read_to_end(&mut buf).await?;
        match Self::unframe(&buf) {
            Ok((content_type, bytes)) => Ok(Some((bytes, content_type))),
            Err(BlobError::Corrupt { reason, .. }) => {
                warn!(key = %key, reason, "corrupt blob frame, treating as absent");
                Err(BlobError::Corrupt {
                    key: key.to_string(),
                    reason,
                })
            }
            Err(e) => Err(e),
        }
    }

    async fn exists(&self, key: &StoreKey) -> Result<bool> {
        Ok(fs::metadata(self.path_for(key)).await.is_ok())
    }

    async fn delete(&self, key: &StoreKey) -> Result<()> {
        match fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<()> {
        let base_dir = self.base_dir.clone();
        let prefix = prefix.to_string();
        tokio::task::spawn_blocking(move || -> Result<()> {
            for entry in walkdir::WalkDir::new(&base_dir)
                .into_iter()
                .filter_map(std::result::Result::ok)
            {
                if !entry.file_type().is_file() {
                    continue;
                }
                let Ok(rel) = entry.path().strip_prefix(&base_dir) else {
                    continue;
                };
                let rel = rel.to_string_lossy().replace(std::path::MAIN_SEPARATOR, "/");
                if rel.starts_with(&prefix) {
                    let _ = std::fs::remove_file(entry.path());
                }
            }
            Ok(())
        })
        .await
        .map_err(|e| BlobError::Io(std::io::Error::other(e)))??;
        Ok(())
    }

    async fn estimate_quota(&self) -> Result<(u64, u64)> {
        let used = dir_size(&self.base_dir).await?;
        let total = statvfs_total_bytes(&self.base_dir).unwrap_or(u64::MAX);
        Ok((used, total))
    }
}

async fn dir_size(base_dir: &Path) -> Result<u64> {
    let base_dir = base_dir.to_path_buf();
    tokio::task::spawn_blocking(move || {
        walkdir::WalkDir::new(&base_dir)
            .into_iter()
            .filter_map(std::result::Result::ok)
            .filter(|e| e.file_type().is_file())
            .filter_map(|e| e.metadata().ok())
            .map(|m| m.len())
            .sum()
    })
    .await
    .map_err(|e| BlobError::Io(std::io::Error::other(e)))
}

#[cfg(unix)]
fn statvfs_total_bytes(path: &Path) -> Option<u64> {
    use std::ffi::CString;
    use std::mem::MaybeUninit;

    let c_path = CString::new(path.to_string_lossy().as_bytes()).ok()?;
    // SAFETY: `stat` is zero-initialised and fully populated by a
    // successful `statvfs` call before it is read.
    unsafe {
        let mut stat = MaybeUninit::<libc::statvfs>::zeroed();
        if libc::statvfs(c_path.as_ptr(), stat.as_mut_ptr()) != 0 {
            return None;
        }
        let stat = stat.assume_init();
        Some((stat.f_blocks as u64).saturating_mul(stat.f_frsize as u64))
    }
}

#[cfg(not(unix))]
fn statvfs_total_bytes(_path: &Path) -> Option<u64> {
    None
}

fn rand_salt() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use signage_model::FileId;

    #[tokio::test]
    async fn put_then_get_round_trips_bytes_and_content_type() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path()).await.unwrap();
        let key = StoreKey::data(&FileId::media(1));

        store
            .put(&key, Bytes::from_static(b"hello world"), "text/plain")
            .await
            .unwrap();

        let (bytes, content_type) = store.get(&key).await.unwrap().unwrap();
        assert_eq!(bytes.as_ref(), b"hello world");
        assert_eq!(content_type, "text/plain");
    }

    #[tokio::test]
    async fn get_missing_key_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path()).await.unwrap();
        let key = StoreKey::data(&FileId::media(404));
        assert!(store.get(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_prefix_removes_all_chunks_of_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path()).await.unwrap();
        let file_id = FileId::media(6);

        for i in 0..4u32 {
            let key = StoreKey::chunk(&file_id, i);
            store
                .put(&key, Bytes::from(vec![i as u8; 4]), "application/octet-stream")
                .await
                .unwrap();
        }
        store
            .put(&StoreKey::meta(&file_id), Bytes::from_static(b"{}"), "application/json")
            .await
            .unwrap();

        store.delete_prefix("media/6").await.unwrap();

        for i in 0..4u32 {
            assert!(store.get(&StoreKey::chunk(&file_id, i)).await.unwrap().is_none());
        }
        assert!(store.get(&StoreKey::meta(&file_id)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn overwrite_is_never_observed_as_truncated() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path()).await.unwrap();
        let key = StoreKey::data(&FileId::media(2));

        store
            .put(&key, Bytes::from_static(b"version-one"), "text/plain")
            .await
            .unwrap();
        store
            .put(&key, Bytes::from_static(b"version-two-longer"), "text/plain")
            .await
            .unwrap();

        let (bytes, _) = store.get(&key).await.unwrap().unwrap();
        assert_eq!(bytes.as_ref(), b"version-two-longer");
    }
}
