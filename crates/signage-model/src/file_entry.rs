//! Persisted per-file metadata and the chunked-storage invariant.

use crate::file_id::FileId;
use serde::{Deserialize, Serialize};

/// Storage shape a file is currently persisted in.
///
/// Invariant: a file is stored in exactly one format at any time (§3). A
/// `CacheManager` migrates between them only by re-downloading, never by
/// rewriting an existing entry in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileFormat {
    Whole,
    Chunked {
        chunk_bytes: u64,
        n_chunks: u32,
        content_type: String,
    },
}

/// Metadata persisted alongside a file's bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub file_id: FileId,
    pub md5: Option<String>,
    pub size: u64,
    /// Unix timestamp (seconds) of when this entry's metadata was written.
    pub cached_at: i64,
    pub format: FileFormat,
    pub content_type: String,
}

impl FileEntry {
    pub fn n_chunks(&self) -> Option<u32> {
        match &self.format {
            FileFormat::Chunked { n_chunks, .. } => Some(*n_chunks),
            FileFormat::Whole => None,
        }
    }

    pub fn chunk_bytes(&self) -> Option<u64> {
        match &self.format {
            FileFormat::Chunked { chunk_bytes, .. } => Some(*chunk_bytes),
            FileFormat::Whole => None,
        }
    }

    pub fn is_chunked(&self) -> bool {
        matches!(self.format, FileFormat::Chunked { .. })
    }
}

/// One slice of a chunked file.
///
/// Invariant: for a chunked file with `n_chunks = N`, chunks `0..N-1` are
/// all present or the entry is considered corrupt and removable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub file_id: FileId,
    pub index: u32,
    pub bytes: Vec<u8>,
}
