//! The CMS's authoritative required-files manifest entry.

use crate::file_id::FileId;
use serde::{Deserialize, Serialize};

/// Where a [`RequiredFileDescriptor`] should be fetched from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileSource {
    Http { url: String },
    Xmds { token: String },
}

/// One entry of the CMS's required-files manifest: what should be locally
/// present, and how to get it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequiredFileDescriptor {
    pub file_id: FileId,
    pub md5: Option<String>,
    pub size: u64,
    pub source: FileSource,
    pub priority_hint: Option<u32>,
}

impl RequiredFileDescriptor {
    pub fn url(&self) -> Option<&str> {
        match &self.source {
            FileSource::Http { url } => Some(url),
            FileSource::Xmds { .. } => None,
        }
    }
}
