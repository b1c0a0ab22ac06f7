//! Path-like namespacing for persisted blobs.

use signage_model::{FileId, FileKind};
use std::fmt;

/// A key into the [`crate::BlobStore`] namespace.
///
/// Mirrors the paths in spec §4.1: `media/{id}`, `layout/{id}`,
/// `media/{id}/meta`, `media/{id}/chunk-{index}`,
/// `widget-html/{layout}/{region}/{widget}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StoreKey(String);

impl StoreKey {
    fn namespace(file_id: &FileId) -> String {
        match file_id.kind {
            FileKind::Layout => format!("layout/{}", file_id.id),
            FileKind::Media => format!("media/{}", file_id.id),
            FileKind::WidgetHtml => {
                let sub = file_id.sub.as_deref().unwrap_or_default();
                format!("widget-html/{}/{}", file_id.id, sub)
            }
            FileKind::LayoutBundleAsset => {
                let sub = file_id.sub.as_deref().unwrap_or_default();
                format!("layout-bundle-asset/{}/{}", file_id.id, sub)
            }
        }
    }

    /// The whole-file (or metadata record) key for `file_id`.
    pub fn data(file_id: &FileId) -> Self {
        Self(Self::namespace(file_id))
    }

    /// The textual prefix covering every key belonging to `file_id`
    /// (data, metadata, and all chunks), for use with `delete_prefix`.
    pub fn prefix(file_id: &FileId) -> String {
        Self::namespace(file_id)
    }

    /// The metadata-record key for `file_id`.
    pub fn meta(file_id: &FileId) -> Self {
        Self(format!("{}/meta", Self::namespace(file_id)))
    }

    /// The key for a single chunk of a chunked `file_id`.
    pub fn chunk(file_id: &FileId, index: u32) -> Self {
        Self(format!("{}/chunk-{index}", Self::namespace(file_id)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this key falls under `prefix` (used by `delete_prefix`).
    pub fn starts_with(&self, prefix: &str) -> bool {
        self.0.starts_with(prefix)
    }
}

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_and_layout_keys_are_disjoint() {
        let media = FileId::media(78);
        let layout = FileId::layout(78);
        assert_ne!(StoreKey::data(&media), StoreKey::data(&layout));
    }

    #[test]
    fn chunk_key_is_nested_under_data_prefix() {
        let file_id = FileId::media(6);
        let chunk = StoreKey::chunk(&file_id, 3);
        assert!(chunk.starts_with("media/6"));
        assert_eq!(chunk.as_str(), "media/6/chunk-3");
    }
}
