//! Typed file identity shared across the cache, schedule, and orchestrator crates.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The namespace a [`FileId`] belongs to.
///
/// Equality of a [`FileId`] includes `kind`: a media id and a layout id that
/// happen to share a numeric value are distinct files. Mixing these up is
/// the §9 "namespace disambiguation" bug this type exists to prevent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileKind {
    Layout,
    Media,
    WidgetHtml,
    LayoutBundleAsset,
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Layout => "layout",
            Self::Media => "media",
            Self::WidgetHtml => "widget-html",
            Self::LayoutBundleAsset => "layout-bundle-asset",
        };
        f.write_str(s)
    }
}

/// A content-addressable identifier for a file the player may need locally.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileId {
    pub kind: FileKind,
    pub id: u64,
    /// Disambiguator for keys that are not globally unique by `(kind, id)`
    /// alone, e.g. widget HTML fragments (`{layout}/{region}/{widget}`).
    pub sub: Option<String>,
}

impl FileId {
    pub fn new(kind: FileKind, id: u64) -> Self {
        Self { kind, id, sub: None }
    }

    pub fn layout(id: u64) -> Self {
        Self::new(FileKind::Layout, id)
    }

    pub fn media(id: u64) -> Self {
        Self::new(FileKind::Media, id)
    }

    pub fn widget_html(layout: u64, region: &str, widget: &str) -> Self {
        Self {
            kind: FileKind::WidgetHtml,
            id: layout,
            sub: Some(format!("{region}/{widget}")),
        }
    }

    pub fn with_sub(mut self, sub: impl Into<String>) -> Self {
        self.sub = Some(sub.into());
        self
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.sub {
            Some(sub) => write!(f, "{}:{}:{}", self.kind, self.id, sub),
            None => write!(f, "{}:{}", self.kind, self.id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_and_layout_with_same_id_are_distinct() {
        let media = FileId::media(78);
        let layout = FileId::layout(78);
        assert_ne!(media, layout);

        use std::collections::HashSet;
        let mut set = HashSet::new();
        set.insert(media.clone());
        assert!(!set.contains(&layout));
        set.insert(layout);
        assert_eq!(set.len(), 2);
    }
}
