//! Opaque layout payloads and their declared dependencies.

use crate::file_id::FileId;

/// A layout as handed to the renderer: opaque bytes plus the dependency set
/// a renderer-facing parser derived from them.
///
/// The core never interprets `bytes`; it only needs the dependency list to
/// decide whether a layout is locally resolvable (§4.7 step 7).
#[derive(Debug, Clone)]
pub struct LayoutDescriptor {
    pub file_id: FileId,
    pub bytes: Vec<u8>,
    pub dependencies: Vec<FileId>,
}

impl LayoutDescriptor {
    pub fn new(file_id: FileId, bytes: Vec<u8>, dependencies: Vec<FileId>) -> Self {
        Self {
            file_id,
            bytes,
            dependencies,
        }
    }
}
