//! Content-addressed persistent storage and bounded in-memory cache for
//! the signage player core (spec §4.1, §4.2).

mod cache;
mod error;
mod key;
mod store;

pub use cache::BlobCache;
pub use error::{BlobError, Result};
pub use key::StoreKey;
pub use store::{BlobStore, FsBlobStore};
