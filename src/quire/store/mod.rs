//! # Storage Layer
//!
//! Durability for quire records sits behind the [`StorageBackend`] trait so
//! the lifecycle code never knows where records live.
//!
//! ## Implementations
//!
//! - [`fs_backend::FsBackend`]: one pretty-printed JSON file per record,
//!   `<dir>/<id>.json`, written atomically (temp file + rename).
//! - [`cache_backend::CacheBackend`]: the whole collection as a single JSON
//!   array stored under a fixed key (`"posts"`, `"snippets"`) in one cache
//!   document. Used when the data directory is not usable, and as the
//!   snapshot mirror next to the file store.
//! - [`mem_backend::MemBackend`]: in-memory, with failure injection for tests.
//!
//! ## Layout
//!
//! ```text
//! <data root>/
//! ├── posts/{id}.json
//! ├── snippets/{id}.json
//! ├── images/{millis}-{original name}
//! ├── settings.json
//! └── cache.json          # {"posts": [...], "snippets": [...]}
//! ```
//!
//! ## Semantics shared by all backends
//!
//! - `save` requires an id that is usable as a file name, else `InvalidRecord`.
//! - `save` replaces the whole record. Last write wins; nothing is locked.
//! - `delete` of an unknown id is `NotFound`; callers decide if that matters.
//! - `list` skips records that fail to parse and reports how many it skipped.

use crate::error::{QuireError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

pub mod backend;
pub mod cache_backend;
pub mod fs_backend;
pub mod mem_backend;

pub use backend::{Listing, StorageBackend};

/// A persisted unit addressed by its id.
pub trait Record: Serialize + DeserializeOwned + Clone {
    /// Directory name and cache key for this kind of record.
    const KIND: &'static str;

    fn id(&self) -> &str;
}

/// Rejects ids that cannot safely name a record file.
pub fn validate_id(id: &str) -> Result<()> {
    if id.trim().is_empty() {
        return Err(QuireError::InvalidRecord("record has no id".to_string()));
    }
    if id.starts_with('.') || id.contains(['/', '\\', '\0']) {
        return Err(QuireError::InvalidRecord(format!(
            "id is not a valid record key: {:?}",
            id
        )));
    }
    Ok(())
}
