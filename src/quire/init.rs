//! Startup: find the data root, pick a storage backend, wire the facade.
//!
//! The data root comes from, in order: the `--data-dir` flag, the
//! `QUIRE_DATA_DIR` environment variable, the platform data directory.
//! With the `auto` backend, quire stores one file per record when the root
//! can be created, and falls back to a single cache document in the system
//! temp directory when it cannot. The fallback has no image support.

use crate::api::QuireApi;
use crate::images::{FsImageStore, ImageStore, UnavailableImages};
use crate::manager::PostManager;
use crate::model::{Post, Snippet};
use crate::settings::{BackendChoice, Settings};
use crate::snippets::SnippetBook;
use crate::store::cache_backend::CacheBackend;
use crate::store::fs_backend::FsBackend;
use crate::store::StorageBackend;
use directories::ProjectDirs;
use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DATA_DIR_ENV: &str = "QUIRE_DATA_DIR";
const CACHE_FILENAME: &str = "cache.json";

pub type PostBackend = Box<dyn StorageBackend<Post>>;
pub type SnippetBackend = Box<dyn StorageBackend<Snippet>>;
pub type Images = Box<dyn ImageStore>;
pub type DynApi = QuireApi<PostBackend, Images, SnippetBackend>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageMode {
    /// One JSON file per record under the data root.
    Files,
    /// Everything in one cache document; no images.
    Cache,
}

impl fmt::Display for StorageMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageMode::Files => f.write_str("files"),
            StorageMode::Cache => f.write_str("cache"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuirePaths {
    pub root: PathBuf,
    pub cache_file: PathBuf,
}

impl QuirePaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let cache_file = root.join(CACHE_FILENAME);
        Self { root, cache_file }
    }

    pub fn posts_dir(&self) -> PathBuf {
        self.root.join("posts")
    }

    pub fn snippets_dir(&self) -> PathBuf {
        self.root.join("snippets")
    }

    pub fn images_dir(&self) -> PathBuf {
        self.root.join("images")
    }

    /// Directory holding `settings.json`.
    pub fn settings_dir(&self) -> &Path {
        &self.root
    }
}

/// Data root from the flag, the environment, or the platform data directory.
pub fn resolve_data_root(flag: Option<PathBuf>) -> Option<PathBuf> {
    if let Some(dir) = flag {
        return Some(dir);
    }
    if let Ok(dir) = env::var(DATA_DIR_ENV) {
        if !dir.trim().is_empty() {
            return Some(PathBuf::from(dir));
        }
    }
    ProjectDirs::from("com", "quire", "quire").map(|dirs| dirs.data_dir().to_path_buf())
}

/// Root used when no usable data directory exists.
pub fn fallback_root() -> PathBuf {
    env::temp_dir().join("quire")
}

/// Which storage to open for `choice`. `auto` probes the root by creating it.
pub fn detect_mode(choice: BackendChoice, root: &Path) -> StorageMode {
    match choice {
        BackendChoice::Files => StorageMode::Files,
        BackendChoice::Cache => StorageMode::Cache,
        BackendChoice::Auto => match fs::create_dir_all(root) {
            Ok(()) => StorageMode::Files,
            Err(e) => {
                tracing::warn!(root = %root.display(), error = %e, "data directory unusable, using fallback store");
                StorageMode::Cache
            }
        },
    }
}

/// Open the data root and wire the facade. Never fails: an unusable root
/// degrades to the fallback store.
pub fn initialize(data_dir: Option<PathBuf>) -> DynApi {
    let root = resolve_data_root(data_dir).unwrap_or_else(|| {
        tracing::warn!("no data directory available, using the temp directory");
        fallback_root()
    });

    let settings = Settings::load(&root).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "settings unreadable, using defaults");
        Settings::default()
    });

    let mode = detect_mode(settings.backend, &root);
    let paths = if mode == StorageMode::Cache && fs::create_dir_all(&root).is_err() {
        QuirePaths::new(fallback_root())
    } else {
        QuirePaths::new(root)
    };
    tracing::debug!(root = %paths.root.display(), %mode, "storage selected");

    build_api(paths, settings, mode)
}

/// Wire the facade for `mode`.
pub fn build_api(paths: QuirePaths, settings: Settings, mode: StorageMode) -> DynApi {
    let (posts, images, snippets, mirror) = match mode {
        StorageMode::Files => (
            Box::new(FsBackend::<Post>::new(paths.posts_dir())) as PostBackend,
            Box::new(FsImageStore::new(paths.images_dir(), settings.image_scheme)) as Images,
            Box::new(FsBackend::<Snippet>::new(paths.snippets_dir())) as SnippetBackend,
            Some(CacheBackend::<Post>::new(&paths.cache_file)),
        ),
        StorageMode::Cache => (
            Box::new(CacheBackend::<Post>::new(&paths.cache_file)) as PostBackend,
            Box::new(UnavailableImages) as Images,
            Box::new(CacheBackend::<Snippet>::new(&paths.cache_file)) as SnippetBackend,
            None,
        ),
    };

    let mut manager = PostManager::new(posts, images);
    if let Some(mirror) = mirror {
        manager = manager.with_mirror(mirror);
    }
    if settings.autosave {
        manager = manager.with_autosave(Duration::from_secs(settings.autosave_delay_secs));
    }

    QuireApi::new(manager, SnippetBook::new(snippets), settings, paths, mode)
}
