use crate::init::QuirePaths;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A throwaway data root for tests.
pub struct ApiFixture {
    // Held so the directory lives as long as the fixture.
    _temp_dir: TempDir,
    root: PathBuf,
}

impl Default for ApiFixture {
    fn default() -> Self {
        Self::new()
    }
}

impl ApiFixture {
    pub fn new() -> Self {
        let temp_dir = tempfile::tempdir().expect("failed to create temp dir");
        let root = temp_dir.path().join("quire");
        Self {
            _temp_dir: temp_dir,
            root,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn paths(&self) -> QuirePaths {
        QuirePaths::new(&self.root)
    }
}
