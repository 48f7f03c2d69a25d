use super::backend::{Listing, StorageBackend};
use super::{validate_id, Record};
use crate::error::{QuireError, Result};
use std::fs;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use uuid::Uuid;

const RECORD_EXT: &str = "json";

/// File-per-record JSON store rooted at one directory.
pub struct FsBackend<R> {
    dir: PathBuf,
    _record: PhantomData<R>,
}

impl<R: Record> FsBackend<R> {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            _record: PhantomData,
        }
    }

    /// Store for `R` under `<root>/<R::KIND>`.
    pub fn under(root: &Path) -> Self {
        Self::new(root.join(R::KIND))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn record_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", id, RECORD_EXT))
    }

    fn ensure_dir(&self) -> Result<()> {
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir).map_err(QuireError::Io)?;
        }
        Ok(())
    }

    fn read_record(path: &Path) -> Option<R> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "unreadable record skipped");
                return None;
            }
        };
        match serde_json::from_str::<R>(&text) {
            Ok(record) if !record.id().trim().is_empty() => Some(record),
            Ok(_) => {
                tracing::warn!(path = %path.display(), "record without id skipped");
                None
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "corrupt record skipped");
                None
            }
        }
    }
}

fn is_record_file(path: &Path) -> bool {
    let hidden = path
        .file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with('.'))
        .unwrap_or(true);
    !hidden && path.extension().and_then(|e| e.to_str()) == Some(RECORD_EXT)
}

impl<R: Record> StorageBackend<R> for FsBackend<R> {
    fn list(&self) -> Result<Listing<R>> {
        if !self.dir.exists() {
            return Ok(Listing::default());
        }

        let mut paths = Vec::new();
        for entry in fs::read_dir(&self.dir).map_err(QuireError::Io)? {
            let path = entry.map_err(QuireError::Io)?.path();
            if path.is_file() && is_record_file(&path) {
                paths.push(path);
            }
        }
        paths.sort();

        let mut listing = Listing::default();
        for path in paths {
            match Self::read_record(&path) {
                Some(record) => listing.records.push(record),
                None => listing.skipped += 1,
            }
        }
        tracing::debug!(
            kind = R::KIND,
            loaded = listing.records.len(),
            skipped = listing.skipped,
            "listed records"
        );
        Ok(listing)
    }

    fn save(&self, record: &R) -> Result<()> {
        validate_id(record.id())?;
        self.ensure_dir()?;

        let content = serde_json::to_string_pretty(record).map_err(QuireError::Serialization)?;

        // Atomic write
        let tmp_path = self
            .dir
            .join(format!(".{}-{}.tmp", record.id(), Uuid::new_v4()));
        fs::write(&tmp_path, content).map_err(QuireError::Io)?;
        if let Err(e) = fs::rename(&tmp_path, self.record_path(record.id())) {
            let _ = fs::remove_file(&tmp_path);
            return Err(QuireError::Io(e));
        }
        Ok(())
    }

    fn delete(&self, id: &str) -> Result<()> {
        validate_id(id)?;
        let path = self.record_path(id);
        if !path.exists() {
            return Err(QuireError::NotFound(id.to_string()));
        }
        fs::remove_file(path).map_err(QuireError::Io)?;
        Ok(())
    }
}
