//! # Image Store
//!
//! Images attached to posts are copied into a managed directory and referred
//! to from post content by a stable reference string. The store owns the
//! lifecycle of those files: it creates them on [`ImageStore::select`] and
//! removes them on [`ImageStore::delete`].
//!
//! ## References
//!
//! Two schemes are understood, both embedding the generated file name:
//!
//! - `public`: `/images/<file>` (a path under the public assets prefix)
//! - `custom`: `quire-image://<file>` (resolved by the host)
//!
//! New references use the configured scheme; either is recognised.
//!
//! ## Naming
//!
//! Copies are named `<unix millis>-<original file name>`. If that name is
//! taken, a counter is inserted: `<millis>-1-<original>`, `<millis>-2-…`.
//! Separators, quotes, angle brackets and control characters in the original
//! name are replaced with `_`.
//!
//! ## Picking
//!
//! Choosing the source file is the host's job (a native dialog in a desktop
//! shell, a path argument in the CLI) and sits behind [`ImagePicker`].
//! Cancelling is a normal outcome, distinct from an I/O failure.

use crate::error::{QuireError, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

const PUBLIC_PREFIX: &str = "/images/";
const CUSTOM_PREFIX: &str = "quire-image://";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceScheme {
    #[default]
    Public,
    Custom,
}

impl ReferenceScheme {
    pub fn reference_for(&self, file_name: &str) -> String {
        match self {
            ReferenceScheme::Public => format!("{}{}", PUBLIC_PREFIX, file_name),
            ReferenceScheme::Custom => format!("{}{}", CUSTOM_PREFIX, file_name),
        }
    }
}

impl fmt::Display for ReferenceScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReferenceScheme::Public => f.write_str("public"),
            ReferenceScheme::Custom => f.write_str("custom"),
        }
    }
}

impl FromStr for ReferenceScheme {
    type Err = QuireError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "public" => Ok(ReferenceScheme::Public),
            "custom" => Ok(ReferenceScheme::Custom),
            other => Err(QuireError::InvalidSetting(format!(
                "image scheme must be 'public' or 'custom', got '{}'",
                other
            ))),
        }
    }
}

/// Extracts the managed file name from a reference of either scheme.
pub fn file_name_of(reference: &str) -> Option<&str> {
    let name = reference
        .strip_prefix(PUBLIC_PREFIX)
        .or_else(|| reference.strip_prefix(CUSTOM_PREFIX))?;
    if name.is_empty() || name.starts_with('.') || name.contains(['/', '\\']) {
        return None;
    }
    Some(name)
}

pub fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// MIME type for serving a stored image.
pub fn content_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

/// Supplies the source file for an upload. `Ok(None)` means the user canceled.
pub trait ImagePicker {
    fn pick(&self, extensions: &[&str]) -> Result<Option<PathBuf>>;
}

/// Picker that hands back a path chosen up front (CLI argument, drag and drop).
#[derive(Debug, Clone, Default)]
pub struct PathPicker(pub Option<PathBuf>);

impl ImagePicker for PathPicker {
    fn pick(&self, _extensions: &[&str]) -> Result<Option<PathBuf>> {
        Ok(self.0.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSelection {
    Canceled,
    Selected { reference: String, file_name: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageDeletion {
    Removed,
    /// The backing file was already gone.
    Missing,
}

pub trait ImageStore {
    fn select(&self, picker: &dyn ImagePicker) -> Result<ImageSelection>;

    fn delete(&self, reference: &str) -> Result<ImageDeletion>;

    /// Whether `reference` points into this store.
    fn owns(&self, reference: &str) -> bool;

    /// Backing file for a reference, if it exists.
    fn resolve(&self, reference: &str) -> Option<PathBuf>;

}

impl<T: ImageStore + ?Sized> ImageStore for Box<T> {
    fn select(&self, picker: &dyn ImagePicker) -> Result<ImageSelection> {
        (**self).select(picker)
    }

    fn delete(&self, reference: &str) -> Result<ImageDeletion> {
        (**self).delete(reference)
    }

    fn owns(&self, reference: &str) -> bool {
        (**self).owns(reference)
    }

    fn resolve(&self, reference: &str) -> Option<PathBuf> {
        (**self).resolve(reference)
    }
}

/// Images copied into a directory on disk.
pub struct FsImageStore {
    dir: PathBuf,
    scheme: ReferenceScheme,
}

impl FsImageStore {
    pub fn new(dir: impl Into<PathBuf>, scheme: ReferenceScheme) -> Self {
        Self {
            dir: dir.into(),
            scheme,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn unique_name(&self, original: &str) -> String {
        let original = safe_name(original);
        let stamp = Utc::now().timestamp_millis();
        let mut candidate = format!("{}-{}", stamp, original);
        let mut counter = 1;
        while self.dir.join(&candidate).exists() {
            candidate = format!("{}-{}-{}", stamp, counter, original);
            counter += 1;
        }
        candidate
    }
}

impl ImageStore for FsImageStore {
    fn select(&self, picker: &dyn ImagePicker) -> Result<ImageSelection> {
        let Some(source) = picker.pick(IMAGE_EXTENSIONS)? else {
            tracing::debug!("image selection canceled");
            return Ok(ImageSelection::Canceled);
        };

        if !is_supported_image(&source) {
            return Err(QuireError::UnsupportedImage(source.display().to_string()));
        }
        let original = source
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| QuireError::UnsupportedImage(source.display().to_string()))?;

        if !self.dir.exists() {
            fs::create_dir_all(&self.dir).map_err(QuireError::Io)?;
        }
        let file_name = self.unique_name(original);
        fs::copy(&source, self.dir.join(&file_name)).map_err(QuireError::Io)?;

        let reference = self.scheme.reference_for(&file_name);
        tracing::debug!(%reference, source = %source.display(), "image stored");
        Ok(ImageSelection::Selected {
            reference,
            file_name,
        })
    }

    fn delete(&self, reference: &str) -> Result<ImageDeletion> {
        let name = file_name_of(reference)
            .ok_or_else(|| QuireError::NotFound(format!("not a stored image: {}", reference)))?;
        let path = self.dir.join(name);
        if !path.exists() {
            tracing::warn!(%reference, "image file already missing");
            return Ok(ImageDeletion::Missing);
        }
        fs::remove_file(&path).map_err(QuireError::Io)?;
        tracing::debug!(%reference, "image deleted");
        Ok(ImageDeletion::Removed)
    }

    fn owns(&self, reference: &str) -> bool {
        file_name_of(reference).is_some()
    }

    fn resolve(&self, reference: &str) -> Option<PathBuf> {
        let path = self.dir.join(file_name_of(reference)?);
        path.is_file().then_some(path)
    }
}

/// Characters that would break a path or surrounding markup become `_`.
fn safe_name(original: &str) -> String {
    original
        .chars()
        .map(|c| {
            if c.is_control() || matches!(c, '/' | '\\' | '<' | '>' | '"' | '\'') {
                '_'
            } else {
                c
            }
        })
        .collect()
}

/// Image store for runtimes without file access.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableImages;

const UNAVAILABLE: &str = "image operations are not available in fallback mode";

impl ImageStore for UnavailableImages {
    fn select(&self, _picker: &dyn ImagePicker) -> Result<ImageSelection> {
        Err(QuireError::Unavailable(UNAVAILABLE.to_string()))
    }

    fn delete(&self, _reference: &str) -> Result<ImageDeletion> {
        Err(QuireError::Unavailable(UNAVAILABLE.to_string()))
    }

    fn owns(&self, _reference: &str) -> bool {
        false
    }

    fn resolve(&self, _reference: &str) -> Option<PathBuf> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn source_image(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, b"\x89PNG fake").unwrap();
        path
    }

    #[test]
    fn select_copies_file_and_returns_reference() {
        let tmp = TempDir::new().unwrap();
        let store = FsImageStore::new(tmp.path().join("images"), ReferenceScheme::Public);
        let src = source_image(tmp.path(), "cat.png");

        let selection = store.select(&PathPicker(Some(src))).unwrap();
        let ImageSelection::Selected {
            reference,
            file_name,
        } = selection
        else {
            panic!("expected a selection");
        };
        assert!(file_name.ends_with("-cat.png"));
        assert_eq!(reference, format!("/images/{}", file_name));
        assert!(store.dir().join(&file_name).exists());
        assert_eq!(store.resolve(&reference), Some(store.dir().join(&file_name)));
    }

    #[test]
    fn same_file_twice_gets_distinct_names() {
        let tmp = TempDir::new().unwrap();
        let store = FsImageStore::new(tmp.path().join("images"), ReferenceScheme::Custom);
        let src = source_image(tmp.path(), "dog.jpg");

        let first = store.select(&PathPicker(Some(src.clone()))).unwrap();
        let second = store.select(&PathPicker(Some(src))).unwrap();
        assert_ne!(first, second);
        if let ImageSelection::Selected { reference, .. } = first {
            assert!(reference.starts_with("quire-image://"));
        }
    }

    #[test]
    fn cancel_is_not_an_error() {
        let tmp = TempDir::new().unwrap();
        let store = FsImageStore::new(tmp.path(), ReferenceScheme::Public);
        assert_eq!(
            store.select(&PathPicker(None)).unwrap(),
            ImageSelection::Canceled
        );
    }

    #[test]
    fn rejects_non_image_files() {
        let tmp = TempDir::new().unwrap();
        let store = FsImageStore::new(tmp.path().join("images"), ReferenceScheme::Public);
        let src = source_image(tmp.path(), "notes.txt");
        assert!(matches!(
            store.select(&PathPicker(Some(src))),
            Err(QuireError::UnsupportedImage(_))
        ));
    }

    #[test]
    fn delete_removes_then_reports_missing() {
        let tmp = TempDir::new().unwrap();
        let store = FsImageStore::new(tmp.path().join("images"), ReferenceScheme::Public);
        let src = source_image(tmp.path(), "a.gif");
        let ImageSelection::Selected { reference, .. } =
            store.select(&PathPicker(Some(src))).unwrap()
        else {
            panic!("expected a selection");
        };

        assert_eq!(store.delete(&reference).unwrap(), ImageDeletion::Removed);
        assert_eq!(store.delete(&reference).unwrap(), ImageDeletion::Missing);
    }

    #[test]
    fn foreign_references_are_not_owned() {
        let store = FsImageStore::new("/tmp/none", ReferenceScheme::Public);
        assert!(store.owns("/images/1-a.png"));
        assert!(store.owns("quire-image://1-a.png"));
        assert!(!store.owns("https://example.com/a.png"));
        assert!(!store.owns("/images/../secret.png"));
        assert!(!store.owns("/images/"));
        assert!(matches!(
            store.delete("https://example.com/a.png"),
            Err(QuireError::NotFound(_))
        ));
    }

    #[test]
    fn unavailable_store_reports_unavailable() {
        let store = UnavailableImages;
        assert!(matches!(
            store.select(&PathPicker(None)),
            Err(QuireError::Unavailable(_))
        ));
        assert!(matches!(
            store.delete("/images/x.png"),
            Err(QuireError::Unavailable(_))
        ));
        assert!(!store.owns("/images/x.png"));
    }

    #[test]
    fn stored_names_drop_separators_and_quotes() {
        assert_eq!(safe_name("a(b)&c.png"), "a(b)&c.png");
        assert_eq!(safe_name("a\\b<c>\"d'.png"), "a_b_c__d_.png");
        assert_eq!(safe_name("line\nbreak.png"), "line_break.png");
    }

    #[test]
    fn content_types_follow_extension() {
        assert_eq!(content_type(Path::new("a.JPG")), "image/jpeg");
        assert_eq!(content_type(Path::new("a.webp")), "image/webp");
        assert_eq!(content_type(Path::new("a.bin")), "application/octet-stream");
    }
}
