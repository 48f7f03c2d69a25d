use super::backend::{Listing, StorageBackend};
use super::{validate_id, Record};
use crate::error::{QuireError, Result};
use serde_json::{Map, Value};
use std::fs;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Whole-collection store: every record of one kind lives in a single JSON
/// array under the key `R::KIND` of a shared cache document.
pub struct CacheBackend<R> {
    file: PathBuf,
    _record: PhantomData<R>,
}

impl<R: Record> CacheBackend<R> {
    pub fn new(file: impl Into<PathBuf>) -> Self {
        Self {
            file: file.into(),
            _record: PhantomData,
        }
    }

    pub fn file(&self) -> &Path {
        &self.file
    }

    /// Overwrite the stored array with `records`.
    pub fn replace_all(&self, records: &[R]) -> Result<()> {
        let values = records
            .iter()
            .map(serde_json::to_value)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(QuireError::Serialization)?;
        self.write_array(values)
    }

    fn load_document(&self) -> Result<Map<String, Value>> {
        if !self.file.exists() {
            return Ok(Map::new());
        }
        let text = fs::read_to_string(&self.file).map_err(QuireError::Io)?;
        if text.trim().is_empty() {
            return Ok(Map::new());
        }
        match serde_json::from_str::<Value>(&text).map_err(QuireError::Serialization)? {
            Value::Object(map) => Ok(map),
            _ => Err(QuireError::Store(format!(
                "cache document {} is not a JSON object",
                self.file.display()
            ))),
        }
    }

    fn load_array(&self) -> Result<Vec<Value>> {
        match self.load_document()?.remove(R::KIND) {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Array(items)) => Ok(items),
            Some(_) => Err(QuireError::Store(format!(
                "cache key {:?} does not hold an array",
                R::KIND
            ))),
        }
    }

    fn write_array(&self, items: Vec<Value>) -> Result<()> {
        let mut document = self.load_document()?;
        document.insert(R::KIND.to_string(), Value::Array(items));

        let dir = self
            .file
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        if !dir.exists() {
            fs::create_dir_all(&dir).map_err(QuireError::Io)?;
        }

        let content =
            serde_json::to_string(&Value::Object(document)).map_err(QuireError::Serialization)?;
        let tmp_path = dir.join(format!(".cache-{}.tmp", Uuid::new_v4()));
        fs::write(&tmp_path, content).map_err(QuireError::Io)?;
        fs::rename(&tmp_path, &self.file).map_err(QuireError::Io)?;
        Ok(())
    }
}

fn id_of(value: &Value) -> Option<&str> {
    value.get("id").and_then(Value::as_str)
}

impl<R: Record> StorageBackend<R> for CacheBackend<R> {
    fn list(&self) -> Result<Listing<R>> {
        let mut listing = Listing::default();
        for value in self.load_array()? {
            match serde_json::from_value::<R>(value) {
                Ok(record) if !record.id().trim().is_empty() => listing.records.push(record),
                Ok(_) => {
                    tracing::warn!(kind = R::KIND, "cached record without id skipped");
                    listing.skipped += 1;
                }
                Err(e) => {
                    tracing::warn!(kind = R::KIND, error = %e, "corrupt cached record skipped");
                    listing.skipped += 1;
                }
            }
        }
        Ok(listing)
    }

    fn save(&self, record: &R) -> Result<()> {
        validate_id(record.id())?;
        let value = serde_json::to_value(record).map_err(QuireError::Serialization)?;

        let mut items = self.load_array()?;
        match items.iter().position(|v| id_of(v) == Some(record.id())) {
            Some(index) => items[index] = value,
            None => items.push(value),
        }
        self.write_array(items)
    }

    fn delete(&self, id: &str) -> Result<()> {
        let mut items = self.load_array()?;
        let before = items.len();
        items.retain(|v| id_of(v) != Some(id));
        if items.len() == before {
            return Err(QuireError::NotFound(id.to_string()));
        }
        self.write_array(items)
    }
}
