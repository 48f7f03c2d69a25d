use super::Record;
use crate::error::Result;

/// Result of reading a whole collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Listing<R> {
    pub records: Vec<R>,
    /// Records present in storage that could not be parsed.
    pub skipped: usize,
}

impl<R> Default for Listing<R> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            skipped: 0,
        }
    }
}

/// Abstract interface for record I/O.
///
/// All methods take `&self`; backends needing mutation use interior
/// mutability, since quire runs on a single thread.
pub trait StorageBackend<R: Record> {
    /// Read every record. Unparsable records are skipped and counted.
    fn list(&self) -> Result<Listing<R>>;

    /// Write the whole record, replacing any previous version.
    fn save(&self, record: &R) -> Result<()>;

    /// Remove a record. Unknown ids are `NotFound`.
    fn delete(&self, id: &str) -> Result<()>;
}

impl<R: Record, B: StorageBackend<R> + ?Sized> StorageBackend<R> for Box<B> {
    fn list(&self) -> Result<Listing<R>> {
        (**self).list()
    }

    fn save(&self, record: &R) -> Result<()> {
        (**self).save(record)
    }

    fn delete(&self, id: &str) -> Result<()> {
        (**self).delete(id)
    }
}
