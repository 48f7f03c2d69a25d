use super::backend::{Listing, StorageBackend};
use super::{validate_id, Record};
use crate::error::{QuireError, Result};
use std::cell::{Cell, RefCell};
use std::collections::HashSet;

/// In-memory storage backend for testing.
///
/// Uses `RefCell` for interior mutability since quire is single-threaded.
/// Keeps insertion order so listings are deterministic.
pub struct MemBackend<R> {
    records: RefCell<Vec<R>>,
    skipped: Cell<usize>,
    simulate_write_error: Cell<bool>,
    simulate_list_error: Cell<bool>,
    failing_deletes: RefCell<HashSet<String>>,
}

impl<R> Default for MemBackend<R> {
    fn default() -> Self {
        Self {
            records: RefCell::new(Vec::new()),
            skipped: Cell::new(0),
            simulate_write_error: Cell::new(false),
            simulate_list_error: Cell::new(false),
            failing_deletes: RefCell::new(HashSet::new()),
        }
    }
}

impl<R: Record> MemBackend<R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<R>) -> Self {
        let backend = Self::default();
        *backend.records.borrow_mut() = records;
        backend
    }

    /// Pretend `count` stored records were unparsable.
    pub fn set_skipped(&self, count: usize) {
        self.skipped.set(count);
    }

    /// Enable write error simulation for testing error handling.
    pub fn set_simulate_write_error(&self, simulate: bool) {
        self.simulate_write_error.set(simulate);
    }

    pub fn set_simulate_list_error(&self, simulate: bool) {
        self.simulate_list_error.set(simulate);
    }

    /// Make every delete of `id` fail with a store error.
    pub fn fail_delete_of(&self, id: &str) {
        self.failing_deletes.borrow_mut().insert(id.to_string());
    }

    pub fn len(&self) -> usize {
        self.records.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.borrow().is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.records.borrow().iter().any(|r| r.id() == id)
    }
}

impl<R: Record> StorageBackend<R> for MemBackend<R> {
    fn list(&self) -> Result<Listing<R>> {
        if self.simulate_list_error.get() {
            return Err(QuireError::Store("Simulated list error".to_string()));
        }
        Ok(Listing {
            records: self.records.borrow().clone(),
            skipped: self.skipped.get(),
        })
    }

    fn save(&self, record: &R) -> Result<()> {
        validate_id(record.id())?;
        if self.simulate_write_error.get() {
            return Err(QuireError::Store("Simulated write error".to_string()));
        }
        let mut records = self.records.borrow_mut();
        match records.iter().position(|r| r.id() == record.id()) {
            Some(index) => records[index] = record.clone(),
            None => records.push(record.clone()),
        }
        Ok(())
    }

    fn delete(&self, id: &str) -> Result<()> {
        if self.failing_deletes.borrow().contains(id) {
            return Err(QuireError::Store("Simulated delete error".to_string()));
        }
        let mut records = self.records.borrow_mut();
        let before = records.len();
        records.retain(|r| r.id() != id);
        if records.len() == before {
            return Err(QuireError::NotFound(id.to_string()));
        }
        Ok(())
    }
}
