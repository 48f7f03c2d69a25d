//! Reusable blocks of markup inserted into posts from the editor.
//!
//! [`SnippetBook`] mirrors the post manager on a smaller scale: an in-memory
//! collection backed by a [`StorageBackend`], committed only after storage
//! accepts the write.

use crate::error::{QuireError, Result};
use crate::model::{generate_id, NewSnippet, Snippet};
use crate::store::StorageBackend;
use chrono::Utc;

pub struct SnippetBook<B> {
    backend: B,
    snippets: Vec<Snippet>,
}

impl<B: StorageBackend<Snippet>> SnippetBook<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            snippets: Vec::new(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Returns how many stored snippets could not be read.
    pub fn load(&mut self) -> Result<usize> {
        let listing = self.backend.list()?;
        if listing.skipped > 0 {
            tracing::warn!(skipped = listing.skipped, "some stored snippets could not be read");
        }
        self.snippets = listing.records;
        self.sort();
        Ok(listing.skipped)
    }

    /// Snippets ordered by name.
    pub fn list(&self) -> &[Snippet] {
        &self.snippets
    }

    pub fn get(&self, id: &str) -> Result<&Snippet> {
        self.snippets
            .iter()
            .find(|s| s.id == id)
            .ok_or_else(|| QuireError::NotFound(id.to_string()))
    }

    /// Finds a snippet by exact id, then by case-insensitive name.
    pub fn find(&self, key: &str) -> Result<&Snippet> {
        self.get(key).or_else(|_| {
            self.snippets
                .iter()
                .find(|s| s.name.eq_ignore_ascii_case(key.trim()))
                .ok_or_else(|| QuireError::NotFound(key.to_string()))
        })
    }

    pub fn create(&mut self, new: NewSnippet) -> Result<Snippet> {
        if new.name.trim().is_empty() {
            return Err(QuireError::InvalidRecord(
                "snippet name cannot be empty".to_string(),
            ));
        }
        let now = Utc::now();
        let snippet = Snippet {
            id: generate_id(),
            name: new.name.trim().to_string(),
            content: new.content,
            icon: new.icon,
            created_at: now,
            updated_at: now,
        };
        self.save(snippet)
    }

    /// Insert or replace a snippet by id.
    pub fn save(&mut self, mut snippet: Snippet) -> Result<Snippet> {
        if snippet.id.trim().is_empty() {
            return Err(QuireError::InvalidRecord(
                "snippet id is required".to_string(),
            ));
        }
        if let Some(existing) = self.snippets.iter().find(|s| s.id == snippet.id) {
            snippet.created_at = existing.created_at;
            snippet.updated_at = Utc::now().max(existing.updated_at);
        }
        self.backend.save(&snippet)?;

        match self.snippets.iter().position(|s| s.id == snippet.id) {
            Some(index) => self.snippets[index] = snippet.clone(),
            None => self.snippets.push(snippet.clone()),
        }
        self.sort();
        tracing::debug!(id = %snippet.id, name = %snippet.name, "snippet saved");
        Ok(snippet)
    }

    pub fn delete(&mut self, id: &str) -> Result<Snippet> {
        let index = self
            .snippets
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| QuireError::NotFound(id.to_string()))?;
        self.backend.delete(id)?;
        Ok(self.snippets.remove(index))
    }

    fn sort(&mut self) {
        self.snippets
            .sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::mem_backend::MemBackend;

    fn book() -> SnippetBook<MemBackend<Snippet>> {
        let mut book = SnippetBook::new(MemBackend::new());
        book.load().unwrap();
        book
    }

    #[test]
    fn create_lists_by_name() {
        let mut book = book();
        book.create(NewSnippet::new("zeta", "z")).unwrap();
        book.create(NewSnippet::new("Alpha", "a")).unwrap();

        let names: Vec<&str> = book.list().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Alpha", "zeta"]);
        assert_eq!(book.backend().len(), 2);
    }

    #[test]
    fn save_replaces_existing_and_keeps_created_at() {
        let mut book = book();
        let created = book.create(NewSnippet::new("sig", "-- me")).unwrap();

        let mut edited = created.clone();
        edited.content = "-- someone else".into();
        let saved = book.save(edited).unwrap();

        assert_eq!(book.list().len(), 1);
        assert_eq!(saved.created_at, created.created_at);
        assert_eq!(book.get(&created.id).unwrap().content, "-- someone else");
    }

    #[test]
    fn save_requires_id() {
        let mut book = book();
        let mut snippet = book.create(NewSnippet::new("x", "")).unwrap();
        snippet.id.clear();
        assert!(matches!(
            book.save(snippet),
            Err(QuireError::InvalidRecord(_))
        ));
    }

    #[test]
    fn empty_name_is_rejected() {
        let mut book = book();
        assert!(book.create(NewSnippet::new("  ", "x")).is_err());
    }

    #[test]
    fn failed_write_leaves_book_unchanged() {
        let mut book = book();
        book.backend().set_simulate_write_error(true);
        assert!(book.create(NewSnippet::new("x", "")).is_err());
        assert!(book.list().is_empty());
    }

    #[test]
    fn delete_and_find() {
        let mut book = book();
        let s = book.create(NewSnippet::new("Callout", "> note")).unwrap();
        assert_eq!(book.find("callout").unwrap().id, s.id);

        book.delete(&s.id).unwrap();
        assert!(book.list().is_empty());
        assert!(matches!(book.delete(&s.id), Err(QuireError::NotFound(_))));
    }
}
