//! # Post Lifecycle Manager
//!
//! [`PostManager`] is the single owner of the in-memory post collection. It
//! is created once at startup, loaded from a [`StorageBackend`], and handed
//! to whatever drives the UI. Nothing else mutates posts.
//!
//! ## Write discipline
//!
//! Every mutation builds the next version of a record, persists it, and only
//! then commits it to memory. A failed write leaves the collection exactly as
//! storage has it. Deletion follows the same rule: memory drops a post only
//! after the backend confirmed the delete.
//!
//! ## Images
//!
//! Image references are derived from content with [`references::extract`].
//! When an update changes content, references that disappeared are removed
//! from `images` and, once the record is saved, deleted from the
//! [`ImageStore`]. Deleting a post deletes every stored image it references.
//! Image deletion is best effort: failures are logged and never fail the
//! operation that triggered them.
//!
//! ## Snapshot mirror
//!
//! An optional [`CacheBackend`] receives the whole collection after every
//! mutation once loading has finished, and serves as the source of posts if
//! the primary backend cannot be listed. It is never written during the
//! initial load, so an empty in-flight collection cannot clobber it.
//!
//! ## Change notification
//!
//! Views call [`PostManager::subscribe`] and receive [`PostEvent`]s over a
//! channel. Dropped receivers are pruned on the next event.
//!
//! ## Auto-save
//!
//! [`PostManager::edit`] defers an update through [`AutoSave`]; the host
//! loop calls [`PostManager::poll_autosave`]. Background saves produce no
//! user messages. Failures are logged.

use crate::autosave::{AutoSave, PendingSave};
use crate::error::{BulkFailure, QuireError, Result};
use crate::images::{ImageDeletion, ImagePicker, ImageSelection, ImageStore};
use crate::model::{NewPost, Post, PostPatch, PostStatus};
use crate::references;
use crate::store::cache_backend::CacheBackend;
use crate::store::StorageBackend;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq)]
pub enum PostEvent {
    Loaded { count: usize, skipped: usize },
    Created(Post),
    Updated(Post),
    Deleted(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoadReport {
    pub count: usize,
    /// Stored records left out: unparsable ones and older copies of a
    /// duplicated id.
    pub skipped: usize,
    pub from_mirror: bool,
}

/// Which statuses a query returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    /// Drafts and published posts; archived posts are hidden.
    #[default]
    Active,
    Only(PostStatus),
    All,
}

impl StatusFilter {
    fn accepts(&self, status: PostStatus) -> bool {
        match self {
            StatusFilter::Active => status != PostStatus::Archived,
            StatusFilter::Only(wanted) => status == *wanted,
            StatusFilter::All => true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostFilter {
    pub status: StatusFilter,
    pub tag: Option<String>,
    pub search: Option<String>,
}

impl PostFilter {
    fn accepts(&self, post: &Post) -> bool {
        if !self.status.accepts(post.status) {
            return false;
        }
        if let Some(tag) = &self.tag {
            if !post.has_tag(tag) {
                return false;
            }
        }
        if let Some(term) = &self.search {
            let term = term.to_lowercase();
            let hit = post.title.to_lowercase().contains(&term)
                || post.content.to_lowercase().contains(&term)
                || post.tags.iter().any(|t| t.to_lowercase().contains(&term));
            if !hit {
                return false;
            }
        }
        true
    }
}

pub struct PostManager<B, I> {
    backend: B,
    images: I,
    mirror: Option<CacheBackend<Post>>,
    posts: Vec<Post>,
    loaded: bool,
    subscribers: Vec<Sender<PostEvent>>,
    autosave: Option<AutoSave>,
}

impl<B: StorageBackend<Post>, I: ImageStore> PostManager<B, I> {
    pub fn new(backend: B, images: I) -> Self {
        Self {
            backend,
            images,
            mirror: None,
            posts: Vec::new(),
            loaded: false,
            subscribers: Vec::new(),
            autosave: None,
        }
    }

    pub fn with_mirror(mut self, mirror: CacheBackend<Post>) -> Self {
        self.mirror = Some(mirror);
        self
    }

    pub fn with_autosave(mut self, delay: Duration) -> Self {
        self.autosave = Some(AutoSave::new(delay));
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn images(&self) -> &I {
        &self.images
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Populate the collection from storage. Falls back to the mirror when
    /// the primary backend cannot be listed.
    pub fn load(&mut self) -> Result<LoadReport> {
        let (listing, from_mirror) = match self.backend.list() {
            Ok(listing) => (listing, false),
            Err(primary) => match &self.mirror {
                Some(mirror) => {
                    tracing::warn!(error = %primary, "primary store unavailable, loading snapshot");
                    (mirror.list()?, true)
                }
                None => return Err(primary),
            },
        };

        let (mut posts, duplicates) = keep_newest_per_id(listing.records);
        posts.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

        let skipped = listing.skipped + duplicates;
        if skipped > 0 {
            tracing::warn!(skipped, duplicates, "some stored posts could not be read");
        }
        tracing::debug!(count = posts.len(), from_mirror, "posts loaded");

        self.posts = posts;
        self.loaded = true;
        let report = LoadReport {
            count: self.posts.len(),
            skipped,
            from_mirror,
        };
        self.notify(PostEvent::Loaded {
            count: report.count,
            skipped: report.skipped,
        });
        Ok(report)
    }

    /// Snapshot of every post, in creation order.
    pub fn list(&self) -> &[Post] {
        &self.posts
    }

    /// Posts matching `filter`, most recently updated first.
    pub fn query(&self, filter: &PostFilter) -> Vec<Post> {
        let mut posts: Vec<Post> = self
            .posts
            .iter()
            .filter(|p| filter.accepts(p))
            .cloned()
            .collect();
        posts.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        posts
    }

    /// Distinct tags across all posts with their use counts, by name.
    pub fn tags(&self) -> Vec<(String, usize)> {
        let mut counts: Vec<(String, usize)> = Vec::new();
        for tag in self.posts.iter().flat_map(|p| p.tags.iter()) {
            match counts.iter_mut().find(|(t, _)| t.eq_ignore_ascii_case(tag)) {
                Some((_, n)) => *n += 1,
                None => counts.push((tag.clone(), 1)),
            }
        }
        counts.sort_by(|a, b| a.0.to_lowercase().cmp(&b.0.to_lowercase()));
        counts
    }

    pub fn get(&self, id: &str) -> Result<&Post> {
        self.posts
            .iter()
            .find(|p| p.id == id)
            .ok_or_else(|| QuireError::NotFound(id.to_string()))
    }

    /// Resolve a full id or a unique id prefix.
    pub fn resolve(&self, key: &str) -> Result<String> {
        let key = key.trim();
        if key.is_empty() {
            return Err(QuireError::Api("empty post id".to_string()));
        }
        if self.posts.iter().any(|p| p.id == key) {
            return Ok(key.to_string());
        }
        let mut matches = self.posts.iter().filter(|p| p.id.starts_with(key));
        match (matches.next(), matches.next()) {
            (Some(post), None) => Ok(post.id.clone()),
            (Some(_), Some(_)) => Err(QuireError::Api(format!(
                "ambiguous post id '{}', use more characters",
                key
            ))),
            (None, _) => Err(QuireError::NotFound(key.to_string())),
        }
    }

    pub fn create(&mut self, new: NewPost) -> Result<Post> {
        let post = Post::from_new(new, Utc::now());
        if self.posts.iter().any(|p| p.id == post.id) {
            return Err(QuireError::InvalidRecord(format!(
                "a post with id {} already exists",
                post.id
            )));
        }
        self.backend.save(&post)?;

        tracing::debug!(id = %post.id, "post created");
        self.posts.push(post.clone());
        self.after_mutation(PostEvent::Created(post.clone()));
        Ok(post)
    }

    pub fn update(&mut self, id: &str, patch: PostPatch) -> Result<Post> {
        if let Some(timer) = self.autosave.as_mut() {
            // An explicit save supersedes a pending background save of the same post.
            timer.cancel_for(id);
        }
        self.apply_update(id, patch)
    }

    pub fn delete(&mut self, id: &str) -> Result<Post> {
        let index = self.position(id)?;
        let post = self.posts[index].clone();

        let mut owned = references::extract(&post.content);
        for reference in &post.images {
            if !owned.contains(reference) {
                owned.push(reference.clone());
            }
        }
        owned.retain(|r| self.images.owns(r));
        for reference in &owned {
            self.delete_image_best_effort(reference);
        }

        self.backend.delete(id)?;

        if let Some(timer) = self.autosave.as_mut() {
            timer.cancel_for(id);
        }
        self.posts.remove(index);
        tracing::debug!(%id, images = owned.len(), "post deleted");
        self.after_mutation(PostEvent::Deleted(id.to_string()));
        Ok(post)
    }

    /// Delete each id in order. Returns the deleted ids, or
    /// `PartialBulkFailure` naming what succeeded and what did not.
    pub fn bulk_delete<S: AsRef<str>>(&mut self, ids: &[S]) -> Result<Vec<String>> {
        let mut deleted = Vec::new();
        let mut failures = Vec::new();

        for id in ids {
            let id = id.as_ref();
            match self.delete(id) {
                Ok(_) => deleted.push(id.to_string()),
                Err(e) => {
                    tracing::warn!(%id, error = %e, "bulk delete item failed");
                    failures.push(BulkFailure {
                        id: id.to_string(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        if failures.is_empty() {
            Ok(deleted)
        } else {
            Err(QuireError::PartialBulkFailure { deleted, failures })
        }
    }

    pub fn set_status(&mut self, id: &str, status: PostStatus) -> Result<Post> {
        self.update(id, PostPatch::default().status(status))
    }

    pub fn archive(&mut self, id: &str) -> Result<Post> {
        self.set_status(id, PostStatus::Archived)
    }

    /// Unarchiving always returns a post to `draft`, whatever it was before.
    pub fn unarchive(&mut self, id: &str) -> Result<Post> {
        self.set_status(id, PostStatus::Draft)
    }

    pub fn publish(&mut self, id: &str) -> Result<Post> {
        self.set_status(id, PostStatus::Published)
    }

    pub fn unpublish(&mut self, id: &str) -> Result<Post> {
        self.set_status(id, PostStatus::Draft)
    }

    /// Copy a picked image into the store and append it to the post.
    /// Returns `None` when the picker was canceled.
    pub fn attach_image(
        &mut self,
        id: &str,
        picker: &dyn ImagePicker,
    ) -> Result<Option<(Post, String)>> {
        let post = self.get(id)?;
        let mut content = post.content.clone();
        let mut images = post.images.clone();

        let reference = match self.images.select(picker)? {
            ImageSelection::Canceled => return Ok(None),
            ImageSelection::Selected { reference, .. } => reference,
        };

        if !content.is_empty() && !content.ends_with('\n') {
            content.push('\n');
        }
        content.push('\n');
        content.push_str(&references::markdown_image("Image", &reference));
        content.push('\n');
        images.push(reference.clone());

        let patch = PostPatch::default().content(content).images(images);
        match self.update(id, patch) {
            Ok(post) => Ok(Some((post, reference))),
            Err(e) => {
                // The copy is useless if the post could not record it.
                self.delete_image_best_effort(&reference);
                Err(e)
            }
        }
    }

    /// Delete a stored image directly. Posts referencing it are left as-is.
    pub fn delete_image(&self, reference: &str) -> Result<ImageDeletion> {
        self.images.delete(reference)
    }

    pub fn subscribe(&mut self) -> Receiver<PostEvent> {
        let (tx, rx) = channel();
        self.subscribers.push(tx);
        rx
    }

    pub fn autosave_enabled(&self) -> bool {
        self.autosave.is_some()
    }

    /// Record an in-progress edit. With auto-save on, the update is deferred
    /// until the delay passes without another edit; otherwise it is applied
    /// immediately.
    pub fn edit(&mut self, id: &str, patch: PostPatch, now: Instant) -> Result<()> {
        self.position(id)?;
        let Some(timer) = self.autosave.as_mut() else {
            self.apply_update(id, patch)?;
            return Ok(());
        };
        if let Some(displaced) = timer.schedule(id, patch, now) {
            // Failures are logged by the background runner.
            let _ = self.run_background(displaced);
        }
        Ok(())
    }

    /// Run the pending background save if it is due. Returns the outcome of
    /// the save that ran, if any.
    pub fn poll_autosave(&mut self, now: Instant) -> Option<Result<Post>> {
        let pending = self.autosave.as_mut()?.take_due(now)?;
        Some(self.run_background(pending))
    }

    /// Run the pending background save now, due or not.
    pub fn flush_autosave(&mut self) -> Option<Result<Post>> {
        let pending = self.autosave.as_mut()?.take()?;
        Some(self.run_background(pending))
    }

    pub fn autosave_due_at(&self) -> Option<Instant> {
        self.autosave.as_ref().and_then(AutoSave::due_at)
    }

    fn run_background(&mut self, pending: PendingSave) -> Result<Post> {
        let result = self.apply_update(&pending.post_id, pending.patch);
        match &result {
            Ok(_) => tracing::debug!(id = %pending.post_id, "auto-saved"),
            Err(e) => tracing::warn!(id = %pending.post_id, error = %e, "auto-save failed"),
        }
        result
    }

    fn apply_update(&mut self, id: &str, patch: PostPatch) -> Result<Post> {
        let index = self.position(id)?;
        let current = &self.posts[index];

        let mut next = current.clone();
        patch.apply_to(&mut next);
        let removed = if next.content != current.content {
            self.reconcile_images(current, &mut next)
        } else {
            Vec::new()
        };
        next.touch(Utc::now());

        self.backend.save(&next)?;

        for reference in &removed {
            self.delete_image_best_effort(reference);
        }
        self.posts[index] = next.clone();
        tracing::debug!(%id, removed_images = removed.len(), "post updated");
        self.after_mutation(PostEvent::Updated(next.clone()));
        Ok(next)
    }

    /// Drop stored images that `next.content` no longer references from
    /// `next.images`, and track newly referenced ones. Returns the dropped
    /// references, which the caller deletes after persisting.
    fn reconcile_images(&self, previous: &Post, next: &mut Post) -> Vec<String> {
        let current_refs = references::extract(&next.content);

        let mut known = references::extract(&previous.content);
        for reference in previous.images.iter().chain(next.images.iter()) {
            if !known.contains(reference) {
                known.push(reference.clone());
            }
        }

        let removed: Vec<String> = known
            .into_iter()
            .filter(|r| self.images.owns(r) && !current_refs.contains(r))
            .collect();

        next.images.retain(|r| !removed.contains(r));
        for reference in current_refs {
            if self.images.owns(&reference) && !next.images.contains(&reference) {
                next.images.push(reference);
            }
        }
        removed
    }

    fn delete_image_best_effort(&self, reference: &str) {
        if let Err(e) = self.images.delete(reference) {
            tracing::warn!(%reference, error = %e, "could not delete image");
        }
    }

    fn position(&self, id: &str) -> Result<usize> {
        self.posts
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| QuireError::NotFound(id.to_string()))
    }

    fn after_mutation(&mut self, event: PostEvent) {
        if self.loaded {
            if let Some(mirror) = &self.mirror {
                if let Err(e) = mirror.replace_all(&self.posts) {
                    tracing::warn!(error = %e, "could not refresh post snapshot");
                }
            }
        }
        self.notify(event);
    }

    fn notify(&mut self, event: PostEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

/// One record per id, the most recently updated copy winning. Returns the
/// survivors in their original order and the number of dropped copies.
fn keep_newest_per_id(records: Vec<Post>) -> (Vec<Post>, usize) {
    let mut by_id: HashMap<String, usize> = HashMap::new();
    let mut kept: Vec<Post> = Vec::with_capacity(records.len());
    let mut duplicates = 0;

    for post in records {
        match by_id.get(&post.id) {
            Some(&index) => {
                duplicates += 1;
                tracing::warn!(id = %post.id, "duplicate stored post, keeping the newest copy");
                if post.updated_at > kept[index].updated_at {
                    kept[index] = post;
                }
            }
            None => {
                by_id.insert(post.id.clone(), kept.len());
                kept.push(post);
            }
        }
    }
    (kept, duplicates)
}
