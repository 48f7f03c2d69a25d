//! # API Facade
//!
//! The API layer is a **thin facade** over the lifecycle manager, the snippet
//! book and the settings document. It is the single entry point for every
//! client: the CLI today, a web-view shell or anything else tomorrow.
//!
//! ## Role and Responsibilities
//!
//! The facade:
//! - **Normalizes inputs**: user keys (full ids or unique prefixes) become ids
//! - **Dispatches** to the component that owns the data
//! - **Returns structured types**: `Result<CmdResult>` carrying data and
//!   the messages to show
//!
//! It never prints, and it holds no business logic of its own. Failures
//! come back as `Err(QuireError)`; clients turn them into a message with
//! [`crate::notify::message_for`].
//!
//! ## Explicit saves and auto-save
//!
//! Explicit operations attach a success message. Background saves driven by
//! [`QuireApi::edit_post`] / [`QuireApi::poll_autosave`] are silent.
//!
//! ## Generic Over Backends
//!
//! `QuireApi<B, I, S>` is generic over the post backend, the image store and
//! the snippet backend. Production wires boxed trait objects chosen at
//! startup (see [`crate::init`]); tests use `MemBackend`.

use crate::error::{QuireError, Result};
use crate::export;
use crate::images::{ImageDeletion, ImagePicker, ImageStore};
use crate::import;
use crate::manager::{PostEvent, PostFilter, PostManager};
use crate::model::{NewPost, NewSnippet, Post, PostPatch, PostStatus, Snippet};
use crate::notify::{CmdMessage, CmdResult};
use crate::settings::Settings;
use crate::snippets::SnippetBook;
use crate::store::StorageBackend;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Receiver;
use std::time::Instant;

pub use crate::init::{QuirePaths, StorageMode};
pub use crate::manager::StatusFilter;
pub use crate::notify::MessageLevel;

/// The main API facade for quire operations.
pub struct QuireApi<B, I, S> {
    posts: PostManager<B, I>,
    snippets: SnippetBook<S>,
    settings: Settings,
    paths: QuirePaths,
    mode: StorageMode,
}

impl<B, I, S> QuireApi<B, I, S>
where
    B: StorageBackend<Post>,
    I: ImageStore,
    S: StorageBackend<Snippet>,
{
    pub fn new(
        posts: PostManager<B, I>,
        snippets: SnippetBook<S>,
        settings: Settings,
        paths: QuirePaths,
        mode: StorageMode,
    ) -> Self {
        Self {
            posts,
            snippets,
            settings,
            paths,
            mode,
        }
    }

    /// Read posts and snippets from storage.
    pub fn load(&mut self) -> Result<CmdResult> {
        let report = self.posts.load()?;
        let skipped_snippets = self.snippets.load()?;

        let mut result = CmdResult::default();
        if report.from_mirror {
            result.add_message(CmdMessage::warning(
                "Post storage could not be read; showing the last snapshot.",
            ));
        }
        if report.skipped > 0 {
            result.add_message(CmdMessage::warning(format!(
                "{} stored post(s) could not be read and were skipped.",
                report.skipped
            )));
        }
        if skipped_snippets > 0 {
            result.add_message(CmdMessage::warning(format!(
                "{} stored snippet(s) could not be read and were skipped.",
                skipped_snippets
            )));
        }
        if self.mode == StorageMode::Cache {
            result.add_message(CmdMessage::info(
                "Running in fallback mode: posts live in the cache document and images are disabled.",
            ));
        }
        Ok(result)
    }

    pub fn list_posts(&self, filter: &PostFilter) -> Result<CmdResult> {
        Ok(CmdResult::default().with_posts(self.posts.query(filter)))
    }

    pub fn get_posts<K: AsRef<str>>(&self, keys: &[K]) -> Result<CmdResult> {
        let posts = self
            .resolve_all(keys)?
            .iter()
            .map(|id| self.posts.get(id).cloned())
            .collect::<Result<Vec<_>>>()?;
        Ok(CmdResult::default().with_posts(posts))
    }

    pub fn create_post(&mut self, new: NewPost) -> Result<CmdResult> {
        let post = self.posts.create(new)?;
        let message = CmdMessage::success(format!("Created post: {}", display_title(&post)));
        Ok(CmdResult::default()
            .with_posts(vec![post])
            .with_message(message))
    }

    pub fn update_post(&mut self, key: &str, patch: PostPatch) -> Result<CmdResult> {
        let id = self.posts.resolve(key)?;
        let post = self.posts.update(&id, patch)?;
        let message = CmdMessage::success(format!("Saved post: {}", display_title(&post)));
        Ok(CmdResult::default()
            .with_posts(vec![post])
            .with_message(message))
    }

    /// Record an in-progress edit; saved later by [`Self::poll_autosave`].
    pub fn edit_post(&mut self, key: &str, patch: PostPatch, now: Instant) -> Result<()> {
        let id = self.posts.resolve(key)?;
        self.posts.edit(&id, patch, now)
    }

    pub fn poll_autosave(&mut self, now: Instant) -> Option<Result<Post>> {
        self.posts.poll_autosave(now)
    }

    pub fn flush_autosave(&mut self) -> Option<Result<Post>> {
        self.posts.flush_autosave()
    }

    pub fn delete_posts<K: AsRef<str>>(&mut self, keys: &[K]) -> Result<CmdResult> {
        let ids = self.resolve_all(keys)?;
        let deleted = if let [id] = ids.as_slice() {
            self.posts.delete(id)?;
            ids.clone()
        } else {
            self.posts.bulk_delete(ids.as_slice())?
        };

        let mut result = CmdResult::default();
        for id in &deleted {
            result.add_message(CmdMessage::success(format!("Deleted post {}", short(id))));
        }
        Ok(result)
    }

    pub fn set_status<K: AsRef<str>>(&mut self, keys: &[K], status: PostStatus) -> Result<CmdResult> {
        let ids = self.resolve_all(keys)?;
        let mut result = CmdResult::default();
        for id in ids {
            let post = self.posts.set_status(&id, status)?;
            result.add_message(CmdMessage::success(format!(
                "{} is now {}",
                display_title(&post),
                post.status
            )));
            result.posts.push(post);
        }
        Ok(result)
    }

    pub fn archive_posts<K: AsRef<str>>(&mut self, keys: &[K]) -> Result<CmdResult> {
        self.set_status(keys, PostStatus::Archived)
    }

    pub fn unarchive_posts<K: AsRef<str>>(&mut self, keys: &[K]) -> Result<CmdResult> {
        self.set_status(keys, PostStatus::Draft)
    }

    pub fn publish_posts<K: AsRef<str>>(&mut self, keys: &[K]) -> Result<CmdResult> {
        self.set_status(keys, PostStatus::Published)
    }

    pub fn unpublish_posts<K: AsRef<str>>(&mut self, keys: &[K]) -> Result<CmdResult> {
        self.set_status(keys, PostStatus::Draft)
    }

    /// Add and remove tags on one post.
    pub fn tag_post<T: AsRef<str>>(&mut self, key: &str, add: &[T], remove: &[T]) -> Result<CmdResult> {
        let id = self.posts.resolve(key)?;
        let current = self.posts.get(&id)?;

        let mut tags: Vec<String> = current
            .tags
            .iter()
            .filter(|t| !remove.iter().any(|r| t.eq_ignore_ascii_case(r.as_ref().trim())))
            .cloned()
            .collect();
        tags.extend(add.iter().map(|t| t.as_ref().to_string()));

        let post = self.posts.update(&id, PostPatch::default().tags(&tags))?;
        let message = CmdMessage::success(format!(
            "Tags of {}: {}",
            display_title(&post),
            if post.tags.is_empty() {
                "(none)".to_string()
            } else {
                post.tags.join(", ")
            }
        ));
        Ok(CmdResult::default()
            .with_posts(vec![post])
            .with_message(message))
    }

    pub fn list_tags(&self) -> Result<CmdResult> {
        Ok(CmdResult::default().with_tags(self.posts.tags()))
    }

    pub fn attach_image(&mut self, key: &str, picker: &dyn ImagePicker) -> Result<CmdResult> {
        let id = self.posts.resolve(key)?;
        match self.posts.attach_image(&id, picker)? {
            None => Ok(CmdResult::default().with_message(CmdMessage::info("No image selected."))),
            Some((post, reference)) => Ok(CmdResult::default()
                .with_posts(vec![post])
                .with_message(CmdMessage::success(format!("Attached {}", reference)))),
        }
    }

    pub fn delete_image(&mut self, reference: &str) -> Result<CmdResult> {
        let message = match self.posts.delete_image(reference)? {
            ImageDeletion::Removed => CmdMessage::success(format!("Deleted image {}", reference)),
            ImageDeletion::Missing => {
                CmdMessage::warning(format!("Image file was already gone: {}", reference))
            }
        };
        Ok(CmdResult::default().with_message(message))
    }

    pub fn list_snippets(&self) -> Result<CmdResult> {
        Ok(CmdResult::default().with_snippets(self.snippets.list().to_vec()))
    }

    pub fn create_snippet(&mut self, new: NewSnippet) -> Result<CmdResult> {
        let snippet = self.snippets.create(new)?;
        let message = CmdMessage::success(format!("Saved snippet: {}", snippet.name));
        Ok(CmdResult::default()
            .with_snippets(vec![snippet])
            .with_message(message))
    }

    pub fn save_snippet(&mut self, snippet: Snippet) -> Result<CmdResult> {
        let snippet = self.snippets.save(snippet)?;
        let message = CmdMessage::success(format!("Saved snippet: {}", snippet.name));
        Ok(CmdResult::default()
            .with_snippets(vec![snippet])
            .with_message(message))
    }

    /// Delete a snippet by id or name.
    pub fn delete_snippet(&mut self, key: &str) -> Result<CmdResult> {
        let id = self.snippets.find(key)?.id.clone();
        let snippet = self.snippets.delete(&id)?;
        Ok(CmdResult::default()
            .with_message(CmdMessage::success(format!("Deleted snippet: {}", snippet.name))))
    }

    pub fn get_settings(&self) -> Result<CmdResult> {
        Ok(CmdResult::default().with_settings(self.settings.clone()))
    }

    pub fn get_setting(&self, key: &str) -> Result<CmdResult> {
        let value = self.settings.get(key)?;
        Ok(CmdResult::default()
            .with_settings(self.settings.clone())
            .with_message(CmdMessage::info(format!("{} = {}", key, value))))
    }

    /// Change one setting and persist the document.
    pub fn set_setting(&mut self, key: &str, value: &str) -> Result<CmdResult> {
        let mut next = self.settings.clone();
        next.set(key, value)?;
        next.save(self.paths.settings_dir())?;
        self.settings = next;

        let mut result = CmdResult::default()
            .with_settings(self.settings.clone())
            .with_message(CmdMessage::success(format!(
                "{} set to {}",
                key,
                self.settings.get(key)?
            )));
        if matches!(key, "autosave" | "autosaveDelaySecs" | "backend" | "imageScheme") {
            result.add_message(CmdMessage::info("Takes effect on next start."));
        }
        Ok(result)
    }

    /// Export the given posts, or every non-archived post, as a tarball.
    pub fn export_posts<K: AsRef<str>>(&self, keys: &[K], dest_dir: &Path) -> Result<CmdResult> {
        let posts = if keys.is_empty() {
            self.posts.query(&PostFilter::default())
        } else {
            self.get_posts(keys)?.posts
        };
        if posts.is_empty() {
            return Ok(CmdResult::default().with_message(CmdMessage::info("No posts to export.")));
        }

        let path = export::run(&posts, dest_dir)?;
        Ok(CmdResult::default()
            .with_message(CmdMessage::success(format!(
                "Exported {} post(s) to {}",
                posts.len(),
                path.display()
            )))
            .with_paths(vec![path]))
    }

    pub fn import_posts(&mut self, paths: &[PathBuf]) -> Result<CmdResult> {
        let report = import::run(&mut self.posts, paths)?;

        let mut result = CmdResult::default();
        for path in &report.skipped {
            result.add_message(CmdMessage::warning(format!("Skipped: {}", path.display())));
        }
        for (path, reason) in &report.failed {
            result.add_message(CmdMessage::error(format!(
                "Failed to import {}: {}",
                path.display(),
                reason
            )));
        }
        result.add_message(CmdMessage::success(format!(
            "Total imported: {}",
            report.imported.len()
        )));
        result.posts = report.imported.into_iter().map(|(_, post)| post).collect();
        Ok(result)
    }

    /// Storage locations, or the backing files of the given keys. A key is
    /// either a post id (prefix) or a stored image reference.
    pub fn post_paths<K: AsRef<str>>(&self, keys: &[K]) -> Result<CmdResult> {
        let mut paths = Vec::new();
        if keys.is_empty() {
            paths.push(self.paths.root.clone());
            match self.mode {
                StorageMode::Files => {
                    paths.push(self.paths.posts_dir());
                    paths.push(self.paths.snippets_dir());
                    paths.push(self.paths.images_dir());
                }
                StorageMode::Cache => paths.push(self.paths.cache_file.clone()),
            }
        } else {
            for key in keys {
                let key = key.as_ref();
                if self.posts.images().owns(key) {
                    paths.push(self.image_path(key)?);
                    continue;
                }
                let id = self.posts.resolve(key)?;
                paths.push(match self.mode {
                    StorageMode::Files => self.paths.posts_dir().join(format!("{}.json", id)),
                    StorageMode::Cache => self.paths.cache_file.clone(),
                });
            }
        }
        Ok(CmdResult::default().with_paths(paths))
    }

    /// Backing file of a stored image reference.
    pub fn image_path(&self, reference: &str) -> Result<PathBuf> {
        self.posts
            .images()
            .resolve(reference)
            .ok_or_else(|| QuireError::NotFound(reference.to_string()))
    }

    pub fn subscribe(&mut self) -> Receiver<PostEvent> {
        self.posts.subscribe()
    }

    pub fn paths(&self) -> &QuirePaths {
        &self.paths
    }

    pub fn mode(&self) -> StorageMode {
        self.mode
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn posts(&self) -> &PostManager<B, I> {
        &self.posts
    }

    fn resolve_all<K: AsRef<str>>(&self, keys: &[K]) -> Result<Vec<String>> {
        if keys.is_empty() {
            return Err(QuireError::Api("no post id given".to_string()));
        }
        let mut ids: Vec<String> = Vec::with_capacity(keys.len());
        for key in keys {
            let id = self.posts.resolve(key.as_ref())?;
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        Ok(ids)
    }
}

fn display_title(post: &Post) -> String {
    if post.title.trim().is_empty() {
        format!("(untitled {})", post.short_id())
    } else {
        post.title.clone()
    }
}

fn short(id: &str) -> &str {
    id.char_indices().nth(8).map(|(i, _)| &id[..i]).unwrap_or(id)
}
