//! # Domain Model
//!
//! The records quire persists: [`Post`] (a Markdown draft) and [`Snippet`]
//! (a reusable block of markup), plus the input shapes used to create and
//! modify posts ([`NewPost`], [`PostPatch`]).
//!
//! ## On-disk shape
//!
//! Records serialize as camelCase JSON, one document per record:
//!
//! ```text
//! {
//!   "id": "5b0c…",
//!   "title": "Hello",
//!   "content": "![Image](/images/1712345678901-cat.png)",
//!   "tags": ["rust", "notes"],
//!   "images": ["/images/1712345678901-cat.png"],
//!   "status": "draft",
//!   "createdAt": "2024-04-05T10:00:00Z",
//!   "updatedAt": "2024-04-05T10:00:00Z"
//! }
//! ```
//!
//! Missing optional fields take their defaults and unknown fields are ignored,
//! so documents written by older builds still load.
//!
//! ## Timestamps
//!
//! `createdAt` is set once. `updatedAt` moves forward on every persisted
//! mutation; [`Post::touch`] guarantees it strictly increases even when two
//! writes land within the clock's resolution.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::QuireError;
use crate::store::Record;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    #[default]
    Draft,
    Published,
    Archived,
}

impl fmt::Display for PostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PostStatus::Draft => "draft",
            PostStatus::Published => "published",
            PostStatus::Archived => "archived",
        };
        f.write_str(label)
    }
}

impl FromStr for PostStatus {
    type Err = QuireError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "draft" => Ok(PostStatus::Draft),
            "published" => Ok(PostStatus::Published),
            "archived" => Ok(PostStatus::Archived),
            other => Err(QuireError::Api(format!("Unknown status: {}", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub status: PostStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Post {
    /// Builds a fresh record from creation input, filling every default.
    pub fn from_new(new: NewPost, now: DateTime<Utc>) -> Self {
        let id = new
            .id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(generate_id);
        Self {
            id,
            title: new.title,
            content: new.content,
            tags: normalize_tags(&new.tags),
            images: dedup(new.images),
            status: new.status.unwrap_or_default(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Advances `updated_at`, never letting it stand still or go backwards.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = if now > self.updated_at {
            now
        } else {
            self.updated_at + Duration::milliseconds(1)
        };
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag.trim()))
    }

    /// Short id used in listings.
    pub fn short_id(&self) -> &str {
        let end = self
            .id
            .char_indices()
            .nth(8)
            .map(|(i, _)| i)
            .unwrap_or(self.id.len());
        &self.id[..end]
    }
}

impl Record for Post {
    const KIND: &'static str = "posts";

    fn id(&self) -> &str {
        &self.id
    }
}

/// Input for creating a post. Anything left out takes the post defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewPost {
    pub id: Option<String>,
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    pub images: Vec<String>,
    pub status: Option<PostStatus>,
}

impl NewPost {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            ..Default::default()
        }
    }

    pub fn with_tags<S: AsRef<str>>(mut self, tags: &[S]) -> Self {
        self.tags = tags.iter().map(|t| t.as_ref().to_string()).collect();
        self
    }

    pub fn with_status(mut self, status: PostStatus) -> Self {
        self.status = Some(status);
        self
    }
}

/// A partial update. `None` fields leave the stored value alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostPatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
    pub images: Option<Vec<String>>,
    pub status: Option<PostStatus>,
}

impl PostPatch {
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn tags<S: AsRef<str>>(mut self, tags: &[S]) -> Self {
        self.tags = Some(tags.iter().map(|t| t.as_ref().to_string()).collect());
        self
    }

    pub fn images(mut self, images: Vec<String>) -> Self {
        self.images = Some(images);
        self
    }

    pub fn status(mut self, status: PostStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.content.is_none()
            && self.tags.is_none()
            && self.images.is_none()
            && self.status.is_none()
    }

    /// Folds a later patch over this one; the later value wins field by field.
    pub fn merge(&mut self, later: PostPatch) {
        if later.title.is_some() {
            self.title = later.title;
        }
        if later.content.is_some() {
            self.content = later.content;
        }
        if later.tags.is_some() {
            self.tags = later.tags;
        }
        if later.images.is_some() {
            self.images = later.images;
        }
        if later.status.is_some() {
            self.status = later.status;
        }
    }

    pub fn apply_to(&self, post: &mut Post) {
        if let Some(title) = &self.title {
            post.title = title.clone();
        }
        if let Some(content) = &self.content {
            post.content = content.clone();
        }
        if let Some(tags) = &self.tags {
            post.tags = normalize_tags(tags);
        }
        if let Some(images) = &self.images {
            post.images = dedup(images.clone());
        }
        if let Some(status) = self.status {
            post.status = status;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snippet {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Record for Snippet {
    const KIND: &'static str = "snippets";

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewSnippet {
    pub name: String,
    pub content: String,
    pub icon: Option<String>,
}

impl NewSnippet {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
            icon: None,
        }
    }
}

pub fn generate_id() -> String {
    Uuid::new_v4().to_string()
}

/// Trims tags, drops empty ones and suppresses duplicates, keeping first-seen
/// order. Tags that differ only in ASCII case are duplicates; the first
/// spelling wins.
pub fn normalize_tags<S: AsRef<str>>(tags: &[S]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.as_ref().trim();
        if tag.is_empty() || out.iter().any(|t| t.eq_ignore_ascii_case(tag)) {
            continue;
        }
        out.push(tag.to_string());
    }
    out
}

fn dedup(items: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(items.len());
    for item in items {
        if !out.contains(&item) {
            out.push(item);
        }
    }
    out
}
