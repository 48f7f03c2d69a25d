//! Markdown export.
//!
//! Each post becomes a standalone Markdown file with a YAML front matter
//! block. [`write_archive`] bundles them into a gzip'd tarball under a
//! `quire/` folder.

use crate::error::{QuireError, Result};
use crate::model::{Post, PostStatus};
use chrono::{DateTime, Utc};
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Metadata written above the content of an exported post.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrontMatter {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub status: Option<PostStatus>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<&Post> for FrontMatter {
    fn from(post: &Post) -> Self {
        Self {
            title: Some(post.title.clone()),
            status: Some(post.status),
            tags: post.tags.clone(),
            created_at: Some(post.created_at),
            updated_at: Some(post.updated_at),
        }
    }
}

/// Renders a post as front matter followed by its content.
pub fn to_markdown(post: &Post) -> Result<String> {
    let yaml = serde_yaml::to_string(&FrontMatter::from(post))?;
    Ok(format!("---\n{}---\n\n{}", yaml, post.content))
}

/// Writes `quire-<timestamp>.tar.gz` into `dest_dir` and returns its path.
pub fn run(posts: &[Post], dest_dir: &Path) -> Result<PathBuf> {
    if !dest_dir.exists() {
        fs::create_dir_all(dest_dir).map_err(QuireError::Io)?;
    }
    let filename = format!("quire-{}.tar.gz", Utc::now().format("%Y%m%d-%H%M%S"));
    let path = dest_dir.join(filename);
    let file = File::create(&path).map_err(QuireError::Io)?;

    write_archive(file, posts)?;
    tracing::debug!(path = %path.display(), count = posts.len(), "export written");
    Ok(path)
}

pub fn write_archive<W: Write>(writer: W, posts: &[Post]) -> Result<()> {
    let enc = GzEncoder::new(writer, Compression::default());
    let mut tar = tar::Builder::new(enc);

    for post in posts {
        let entry_name = entry_name(post);
        let content = to_markdown(post)?;

        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        header.set_mtime(post.updated_at.timestamp().max(0) as u64);
        header.set_cksum();

        tar.append_data(&mut header, entry_name, content.as_bytes())
            .map_err(QuireError::Io)?;
    }

    let enc = tar.into_inner().map_err(QuireError::Io)?;
    enc.finish().map_err(QuireError::Io)?;
    Ok(())
}

fn entry_name(post: &Post) -> String {
    let safe_title = sanitize_filename(&post.title);
    let safe_title = if safe_title.is_empty() {
        "untitled".to_string()
    } else {
        safe_title
    };
    format!("quire/{}-{}.md", safe_title, post.short_id())
}

pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_alphanumeric() || c == ' ' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect::<String>()
        .trim()
        .to_string()
}
