//! Markdown import.
//!
//! Reads `.md` / `.markdown` files (directories are walked one level deep)
//! and creates a post per file. Files written by [`crate::export`] keep their
//! title, status and tags through the front matter block. Otherwise the title
//! comes from the first ATX heading, falling back to the file stem.

use crate::error::{QuireError, Result};
use crate::export::FrontMatter;
use crate::images::ImageStore;
use crate::manager::PostManager;
use crate::model::{NewPost, Post};
use crate::store::StorageBackend;
use std::fs;
use std::path::{Path, PathBuf};

pub const MARKDOWN_EXTENSIONS: &[&str] = &["md", "markdown"];

#[derive(Debug, Default)]
pub struct ImportReport {
    pub imported: Vec<(PathBuf, Post)>,
    /// Paths that are not Markdown files, or do not exist.
    pub skipped: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, String)>,
}

pub fn run<B, I>(manager: &mut PostManager<B, I>, paths: &[PathBuf]) -> Result<ImportReport>
where
    B: StorageBackend<Post>,
    I: ImageStore,
{
    let mut report = ImportReport::default();

    for path in paths {
        if path.is_dir() {
            let mut entries: Vec<PathBuf> = fs::read_dir(path)
                .map_err(QuireError::Io)?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| p.is_file())
                .collect();
            entries.sort();
            for file in entries {
                import_path(manager, &file, &mut report);
            }
        } else {
            import_path(manager, path, &mut report);
        }
    }

    tracing::debug!(
        imported = report.imported.len(),
        skipped = report.skipped.len(),
        failed = report.failed.len(),
        "import finished"
    );
    Ok(report)
}

fn import_path<B, I>(manager: &mut PostManager<B, I>, path: &Path, report: &mut ImportReport)
where
    B: StorageBackend<Post>,
    I: ImageStore,
{
    if !path.is_file() || !is_markdown(path) {
        report.skipped.push(path.to_path_buf());
        return;
    }

    let outcome = fs::read_to_string(path)
        .map_err(QuireError::Io)
        .and_then(|text| parse_markdown(&text, &file_stem(path)))
        .and_then(|new| manager.create(new));

    match outcome {
        Ok(post) => report.imported.push((path.to_path_buf(), post)),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "import failed");
            report.failed.push((path.to_path_buf(), e.to_string()));
        }
    }
}

pub fn is_markdown(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| MARKDOWN_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Builds creation input from a Markdown document.
pub fn parse_markdown(text: &str, fallback_title: &str) -> Result<NewPost> {
    let (front, body) = split_front_matter(text)?;
    let front = front.unwrap_or_default();

    let title = front
        .title
        .filter(|t| !t.trim().is_empty())
        .or_else(|| first_heading(body))
        .unwrap_or_else(|| fallback_title.to_string());

    Ok(NewPost {
        title,
        content: body.to_string(),
        tags: front.tags,
        status: front.status,
        ..Default::default()
    })
}

fn split_front_matter(text: &str) -> Result<(Option<FrontMatter>, &str)> {
    let Some(rest) = text
        .strip_prefix("---\n")
        .or_else(|| text.strip_prefix("---\r\n"))
    else {
        return Ok((None, text));
    };

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == "---" {
            let yaml = &rest[..offset];
            let body = rest[offset + line.len()..].trim_start_matches(['\n', '\r']);
            let front: FrontMatter = if yaml.trim().is_empty() {
                FrontMatter::default()
            } else {
                serde_yaml::from_str(yaml)?
            };
            return Ok((Some(front), body));
        }
        offset += line.len();
    }

    // No closing fence: treat the whole thing as content.
    Ok((None, text))
}

fn first_heading(body: &str) -> Option<String> {
    let mut in_fence = false;
    for line in body.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            continue;
        }
        let hashes = trimmed.chars().take_while(|c| *c == '#').count();
        if (1..=6).contains(&hashes) {
            let rest = &trimmed[hashes..];
            if rest.is_empty() || rest.starts_with(' ') || rest.starts_with('\t') {
                let title = rest.trim().trim_end_matches('#').trim();
                if !title.is_empty() {
                    return Some(title.to_string());
                }
            }
        }
    }
    None
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "Untitled".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::to_markdown;
    use crate::images::UnavailableImages;
    use crate::model::PostStatus;
    use crate::store::mem_backend::MemBackend;
    use chrono::Utc;
    use tempfile::TempDir;

    #[test]
    fn title_from_heading() {
        let new = parse_markdown("intro\n\n## My Post ##\n\nbody", "file").unwrap();
        assert_eq!(new.title, "My Post");
        assert_eq!(new.content, "intro\n\n## My Post ##\n\nbody");
    }

    #[test]
    fn title_falls_back_to_stem() {
        let new = parse_markdown("#hashtag is not a heading\n```\n# nor this\n```", "notes").unwrap();
        assert_eq!(new.title, "notes");
    }

    #[test]
    fn front_matter_restores_metadata() {
        let post = Post::from_new(
            NewPost::new("Round trip", "![Image](/images/1-a.png)")
                .with_tags(&["a", "b"])
                .with_status(PostStatus::Published),
            Utc::now(),
        );
        let new = parse_markdown(&to_markdown(&post).unwrap(), "ignored").unwrap();

        assert_eq!(new.title, "Round trip");
        assert_eq!(new.content, post.content);
        assert_eq!(new.tags, vec!["a", "b"]);
        assert_eq!(new.status, Some(PostStatus::Published));
    }

    #[test]
    fn malformed_front_matter_is_an_error() {
        assert!(matches!(
            parse_markdown("---\ntags: [unclosed\n---\nbody", "x"),
            Err(QuireError::FrontMatter(_))
        ));
    }

    #[test]
    fn unterminated_front_matter_is_content() {
        let new = parse_markdown("---\nnot closed", "stem").unwrap();
        assert_eq!(new.content, "---\nnot closed");
        assert_eq!(new.title, "stem");
    }

    #[test]
    fn run_imports_markdown_and_skips_the_rest() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("drafts");
        fs::create_dir(&dir).unwrap();
        fs::write(dir.join("a.md"), "# Alpha\n\nbody").unwrap();
        fs::write(dir.join("b.markdown"), "no heading").unwrap();
        fs::write(dir.join("c.txt"), "ignored").unwrap();

        let mut manager = PostManager::new(MemBackend::new(), UnavailableImages);
        manager.load().unwrap();
        let report = run(&mut manager, &[dir.clone(), tmp.path().join("missing.md")]).unwrap();

        let titles: Vec<&str> = report.imported.iter().map(|(_, p)| p.title.as_str()).collect();
        assert_eq!(titles, vec!["Alpha", "b"]);
        assert_eq!(report.skipped.len(), 2);
        assert!(report.failed.is_empty());
        assert_eq!(manager.list().len(), 2);
    }
}
