//! Structured results and user-facing messages.
//!
//! Every facade operation returns a [`CmdResult`]: the data it touched plus
//! the messages a client should show. Clients decide how messages look; the
//! library never prints.

use crate::error::{ErrorKind, QuireError};
use crate::model::{Post, Snippet};
use crate::settings::Settings;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CmdMessage {
    pub level: MessageLevel,
    pub content: String,
}

impl CmdMessage {
    pub fn info(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Info,
            content: content.into(),
        }
    }

    pub fn success(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Success,
            content: content.into(),
        }
    }

    pub fn warning(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Warning,
            content: content.into(),
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Error,
            content: content.into(),
        }
    }
}

#[derive(Debug, Default)]
pub struct CmdResult {
    pub posts: Vec<Post>,
    pub snippets: Vec<Snippet>,
    pub tags: Vec<(String, usize)>,
    pub settings: Option<Settings>,
    pub paths: Vec<PathBuf>,
    pub messages: Vec<CmdMessage>,
}

impl CmdResult {
    pub fn add_message(&mut self, message: CmdMessage) {
        self.messages.push(message);
    }

    pub fn with_message(mut self, message: CmdMessage) -> Self {
        self.messages.push(message);
        self
    }

    pub fn with_posts(mut self, posts: Vec<Post>) -> Self {
        self.posts = posts;
        self
    }

    pub fn with_snippets(mut self, snippets: Vec<Snippet>) -> Self {
        self.snippets = snippets;
        self
    }

    pub fn with_tags(mut self, tags: Vec<(String, usize)>) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = Some(settings);
        self
    }

    pub fn with_paths(mut self, paths: Vec<PathBuf>) -> Self {
        self.paths = paths;
        self
    }
}

/// The single message shown for a failed operation.
pub fn message_for(err: &QuireError) -> CmdMessage {
    match err {
        QuireError::PartialBulkFailure { deleted, failures } => {
            let mut text = format!(
                "Deleted {} post(s); {} could not be deleted:",
                deleted.len(),
                failures.len()
            );
            for failure in failures {
                text.push_str(&format!("\n  {}: {}", failure.id, failure.reason));
            }
            CmdMessage::error(text)
        }
        other => match other.kind() {
            ErrorKind::NotFound => CmdMessage::error(format!("Nothing found: {}", other)),
            ErrorKind::Unavailable => CmdMessage::warning(other.to_string()),
            _ => CmdMessage::error(other.to_string()),
        },
    }
}
