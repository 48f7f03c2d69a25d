use crate::error::{QuireError, Result};
use std::env;
use std::fs;
use std::path::Path;
use std::process::Command;

/// Represents a post as it appears in an editor buffer.
/// Format: title\n\ncontent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorContent {
    pub title: String,
    pub content: String,
}

impl EditorContent {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
        }
    }

    /// Formats the post for the editor buffer.
    pub fn to_buffer(&self) -> String {
        format!("{}\n\n{}", self.title, self.content)
    }

    /// Parses an editor buffer back into title and content.
    ///
    /// The first line is the title. One blank separator line is dropped; the
    /// rest is the content, with trailing newlines added by editors removed.
    /// Leading whitespace inside the content is kept so indented code survives.
    pub fn from_buffer(buffer: &str) -> Self {
        let (title, rest) = match buffer.split_once('\n') {
            Some((title, rest)) => (title, rest),
            None => (buffer, ""),
        };
        let rest = rest
            .strip_prefix("\r\n")
            .or_else(|| rest.strip_prefix('\n'))
            .unwrap_or(rest);

        Self {
            title: title.trim().to_string(),
            content: rest.trim_end_matches(['\n', '\r']).to_string(),
        }
    }
}

/// Gets the editor command from environment.
/// Checks $EDITOR, then $VISUAL, then falls back to common editors.
pub fn get_editor() -> Result<String> {
    for var in ["EDITOR", "VISUAL"] {
        if let Ok(editor) = env::var(var) {
            if !editor.trim().is_empty() {
                return Ok(editor);
            }
        }
    }

    for fallback in &["vim", "vi", "nano"] {
        if Command::new("which")
            .arg(fallback)
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
        {
            return Ok((*fallback).to_string());
        }
    }

    Err(QuireError::Api(
        "No editor found. Set $EDITOR environment variable.".to_string(),
    ))
}

/// Opens a file in the user's editor and waits for it to close.
/// Returns the contents of the file after editing.
pub fn open_in_editor<P: AsRef<Path>>(file_path: P) -> Result<String> {
    let editor = get_editor()?;
    let path = file_path.as_ref();

    // $EDITOR may carry arguments, e.g. "code --wait".
    let mut parts = editor.split_whitespace();
    let program = parts.next().unwrap_or(editor.as_str());
    let status = Command::new(program)
        .args(parts)
        .arg(path)
        .status()
        .map_err(|e| QuireError::Api(format!("Failed to launch editor '{}': {}", editor, e)))?;

    if !status.success() {
        return Err(QuireError::Api(format!(
            "Editor '{}' exited with non-zero status",
            editor
        )));
    }

    fs::read_to_string(path).map_err(QuireError::Io)
}

/// Opens an editor on `initial` and returns the edited post.
pub fn edit_content(initial: &EditorContent) -> Result<EditorContent> {
    let temp_file = env::temp_dir().join(format!("quire_edit_{}.md", std::process::id()));

    fs::write(&temp_file, initial.to_buffer()).map_err(QuireError::Io)?;
    let result = open_in_editor(&temp_file);
    let _ = fs::remove_file(&temp_file);

    Ok(EditorContent::from_buffer(&result?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_editor_content_to_buffer_with_content() {
        let ec = EditorContent::new("My Title", "Some content here.");
        assert_eq!(ec.to_buffer(), "My Title\n\nSome content here.");
    }

    #[test]
    fn test_editor_content_to_buffer_empty_content() {
        let ec = EditorContent::new("My Title", "");
        assert_eq!(ec.to_buffer(), "My Title\n\n");
    }

    #[test]
    fn test_editor_content_from_buffer_normal() {
        let ec = EditorContent::from_buffer("My Title\n\nThis is content.\nMore content.\n");
        assert_eq!(ec.title, "My Title");
        assert_eq!(ec.content, "This is content.\nMore content.");
    }

    #[test]
    fn test_editor_content_from_buffer_title_only() {
        let ec = EditorContent::from_buffer("My Title");
        assert_eq!(ec.title, "My Title");
        assert_eq!(ec.content, "");
    }

    #[test]
    fn test_editor_content_from_buffer_empty() {
        let ec = EditorContent::from_buffer("");
        assert_eq!(ec.title, "");
        assert_eq!(ec.content, "");
    }

    #[test]
    fn test_editor_content_from_buffer_no_blank_separator() {
        let ec = EditorContent::from_buffer("Title\nContent without blank");
        assert_eq!(ec.title, "Title");
        assert_eq!(ec.content, "Content without blank");
    }

    #[test]
    fn test_indented_code_is_kept() {
        let ec = EditorContent::from_buffer("T\n\n    let x = 1;\n");
        assert_eq!(ec.content, "    let x = 1;");
    }

    #[test]
    fn test_roundtrip() {
        let original = EditorContent::new("Test Title", "![Image](/images/1-a.png)\n\nmore");
        let parsed = EditorContent::from_buffer(&original.to_buffer());
        assert_eq!(original, parsed);
    }
}
