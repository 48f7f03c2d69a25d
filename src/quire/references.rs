//! Image reference extraction.
//!
//! Post content can embed images two ways:
//!
//! - Markdown: `![alt](/images/1712345678901-cat.png "title")`
//! - Raw markup: `<img src="/images/1712345678901-cat.png" alt="cat">`
//!
//! [`extract`] returns every reference in document order with duplicates
//! removed. It is pure; the lifecycle manager calls it when content is saved
//! and when a post is deleted. Images written inside code blocks or code
//! spans are not references.

use once_cell::sync::Lazy;
use pulldown_cmark::{Event, Options, Parser, Tag};
use regex::Regex;

static IMG_SRC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<img\b[^>]*?\bsrc\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#)
        .expect("img src pattern is valid")
});

pub fn extract(content: &str) -> Vec<String> {
    let mut refs: Vec<String> = Vec::new();
    let mut html = String::new();

    let options = Options::ENABLE_TABLES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_FOOTNOTES;
    for event in Parser::new_ext(content, options) {
        match event {
            Event::Html(text) | Event::InlineHtml(text) => html.push_str(&text),
            other => {
                flush_html(&mut html, &mut refs);
                if let Event::Start(Tag::Image { dest_url, .. }) = other {
                    push_unique(&mut refs, &dest_url);
                }
            }
        }
    }
    flush_html(&mut html, &mut refs);
    refs
}

/// Markdown snippet embedding `reference` so that [`extract`] reads back the
/// exact same string.
///
/// Plain references are written as-is. Any other reference goes into the
/// `<...>` destination form with `\`, `<`, `>` and `&` backslash-escaped, so
/// parentheses survive and entities are never decoded.
pub fn markdown_image(alt: &str, reference: &str) -> String {
    if !reference.chars().any(needs_escape) {
        return format!("![{}]({})", alt, reference);
    }
    let mut dest = String::with_capacity(reference.len() + 8);
    for c in reference.chars() {
        if matches!(c, '\\' | '<' | '>' | '&') {
            dest.push('\\');
        }
        dest.push(c);
    }
    format!("![{}](<{}>)", alt, dest)
}

fn needs_escape(c: char) -> bool {
    c.is_whitespace() || c.is_control() || matches!(c, '(' | ')' | '<' | '>' | '\\' | '&')
}

fn flush_html(html: &mut String, refs: &mut Vec<String>) {
    if html.is_empty() {
        return;
    }
    for caps in IMG_SRC.captures_iter(html) {
        if let Some(src) = caps.get(1).or_else(|| caps.get(2)).or_else(|| caps.get(3)) {
            push_unique(refs, src.as_str());
        }
    }
    html.clear();
}

fn push_unique(refs: &mut Vec<String>, reference: &str) {
    let reference = reference.trim();
    if !reference.is_empty() && !refs.iter().any(|r| r == reference) {
        refs.push(reference.to_string());
    }
}
