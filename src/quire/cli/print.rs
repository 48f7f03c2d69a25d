use chrono::{DateTime, Utc};
use colored::{ColoredString, Colorize};
use quire::api::MessageLevel;
use quire::model::{Post, PostStatus, Snippet};
use quire::notify::CmdMessage;
use quire::settings::Settings;
use std::path::PathBuf;
use timeago::Formatter;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

const LINE_WIDTH: usize = 100;
const TIME_WIDTH: usize = 14;
const STATUS_WIDTH: usize = 10;

pub(super) fn print_messages(messages: &[CmdMessage]) {
    for message in messages {
        match message.level {
            MessageLevel::Info => println!("{}", message.content.dimmed()),
            MessageLevel::Success => println!("{}", message.content.green()),
            MessageLevel::Warning => eprintln!("{}", message.content.yellow()),
            MessageLevel::Error => eprintln!("{}", message.content.red()),
        }
    }
}

pub(super) fn print_full_posts(posts: &[Post]) {
    for (i, post) in posts.iter().enumerate() {
        if i > 0 {
            println!("\n================================\n");
        }
        println!(
            "{} {} {}",
            post.short_id().yellow(),
            post.title.bold(),
            status_label(post.status)
        );
        if !post.tags.is_empty() {
            println!("{}", format_tags(&post.tags).cyan());
        }
        println!("--------------------------------");
        println!("{}", post.content);
    }
}

pub(super) fn print_posts(posts: &[Post]) {
    if posts.is_empty() {
        println!("No posts found.");
        return;
    }

    for post in posts {
        let id_str = format!("{} ", post.short_id());
        let status = format!("{:<width$}", post.status.to_string(), width = STATUS_WIDTH);
        let time_ago = format_time_ago(post.updated_at);

        let mut line = if post.title.trim().is_empty() {
            "(untitled)".to_string()
        } else {
            post.title.clone()
        };
        if !post.tags.is_empty() {
            line.push(' ');
            line.push_str(&format_tags(&post.tags));
        }

        let fixed_width = 2 + id_str.width() + STATUS_WIDTH + TIME_WIDTH;
        let available = LINE_WIDTH.saturating_sub(fixed_width);
        let line_display = truncate_to_width(&line, available);
        let padding = available.saturating_sub(line_display.width());

        println!(
            "  {}{}{}{}{}",
            id_str.yellow(),
            colorize_status(&status, post.status),
            line_display,
            " ".repeat(padding),
            time_ago.dimmed()
        );
    }
}

pub(super) fn print_tags(tags: &[(String, usize)]) {
    if tags.is_empty() {
        println!("No tags.");
        return;
    }
    let width = tags.iter().map(|(t, _)| t.width()).max().unwrap_or(0);
    for (tag, count) in tags {
        println!("  {:<width$}  {}", tag.cyan(), count.to_string().dimmed(), width = width);
    }
}

pub(super) fn print_snippets(snippets: &[Snippet]) {
    if snippets.is_empty() {
        println!("No snippets.");
        return;
    }
    for snippet in snippets {
        let icon = snippet.icon.as_deref().unwrap_or("•");
        let preview: String = snippet
            .content
            .chars()
            .take(60)
            .map(|c| if c == '\n' { ' ' } else { c })
            .collect();
        println!("  {} {}  {}", icon, snippet.name.bold(), preview.dimmed());
    }
}

pub(super) fn print_settings(settings: &Settings) {
    for (key, value) in settings.entries() {
        println!("{:<20} {}", key, value);
    }
}

pub(super) fn print_paths(paths: &[PathBuf]) {
    for path in paths {
        println!("{}", path.display());
    }
}

fn status_label(status: PostStatus) -> ColoredString {
    colorize_status(&format!("[{}]", status), status)
}

fn colorize_status(text: &str, status: PostStatus) -> ColoredString {
    match status {
        PostStatus::Draft => text.normal(),
        PostStatus::Published => text.green(),
        PostStatus::Archived => text.dimmed(),
    }
}

fn format_tags(tags: &[String]) -> String {
    tags.iter()
        .map(|t| format!("#{}", t))
        .collect::<Vec<_>>()
        .join(" ")
}

fn truncate_to_width(s: &str, max_width: usize) -> String {
    let mut result = String::new();
    let mut current_width = 0;

    for c in s.chars() {
        let c = if c == '\n' { ' ' } else { c };
        let char_width = c.width().unwrap_or(0);
        if current_width + char_width > max_width.saturating_sub(1) {
            result.push('…');
            return result;
        }
        result.push(c);
        current_width += char_width;
    }

    result
}

fn format_time_ago(timestamp: DateTime<Utc>) -> String {
    let duration = Utc::now().signed_duration_since(timestamp);

    let formatter = Formatter::new();
    let time_str = formatter.convert(duration.to_std().unwrap_or_default());

    format!("{:>width$}", time_str, width = TIME_WIDTH)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_keeps_short_text() {
        assert_eq!(truncate_to_width("hello", 20), "hello");
    }

    #[test]
    fn truncate_marks_cut_text() {
        let out = truncate_to_width("a very long title indeed", 8);
        assert!(out.ends_with('…'));
        assert!(out.width() <= 8);
    }

    #[test]
    fn tags_render_with_hashes() {
        assert_eq!(format_tags(&["a".into(), "b c".into()]), "#a #b c");
    }
}
