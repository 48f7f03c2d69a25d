use super::print::{
    print_full_posts, print_messages, print_paths, print_posts, print_settings, print_snippets,
    print_tags,
};
use super::setup::{Cli, Commands, StatusArg};
use clap::Parser;
use quire::api::StatusFilter;
use quire::editor::{edit_content, EditorContent};
use quire::error::Result;
use quire::images::PathPicker;
use quire::init::{initialize, DynApi};
use quire::manager::PostFilter;
use quire::model::{NewPost, NewSnippet, PostPatch};
use quire::notify::{message_for, CmdMessage, CmdResult};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

struct AppContext {
    api: DynApi,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut ctx = init_context(&cli)?;

    let outcome = match cli.command {
        Some(Commands::List {
            status,
            tag,
            search,
        }) => handle_list(&mut ctx, status, tag, search),
        Some(Commands::Show { ids }) => handle_show(&mut ctx, ids),
        Some(Commands::Create {
            title,
            content,
            tags,
            no_editor,
        }) => handle_create(&mut ctx, title, content, tags, no_editor),
        Some(Commands::Edit { id, title, content }) => handle_edit(&mut ctx, id, title, content),
        Some(Commands::Delete { ids }) => report(ctx.api.delete_posts(&ids)),
        Some(Commands::Archive { ids }) => report(ctx.api.archive_posts(&ids)),
        Some(Commands::Unarchive { ids }) => report(ctx.api.unarchive_posts(&ids)),
        Some(Commands::Publish { ids }) => report(ctx.api.publish_posts(&ids)),
        Some(Commands::Unpublish { ids }) => report(ctx.api.unpublish_posts(&ids)),
        Some(Commands::Tag { id, add, remove }) => handle_tag(&mut ctx, id, add, remove),
        Some(Commands::Attach { id, file }) => {
            report(ctx.api.attach_image(&id, &PathPicker(Some(file))))
        }
        Some(Commands::ImageRm { reference }) => report(ctx.api.delete_image(&reference)),
        Some(Commands::Snippets) => handle_snippets(&mut ctx),
        Some(Commands::SnippetAdd {
            name,
            content,
            icon,
        }) => report(ctx.api.create_snippet(NewSnippet {
            name,
            content,
            icon,
        })),
        Some(Commands::SnippetRm { key }) => report(ctx.api.delete_snippet(&key)),
        Some(Commands::Config { key, value }) => handle_config(&mut ctx, key, value),
        Some(Commands::Export { ids, out }) => report(ctx.api.export_posts(&ids, &out)),
        Some(Commands::Import { paths }) => report(ctx.api.import_posts(&paths)),
        Some(Commands::Paths { ids }) => handle_paths(&mut ctx, ids),
        None => handle_list(&mut ctx, None, None, None),
    };

    // Anything still waiting on the auto-save timer is written before exit.
    if let Some(Err(e)) = ctx.api.flush_autosave() {
        tracing::warn!(error = %e, "pending save failed on exit");
    }
    outcome
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn init_context(cli: &Cli) -> Result<AppContext> {
    let mut api = initialize(cli.data_dir.clone());
    let loaded = api.load()?;
    print_messages(&loaded.messages);
    Ok(AppContext { api })
}

/// Print a facade result. Errors with a structured message (partial bulk
/// failures) are shown in full before being returned.
fn report(result: Result<CmdResult>) -> Result<()> {
    match result {
        Ok(result) => {
            print_messages(&result.messages);
            Ok(())
        }
        Err(e) => {
            if let quire::error::QuireError::PartialBulkFailure { .. } = e {
                print_messages(&[message_for(&e)]);
            }
            Err(e)
        }
    }
}

fn handle_list(
    ctx: &mut AppContext,
    status: Option<StatusArg>,
    tag: Option<String>,
    search: Option<String>,
) -> Result<()> {
    let filter = PostFilter {
        status: status.map(StatusFilter::from).unwrap_or_default(),
        tag,
        search,
    };
    let result = ctx.api.list_posts(&filter)?;
    print_posts(&result.posts);
    print_messages(&result.messages);
    Ok(())
}

fn handle_show(ctx: &mut AppContext, ids: Vec<String>) -> Result<()> {
    let result = ctx.api.get_posts(&ids)?;
    print_full_posts(&result.posts);
    print_messages(&result.messages);
    Ok(())
}

fn handle_create(
    ctx: &mut AppContext,
    title: Vec<String>,
    content: Option<String>,
    tags: Vec<String>,
    no_editor: bool,
) -> Result<()> {
    let title = title.join(" ");
    let content = content.unwrap_or_default();

    let (title, content) = if no_editor {
        (title, content)
    } else {
        let edited = edit_content(&EditorContent::new(title, content))?;
        if edited.title.is_empty() && edited.content.is_empty() {
            print_messages(&[CmdMessage::info("Empty post, nothing created.")]);
            return Ok(());
        }
        (edited.title, edited.content)
    };

    let new = NewPost::new(title, content).with_tags(&tags);
    let result = ctx.api.create_post(new)?;
    print_messages(&result.messages);
    if let Some(post) = result.posts.first() {
        println!("{}", post.id);
    }
    Ok(())
}

fn handle_edit(
    ctx: &mut AppContext,
    id: String,
    title: Option<String>,
    content: Option<String>,
) -> Result<()> {
    if title.is_some() || content.is_some() {
        let patch = PostPatch {
            title,
            content,
            ..Default::default()
        };
        return report(ctx.api.update_post(&id, patch));
    }

    let current = ctx
        .api
        .get_posts(&[id.as_str()])?
        .posts
        .into_iter()
        .next();
    let Some(current) = current else {
        return Ok(());
    };

    let initial = EditorContent::new(current.title.clone(), current.content.clone());
    let edited = edit_content(&initial)?;
    if edited == initial {
        print_messages(&[CmdMessage::info("No changes.")]);
        return Ok(());
    }

    let patch = PostPatch::default()
        .title(edited.title)
        .content(edited.content);
    report(ctx.api.update_post(&current.id, patch))
}

fn handle_tag(
    ctx: &mut AppContext,
    id: Option<String>,
    add: Vec<String>,
    remove: Vec<String>,
) -> Result<()> {
    match id {
        Some(id) => report(ctx.api.tag_post(&id, &add, &remove)),
        None => {
            let result = ctx.api.list_tags()?;
            print_tags(&result.tags);
            Ok(())
        }
    }
}

fn handle_snippets(ctx: &mut AppContext) -> Result<()> {
    let result = ctx.api.list_snippets()?;
    print_snippets(&result.snippets);
    print_messages(&result.messages);
    Ok(())
}

fn handle_config(ctx: &mut AppContext, key: Option<String>, value: Option<String>) -> Result<()> {
    let result = match (key, value) {
        (None, _) => {
            let result = ctx.api.get_settings()?;
            if let Some(settings) = &result.settings {
                print_settings(settings);
            }
            result
        }
        (Some(key), None) => ctx.api.get_setting(&key)?,
        (Some(key), Some(value)) => ctx.api.set_setting(&key, &value)?,
    };
    print_messages(&result.messages);
    Ok(())
}

fn handle_paths(ctx: &mut AppContext, ids: Vec<String>) -> Result<()> {
    let result = ctx.api.post_paths(&ids)?;
    let paths: Vec<PathBuf> = result.paths;
    print_paths(&paths);
    Ok(())
}
