use clap::{Parser, Subcommand, ValueEnum};
use quire::model::PostStatus;
use quire::manager::StatusFilter;
use std::path::PathBuf;

/// Returns the version string, including the git hash for non-release builds.
/// Format: "0.1.0" for releases, "0.1.0@abc1234" for dev builds
fn get_version() -> &'static str {
    const VERSION: &str = env!("CARGO_PKG_VERSION");
    const GIT_HASH: &str = env!("GIT_HASH");
    const IS_RELEASE: &str = env!("IS_RELEASE");

    use std::sync::OnceLock;
    static VERSION_STRING: OnceLock<String> = OnceLock::new();

    VERSION_STRING.get_or_init(|| {
        if IS_RELEASE == "true" || GIT_HASH.is_empty() {
            VERSION.to_string()
        } else {
            format!("{}@{}", VERSION, GIT_HASH)
        }
    })
}

#[derive(Parser, Debug)]
#[command(name = "quire", bin_name = "quire", version = get_version())]
#[command(about = "Local manager for Markdown blog drafts", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Data directory (defaults to $QUIRE_DATA_DIR, then the platform data dir)
    #[arg(long, global = true, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Verbose output (debug logging on stderr)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum StatusArg {
    Draft,
    Published,
    Archived,
    All,
}

impl From<StatusArg> for StatusFilter {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::Draft => StatusFilter::Only(PostStatus::Draft),
            StatusArg::Published => StatusFilter::Only(PostStatus::Published),
            StatusArg::Archived => StatusFilter::Only(PostStatus::Archived),
            StatusArg::All => StatusFilter::All,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List posts (archived posts are hidden unless asked for)
    #[command(alias = "ls")]
    List {
        /// Only posts with this status
        #[arg(long, value_enum)]
        status: Option<StatusArg>,

        /// Only posts with this tag
        #[arg(short, long)]
        tag: Option<String>,

        /// Search title, content and tags
        #[arg(short, long)]
        search: Option<String>,
    },

    /// Print one or more posts
    #[command(alias = "view")]
    Show {
        /// Post ids (a unique prefix is enough)
        #[arg(required = true, num_args = 1..)]
        ids: Vec<String>,
    },

    /// Create a new post
    #[command(alias = "new")]
    Create {
        /// Title words
        #[arg(num_args = 0..)]
        title: Vec<String>,

        /// Post content
        #[arg(short, long)]
        content: Option<String>,

        /// Tags (repeatable)
        #[arg(short, long = "tag")]
        tags: Vec<String>,

        /// Skip opening the editor
        #[arg(long)]
        no_editor: bool,
    },

    /// Edit a post in $EDITOR, or set fields directly
    #[command(alias = "e")]
    Edit {
        id: String,

        /// New title (skips the editor)
        #[arg(long)]
        title: Option<String>,

        /// New content (skips the editor)
        #[arg(long)]
        content: Option<String>,
    },

    /// Delete posts and the images they reference
    #[command(alias = "rm")]
    Delete {
        #[arg(required = true, num_args = 1..)]
        ids: Vec<String>,
    },

    /// Move posts to the archive
    Archive {
        #[arg(required = true, num_args = 1..)]
        ids: Vec<String>,
    },

    /// Bring archived posts back as drafts
    Unarchive {
        #[arg(required = true, num_args = 1..)]
        ids: Vec<String>,
    },

    /// Mark posts as published
    Publish {
        #[arg(required = true, num_args = 1..)]
        ids: Vec<String>,
    },

    /// Return published posts to draft
    Unpublish {
        #[arg(required = true, num_args = 1..)]
        ids: Vec<String>,
    },

    /// Add or remove tags; without a post id, list all tags
    Tag {
        id: Option<String>,

        /// Tags to add (repeatable)
        #[arg(short, long)]
        add: Vec<String>,

        /// Tags to remove (repeatable)
        #[arg(short, long)]
        remove: Vec<String>,
    },

    /// Copy an image into the store and embed it in a post
    Attach { id: String, file: PathBuf },

    /// Delete a stored image by reference
    #[command(name = "image-rm")]
    ImageRm { reference: String },

    /// List snippets
    Snippets,

    /// Save a snippet
    #[command(name = "snippet-add")]
    SnippetAdd {
        name: String,
        content: String,

        #[arg(long)]
        icon: Option<String>,
    },

    /// Delete a snippet by id or name
    #[command(name = "snippet-rm")]
    SnippetRm { key: String },

    /// Get or set settings
    Config {
        /// Setting name (e.g. darkMode, autosave, imageScheme)
        key: Option<String>,

        /// Value to set
        value: Option<String>,
    },

    /// Export posts as a tar.gz of Markdown files
    Export {
        /// Posts to export (defaults to all non-archived posts)
        ids: Vec<String>,

        /// Directory to write the archive into
        #[arg(short, long, default_value = ".")]
        out: PathBuf,
    },

    /// Import Markdown files or directories of them
    Import {
        #[arg(required = true, num_args = 1..)]
        paths: Vec<PathBuf>,
    },

    /// Show storage locations, or the files behind posts and image references
    Paths { ids: Vec<String> },
}
