use clap::{Args, Parser, Subcommand};

use crate::config::{DEFAULT_CATALOG_URL, DEFAULT_ORGANIZED_ROOT};

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Tag archives with ComicInfo.xml and move them into the organized layout.
    Sync(SyncArgs),
    /// Print the ComicInfo.xml embedded in one archive.
    Show(ShowArgs),
}

#[derive(Debug, Args)]
pub struct SyncArgs {
    /// Archive file, or a directory to walk for `.cbz`/`.zip` archives.
    pub path: String,

    /// Base directory for `<series>/<series> #<number>.<ext>`.
    #[arg(long, default_value = DEFAULT_ORGANIZED_ROOT)]
    pub organized_root: String,

    /// Comic Vine API key (default: `COMICVINE_API_KEY`).
    #[arg(long)]
    pub api_key: Option<String>,

    /// Catalog API base URL.
    #[arg(long, default_value = DEFAULT_CATALOG_URL)]
    pub catalog_url: String,

    /// Catalog request timeout.
    #[arg(long, default_value_t = 30)]
    pub timeout_secs: u64,

    /// Pick the catalog's first candidate instead of prompting.
    #[arg(long)]
    pub auto_select: bool,

    /// Keep walking after an archive fails (skips never stop the walk).
    #[arg(long)]
    pub keep_going: bool,
}

#[derive(Debug, Args)]
pub struct ShowArgs {
    /// Archive file to inspect.
    pub archive: String,
}
