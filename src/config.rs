use std::path::PathBuf;
use std::time::Duration;

use crate::cli::SyncArgs;

pub const API_KEY_ENV: &str = "COMICVINE_API_KEY";
pub const DEFAULT_CATALOG_URL: &str = "https://comicvine.gamespot.com/api/";
pub const DEFAULT_ORGANIZED_ROOT: &str = "organized_comics";

#[derive(Debug, Clone)]
pub struct CatalogConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout: Duration,
}

/// Everything one `sync` run needs, resolved once at startup.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub target: PathBuf,
    pub organized_root: PathBuf,
    pub catalog: CatalogConfig,
    pub auto_select: bool,
    pub keep_going: bool,
}

impl SyncConfig {
    /// `--api-key` wins over `COMICVINE_API_KEY`. A missing key is not an
    /// error here: archives that already carry a record never hit the catalog.
    pub fn from_args(args: SyncArgs) -> anyhow::Result<Self> {
        if args.timeout_secs == 0 {
            anyhow::bail!("--timeout-secs must be > 0");
        }

        let api_key = args
            .api_key
            .or_else(|| std::env::var(API_KEY_ENV).ok())
            .map(|key| key.trim().to_owned())
            .unwrap_or_default();

        Ok(Self {
            target: PathBuf::from(args.path),
            organized_root: PathBuf::from(args.organized_root),
            catalog: CatalogConfig {
                base_url: args.catalog_url,
                api_key,
                timeout: Duration::from_secs(args.timeout_secs),
            },
            auto_select: args.auto_select,
            keep_going: args.keep_going,
        })
    }
}
