use std::io::Write as _;
use std::path::PathBuf;

use anyhow::Context as _;

use crate::catalog::ComicVineClient;
use crate::cli::{ShowArgs, SyncArgs};
use crate::comicinfo;
use crate::config::SyncConfig;
use crate::organize::Organizer;
use crate::resolve::{Chooser, FirstMatchChooser, Resolver, TerminalChooser};
use crate::sync::{RunSummary, Synchronizer};

pub fn sync(args: SyncArgs) -> anyhow::Result<()> {
    let config = SyncConfig::from_args(args).context("resolve configuration")?;
    let client = ComicVineClient::new(&config.catalog).context("build catalog client")?;
    let organizer = Organizer::new(&config.organized_root);

    tracing::info!(
        path = %config.target.display(),
        organized_root = %config.organized_root.display(),
        auto_select = config.auto_select,
        "sync"
    );

    let summary = if config.auto_select {
        run_with(client, FirstMatchChooser, organizer, &config)?
    } else {
        run_with(client, TerminalChooser::stdio(), organizer, &config)?
    };

    if !summary.failed.is_empty() {
        for (archive, error) in &summary.failed {
            tracing::error!(archive = %archive.display(), %error, "archive failed");
        }
        anyhow::bail!("{} archive(s) failed", summary.failed.len());
    }
    Ok(())
}

fn run_with<P: Chooser>(
    client: ComicVineClient,
    chooser: P,
    organizer: Organizer,
    config: &SyncConfig,
) -> anyhow::Result<RunSummary> {
    let mut synchronizer = Synchronizer::new(Resolver::new(client, chooser), organizer);
    synchronizer
        .run(&config.target, config.keep_going)
        .with_context(|| format!("sync {}", config.target.display()))
}

pub fn show(args: ShowArgs) -> anyhow::Result<()> {
    let archive = PathBuf::from(&args.archive);
    let record = comicinfo::read_record(&archive)
        .with_context(|| format!("read record: {}", archive.display()))?;

    let mut stdout = std::io::stdout().lock();
    match record {
        Some(record) => {
            let xml = record.to_xml().context("encode record")?;
            stdout.write_all(xml.as_bytes()).context("write stdout")?;
        }
        None => {
            writeln!(
                stdout,
                "no {} in {}",
                comicinfo::COMIC_INFO_ENTRY,
                archive.display()
            )
            .context("write stdout")?;
        }
    }
    Ok(())
}
