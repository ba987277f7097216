use std::process::ExitCode;

use anyhow::Context as _;
use clap::Parser as _;

fn main() -> ExitCode {
    if let Err(err) = try_main() {
        eprintln!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

fn try_main() -> anyhow::Result<()> {
    comicshelf::logging::init().context("init logging")?;

    let cli = comicshelf::cli::Cli::parse();
    tracing::debug!(?cli, "parsed cli");

    match cli.command {
        comicshelf::cli::Command::Sync(args) => {
            comicshelf::commands::sync(args).context("sync")?;
        }
        comicshelf::cli::Command::Show(args) => {
            comicshelf::commands::show(args).context("show")?;
        }
    }

    Ok(())
}
