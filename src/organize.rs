use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::comicinfo::ComicInfo;

#[derive(Debug, Error)]
pub enum OrganizeError {
    #[error("create organized directory {}: {source}", .dir.display())]
    CreateDir { dir: PathBuf, source: io::Error },

    #[error("refusing to overwrite {} with {}", .to.display(), .from.display())]
    DestinationExists { from: PathBuf, to: PathBuf },

    #[error("move {} to {}: {source}", .from.display(), .to.display())]
    Move {
        from: PathBuf,
        to: PathBuf,
        source: io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    Moved { from: PathBuf, to: PathBuf },
    /// The record has no series, so there is nowhere to put the archive.
    Unchanged,
    AlreadyInPlace(PathBuf),
}

/// Moves archives into `<root>/<series>/<series> #<number><ext>`.
#[derive(Debug, Clone)]
pub struct Organizer {
    root: PathBuf,
}

impl Organizer {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `None` when the record has no series.
    pub fn destination(&self, archive: &Path, record: &ComicInfo) -> Option<PathBuf> {
        if record.series.trim().is_empty() {
            return None;
        }
        let series = path_component(&record.series);
        let number = path_component(&record.number);
        let ext = archive
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default();

        Some(
            self.root
                .join(&series)
                .join(format!("{series} #{number}{ext}")),
        )
    }

    /// Fails with [`OrganizeError::DestinationExists`] when another file
    /// already sits where `archive` would go. Touches nothing on disk, so it
    /// can run before the archive is tagged.
    pub fn check_destination(
        &self,
        archive: &Path,
        record: &ComicInfo,
    ) -> Result<Option<PathBuf>, OrganizeError> {
        let Some(dest) = self.destination(archive, record) else {
            return Ok(None);
        };
        if dest.exists() && !same_file(archive, &dest) {
            return Err(OrganizeError::DestinationExists {
                from: archive.to_path_buf(),
                to: dest,
            });
        }
        Ok(Some(dest))
    }

    /// Renames the archive into place. On failure the archive stays where it
    /// was. An occupied destination is refused up front; a file created there
    /// between that check and the rename is not detected.
    pub fn place(&self, archive: &Path, record: &ComicInfo) -> Result<Placement, OrganizeError> {
        let Some(dest) = self.check_destination(archive, record)? else {
            tracing::info!(
                archive = %archive.display(),
                "no series in record; leaving archive in place"
            );
            return Ok(Placement::Unchanged);
        };
        if same_file(archive, &dest) {
            return Ok(Placement::AlreadyInPlace(dest));
        }

        if let Some(dir) = dest.parent() {
            fs::create_dir_all(dir).map_err(|source| OrganizeError::CreateDir {
                dir: dir.to_path_buf(),
                source,
            })?;
        }

        fs::rename(archive, &dest).map_err(|source| OrganizeError::Move {
            from: archive.to_path_buf(),
            to: dest.clone(),
            source,
        })?;
        tracing::info!(from = %archive.display(), to = %dest.display(), "archive organized");

        Ok(Placement::Moved {
            from: archive.to_path_buf(),
            to: dest,
        })
    }
}

/// Keeps record text from introducing extra path levels.
fn path_component(raw: &str) -> String {
    let cleaned = raw.trim().replace(['/', '\\', '\0'], "-");
    match cleaned.as_str() {
        "." | ".." => cleaned.replace('.', "_"),
        _ => cleaned,
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
