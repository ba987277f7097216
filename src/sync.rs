use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use walkdir::WalkDir;

use crate::catalog::Catalog;
use crate::comicinfo::{self, RecordError};
use crate::filename::{FilenameError, SearchTerms};
use crate::organize::{OrganizeError, Organizer, Placement};
use crate::resolve::{Chooser, Resolution, ResolveError, Resolver, record_from_candidate};

const ARCHIVE_EXTENSIONS: &[&str] = &["cbz", "zip"];

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("path not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("walk {}: {source}", .root.display())]
    Walk {
        root: PathBuf,
        source: walkdir::Error,
    },

    #[error(transparent)]
    Filename(#[from] FilenameError),

    #[error(transparent)]
    Record(#[from] RecordError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Organize(#[from] OrganizeError),
}

impl SyncError {
    /// The catalog had nothing for this archive's name.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Resolve(err) if err.is_not_found())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveOutcome {
    Organized { from: PathBuf, to: PathBuf },
    AlreadyInPlace(PathBuf),
    /// Tagged (or already tagged) but the record has no series.
    Unplaced(PathBuf),
    /// The operator declined every candidate.
    Skipped(PathBuf),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub organized: usize,
    pub unplaced: usize,
    pub skipped: usize,
    pub failed: Vec<(PathBuf, String)>,
}

impl RunSummary {
    fn record(&mut self, outcome: &ArchiveOutcome) {
        match outcome {
            ArchiveOutcome::Organized { .. } | ArchiveOutcome::AlreadyInPlace(_) => {
                self.organized += 1;
            }
            ArchiveOutcome::Unplaced(_) => self.unplaced += 1,
            ArchiveOutcome::Skipped(_) => self.skipped += 1,
        }
    }
}

/// Runs the read-or-resolve, tag, organize pipeline one archive at a time.
pub struct Synchronizer<C, P> {
    resolver: Resolver<C, P>,
    organizer: Organizer,
}

impl<C: Catalog, P: Chooser> Synchronizer<C, P> {
    pub fn new(resolver: Resolver<C, P>, organizer: Organizer) -> Self {
        Self {
            resolver,
            organizer,
        }
    }

    /// Processes one archive to completion. A failure leaves the archive's
    /// bytes and location as they were before the failing step.
    pub fn process(&mut self, archive: &Path) -> Result<ArchiveOutcome, SyncError> {
        let record = match comicinfo::read_record(archive)? {
            Some(record) => {
                tracing::info!(archive = %archive.display(), "found existing ComicInfo.xml");
                record
            }
            None => {
                let terms = SearchTerms::from_path(archive)?;
                tracing::info!(
                    archive = %archive.display(),
                    title = %terms.title,
                    issue = %terms.issue,
                    "no ComicInfo.xml; searching catalog"
                );
                let candidate = match self.resolver.resolve(&terms)? {
                    Resolution::Selected(candidate) => candidate,
                    Resolution::Skipped => {
                        tracing::info!(archive = %archive.display(), "skipped by operator");
                        return Ok(ArchiveOutcome::Skipped(archive.to_path_buf()));
                    }
                };
                let record = record_from_candidate(&candidate)?;
                // Refuse before tagging so a collision leaves the archive as it was.
                self.organizer.check_destination(archive, &record)?;
                comicinfo::write_record(archive, &record)?;
                tracing::info!(archive = %archive.display(), "wrote ComicInfo.xml");
                record
            }
        };

        Ok(match self.organizer.place(archive, &record)? {
            Placement::Moved { from, to } => ArchiveOutcome::Organized { from, to },
            Placement::AlreadyInPlace(path) => ArchiveOutcome::AlreadyInPlace(path),
            Placement::Unchanged => ArchiveOutcome::Unplaced(archive.to_path_buf()),
        })
    }

    /// Processes a single archive, or every archive under a directory.
    ///
    /// Skips never stop a walk. Any other failure aborts it unless
    /// `keep_going` is set, in which case it is logged and counted.
    pub fn run(&mut self, target: &Path, keep_going: bool) -> Result<RunSummary, SyncError> {
        let mut summary = RunSummary::default();
        if !target.exists() {
            return Err(SyncError::NotFound(target.to_path_buf()));
        }

        if !target.is_dir() {
            let outcome = self.process(target)?;
            summary.record(&outcome);
            return Ok(summary);
        }

        let archives = collect_archives(target, self.organizer.root())?;
        tracing::info!(root = %target.display(), archives = archives.len(), "walking directory");

        for archive in archives {
            match self.process(&archive) {
                Ok(outcome) => summary.record(&outcome),
                Err(err) if keep_going => {
                    tracing::warn!(
                        archive = %archive.display(),
                        error = %err,
                        "archive failed; continuing"
                    );
                    summary.failed.push((archive, err.to_string()));
                }
                Err(err) => return Err(err),
            }
        }

        tracing::info!(
            organized = summary.organized,
            unplaced = summary.unplaced,
            skipped = summary.skipped,
            failed = summary.failed.len(),
            "sync finished"
        );
        Ok(summary)
    }
}

/// Lists `.cbz`/`.zip` files under `root` in file-name order, leaving out
/// anything inside `exclude` (the organized root).
pub fn collect_archives(root: &Path, exclude: &Path) -> Result<Vec<PathBuf>, SyncError> {
    let exclude = fs::canonicalize(exclude).ok();
    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            let Some(exclude) = exclude.as_deref() else {
                return true;
            };
            !(entry.file_type().is_dir()
                && fs::canonicalize(entry.path()).is_ok_and(|path| path == exclude))
        });

    let mut archives = Vec::new();
    for entry in walker {
        let entry = entry.map_err(|source| SyncError::Walk {
            root: root.to_path_buf(),
            source,
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        if is_archive(entry.path()) {
            archives.push(entry.into_path());
        } else {
            tracing::debug!(path = %entry.path().display(), "not an archive; ignoring");
        }
    }
    Ok(archives)
}

fn is_archive(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            ARCHIVE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}
