use std::fs::{self, File};
use std::io::{self, Read as _, Write as _};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("open archive {}: {source}", .path.display())]
    Open { path: PathBuf, source: io::Error },

    #[error("read archive {}: {source}", .path.display())]
    Corrupt { path: PathBuf, source: ZipError },

    #[error("read entry {entry} in {}: {source}", .path.display())]
    ReadEntry {
        path: PathBuf,
        entry: String,
        source: io::Error,
    },

    #[error("create temporary archive next to {}: {source}", .path.display())]
    CreateTemp { path: PathBuf, source: io::Error },

    #[error("write temporary archive {}: {source}", .temp.display())]
    WriteTemp { temp: PathBuf, source: ZipError },

    #[error("flush temporary archive {}: {source}", .temp.display())]
    Flush { temp: PathBuf, source: io::Error },

    #[error(
        "replace {} with temporary archive {} (removed): {source}",
        .target.display(),
        .temp.display()
    )]
    Persist {
        target: PathBuf,
        temp: PathBuf,
        source: io::Error,
    },

    #[error(
        "replace {} with temporary archive {}: {source}; temporary archive could not be removed and is left at {}: {cleanup}",
        .target.display(),
        .temp.display(),
        .temp.display()
    )]
    PersistOrphaned {
        target: PathBuf,
        temp: PathBuf,
        source: io::Error,
        cleanup: io::Error,
    },
}

/// A fully written replacement archive that has not yet been moved over the
/// original. Dropping it without calling [`StagedArchive::commit`] removes the
/// temporary file and leaves the original untouched.
#[derive(Debug)]
pub struct StagedArchive {
    temp: NamedTempFile,
    target: PathBuf,
}

impl StagedArchive {
    pub fn temp_path(&self) -> &Path {
        self.temp.path()
    }

    /// Atomically renames the staged archive over the target path.
    pub fn commit(self) -> Result<(), ArchiveError> {
        let temp_path = self.temp.path().to_path_buf();
        match self.temp.persist(&self.target) {
            Ok(_) => {
                tracing::debug!(archive = %self.target.display(), "archive replaced");
                Ok(())
            }
            Err(err) => match err.file.close() {
                Ok(()) => Err(ArchiveError::Persist {
                    target: self.target,
                    temp: temp_path,
                    source: err.error,
                }),
                Err(cleanup) => Err(ArchiveError::PersistOrphaned {
                    target: self.target,
                    temp: temp_path,
                    source: err.error,
                    cleanup,
                }),
            },
        }
    }
}

pub fn open(path: &Path) -> Result<ZipArchive<File>, ArchiveError> {
    let file = File::open(path).map_err(|source| ArchiveError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    ZipArchive::new(file).map_err(|source| ArchiveError::Corrupt {
        path: path.to_path_buf(),
        source,
    })
}

pub fn list_entries(path: &Path) -> Result<Vec<String>, ArchiveError> {
    let archive = open(path)?;
    Ok(archive.file_names().map(str::to_owned).collect())
}

/// Finds the stored name for `wanted`, preferring an exact match and falling
/// back to an ASCII case-insensitive one.
pub fn find_entry_name<'a>(
    names: impl IntoIterator<Item = &'a str>,
    wanted: &str,
) -> Option<&'a str> {
    let mut folded = None;
    for name in names {
        if name == wanted {
            return Some(name);
        }
        if folded.is_none() && name.eq_ignore_ascii_case(wanted) {
            folded = Some(name);
        }
    }
    folded
}

/// Reads the entry named `name` (any ASCII casing). `Ok(None)` means the
/// archive is readable but has no such entry.
pub fn read_entry(path: &Path, name: &str) -> Result<Option<Vec<u8>>, ArchiveError> {
    let mut archive = open(path)?;
    let Some(stored) = find_entry_name(archive.file_names(), name).map(str::to_owned) else {
        return Ok(None);
    };

    let mut entry = archive
        .by_name(&stored)
        .map_err(|source| ArchiveError::Corrupt {
            path: path.to_path_buf(),
            source,
        })?;
    let mut bytes = entry_buffer(entry.size());
    entry
        .read_to_end(&mut bytes)
        .map_err(|source| ArchiveError::ReadEntry {
            path: path.to_path_buf(),
            entry: stored.clone(),
            source,
        })?;
    Ok(Some(bytes))
}

/// Upper bound on what a declared entry size may pre-allocate.
const MAX_PREALLOC: usize = 1 << 20;

/// The size in the zip header is untrusted; larger entries grow as read.
fn entry_buffer(declared: u64) -> Vec<u8> {
    let capacity = usize::try_from(declared).map_or(MAX_PREALLOC, |size| size.min(MAX_PREALLOC));
    Vec::with_capacity(capacity)
}

/// Replaces (or inserts) `entry_name` inside the archive at `path`.
///
/// Every other entry is copied without recompression. On any failure the file
/// at `path` is left exactly as it was.
pub fn replace_entry(path: &Path, entry_name: &str, content: &[u8]) -> Result<(), ArchiveError> {
    stage_replacement(path, entry_name, content)?.commit()
}

/// Builds the rewritten archive next to `path` without touching `path` itself.
///
/// Existing entries whose names match `entry_name` in any ASCII casing are
/// dropped, so the result holds exactly one copy of the entry.
pub fn stage_replacement(
    path: &Path,
    entry_name: &str,
    content: &[u8],
) -> Result<StagedArchive, ArchiveError> {
    let mut source = open(path)?;
    let permissions = fs::metadata(path)
        .map_err(|source| ArchiveError::Open {
            path: path.to_path_buf(),
            source,
        })?
        .permissions();

    // Same directory keeps the final rename on one filesystem.
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut temp = tempfile::Builder::new()
        .prefix(".comicshelf-")
        .suffix(".tmp")
        .tempfile_in(parent)
        .map_err(|source| ArchiveError::CreateTemp {
            path: path.to_path_buf(),
            source,
        })?;
    let temp_path = temp.path().to_path_buf();
    let write_err = |source: ZipError| ArchiveError::WriteTemp {
        temp: temp_path.clone(),
        source,
    };

    {
        let mut writer = ZipWriter::new(temp.as_file_mut());
        writer.set_raw_comment(source.comment().to_vec().into_boxed_slice());

        let mut replaced = 0usize;
        for index in 0..source.len() {
            let entry = source
                .by_index_raw(index)
                .map_err(|source| ArchiveError::Corrupt {
                    path: path.to_path_buf(),
                    source,
                })?;
            if entry.name().eq_ignore_ascii_case(entry_name) {
                replaced += 1;
                continue;
            }
            writer.raw_copy_file(entry).map_err(write_err)?;
        }

        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .unix_permissions(0o644);
        writer.start_file(entry_name, options).map_err(write_err)?;
        writer
            .write_all(content)
            .map_err(|err| write_err(ZipError::Io(err)))?;

        let file = writer.finish().map_err(write_err)?;
        file.flush()
            .and_then(|()| file.sync_all())
            .map_err(|source| ArchiveError::Flush {
                temp: temp_path.clone(),
                source,
            })?;

        tracing::debug!(
            archive = %path.display(),
            entry = entry_name,
            entries = source.len(),
            replaced,
            "staged archive rewrite"
        );
    }

    fs::set_permissions(&temp_path, permissions).map_err(|source| ArchiveError::Flush {
        temp: temp_path.clone(),
        source,
    })?;

    Ok(StagedArchive {
        temp,
        target: path.to_path_buf(),
    })
}
