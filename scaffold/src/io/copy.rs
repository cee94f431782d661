//! Recursive tree replication with permission preservation.
//!
//! Two failure channels are kept apart:
//!
//! - [`CopyError`]: the whole copy could not start (missing source, unusable
//!   destination). Returned as `Err`, nothing past the failed check is touched.
//! - [`CopyOutcome::Failed`]: one entry could not be replicated. Recorded in
//!   the [`CopyReport`] and logged; traversal continues with the next sibling.
//!
//! Traversal is sequential and depth-first, in directory-listing order.

use std::error::Error as _;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use super::entry;
use crate::core::types::{CopyOutcome, CopyReport, EntryKind, FileSystemEntry, StageFailure};

/// Whole-tree failure. The destination is only created once the source checks pass.
#[derive(Debug, Error)]
pub enum CopyError {
    #[error("source {} not found", path.display())]
    SourceNotFound { path: PathBuf },

    #[error("source {} is not a directory", path.display())]
    SourceNotDirectory { path: PathBuf },

    #[error("inspect source {}", path.display())]
    InspectSource {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("destination {} lies inside template {}", path.display(), template.display())]
    DestinationInsideSource { path: PathBuf, template: PathBuf },

    #[error("create destination {}", path.display())]
    CreateDestination {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("read source directory {}", path.display())]
    ReadSource {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl From<CopyError> for StageFailure {
    fn from(err: CopyError) -> Self {
        match err {
            CopyError::SourceNotFound { path } => StageFailure::SourceNotFound { path },
            other => {
                let reason = match other.source() {
                    Some(cause) => format!("{other}: {cause}"),
                    None => other.to_string(),
                };
                StageFailure::CopyAborted(reason)
            }
        }
    }
}

/// Replicate the contents of `source` into `destination`.
///
/// `destination` (and any missing parents) is created if needed; existing
/// content there is left in place and overwritten file by file.
#[instrument(skip_all, fields(source = %source.display(), dest = %destination.display()))]
pub fn copy_tree(source: &Path, destination: &Path) -> Result<CopyReport, CopyError> {
    let root = match entry::inspect(source) {
        Ok(Some(root)) => root,
        Ok(None) => {
            warn!("template source missing");
            return Err(CopyError::SourceNotFound {
                path: source.to_path_buf(),
            });
        }
        Err(err) => {
            return Err(CopyError::InspectSource {
                path: source.to_path_buf(),
                source: err,
            });
        }
    };
    if root.kind != EntryKind::Directory {
        return Err(CopyError::SourceNotDirectory {
            path: source.to_path_buf(),
        });
    }

    let canonical_source = fs::canonicalize(source).map_err(|err| CopyError::InspectSource {
        path: source.to_path_buf(),
        source: err,
    })?;
    if resolve_existing_prefix(destination).starts_with(&canonical_source) {
        warn!("destination inside template source");
        return Err(CopyError::DestinationInsideSource {
            path: destination.to_path_buf(),
            template: source.to_path_buf(),
        });
    }

    fs::create_dir_all(destination).map_err(|err| CopyError::CreateDestination {
        path: destination.to_path_buf(),
        source: err,
    })?;

    let children = list_children(source).map_err(|err| CopyError::ReadSource {
        path: source.to_path_buf(),
        source: err,
    })?;

    let mut report = CopyReport::default();
    copy_children(&children, destination, &mut report);

    info!(
        files = report.files_copied(),
        directories = report.directories_created(),
        failed = report.failure_count(),
        "tree copy finished"
    );
    Ok(report)
}

/// Canonicalize the longest existing ancestor of `path` and re-append the rest.
fn resolve_existing_prefix(path: &Path) -> PathBuf {
    let mut existing = path;
    let mut missing = Vec::new();
    loop {
        if let Ok(resolved) = fs::canonicalize(existing) {
            return missing
                .iter()
                .rev()
                .fold(resolved, |acc: PathBuf, part| acc.join(part));
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name);
                existing = parent;
            }
            _ => return path.to_path_buf(),
        }
    }
}

fn list_children(dir: &Path) -> io::Result<Vec<PathBuf>> {
    fs::read_dir(dir)?
        .map(|child| child.map(|child| child.path()))
        .collect()
}

fn copy_children(children: &[PathBuf], dest_dir: &Path, report: &mut CopyReport) {
    for child in children {
        let Some(file_name) = child.file_name() else {
            record_failure(report, child, "entry has no file name".to_string());
            continue;
        };
        copy_entry(child, &dest_dir.join(file_name), report);
    }
}

fn copy_entry(source: &Path, dest: &Path, report: &mut CopyReport) {
    let entry = match entry::inspect(source) {
        Ok(Some(entry)) => entry,
        Ok(None) => {
            record_failure(report, source, "entry vanished during copy".to_string());
            return;
        }
        Err(err) => {
            record_failure(report, source, format!("inspect: {err}"));
            return;
        }
    };

    match entry.kind {
        EntryKind::File => copy_file(&entry, dest, report),
        EntryKind::Directory => copy_directory(&entry, dest, report),
    }
}

/// Copy bytes, then set the mode as its own step: the created file may carry
/// a different default mode.
fn copy_file(entry: &FileSystemEntry, dest: &Path, report: &mut CopyReport) {
    let result = fs::copy(&entry.path, dest)
        .map_err(|err| format!("copy to {}: {err}", dest.display()))
        .and_then(|_| {
            entry::set_mode(dest, entry.mode)
                .map_err(|err| format!("set mode {:o} on {}: {err}", entry.mode, dest.display()))
        });

    match result {
        Ok(()) => {
            debug!(dest = %dest.display(), mode = %format!("{:o}", entry.mode), "copied file");
            report.push(CopyOutcome::Copied {
                source: entry.path.clone(),
                dest: dest.to_path_buf(),
                mode: entry.mode,
            });
        }
        Err(reason) => record_failure(report, &entry.path, reason),
    }
}

/// A directory that cannot be created or listed is skipped with its whole
/// subtree; siblings are unaffected.
///
/// The source mode is applied after the subtree is populated so read-only
/// directories still receive their children. The `DirectoryCreated` outcome
/// is therefore recorded after the outcomes of its children.
fn copy_directory(entry: &FileSystemEntry, dest: &Path, report: &mut CopyReport) {
    if let Err(err) = fs::create_dir_all(dest) {
        record_failure(
            report,
            &entry.path,
            format!("create directory {}: {err}", dest.display()),
        );
        return;
    }

    let children = match list_children(&entry.path) {
        Ok(children) => children,
        Err(err) => {
            record_failure(report, &entry.path, format!("read directory: {err}"));
            return;
        }
    };
    copy_children(&children, dest, report);

    match entry::set_mode(dest, entry.mode) {
        Ok(()) => report.push(CopyOutcome::DirectoryCreated {
            dest: dest.to_path_buf(),
            mode: entry.mode,
        }),
        Err(err) => record_failure(
            report,
            &entry.path,
            format!("set mode {:o} on {}: {err}", entry.mode, dest.display()),
        ),
    }
}

fn record_failure(report: &mut CopyReport, path: &Path, reason: String) {
    warn!(path = %path.display(), %reason, "entry copy failed");
    report.push(CopyOutcome::Failed {
        path: path.to_path_buf(),
        reason,
    });
}
