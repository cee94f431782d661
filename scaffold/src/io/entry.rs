//! Filesystem entry inspection and permission bits.
//!
//! Entries are read fresh on every call; nothing here caches metadata.

use std::fs::{self, Metadata};
use std::io;
use std::path::Path;

use crate::core::types::{EntryKind, FileSystemEntry};

/// Classify `path`.
///
/// Returns `Ok(None)` when nothing exists at `path`. Symlinks are followed,
/// so a link to a directory is reported as a directory.
pub fn inspect(path: &Path) -> io::Result<Option<FileSystemEntry>> {
    let metadata = match fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err),
    };
    let kind = if metadata.is_dir() {
        EntryKind::Directory
    } else {
        EntryKind::File
    };
    Ok(Some(FileSystemEntry {
        path: path.to_path_buf(),
        kind,
        mode: mode_of(&metadata),
    }))
}

/// Apply `mode` to an existing path.
pub fn set_mode(path: &Path, mode: u32) -> io::Result<()> {
    let mut permissions = fs::metadata(path)?.permissions();
    apply_mode(&mut permissions, mode);
    fs::set_permissions(path, permissions)
}

#[cfg(unix)]
fn mode_of(metadata: &Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
fn mode_of(metadata: &Metadata) -> u32 {
    if metadata.permissions().readonly() {
        0o444
    } else {
        0o644
    }
}

#[cfg(unix)]
fn apply_mode(permissions: &mut fs::Permissions, mode: u32) {
    use std::os::unix::fs::PermissionsExt;
    permissions.set_mode(mode);
}

#[cfg(not(unix))]
fn apply_mode(permissions: &mut fs::Permissions, mode: u32) {
    permissions.set_readonly(mode & 0o200 == 0);
}
