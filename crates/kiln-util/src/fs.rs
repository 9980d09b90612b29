//! Filesystem utilities for Kiln.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::error::UtilError;

fn io_err(path: &Path, source: std::io::Error) -> UtilError {
    UtilError::Io {
        path: path.display().to_string(),
        source,
    }
}

/// Create a directory and all parent directories if they do not exist.
///
/// # Errors
/// Returns an error if the directory cannot be created.
pub fn ensure_dir(path: &Path) -> Result<(), UtilError> {
    std::fs::create_dir_all(path).map_err(|source| io_err(path, source))
}

/// Remove a directory and all its contents. No error if the directory is absent.
///
/// # Errors
/// Returns an error if the directory exists but cannot be removed.
pub fn remove_dir_all_if_exists(path: &Path) -> Result<(), UtilError> {
    match std::fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(io_err(path, source)),
    }
}

/// Recursively copy the contents of `src` into `dest`, creating `dest` as needed.
///
/// Regular-file permission bits survive the copy, so staged configure scripts
/// stay executable.
///
/// # Errors
/// Returns an error if `src` cannot be read or any entry cannot be copied.
pub fn copy_tree(src: &Path, dest: &Path) -> Result<(), UtilError> {
    ensure_dir(dest)?;

    let entries = std::fs::read_dir(src).map_err(|source| io_err(src, source))?;
    for entry in entries {
        let entry = entry.map_err(|source| io_err(src, source))?;
        let from = entry.path();
        let to = dest.join(entry.file_name());

        if from.is_dir() {
            copy_tree(&from, &to)?;
        } else {
            std::fs::copy(&from, &to).map_err(|source| io_err(&to, source))?;
        }
    }

    Ok(())
}

/// Mark a file executable (0o755 on Unix). No-op elsewhere.
///
/// # Errors
/// Returns an error if the permissions cannot be changed.
pub fn set_executable(path: &Path) -> Result<(), UtilError> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
            .map_err(|source| io_err(path, source))?;
    }
    Ok(())
}

/// Collect all regular files under `dir`, recursively, sorted by path.
///
/// Returns an empty list when `dir` does not exist.
///
/// # Errors
/// Returns an error if an existing directory cannot be read.
pub fn walk_files(dir: &Path) -> Result<Vec<PathBuf>, UtilError> {
    let mut files = Vec::new();
    if dir.exists() {
        walk_files_recursive(dir, &mut files)?;
    }
    files.sort();
    Ok(files)
}

fn walk_files_recursive(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), UtilError> {
    let entries = std::fs::read_dir(dir).map_err(|source| io_err(dir, source))?;

    for entry in entries {
        let entry = entry.map_err(|source| io_err(dir, source))?;
        let path = entry.path();

        if path.is_dir() {
            walk_files_recursive(&path, out)?;
        } else {
            out.push(path);
        }
    }

    Ok(())
}

/// Modification time of `path`, or `None` if it is missing or unreadable.
pub fn mtime(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// Newest modification time among all files under `dir`.
///
/// Unreadable entries are skipped; a staleness check treats the affected
/// outputs as missing instead.
///
/// # Errors
/// Returns an error if an existing directory cannot be read.
pub fn newest_mtime(dir: &Path) -> Result<Option<SystemTime>, UtilError> {
    let files = walk_files(dir)?;
    Ok(files.iter().filter_map(|p| mtime(p)).max())
}
