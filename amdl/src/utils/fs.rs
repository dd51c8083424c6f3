//! Filesystem helpers shared across modules.
//!
//! These helpers provide consistent error context (operation + path) and
//! reduce duplicated `create_dir_all` / parent-directory checks.

use std::path::{Component, Path};

use crate::{Error, Result};

/// Ensure a directory exists, creating it (recursively) if needed.
pub async fn ensure_dir_all(path: &Path) -> Result<()> {
    tokio::fs::create_dir_all(path)
        .await
        .map_err(|e| Error::io_path("creating directory", path, e))
}

/// Ensure the parent directory of a file path exists.
pub async fn ensure_parent_dir(path: &Path) -> Result<()> {
    let Some(parent) = path.parent() else {
        return Ok(());
    };
    ensure_dir_all(parent).await
}

/// Ensure a directory exists (synchronous variant).
pub fn ensure_dir_all_sync(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path).map_err(|e| Error::io_path("creating directory", path, e))
}

/// Ensure the parent directory of a file path exists (synchronous variant).
pub fn ensure_parent_dir_sync(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => ensure_dir_all_sync(parent),
        _ => Ok(()),
    }
}

/// Whether a regular file exists at `path`.
pub async fn file_exists(path: &Path) -> Result<bool> {
    match tokio::fs::metadata(path).await {
        Ok(meta) => Ok(meta.is_file()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(Error::io_path("checking file", path, e)),
    }
}

/// Move a finished file into place, replacing any existing one.
pub async fn rename(from: &Path, to: &Path) -> Result<()> {
    tokio::fs::rename(from, to)
        .await
        .map_err(|e| Error::io_path("renaming", from, e))
}

/// Whether `path` is relative and never climbs out of its base directory.
pub fn is_contained_relative(path: &Path) -> bool {
    !path.as_os_str().is_empty()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

/// Counts of entries removed by [`empty_dir`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RemovedEntries {
    pub files: usize,
    pub dirs: usize,
}

/// Remove every entry inside `dir`, keeping `dir` itself.
pub async fn empty_dir(dir: &Path) -> Result<RemovedEntries> {
    let mut removed = RemovedEntries::default();
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| Error::io_path("reading directory", dir, e))?;

    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| Error::io_path("reading directory", dir, e))?
    {
        let path = entry.path();
        let file_type = entry
            .file_type()
            .await
            .map_err(|e| Error::io_path("inspecting entry", &path, e))?;
        if file_type.is_dir() {
            tokio::fs::remove_dir_all(&path)
                .await
                .map_err(|e| Error::io_path("removing directory", &path, e))?;
            removed.dirs += 1;
        } else {
            tokio::fs::remove_file(&path)
                .await
                .map_err(|e| Error::io_path("removing file", &path, e))?;
            removed.files += 1;
        }
    }

    Ok(removed)
}
