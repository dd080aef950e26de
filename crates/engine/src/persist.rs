//! Durable file replacement.
//!
//! Writes go to a temp file in the destination directory, are flushed and
//! fsynced, then renamed over the target. The directory is synced afterwards
//! so the rename itself survives a crash.

use docsim_core::{AppError, AppResult};
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Atomically replace `path` with `bytes`.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> AppResult<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.flush()?;
    tmp.as_file().sync_all()?;

    tmp.persist(path).map_err(|e| {
        AppError::Io(std::io::Error::new(
            e.error.kind(),
            format!("Failed to move temp file into {:?}: {}", path, e.error),
        ))
    })?;

    sync_dir(dir);

    tracing::trace!("Wrote {} bytes to {:?}", bytes.len(), path);
    Ok(())
}

#[cfg(unix)]
fn sync_dir(dir: &Path) {
    match fs::File::open(dir).and_then(|d| d.sync_all()) {
        Ok(()) => {}
        Err(e) => tracing::warn!("Failed to sync directory {:?}: {}", dir, e),
    }
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) {}
