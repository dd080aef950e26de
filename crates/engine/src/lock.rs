//! Cross-process rebuild lock.
//!
//! An exclusive advisory lock (`flock` on Unix, `LockFileEx` on Windows) on
//! `meta.json.lock`. Acquisition is polled until a bounded timeout; on
//! expiry the caller abandons its run. The lock file itself is never
//! removed, only unlocked.

use docsim_core::config::IndexConfig;
use docsim_core::{AppError, AppResult};
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Named lock guarding index/metadata replacement.
#[derive(Debug, Clone)]
pub struct RebuildLock {
    path: PathBuf,
    timeout: Duration,
    poll_interval: Duration,
}

/// Held lock; released on drop.
#[derive(Debug)]
pub struct LockGuard {
    file: File,
    path: PathBuf,
}

/// Result of a bounded acquisition.
#[derive(Debug)]
pub enum LockAttempt {
    Acquired(LockGuard),
    TimedOut { waited: Duration },
}

impl RebuildLock {
    pub fn new(path: impl Into<PathBuf>, timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            path: path.into(),
            timeout,
            poll_interval: poll_interval.max(Duration::from_millis(1)),
        }
    }

    /// Lock at `path` with the configured timeout and poll interval.
    pub fn from_config(path: impl Into<PathBuf>, config: &IndexConfig) -> Self {
        Self::new(
            path,
            Duration::from_secs(config.lock_timeout_secs),
            Duration::from_millis(config.lock_poll_millis),
        )
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// One non-blocking attempt. `None` when another holder has it.
    pub fn try_acquire(&self) -> AppResult<Option<LockGuard>> {
        if let Some(dir) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)
            .map_err(|e| AppError::Lock(format!("Failed to open {:?}: {}", self.path, e)))?;

        match fs2::FileExt::try_lock_exclusive(&file) {
            Ok(()) => Ok(Some(LockGuard {
                file,
                path: self.path.clone(),
            })),
            Err(e) if e.raw_os_error() == fs2::lock_contended_error().raw_os_error() => Ok(None),
            Err(e) => Err(AppError::Lock(format!(
                "Failed to lock {:?}: {}",
                self.path, e
            ))),
        }
    }

    /// Poll until acquired or the timeout elapses.
    pub async fn acquire(&self) -> AppResult<LockAttempt> {
        let started = Instant::now();

        loop {
            if let Some(guard) = self.try_acquire()? {
                tracing::info!(
                    lock = ?self.path,
                    waited_ms = started.elapsed().as_millis() as u64,
                    "Rebuild lock acquired"
                );
                return Ok(LockAttempt::Acquired(guard));
            }

            let waited = started.elapsed();
            if waited >= self.timeout {
                tracing::warn!(
                    lock = ?self.path,
                    waited_secs = waited.as_secs_f64(),
                    "Rebuild lock not acquired within timeout"
                );
                return Ok(LockAttempt::TimedOut { waited });
            }

            let remaining = self.timeout - waited;
            tokio::time::sleep(self.poll_interval.min(remaining)).await;
        }
    }
}

impl LockGuard {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if let Err(e) = fs2::FileExt::unlock(&self.file) {
            tracing::warn!("Failed to unlock {:?}: {}", self.path, e);
        } else {
            tracing::debug!(lock = ?self.path, "Rebuild lock released");
        }
    }
}
