//! Advisory run lock
//!
//! Two migration runs against the same database file must not interleave
//! their read-diff-apply sequences. The lock is an exclusive `fs2` lock on a
//! sidecar file (`<database>.lock`), released when the guard is dropped.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use fs2::FileExt;

use crate::domain::result::{Error, Result};

/// Poll interval while waiting for another holder to release the lock
const POLL_INTERVAL_MS: u64 = 50;

/// Exclusive lock guarding one database file
#[derive(Debug)]
pub struct RunLock {
    file: File,
    path: PathBuf,
}

impl RunLock {
    /// Path of the lock file for a database file
    pub fn lock_path(db_path: &Path) -> PathBuf {
        let mut name = db_path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".lock");
        db_path.with_file_name(name)
    }

    /// Acquire the lock, waiting at most `timeout`
    pub fn acquire(db_path: &Path, timeout: Duration) -> Result<Self> {
        let path = Self::lock_path(db_path);
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)?;

        let start = Instant::now();
        let mut waited = false;
        loop {
            match FileExt::try_lock_exclusive(&file) {
                Ok(()) => {
                    if waited {
                        tracing::info!(lock = %path.display(), waited_ms = start.elapsed().as_millis() as u64, "run lock acquired");
                    }
                    return Ok(Self { file, path });
                }
                Err(e) if e.kind() == fs2::lock_contended_error().kind() => {
                    if start.elapsed() >= timeout {
                        return Err(Error::Lock(format!(
                            "another migration run holds {} (waited {}ms)",
                            path.display(),
                            start.elapsed().as_millis()
                        )));
                    }
                    if !waited {
                        tracing::warn!(lock = %path.display(), "waiting for another migration run to finish");
                        waited = true;
                    }
                    thread::sleep(Duration::from_millis(POLL_INTERVAL_MS));
                }
                Err(e) => return Err(Error::Lock(format!("{}: {}", path.display(), e))),
            }
        }
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            tracing::warn!(lock = %self.path.display(), error = %e, "failed to release run lock");
        }
    }
}
