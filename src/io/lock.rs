use std::fs::{self, File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Default wait before giving up on a held store lock
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

const LOCK_FILE: &str = ".lock";
const RETRY_INTERVAL: Duration = Duration::from_millis(10);

/// Exclusive advisory lock over a workspace's collection files, held for
/// one read-modify-write cycle.
///
/// The holder writes its pid into the lock file so a waiting process can
/// say who it is waiting on.
pub struct StoreLock {
    file: File,
    path: PathBuf,
}

/// Error type for lock operations
#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("could not create lock file at {path}: {source}")]
    CreateError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("timed out waiting for {path} (held by {holder})")]
    Timeout { path: PathBuf, holder: String },
}

impl StoreLock {
    /// Lock `store_dir`, retrying until `timeout` has passed.
    pub fn acquire(store_dir: &Path, timeout: Duration) -> Result<Self, LockError> {
        let path = store_dir.join(LOCK_FILE);
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .map_err(|source| LockError::CreateError {
                path: path.clone(),
                source,
            })?;

        let deadline = Instant::now() + timeout;
        while !try_flock(&file) {
            if Instant::now() >= deadline {
                let holder = fs::read_to_string(&path)
                    .ok()
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .map_or_else(|| "another sp process".to_string(), |pid| format!("pid {}", pid));
                return Err(LockError::Timeout { path, holder });
            }
            std::thread::sleep(RETRY_INTERVAL);
        }

        let mut lock = StoreLock { file, path };
        lock.record_holder();
        tracing::trace!(path = %lock.path.display(), "store lock acquired");
        Ok(lock)
    }

    pub fn acquire_default(store_dir: &Path) -> Result<Self, LockError> {
        Self::acquire(store_dir, DEFAULT_LOCK_TIMEOUT)
    }

    fn record_holder(&mut self) {
        let written = self
            .file
            .set_len(0)
            .and_then(|_| self.file.seek(SeekFrom::Start(0)))
            .and_then(|_| write!(self.file, "{}", std::process::id()));
        if let Err(e) = written {
            tracing::debug!(error = %e, "could not record lock holder");
        }
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        // The flock goes away with the descriptor
        let _ = fs::remove_file(&self.path);
    }
}

#[cfg(unix)]
fn try_flock(file: &File) -> bool {
    use std::os::unix::io::AsRawFd;
    // SAFETY: the descriptor is owned by `file` and stays open for the call
    unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) == 0 }
}

#[cfg(not(unix))]
fn try_flock(_file: &File) -> bool {
    true
}
