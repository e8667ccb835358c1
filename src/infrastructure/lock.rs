//! Cross-process exclusive lock guarding ledger commits.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, trace};

const POLL_INTERVAL: Duration = Duration::from_millis(10);
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Exclusive advisory lock on a lock file, held until the guard is dropped.
///
/// The OS releases the lock when the file descriptor closes, so a crashed
/// holder never leaves the ledger locked.
pub struct LedgerLock {
    _file: File,
    path: PathBuf,
}

impl std::fmt::Debug for LedgerLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerLock")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl LedgerLock {
    /// Wait up to the default timeout for the lock at `path`.
    pub fn acquire(path: &Path) -> io::Result<Self> {
        Self::acquire_within(path, DEFAULT_TIMEOUT)
    }

    /// Wait up to `timeout` for the lock at `path`, creating the lock file
    /// if needed. Fails with `TimedOut` when another holder keeps it.
    pub fn acquire_within(path: &Path, timeout: Duration) -> io::Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        let start = Instant::now();
        loop {
            if try_flock_exclusive(&file)? {
                trace!("lock acquired: {}", path.display());
                return Ok(Self {
                    _file: file,
                    path: path.to_path_buf(),
                });
            }
            if start.elapsed() >= timeout {
                debug!("lock timeout: {} after {:?}", path.display(), timeout);
                return Err(io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("ledger is locked by another process: {}", path.display()),
                ));
            }
            thread::sleep(POLL_INTERVAL);
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Returns `Ok(false)` if another open file description holds the lock.
#[cfg(unix)]
fn try_flock_exclusive(file: &File) -> io::Result<bool> {
    use std::os::unix::io::AsRawFd;

    loop {
        // SAFETY: the descriptor is owned by `file`, which outlives the call.
        let result = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
        if result == 0 {
            return Ok(true);
        }
        let err = io::Error::last_os_error();
        match err.kind() {
            io::ErrorKind::WouldBlock => return Ok(false),
            io::ErrorKind::Interrupted => continue,
            _ if err.raw_os_error() == Some(libc::EWOULDBLOCK) => return Ok(false),
            _ => return Err(err),
        }
    }
}

#[cfg(not(unix))]
fn try_flock_exclusive(file: &File) -> io::Result<bool> {
    let _ = file;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[cfg(unix)]
    #[test]
    fn given_held_lock_when_acquiring_again_then_times_out() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ledger.toml.lock");
        let held = LedgerLock::acquire(&path).unwrap();

        let err = LedgerLock::acquire_within(&path, Duration::from_millis(50)).unwrap_err();

        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
        assert_eq!(held.path(), path.as_path());
    }

    #[test]
    fn given_released_lock_when_acquiring_then_succeeds() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ledger.toml.lock");
        drop(LedgerLock::acquire(&path).unwrap());

        assert!(LedgerLock::acquire_within(&path, Duration::from_millis(50)).is_ok());
    }
}
