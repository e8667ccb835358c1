//! Ledger stores: where committed state lives.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, instrument, warn};

use crate::application::{ApplicationError, ApplicationResult, ResultExt};
use crate::infrastructure::ledger::Ledger;
use crate::infrastructure::lock::LedgerLock;
use crate::infrastructure::traits::{FileSystem, LedgerStore};

fn check_revision(base_revision: u64, current: u64) -> ApplicationResult<()> {
    if base_revision != current {
        warn!(
            "commit rejected: based on revision {}, store is at {}",
            base_revision, current
        );
        return Err(ApplicationError::Conflict {
            expected: base_revision,
            found: current,
        });
    }
    Ok(())
}

/// Volatile store, used by tests and embedding callers.
#[derive(Debug, Default)]
pub struct InMemoryLedgerStore {
    ledger: RwLock<Ledger>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ledger(ledger: Ledger) -> Self {
        Self {
            ledger: RwLock::new(ledger),
        }
    }
}

impl LedgerStore for InMemoryLedgerStore {
    fn snapshot(&self) -> ApplicationResult<Ledger> {
        Ok(self.ledger.read().clone())
    }

    fn commit(&self, base_revision: u64, mut ledger: Ledger) -> ApplicationResult<u64> {
        let mut current = self.ledger.write();
        check_revision(base_revision, current.revision())?;
        let revision = base_revision + 1;
        ledger.set_revision(revision);
        *current = ledger;
        debug!("commit: in-memory ledger at revision {}", revision);
        Ok(revision)
    }
}

/// Ledger persisted as a single TOML file.
///
/// Commits from any process are serialized by an exclusive lock on the
/// sibling `<ledger>.lock` file; the ledger is replaced atomically, so
/// readers see either the old or the new ledger.
pub struct FileLedgerStore {
    path: PathBuf,
    fs: Arc<dyn FileSystem>,
}

impl FileLedgerStore {
    pub fn new(path: impl Into<PathBuf>, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            path: path.into(),
            fs,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn lock_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(OsString::from)
            .unwrap_or_else(|| OsString::from("ledger"));
        name.push(".lock");
        self.path.with_file_name(name)
    }

    fn load(&self) -> ApplicationResult<Ledger> {
        if !self.fs.exists(&self.path) {
            debug!("load: no ledger at {}, starting empty", self.path.display());
            return Ok(Ledger::default());
        }
        let content = self
            .fs
            .read_to_string(&self.path)
            .with_path_context("read ledger", &self.path)?;
        toml::from_str(&content).with_path_context("parse ledger", &self.path)
    }
}

impl LedgerStore for FileLedgerStore {
    #[instrument(level = "trace", skip(self))]
    fn snapshot(&self) -> ApplicationResult<Ledger> {
        self.load()
    }

    #[instrument(level = "debug", skip(self, ledger))]
    fn commit(&self, base_revision: u64, mut ledger: Ledger) -> ApplicationResult<u64> {
        self.fs
            .ensure_parent(&self.path)
            .with_path_context("create ledger directory", &self.path)?;
        let lock_path = self.lock_path();
        let _lock = LedgerLock::acquire(&lock_path).with_path_context("lock ledger", &lock_path)?;
        let on_disk = self.load()?;
        check_revision(base_revision, on_disk.revision())?;

        let revision = base_revision + 1;
        ledger.set_revision(revision);
        let content =
            toml::to_string_pretty(&ledger).with_path_context("serialize ledger", &self.path)?;
        self.fs
            .write_atomic(&self.path, &content)
            .with_path_context("write ledger", &self.path)?;
        debug!("commit: {} at revision {}", self.path.display(), revision);
        Ok(revision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::traits::RealFileSystem;

    #[test]
    fn given_stale_revision_when_committing_then_conflict_and_state_kept() {
        let store = InMemoryLedgerStore::new();
        let first = store.snapshot().unwrap();
        let second = store.snapshot().unwrap();

        assert_eq!(store.commit(first.revision(), first).unwrap(), 1);
        let err = store.commit(second.revision(), second).unwrap_err();

        assert_eq!(err.code(), "conflict");
        assert_eq!(store.snapshot().unwrap().revision(), 1);
    }

    #[test]
    fn given_ledger_path_when_locking_then_lock_file_is_sibling() {
        let store = FileLedgerStore::new("/var/lib/supplynet/ledger.toml", Arc::new(RealFileSystem));

        assert_eq!(
            store.lock_path(),
            PathBuf::from("/var/lib/supplynet/ledger.toml.lock")
        );
    }
}
