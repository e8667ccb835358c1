//! I/O boundary traits for testability
//!
//! These traits abstract persistence, allowing services to run against an
//! in-memory store in tests and a file-backed store in the CLI.

use std::io::{self, Write};
use std::path::Path;

use crate::application::ApplicationResult;
use crate::domain::{
    NewProduct, NewSupplier, Product, ProductId, RebuildStats, SupplierId, SupplierNode, TreeIndex,
};
use crate::infrastructure::ledger::Ledger;

/// Persistence contract the hierarchy core works against.
///
/// Implementations operate on a private working copy; nothing becomes
/// visible to other readers until the surrounding transaction commits.
/// Orderings are pre-order: `(tree_id, left_bound)`.
pub trait SupplierRepository {
    /// Persist a new, unplaced supplier and return its id.
    fn insert_supplier(&mut self, draft: NewSupplier) -> ApplicationResult<SupplierId>;

    /// Replace a supplier's attributes. Stored tree positions are kept;
    /// only `rebuild_index` changes them.
    fn update_supplier(&mut self, node: SupplierNode) -> ApplicationResult<()>;

    /// Remove a supplier that no child or product references any more.
    fn delete_supplier(&mut self, id: SupplierId) -> ApplicationResult<SupplierNode>;

    fn get_supplier(&self, id: SupplierId) -> ApplicationResult<SupplierNode>;

    /// Direct children by parent pointer, in pre-order.
    fn children(&self, id: SupplierId) -> Vec<SupplierNode>;

    fn all_suppliers(&self) -> Vec<SupplierNode>;

    /// Renumber the whole forest from parent pointers.
    fn rebuild_index(&mut self) -> ApplicationResult<RebuildStats>;

    fn insert_product(&mut self, draft: NewProduct) -> ApplicationResult<ProductId>;

    fn update_product(&mut self, product: Product) -> ApplicationResult<()>;

    fn delete_product(&mut self, id: ProductId) -> ApplicationResult<Product>;

    fn get_product(&self, id: ProductId) -> ApplicationResult<Product>;

    fn products_of(&self, supplier: SupplierId) -> Vec<Product>;

    fn all_products(&self) -> Vec<Product>;

    /// Snapshot of the current encoding for ancestry queries.
    fn index(&self) -> TreeIndex {
        TreeIndex::new(self.all_suppliers())
    }
}

/// Transactional ledger storage.
///
/// Reads take a snapshot and never block writers. Writes are optimistic:
/// `commit` succeeds only if no other commit happened since the snapshot
/// the transaction started from.
pub trait LedgerStore: Send + Sync {
    /// Current committed state.
    fn snapshot(&self) -> ApplicationResult<Ledger>;

    /// Publish `ledger` if the committed revision still equals
    /// `base_revision`. Returns the new revision.
    fn commit(&self, base_revision: u64, ledger: Ledger) -> ApplicationResult<u64>;
}

impl dyn LedgerStore {
    /// Run `work` against a private copy of the ledger and commit it as one
    /// unit. Any error, from `work` or from the commit, leaves the store
    /// exactly as it was.
    pub fn run_in_transaction<T, F>(&self, work: F) -> ApplicationResult<T>
    where
        F: FnOnce(&mut dyn SupplierRepository) -> ApplicationResult<T>,
    {
        let mut working = self.snapshot()?;
        let base = working.revision();
        let out = work(&mut working)?;
        self.commit(base, working)?;
        Ok(out)
    }
}

/// Filesystem abstraction for testability.
pub trait FileSystem: Send + Sync {
    /// Read file contents to string.
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Replace file content so readers see either the old or the new file.
    fn write_atomic(&self, path: &Path, content: &str) -> io::Result<()>;

    /// Check if path exists.
    fn exists(&self, path: &Path) -> bool;

    /// Create directory and all parent directories.
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Create parent directories if needed.
    fn ensure_parent(&self, path: &Path) -> io::Result<()>;
}

// ============================================================
// REAL IMPLEMENTATIONS
// ============================================================

/// Real filesystem implementation.
#[derive(Debug, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn write_atomic(&self, path: &Path, content: &str) -> io::Result<()> {
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        // Temp file in the target directory so the rename stays on one filesystem
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        std::fs::create_dir_all(path)
    }

    fn ensure_parent(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                self.create_dir_all(parent)?;
            }
        }
        Ok(())
    }
}
