//! Service container for dependency injection
//!
//! Wires up all services with their dependencies.

use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::application::services::{HierarchyService, ProductService};
use crate::config::Settings;
use crate::infrastructure::store::{FileLedgerStore, InMemoryLedgerStore};
use crate::infrastructure::traits::{FileSystem, LedgerStore, RealFileSystem};

/// Container holding all application services.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Filesystem abstraction
    pub fs: Arc<dyn FileSystem>,

    /// Committed ledger state
    pub store: Arc<dyn LedgerStore>,

    pub hierarchy: HierarchyService,

    pub products: ProductService,
}

impl ServiceContainer {
    /// Create a container backed by the ledger file at `ledger`.
    pub fn new(settings: Settings, ledger: &Path) -> Self {
        let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
        let store = Arc::new(FileLedgerStore::new(ledger, fs.clone()));
        debug!("ServiceContainer: ledger at {}", ledger.display());
        Self::with_deps(settings, fs, store)
    }

    /// Create a container over a volatile store.
    pub fn in_memory(settings: Settings) -> Self {
        Self::with_deps(
            settings,
            Arc::new(RealFileSystem),
            Arc::new(InMemoryLedgerStore::new()),
        )
    }

    /// Create a service container with custom dependencies (for testing).
    pub fn with_deps(
        settings: Settings,
        fs: Arc<dyn FileSystem>,
        store: Arc<dyn LedgerStore>,
    ) -> Self {
        let settings = Arc::new(settings);
        let hierarchy = HierarchyService::new(store.clone(), settings.hierarchy.verify_on_commit);
        let products = ProductService::new(store.clone());

        Self {
            settings,
            fs,
            store,
            hierarchy,
            products,
        }
    }
}
