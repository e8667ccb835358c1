//! Infrastructure layer: I/O implementations and DI container
//!
//! This layer implements the persistence traits and wires up services.

pub mod di;
pub mod error;
pub mod ledger;
pub mod lock;
pub mod store;
pub mod traits;

pub use error::InfraError;
pub use ledger::Ledger;
pub use lock::LedgerLock;
pub use store::{FileLedgerStore, InMemoryLedgerStore};
pub use traits::{FileSystem, LedgerStore, RealFileSystem, SupplierRepository};
