//! Application services
//!
//! Concrete service implementations that orchestrate domain logic.
//! Services depend on the `LedgerStore` boundary trait but are themselves
//! concrete structs, not traits.

mod hierarchy;
mod product;

pub use hierarchy::{BulkDeletion, DeletionRefusal, HierarchyService};
pub use product::ProductService;
