//! Domain layer: entities and business logic
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod amount;
pub mod arena;
pub mod entities;
pub mod error;
pub mod guard;
pub mod policy;
pub mod tree_index;

pub use amount::Amount;
pub use arena::{NodeData, TreeArena, TreeNode, Visit};
pub use entities::*;
pub use error::{Blocker, DomainError, DomainResult, EntityKind, InvariantRule};
pub use policy::Deletability;
pub use tree_index::{Descendants, RebuildStats, TreeIndex};

