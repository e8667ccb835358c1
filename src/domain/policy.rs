//! Debt-based deletion policy.
//!
//! A supplier may be removed only if neither it nor any supplier on the
//! next hierarchy level still owes money. When several children carry
//! debt, the first one in pre-order is reported.

use std::collections::HashSet;

use crate::domain::entities::{SupplierId, SupplierNode};
use crate::domain::error::{Blocker, DomainError};
use crate::domain::tree_index::TreeIndex;

/// Policy verdict for a single candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Deletability {
    Allowed,
    Blocked(Blocker),
}

impl Deletability {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Deletability::Allowed)
    }

    pub fn blocker(&self) -> Option<&Blocker> {
        match self {
            Deletability::Allowed => None,
            Deletability::Blocked(blocker) => Some(blocker),
        }
    }

    /// Turn a refusal into the error surfaced to callers.
    pub fn into_result(self, node: &SupplierNode) -> Result<(), DomainError> {
        match self {
            Deletability::Allowed => Ok(()),
            Deletability::Blocked(blocker) => Err(DomainError::DeletionBlocked {
                node: node.name.clone(),
                blocker,
            }),
        }
    }
}

/// Decide whether `node` may be deleted, given its children in persistence
/// (pre-order) order. Only children exactly one level below count.
pub fn can_delete<'a, I>(node: &SupplierNode, children: I) -> Deletability
where
    I: IntoIterator<Item = &'a SupplierNode>,
{
    if node.debt.is_positive() {
        return Deletability::Blocked(Blocker::OwnDebt {
            id: node.id,
            name: node.name.clone(),
        });
    }

    let next_level = node.depth() + 1;
    children
        .into_iter()
        .find(|child| child.depth() == next_level && child.debt.is_positive())
        .map_or(Deletability::Allowed, |child| {
            Deletability::Blocked(Blocker::ChildDebt {
                id: child.id,
                name: child.name.clone(),
            })
        })
}

/// Nearest ancestor of `node` that is not in `removed`, using the parent
/// pointers of the pre-batch snapshot. This is where `node`'s children land.
pub fn surviving_parent(
    node: &SupplierNode,
    removed: &HashSet<SupplierId>,
    index: &TreeIndex,
) -> Option<SupplierId> {
    let mut parent = node.parent;
    while let Some(id) = parent {
        if !removed.contains(&id) {
            return Some(id);
        }
        parent = index.get(id).and_then(|p| p.parent);
    }
    None
}
