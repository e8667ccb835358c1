//! Domain-level errors (no external dependencies)

use std::fmt;

use thiserror::Error;

use crate::domain::entities::SupplierId;

/// Cross-field rule a proposed supplier state violates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvariantRule {
    /// A factory heads its chain and cannot be attached to a parent.
    FactoryWithParent,
    /// A supplier without a parent owes nobody and cannot carry debt.
    RootlessWithDebt,
    /// Debt is only changed through the dedicated clearing action.
    DebtNotEditable,
}

impl InvariantRule {
    pub fn name(self) -> &'static str {
        match self {
            InvariantRule::FactoryWithParent => "factory_with_parent",
            InvariantRule::RootlessWithDebt => "rootless_with_debt",
            InvariantRule::DebtNotEditable => "debt_not_editable",
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            InvariantRule::FactoryWithParent => "factory cannot have a parent",
            InvariantRule::RootlessWithDebt => "rootless node cannot carry debt",
            InvariantRule::DebtNotEditable => "debt is not editable via general update",
        }
    }
}

impl fmt::Display for InvariantRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Why a supplier cannot be removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Blocker {
    /// The supplier itself still owes its parent.
    OwnDebt { id: SupplierId, name: String },
    /// A supplier on the next hierarchy level still owes the candidate.
    ChildDebt { id: SupplierId, name: String },
}

impl Blocker {
    pub fn blocking_id(&self) -> SupplierId {
        match self {
            Blocker::OwnDebt { id, .. } | Blocker::ChildDebt { id, .. } => *id,
        }
    }

    pub fn blocking_name(&self) -> &str {
        match self {
            Blocker::OwnDebt { name, .. } | Blocker::ChildDebt { name, .. } => name,
        }
    }

    pub fn is_own_debt(&self) -> bool {
        matches!(self, Blocker::OwnDebt { .. })
    }
}

/// What kind of entity a lookup failed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Supplier,
    Parent,
    Product,
    Owner,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EntityKind::Supplier => "supplier",
            EntityKind::Parent => "parent supplier",
            EntityKind::Product => "product",
            EntityKind::Owner => "owning supplier",
        };
        f.write_str(s)
    }
}

/// Domain errors represent business rule violations.
/// All of them are detected before any write is issued.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid {field}: {message}")]
    Validation { field: &'static str, message: String },

    #[error("{rule}")]
    Invariant { rule: InvariantRule, node: Option<String> },

    #[error("cyclic relationships are not allowed: {node} cannot be placed under {parent}")]
    Cycle { node: String, parent: String },

    #[error("{}", deletion_message(.node, .blocker))]
    DeletionBlocked { node: String, blocker: Blocker },

    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: u64 },

    #[error("tree index is inconsistent: {0}")]
    CorruptIndex(String),
}

fn deletion_message(node: &str, blocker: &Blocker) -> String {
    match blocker {
        Blocker::OwnDebt { .. } => {
            format!("cannot delete supplier {node}: it still has debt to its supplier")
        }
        Blocker::ChildDebt { name, .. } => format!(
            "cannot delete supplier {node}: its supplier {name} on the next hierarchy level has debt"
        ),
    }
}

impl DomainError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    pub fn invariant(rule: InvariantRule, node: Option<&str>) -> Self {
        Self::Invariant {
            rule,
            node: node.map(str::to_string),
        }
    }

    pub fn not_found(kind: EntityKind, id: impl Into<u64>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Stable machine-readable code for callers that map errors to responses.
    pub fn code(&self) -> &'static str {
        match self {
            DomainError::Validation { .. } => "validation_error",
            DomainError::Invariant { .. } => "invariant_violation",
            DomainError::Cycle { .. } => "cyclic_relationship",
            DomainError::DeletionBlocked { .. } => "deletion_blocked",
            DomainError::NotFound { .. } => "not_found",
            DomainError::CorruptIndex(_) => "corrupt_index",
        }
    }
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_child_blocker_when_formatting_then_names_both_suppliers() {
        let err = DomainError::DeletionBlocked {
            node: "Progress".into(),
            blocker: Blocker::ChildDebt {
                id: SupplierId(2),
                name: "Success".into(),
            },
        };
        let msg = err.to_string();
        assert!(msg.contains("Progress"));
        assert!(msg.contains("Success"));
        assert_eq!(err.code(), "deletion_blocked");
    }

    #[test]
    fn given_invariant_error_when_formatting_then_uses_rule_message() {
        let err = DomainError::invariant(InvariantRule::DebtNotEditable, Some("x"));
        assert_eq!(err.to_string(), "debt is not editable via general update");
        assert_eq!(err.code(), "invariant_violation");
    }
}
