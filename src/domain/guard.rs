//! Invariant guard: pure validation of a proposed supplier state.
//!
//! Nothing here mutates; callers run the guard inside their transaction
//! before the first write.

use std::sync::OnceLock;

use regex::Regex;

use crate::domain::amount::Amount;
use crate::domain::entities::{Category, NewSupplier, SupplierId, SupplierNode};
use crate::domain::error::{DomainError, DomainResult, InvariantRule};
use crate::domain::tree_index::TreeIndex;

const MAX_TEXT: usize = 100;
const MAX_HOUSE_NUMBER: usize = 10;
const MAX_EMAIL: usize = 254;

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern is a valid regex")
    })
}

/// The state a create or update would commit.
#[derive(Debug, Clone)]
pub struct Proposal<'a> {
    /// Existing node for updates, `None` for creates
    pub current: Option<&'a SupplierNode>,
    pub name: &'a str,
    pub category: Category,
    pub parent: Option<SupplierId>,
    pub debt: Amount,
    /// Whether the request carried a debt value at all
    pub debt_supplied: bool,
}

impl<'a> Proposal<'a> {
    pub fn for_create(draft: &'a NewSupplier) -> Self {
        Self {
            current: None,
            name: &draft.name,
            category: draft.category,
            parent: draft.parent,
            debt: draft.debt,
            debt_supplied: true,
        }
    }
}

/// Reject blank text, over-long fields and malformed emails.
pub fn validate_text_fields(
    name: &str,
    email: &str,
    country: &str,
    city: &str,
    street: &str,
    house_number: &str,
) -> DomainResult<()> {
    not_blank("name", name, MAX_TEXT)?;
    validate_email(email)?;
    not_blank("country", country, MAX_TEXT)?;
    not_blank("city", city, MAX_TEXT)?;
    not_blank("street", street, MAX_TEXT)?;
    not_blank("house_number", house_number, MAX_HOUSE_NUMBER)?;
    Ok(())
}

pub fn validate_new_supplier(draft: &NewSupplier) -> DomainResult<()> {
    validate_text_fields(
        &draft.name,
        &draft.email,
        &draft.address.country,
        &draft.address.city,
        &draft.address.street,
        &draft.address.house_number,
    )
}

pub fn validate_supplier(node: &SupplierNode) -> DomainResult<()> {
    validate_text_fields(
        &node.name,
        &node.email,
        &node.address.country,
        &node.address.city,
        &node.address.street,
        &node.address.house_number,
    )
}

pub fn validate_product(name: &str, model: &str) -> DomainResult<()> {
    not_blank("name", name, MAX_TEXT)?;
    not_blank("model", model, MAX_TEXT)?;
    Ok(())
}

fn not_blank(field: &'static str, value: &str, max: usize) -> DomainResult<()> {
    if value.trim().is_empty() {
        return Err(DomainError::validation(
            field,
            "this field may not be blank or whitespace only",
        ));
    }
    if value.chars().count() > max {
        return Err(DomainError::validation(
            field,
            format!("ensure this field has no more than {max} characters"),
        ));
    }
    Ok(())
}

fn validate_email(email: &str) -> DomainResult<()> {
    if email.chars().count() > MAX_EMAIL {
        return Err(DomainError::validation(
            "email",
            format!("ensure this field has no more than {MAX_EMAIL} characters"),
        ));
    }
    if !email_regex().is_match(email) {
        return Err(DomainError::validation("email", "enter a valid email address"));
    }
    Ok(())
}

/// Evaluate the hierarchy rules in order, first failure wins:
///
/// 1. factory with a parent
/// 2. no parent but positive debt
/// 3. negative or out-of-range debt
/// 4. parent is the node itself or one of its descendants
/// 5. (updates) debt changed through the general update path
pub fn check(proposal: &Proposal<'_>, index: &TreeIndex) -> DomainResult<()> {
    let name = Some(proposal.name);

    if !proposal.category.may_have_parent() && proposal.parent.is_some() {
        return Err(DomainError::invariant(InvariantRule::FactoryWithParent, name));
    }

    if proposal.parent.is_none() && proposal.debt.is_positive() {
        return Err(DomainError::invariant(InvariantRule::RootlessWithDebt, name));
    }

    if proposal.debt.is_negative() {
        return Err(DomainError::validation(
            "debt",
            "ensure this value is greater than or equal to 0",
        ));
    }
    if !proposal.debt.in_range() {
        return Err(DomainError::validation("debt", "amount out of range"));
    }

    if let (Some(current), Some(parent)) = (proposal.current, proposal.parent) {
        check_cycle(current, parent, index)?;
    }

    if let Some(current) = proposal.current {
        if proposal.debt_supplied && proposal.debt != current.debt {
            return Err(DomainError::invariant(InvariantRule::DebtNotEditable, name));
        }
    }
    Ok(())
}

/// Fail with `Cycle` if `parent` is `node` or lies within `node`'s subtree.
pub fn check_cycle(node: &SupplierNode, parent: SupplierId, index: &TreeIndex) -> DomainResult<()> {
    if index.is_self_or_descendant(node, parent) {
        let parent_name = index
            .get(parent)
            .map(|p| p.name.clone())
            .unwrap_or_else(|| parent.to_string());
        return Err(DomainError::Cycle {
            node: node.name.clone(),
            parent: parent_name,
        });
    }
    Ok(())
}
