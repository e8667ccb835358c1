//! Domain entities: core data structures

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::amount::Amount;
use crate::domain::error::DomainError;

/// Opaque supplier identifier, assigned by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SupplierId(pub u64);

/// Opaque product identifier, assigned by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub u64);

impl fmt::Display for SupplierId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<SupplierId> for u64 {
    fn from(id: SupplierId) -> Self {
        id.0
    }
}

impl From<ProductId> for u64 {
    fn from(id: ProductId) -> Self {
        id.0
    }
}

impl FromStr for SupplierId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(SupplierId)
    }
}

impl FromStr for ProductId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(ProductId)
    }
}

/// Kind of link in the delivery network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Factory,
    Retail,
    Entrepreneur,
}

impl Category {
    /// Factories head their chain; every other category may be attached.
    pub fn may_have_parent(self) -> bool {
        match self {
            Category::Factory => false,
            Category::Retail | Category::Entrepreneur => true,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Factory => "factory",
            Category::Retail => "retail",
            Category::Entrepreneur => "entrepreneur",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Category::Factory => "Factory",
            Category::Retail => "Retail chain",
            Category::Entrepreneur => "Entrepreneur",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "factory" => Ok(Category::Factory),
            "retail" => Ok(Category::Retail),
            "entrepreneur" => Ok(Category::Entrepreneur),
            other => Err(DomainError::validation(
                "category",
                format!("unknown category '{other}' (expected factory, retail or entrepreneur)"),
            )),
        }
    }
}

/// Postal address of a supplier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub country: String,
    pub city: String,
    pub street: String,
    pub house_number: String,
}

/// Structural fields of a node in the nested-set encoding.
///
/// Only `tree_index::rebuild` assigns these; everything else reads them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TreePosition {
    tree_id: u32,
    #[serde(rename = "lft")]
    left_bound: u32,
    #[serde(rename = "rght")]
    right_bound: u32,
    #[serde(rename = "level")]
    depth: u32,
}

impl TreePosition {
    pub(crate) fn new(tree_id: u32, left_bound: u32, right_bound: u32, depth: u32) -> Self {
        Self {
            tree_id,
            left_bound,
            right_bound,
            depth,
        }
    }

    pub fn tree_id(&self) -> u32 {
        self.tree_id
    }

    pub fn left_bound(&self) -> u32 {
        self.left_bound
    }

    pub fn right_bound(&self) -> u32 {
        self.right_bound
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// True if `other` lies strictly inside this interval of the same tree.
    pub fn contains(&self, other: &TreePosition) -> bool {
        self.tree_id == other.tree_id
            && self.left_bound < other.left_bound
            && other.right_bound < self.right_bound
    }

    /// Number of nodes below this one.
    pub fn descendant_count(&self) -> u32 {
        self.right_bound.saturating_sub(self.left_bound) / 2
    }
}

/// A link in the supply chain hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplierNode {
    pub id: SupplierId,
    pub category: Category,
    pub name: String,
    pub email: String,
    pub address: Address,
    pub debt: Amount,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<SupplierId>,
    #[serde(default)]
    position: TreePosition,
}

impl SupplierNode {
    /// Materialize a new, not yet placed node from its creation input.
    pub fn new(id: SupplierId, draft: NewSupplier, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            category: draft.category,
            name: draft.name,
            email: draft.email,
            address: draft.address,
            debt: draft.debt,
            created_at,
            parent: draft.parent,
            position: TreePosition::default(),
        }
    }

    pub fn position(&self) -> &TreePosition {
        &self.position
    }

    pub(crate) fn place(&mut self, position: TreePosition) {
        self.position = position;
    }

    pub fn tree_id(&self) -> u32 {
        self.position.tree_id
    }

    pub fn left_bound(&self) -> u32 {
        self.position.left_bound
    }

    pub fn right_bound(&self) -> u32 {
        self.position.right_bound
    }

    /// Distance from the root of its tree (root = 0).
    pub fn depth(&self) -> u32 {
        self.position.depth
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Intermediaries between this node and the head of its chain.
    pub fn intermediaries(&self) -> Option<u32> {
        match self.position.depth {
            0 => None,
            depth => Some(depth - 1),
        }
    }

    /// Apply the non-structural parts of a patch. Parent and debt are left
    /// to the caller, which has to run them through the guard first.
    pub(crate) fn apply_fields(&mut self, patch: &SupplierPatch) {
        if let Some(category) = patch.category {
            self.category = category;
        }
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        if let Some(email) = &patch.email {
            self.email = email.clone();
        }
        if let Some(country) = &patch.country {
            self.address.country = country.clone();
        }
        if let Some(city) = &patch.city {
            self.address.city = city.clone();
        }
        if let Some(street) = &patch.street {
            self.address.street = street.clone();
        }
        if let Some(house_number) = &patch.house_number {
            self.address.house_number = house_number.clone();
        }
    }
}

impl fmt::Display for SupplierNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.category.label(), self.name)
    }
}

/// Input for creating a supplier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSupplier {
    pub category: Category,
    pub name: String,
    pub email: String,
    pub address: Address,
    pub debt: Amount,
    pub parent: Option<SupplierId>,
}

/// Partial update of a supplier. `None` leaves a field untouched.
///
/// `parent: Some(None)` detaches the supplier to become a root.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SupplierPatch {
    pub category: Option<Category>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub street: Option<String>,
    pub house_number: Option<String>,
    pub debt: Option<Amount>,
    pub parent: Option<Option<SupplierId>>,
}

impl SupplierPatch {
    pub fn is_empty(&self) -> bool {
        *self == SupplierPatch::default()
    }
}

/// Listing filter: country is a substring search, city an exact match,
/// both case-insensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SupplierFilter {
    pub country: Option<String>,
    pub city: Option<String>,
}

impl SupplierFilter {
    pub fn matches(&self, node: &SupplierNode) -> bool {
        let country_ok = self.country.as_ref().map_or(true, |needle| {
            node.address
                .country
                .to_lowercase()
                .contains(&needle.to_lowercase())
        });
        let city_ok = self
            .city
            .as_ref()
            .map_or(true, |city| node.address.city.to_lowercase() == city.to_lowercase());
        country_ok && city_ok
    }
}

/// Product offered by exactly one supplier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub model: String,
    pub release_date: NaiveDate,
    pub supplier: SupplierId,
}

impl Product {
    pub fn new(id: ProductId, draft: NewProduct) -> Self {
        Self {
            id,
            name: draft.name,
            model: draft.model,
            release_date: draft.release_date,
            supplier: draft.supplier,
        }
    }
}

impl fmt::Display for Product {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Input for creating a product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProduct {
    pub name: String,
    pub model: String,
    pub release_date: NaiveDate,
    pub supplier: SupplierId,
}

/// Partial update of a product.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub model: Option<String>,
    pub release_date: Option<NaiveDate>,
    pub supplier: Option<SupplierId>,
}
