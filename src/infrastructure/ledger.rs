//! The persisted ledger: one record per supplier and product.
//!
//! A `Ledger` is both the on-disk layout and the in-memory working copy a
//! transaction mutates through `SupplierRepository`.

use std::collections::BTreeMap;

use chrono::Utc;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::tree_index;
use crate::domain::{
    DomainError, EntityKind, NewProduct, NewSupplier, Product, ProductId, RebuildStats,
    SupplierId, SupplierNode,
};
use crate::infrastructure::traits::SupplierRepository;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ledger {
    /// Bumped by every commit
    #[serde(default)]
    revision: u64,
    #[serde(default)]
    last_supplier_id: u64,
    #[serde(default)]
    last_product_id: u64,
    #[serde(default, with = "records")]
    suppliers: BTreeMap<SupplierId, SupplierNode>,
    #[serde(default, with = "records")]
    products: BTreeMap<ProductId, Product>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub(crate) fn set_revision(&mut self, revision: u64) {
        self.revision = revision;
    }

    pub fn supplier_count(&self) -> usize {
        self.suppliers.len()
    }

    pub fn product_count(&self) -> usize {
        self.products.len()
    }

    fn supplier_not_found(id: SupplierId) -> ApplicationError {
        DomainError::not_found(EntityKind::Supplier, id).into()
    }

    fn product_not_found(id: ProductId) -> ApplicationError {
        DomainError::not_found(EntityKind::Product, id).into()
    }

    fn preorder<'a>(nodes: impl Iterator<Item = &'a SupplierNode>) -> Vec<SupplierNode> {
        nodes
            .sorted_by_key(|n| (n.tree_id(), n.left_bound(), n.id))
            .cloned()
            .collect()
    }
}

impl SupplierRepository for Ledger {
    fn insert_supplier(&mut self, draft: NewSupplier) -> ApplicationResult<SupplierId> {
        if let Some(parent) = draft.parent {
            if !self.suppliers.contains_key(&parent) {
                return Err(DomainError::not_found(EntityKind::Parent, parent).into());
            }
        }
        self.last_supplier_id += 1;
        let id = SupplierId(self.last_supplier_id);
        self.suppliers
            .insert(id, SupplierNode::new(id, draft, Utc::now()));
        trace!("insert_supplier: {}", id);
        Ok(id)
    }

    fn update_supplier(&mut self, mut node: SupplierNode) -> ApplicationResult<()> {
        if let Some(parent) = node.parent {
            if !self.suppliers.contains_key(&parent) {
                return Err(DomainError::not_found(EntityKind::Parent, parent).into());
            }
        }
        let stored = self
            .suppliers
            .get_mut(&node.id)
            .ok_or_else(|| Self::supplier_not_found(node.id))?;
        node.place(*stored.position());
        *stored = node;
        Ok(())
    }

    fn delete_supplier(&mut self, id: SupplierId) -> ApplicationResult<SupplierNode> {
        if !self.suppliers.contains_key(&id) {
            return Err(Self::supplier_not_found(id));
        }
        if let Some(child) = self.suppliers.values().find(|n| n.parent == Some(id)) {
            return Err(ApplicationError::constraint(format!(
                "supplier {} is still the parent of {}",
                id, child.id
            )));
        }
        if let Some(product) = self.products.values().find(|p| p.supplier == id) {
            return Err(ApplicationError::constraint(format!(
                "supplier {} still owns product {}",
                id, product.id
            )));
        }
        trace!("delete_supplier: {}", id);
        self.suppliers
            .remove(&id)
            .ok_or_else(|| Self::supplier_not_found(id))
    }

    fn get_supplier(&self, id: SupplierId) -> ApplicationResult<SupplierNode> {
        self.suppliers
            .get(&id)
            .cloned()
            .ok_or_else(|| Self::supplier_not_found(id))
    }

    fn children(&self, id: SupplierId) -> Vec<SupplierNode> {
        Self::preorder(self.suppliers.values().filter(|n| n.parent == Some(id)))
    }

    fn all_suppliers(&self) -> Vec<SupplierNode> {
        Self::preorder(self.suppliers.values())
    }

    fn rebuild_index(&mut self) -> ApplicationResult<RebuildStats> {
        Ok(tree_index::rebuild(self.suppliers.values_mut())?)
    }

    fn insert_product(&mut self, draft: NewProduct) -> ApplicationResult<ProductId> {
        if !self.suppliers.contains_key(&draft.supplier) {
            return Err(DomainError::not_found(EntityKind::Owner, draft.supplier).into());
        }
        self.last_product_id += 1;
        let id = ProductId(self.last_product_id);
        self.products.insert(id, Product::new(id, draft));
        trace!("insert_product: {}", id);
        Ok(id)
    }

    fn update_product(&mut self, product: Product) -> ApplicationResult<()> {
        if !self.suppliers.contains_key(&product.supplier) {
            return Err(DomainError::not_found(EntityKind::Owner, product.supplier).into());
        }
        let stored = self
            .products
            .get_mut(&product.id)
            .ok_or_else(|| Self::product_not_found(product.id))?;
        *stored = product;
        Ok(())
    }

    fn delete_product(&mut self, id: ProductId) -> ApplicationResult<Product> {
        self.products
            .remove(&id)
            .ok_or_else(|| Self::product_not_found(id))
    }

    fn get_product(&self, id: ProductId) -> ApplicationResult<Product> {
        self.products
            .get(&id)
            .cloned()
            .ok_or_else(|| Self::product_not_found(id))
    }

    fn products_of(&self, supplier: SupplierId) -> Vec<Product> {
        self.products
            .values()
            .filter(|p| p.supplier == supplier)
            .cloned()
            .collect()
    }

    fn all_products(&self) -> Vec<Product> {
        self.products.values().cloned().collect()
    }
}

/// Serialize keyed maps as plain record lists.
mod records {
    use std::collections::BTreeMap;

    use serde::de::DeserializeOwned;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use crate::domain::{Product, ProductId, SupplierId, SupplierNode};

    pub trait Keyed {
        type Key: Ord;
        fn key(&self) -> Self::Key;
    }

    impl Keyed for SupplierNode {
        type Key = SupplierId;
        fn key(&self) -> SupplierId {
            self.id
        }
    }

    impl Keyed for Product {
        type Key = ProductId;
        fn key(&self) -> ProductId {
            self.id
        }
    }

    pub fn serialize<S, V>(map: &BTreeMap<V::Key, V>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        V: Keyed + Serialize,
    {
        serializer.collect_seq(map.values())
    }

    pub fn deserialize<'de, D, V>(deserializer: D) -> Result<BTreeMap<V::Key, V>, D::Error>
    where
        D: Deserializer<'de>,
        V: Keyed + DeserializeOwned,
    {
        let records = Vec::<V>::deserialize(deserializer)?;
        Ok(records.into_iter().map(|r| (r.key(), r)).collect())
    }
}
