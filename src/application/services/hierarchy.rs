//! Hierarchy service
//!
//! Creates, moves and removes suppliers. Every mutation runs as one store
//! transaction: guard and policy checks read the transaction's snapshot,
//! writes go to its private copy, and the forest is renumbered before the
//! commit so no reader ever sees a half-rebuilt encoding.

use std::collections::HashSet;
use std::sync::Arc;

use itertools::Itertools;
use tracing::{debug, info, instrument, warn};

use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::guard::{self, Proposal};
use crate::domain::policy::{self, Deletability};
use crate::domain::tree_index;
use crate::domain::{
    Address, Amount, Blocker, DomainError, EntityKind, NewSupplier, RebuildStats, SupplierFilter,
    SupplierId, SupplierNode, SupplierPatch, TreeIndex,
};
use crate::infrastructure::traits::{LedgerStore, SupplierRepository};

/// A candidate of a bulk delete that the debt policy kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletionRefusal {
    pub node: SupplierNode,
    pub blocker: Blocker,
}

impl DeletionRefusal {
    /// The error a single delete of this node would have reported.
    pub fn to_error(&self) -> DomainError {
        DomainError::DeletionBlocked {
            node: self.node.name.clone(),
            blocker: self.blocker.clone(),
        }
    }
}

/// Outcome of a bulk delete.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkDeletion {
    /// Removed suppliers, pre-order of the pre-batch forest
    pub deleted: Vec<SupplierNode>,
    pub refused: Vec<DeletionRefusal>,
}

/// Service maintaining the supplier forest.
pub struct HierarchyService {
    store: Arc<dyn LedgerStore>,
    verify_on_commit: bool,
}

impl HierarchyService {
    pub fn new(store: Arc<dyn LedgerStore>, verify_on_commit: bool) -> Self {
        Self {
            store,
            verify_on_commit,
        }
    }

    /// Run `work` in a transaction, checking the encoding before commit.
    fn transact<T, F>(&self, work: F) -> ApplicationResult<T>
    where
        F: FnOnce(&mut dyn SupplierRepository) -> ApplicationResult<T>,
    {
        let verify = self.verify_on_commit;
        self.store.run_in_transaction(|repo| {
            let out = work(repo)?;
            if verify {
                tree_index::verify(repo.all_suppliers().iter())?;
            }
            Ok(out)
        })
    }

    /// Committed forest as a read-only snapshot.
    pub fn forest(&self) -> ApplicationResult<TreeIndex> {
        Ok(self.store.snapshot()?.index())
    }

    fn lookup(index: &TreeIndex, id: SupplierId) -> ApplicationResult<&SupplierNode> {
        index
            .get(id)
            .ok_or_else(|| DomainError::not_found(EntityKind::Supplier, id).into())
    }

    fn ensure_parent_exists(index: &TreeIndex, parent: Option<SupplierId>) -> ApplicationResult<()> {
        match parent {
            Some(p) if index.get(p).is_none() => {
                Err(DomainError::not_found(EntityKind::Parent, p).into())
            }
            _ => Ok(()),
        }
    }

    /// No two suppliers share country, city, name and email.
    fn ensure_unique(
        index: &TreeIndex,
        own_id: Option<SupplierId>,
        name: &str,
        email: &str,
        address: &Address,
    ) -> ApplicationResult<()> {
        let clash = index.iter().any(|n| {
            Some(n.id) != own_id
                && n.address.country == address.country
                && n.address.city == address.city
                && n.name == name
                && n.email == email
        });
        if clash {
            return Err(DomainError::validation(
                "name",
                "supplier with this country, city, name and email already exists",
            )
            .into());
        }
        Ok(())
    }

    /// Create a supplier, as a new root or below an existing parent.
    #[instrument(level = "debug", skip(self, draft), fields(name = %draft.name))]
    pub fn create(&self, draft: NewSupplier) -> ApplicationResult<SupplierNode> {
        guard::validate_new_supplier(&draft)?;
        let created = self.transact(|repo| {
            let index = repo.index();
            guard::check(&Proposal::for_create(&draft), &index)?;
            Self::ensure_parent_exists(&index, draft.parent)?;
            Self::ensure_unique(&index, None, &draft.name, &draft.email, &draft.address)?;

            let id = repo.insert_supplier(draft)?;
            repo.rebuild_index()?;
            repo.get_supplier(id)
        })?;
        info!(
            "created supplier {} '{}' in tree {} at level {}",
            created.id,
            created.name,
            created.tree_id(),
            created.depth()
        );
        Ok(created)
    }

    /// Partial update. A changed parent moves the whole subtree.
    #[instrument(level = "debug", skip(self, patch))]
    pub fn update(&self, id: SupplierId, patch: SupplierPatch) -> ApplicationResult<SupplierNode> {
        let updated = self.transact(|repo| {
            let index = repo.index();
            let current = Self::lookup(&index, id)?;

            let mut next = current.clone();
            next.apply_fields(&patch);
            guard::validate_supplier(&next)?;

            let parent = patch.parent.unwrap_or(current.parent);
            Self::ensure_parent_exists(&index, parent)?;
            let proposal = Proposal {
                current: Some(current),
                name: &next.name,
                category: next.category,
                parent,
                debt: patch.debt.unwrap_or(current.debt),
                debt_supplied: patch.debt.is_some(),
            };
            guard::check(&proposal, &index)?;
            Self::ensure_unique(&index, Some(id), &next.name, &next.email, &next.address)?;

            if parent != current.parent {
                debug!(
                    "update: moving {} from {:?} to {:?} with {} descendants",
                    id,
                    current.parent,
                    parent,
                    current.position().descendant_count()
                );
            }
            next.parent = parent;
            repo.update_supplier(next)?;
            repo.rebuild_index()?;
            repo.get_supplier(id)
        })?;
        info!("updated supplier {} '{}'", updated.id, updated.name);
        Ok(updated)
    }

    /// Attach `id` below `new_parent`, or make it a root.
    pub fn reparent(
        &self,
        id: SupplierId,
        new_parent: Option<SupplierId>,
    ) -> ApplicationResult<SupplierNode> {
        self.update(
            id,
            SupplierPatch {
                parent: Some(new_parent),
                ..SupplierPatch::default()
            },
        )
    }

    /// Policy verdict for deleting `id`, without deleting.
    pub fn can_delete(&self, id: SupplierId) -> ApplicationResult<Deletability> {
        let index = self.forest()?;
        let node = Self::lookup(&index, id)?;
        Ok(policy::can_delete(node, index.children_of(node)))
    }

    /// Delete a supplier, promoting its children to its parent and removing
    /// its products.
    #[instrument(level = "debug", skip(self))]
    pub fn delete(&self, id: SupplierId) -> ApplicationResult<SupplierNode> {
        let deleted = self.transact(|repo| {
            let index = repo.index();
            let node = Self::lookup(&index, id)?;
            if let Err(e) = policy::can_delete(node, index.children_of(node)).into_result(node) {
                warn!("delete refused: {}", e);
                return Err(e.into());
            }
            Self::remove_promoting(repo, node, node.parent)?;
            repo.rebuild_index()?;
            Ok(node.clone())
        })?;
        info!("deleted supplier {} '{}'", deleted.id, deleted.name);
        Ok(deleted)
    }

    /// Delete several suppliers at once.
    ///
    /// Each candidate is judged against the forest as it was before the
    /// batch. Refused candidates stay untouched and are reported; the rest
    /// are removed and the forest is renumbered once. An unknown id fails
    /// the whole batch.
    #[instrument(level = "debug", skip(self))]
    pub fn delete_many(&self, ids: &[SupplierId]) -> ApplicationResult<BulkDeletion> {
        let outcome = self.transact(|repo| {
            let index = repo.index();
            let mut allowed = Vec::new();
            let mut refused = Vec::new();

            for &id in ids.iter().unique() {
                let node = Self::lookup(&index, id)?;
                match policy::can_delete(node, index.children_of(node)) {
                    Deletability::Allowed => allowed.push(node),
                    Deletability::Blocked(blocker) => {
                        warn!(
                            "delete_many: {} blocked by {}",
                            node.id,
                            blocker.blocking_id()
                        );
                        refused.push(DeletionRefusal {
                            node: node.clone(),
                            blocker,
                        });
                    }
                }
            }

            allowed.sort_by_key(|n| (n.tree_id(), n.left_bound()));
            let removed: HashSet<SupplierId> = allowed.iter().map(|n| n.id).collect();
            // Deepest first, so every promotion target still exists
            for node in allowed.iter().rev() {
                let target = policy::surviving_parent(node, &removed, &index);
                Self::remove_promoting(repo, node, target)?;
            }
            if !allowed.is_empty() {
                repo.rebuild_index()?;
            }

            Ok(BulkDeletion {
                deleted: allowed.into_iter().cloned().collect(),
                refused,
            })
        })?;
        info!(
            "delete_many: {} deleted, {} refused",
            outcome.deleted.len(),
            outcome.refused.len()
        );
        Ok(outcome)
    }

    /// Promote children to `new_parent`, drop owned products, drop the node.
    fn remove_promoting(
        repo: &mut dyn SupplierRepository,
        node: &SupplierNode,
        new_parent: Option<SupplierId>,
    ) -> ApplicationResult<()> {
        for mut child in repo.children(node.id) {
            debug!("promote: {} from {} to {:?}", child.id, node.id, new_parent);
            child.parent = new_parent;
            repo.update_supplier(child)?;
        }
        for product in repo.products_of(node.id) {
            repo.delete_product(product.id)?;
            debug!("cascade: product {} of {}", product.id, node.id);
        }
        repo.delete_supplier(node.id)?;
        Ok(())
    }

    /// The dedicated debt-clearing action. All listed suppliers or none.
    #[instrument(level = "debug", skip(self))]
    pub fn clear_debt(&self, ids: &[SupplierId]) -> ApplicationResult<Vec<SupplierNode>> {
        let cleared = self.transact(|repo| {
            let mut cleared = Vec::with_capacity(ids.len());
            for &id in ids.iter().unique() {
                let mut node = repo.get_supplier(id)?;
                node.debt = Amount::ZERO;
                repo.update_supplier(node)?;
                cleared.push(repo.get_supplier(id)?);
            }
            Ok(cleared)
        })?;
        info!("cleared debt of {} suppliers", cleared.len());
        Ok(cleared)
    }

    /// Renumber the whole forest from parent pointers.
    pub fn rebuild(&self) -> ApplicationResult<RebuildStats> {
        let stats = self.transact(|repo| repo.rebuild_index())?;
        info!("rebuilt {} nodes in {} trees", stats.nodes, stats.trees);
        Ok(stats)
    }

    /// Check the committed encoding against the parent pointers.
    pub fn verify(&self) -> ApplicationResult<()> {
        let ledger = self.store.snapshot()?;
        tree_index::verify(ledger.all_suppliers().iter()).map_err(ApplicationError::from)
    }

    pub fn get(&self, id: SupplierId) -> ApplicationResult<SupplierNode> {
        self.store.snapshot()?.get_supplier(id)
    }

    /// Suppliers matching `filter`, in pre-order.
    pub fn list(&self, filter: &SupplierFilter) -> ApplicationResult<Vec<SupplierNode>> {
        Ok(self
            .store
            .snapshot()?
            .all_suppliers()
            .into_iter()
            .filter(|n| filter.matches(n))
            .collect())
    }

    pub fn children(&self, id: SupplierId) -> ApplicationResult<Vec<SupplierNode>> {
        let index = self.forest()?;
        let node = Self::lookup(&index, id)?;
        Ok(index.children_of(node).cloned().collect())
    }

    pub fn descendants(&self, id: SupplierId) -> ApplicationResult<Vec<SupplierNode>> {
        let index = self.forest()?;
        let node = Self::lookup(&index, id)?;
        Ok(index.descendants_of(node).cloned().collect())
    }

    /// Chain from the root down to the node's parent.
    pub fn ancestors(&self, id: SupplierId) -> ApplicationResult<Vec<SupplierNode>> {
        let index = self.forest()?;
        let node = Self::lookup(&index, id)?;
        Ok(index.ancestors_of(node).into_iter().cloned().collect())
    }
}
