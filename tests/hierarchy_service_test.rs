use std::sync::Arc;

use chrono::NaiveDate;
use rstest::{fixture, rstest};

use supplynet::application::services::{HierarchyService, ProductService};
use supplynet::application::ApplicationError;
use supplynet::domain::{
    Amount, Category, Deletability, DomainError, InvariantRule, NewProduct, NewSupplier,
    SupplierFilter, SupplierId, SupplierNode, SupplierPatch,
};
use supplynet::infrastructure::{InMemoryLedgerStore, LedgerStore};
use supplynet::util::testing::{draft, init_test_setup};

struct Ctx {
    store: Arc<dyn LedgerStore>,
    hierarchy: HierarchyService,
    products: ProductService,
}

impl Ctx {
    fn add(&self, name: &str, parent: Option<SupplierId>, debt_cents: i64) -> SupplierNode {
        self.hierarchy
            .create(draft(name, parent, debt_cents))
            .expect("create supplier")
    }

    fn add_retail_root(&self, name: &str) -> SupplierNode {
        self.hierarchy
            .create(NewSupplier {
                category: Category::Retail,
                ..draft(name, None, 0)
            })
            .expect("create retail root")
    }

    fn node(&self, id: SupplierId) -> SupplierNode {
        self.hierarchy.get(id).expect("supplier exists")
    }

    fn revision(&self) -> u64 {
        self.store.snapshot().expect("snapshot").revision()
    }
}

#[fixture]
fn ctx() -> Ctx {
    init_test_setup();
    let store: Arc<dyn LedgerStore> = Arc::new(InMemoryLedgerStore::new());
    Ctx {
        hierarchy: HierarchyService::new(store.clone(), true),
        products: ProductService::new(store.clone()),
        store,
    }
}

fn domain(err: ApplicationError) -> DomainError {
    match err {
        ApplicationError::Domain(e) => e,
        other => panic!("expected domain error, got {other:?}"),
    }
}

// ============================================================
// create
// ============================================================

#[rstest]
fn given_parent_when_creating_then_placed_below_it(ctx: Ctx) {
    // Arrange
    let factory = ctx.add("Factory", None, 0);

    // Act
    let retail = ctx.add("Retail", Some(factory.id), 1000);

    // Assert
    let factory = ctx.node(factory.id);
    assert_eq!(retail.tree_id(), factory.tree_id());
    assert_eq!(retail.depth(), 1);
    assert_eq!((factory.left_bound(), factory.right_bound()), (1, 4));
    assert_eq!((retail.left_bound(), retail.right_bound()), (2, 3));
    assert_eq!(retail.intermediaries(), Some(0));
    assert_eq!(factory.intermediaries(), None);
}

#[rstest]
fn given_no_parent_when_creating_then_new_tree(ctx: Ctx) {
    let first = ctx.add("A", None, 0);
    let second = ctx.add("B", None, 0);

    assert_ne!(first.tree_id(), ctx.node(second.id).tree_id());
    assert_eq!(ctx.hierarchy.forest().unwrap().roots().count(), 2);
}

#[rstest]
fn given_factory_with_parent_when_creating_then_invariant_violation(ctx: Ctx) {
    let root = ctx.add("Root", None, 0);
    let before = ctx.revision();

    let err = ctx
        .hierarchy
        .create(NewSupplier {
            category: Category::Factory,
            ..draft("Plant", Some(root.id), 0)
        })
        .unwrap_err();

    assert_eq!(
        domain(err),
        DomainError::invariant(InvariantRule::FactoryWithParent, Some("Plant"))
    );
    assert_eq!(ctx.revision(), before);
}

#[rstest]
#[case(Category::Retail, 100, "invariant_violation")]
#[case(Category::Entrepreneur, -100, "validation_error")]
fn given_bad_root_debt_when_creating_then_rejected(
    ctx: Ctx,
    #[case] category: Category,
    #[case] debt: i64,
    #[case] code: &str,
) {
    let err = ctx
        .hierarchy
        .create(NewSupplier {
            category,
            ..draft("Shop", None, debt)
        })
        .unwrap_err();

    assert_eq!(err.code(), code);
    assert!(ctx.hierarchy.list(&SupplierFilter::default()).unwrap().is_empty());
}

#[rstest]
fn given_unknown_parent_when_creating_then_not_found(ctx: Ctx) {
    let err = ctx
        .hierarchy
        .create(draft("Shop", Some(SupplierId(99)), 0))
        .unwrap_err();
    assert_eq!(err.code(), "not_found");
}

#[rstest]
fn given_duplicate_supplier_when_creating_then_validation_error(ctx: Ctx) {
    ctx.add("Twin", None, 0);
    let err = ctx.hierarchy.create(draft("Twin", None, 0)).unwrap_err();
    assert!(matches!(
        domain(err),
        DomainError::Validation { field: "name", .. }
    ));
}

#[rstest]
fn given_siblings_when_listing_children_then_ordered_by_name(ctx: Ctx) {
    let root = ctx.add("Root", None, 0);
    ctx.add("beta", Some(root.id), 0);
    ctx.add("alpha", Some(root.id), 0);

    let names: Vec<String> = ctx
        .hierarchy
        .children(root.id)
        .unwrap()
        .into_iter()
        .map(|n| n.name)
        .collect();

    assert_eq!(names, vec!["alpha", "beta"]);
}

// ============================================================
// update / reparent
// ============================================================

#[rstest]
fn given_two_roots_when_reparenting_then_trees_merge_and_depths_shift(ctx: Ctx) {
    // Arrange: A, and B -> C as a separate tree
    let a = ctx.add("A", None, 0);
    let b = ctx.add_retail_root("B");
    let c = ctx.add("C", Some(b.id), 0);
    assert_ne!(ctx.node(a.id).tree_id(), ctx.node(b.id).tree_id());

    // Act
    ctx.hierarchy.reparent(b.id, Some(a.id)).unwrap();

    // Assert
    let (a, b, c) = (ctx.node(a.id), ctx.node(b.id), ctx.node(c.id));
    assert_eq!(a.tree_id(), b.tree_id());
    assert_eq!(b.tree_id(), c.tree_id());
    assert_eq!(b.depth(), a.depth() + 1);
    assert_eq!(c.depth(), a.depth() + 2);
    assert_eq!(ctx.hierarchy.forest().unwrap().roots().count(), 1);
    ctx.hierarchy.verify().unwrap();
}

#[rstest]
fn given_self_as_parent_when_reparenting_then_cycle_and_unchanged(ctx: Ctx) {
    let root = ctx.add("Root", None, 0);
    let x = ctx.add("X", Some(root.id), 0);
    let before = ctx.node(x.id);

    let err = ctx.hierarchy.reparent(x.id, Some(x.id)).unwrap_err();

    assert_eq!(err.code(), "cyclic_relationship");
    let after = ctx.node(x.id);
    assert_eq!(after.parent, before.parent);
    assert_eq!(after.position(), before.position());
}

#[rstest]
fn given_descendant_as_parent_when_reparenting_then_cycle(ctx: Ctx) {
    let root = ctx.add("Root", None, 0);
    let mid = ctx.add("Mid", Some(root.id), 0);
    let leaf = ctx.add("Leaf", Some(mid.id), 0);

    let err = ctx.hierarchy.reparent(mid.id, Some(leaf.id)).unwrap_err();

    assert!(matches!(domain(err), DomainError::Cycle { .. }));
    assert_eq!(ctx.node(leaf.id).parent, Some(mid.id));
}

#[rstest]
fn given_changed_debt_when_updating_then_not_editable(ctx: Ctx) {
    let root = ctx.add("Root", None, 0);
    let shop = ctx.add("Shop", Some(root.id), 500);

    let err = ctx
        .hierarchy
        .update(
            shop.id,
            SupplierPatch {
                debt: Some(Amount::from_cents(100)),
                ..SupplierPatch::default()
            },
        )
        .unwrap_err();

    assert_eq!(
        domain(err),
        DomainError::invariant(InvariantRule::DebtNotEditable, Some("Shop"))
    );
    assert_eq!(ctx.node(shop.id).debt, Amount::from_cents(500));
}

#[rstest]
fn given_unchanged_debt_and_rename_when_updating_then_applied(ctx: Ctx) {
    let root = ctx.add("Root", None, 0);
    let shop = ctx.add("Shop", Some(root.id), 500);

    let updated = ctx
        .hierarchy
        .update(
            shop.id,
            SupplierPatch {
                name: Some("Store".into()),
                debt: Some(Amount::from_cents(500)),
                ..SupplierPatch::default()
            },
        )
        .unwrap();

    assert_eq!(updated.name, "Store");
    assert_eq!(updated.created_at, shop.created_at);
}

#[rstest]
fn given_indebted_node_when_detaching_to_root_then_rootless_with_debt(ctx: Ctx) {
    let root = ctx.add("Root", None, 0);
    let shop = ctx.add("Shop", Some(root.id), 500);

    let err = ctx.hierarchy.reparent(shop.id, None).unwrap_err();

    assert_eq!(
        domain(err),
        DomainError::invariant(InvariantRule::RootlessWithDebt, Some("Shop"))
    );
}

#[rstest]
fn given_attached_node_when_switching_to_factory_then_rejected(ctx: Ctx) {
    let root = ctx.add("Root", None, 0);
    let shop = ctx.add("Shop", Some(root.id), 0);

    let err = ctx
        .hierarchy
        .update(
            shop.id,
            SupplierPatch {
                category: Some(Category::Factory),
                ..SupplierPatch::default()
            },
        )
        .unwrap_err();

    assert_eq!(err.code(), "invariant_violation");
}

// ============================================================
// delete
// ============================================================

#[rstest]
fn given_chain_with_indebted_grandchild_when_deleting_root_then_child_becomes_root(ctx: Ctx) {
    // Arrange: F -> R -> E(100)
    let f = ctx.add("F", None, 0);
    let r = ctx.add("R", Some(f.id), 0);
    let e = ctx.add("E", Some(r.id), 10_000);

    // Act
    ctx.hierarchy.delete(f.id).unwrap();

    // Assert
    let (r, e) = (ctx.node(r.id), ctx.node(e.id));
    assert!(r.is_root());
    assert_eq!(r.depth(), 0);
    assert_eq!(e.parent, Some(r.id));
    assert_eq!(e.depth(), 1);
    assert_eq!(ctx.hierarchy.forest().unwrap().roots().count(), 1);
    assert_eq!(ctx.hierarchy.get(f.id).unwrap_err().code(), "not_found");
}

#[rstest]
fn given_indebted_child_when_deleting_parent_then_blocked_and_unchanged(ctx: Ctx) {
    // Arrange: F -> R(100)
    let f = ctx.add("F", None, 0);
    let r = ctx.add("R", Some(f.id), 10_000);
    let before = ctx.hierarchy.list(&SupplierFilter::default()).unwrap();

    // Act
    let err = ctx.hierarchy.delete(f.id).unwrap_err();

    // Assert
    match domain(err) {
        DomainError::DeletionBlocked { node, blocker } => {
            assert_eq!(node, "F");
            assert_eq!(blocker.blocking_id(), r.id);
            assert!(!blocker.is_own_debt());
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(ctx.hierarchy.list(&SupplierFilter::default()).unwrap(), before);
}

#[rstest]
fn given_own_debt_when_deleting_then_blocked_by_itself(ctx: Ctx) {
    let f = ctx.add("F", None, 0);
    let r = ctx.add("R", Some(f.id), 100);

    let verdict = ctx.hierarchy.can_delete(r.id).unwrap();

    let blocker = verdict.blocker().expect("blocked");
    assert!(blocker.is_own_debt());
    assert_eq!(blocker.blocking_id(), r.id);
}

#[rstest]
fn given_middle_node_when_deleting_then_children_promoted_one_level(ctx: Ctx) {
    let top = ctx.add("Top", None, 0);
    let mid = ctx.add("Mid", Some(top.id), 0);
    let c1 = ctx.add("C1", Some(mid.id), 0);
    let c2 = ctx.add("C2", Some(mid.id), 0);
    let mid_depth = ctx.node(mid.id).depth();

    ctx.hierarchy.delete(mid.id).unwrap();

    for id in [c1.id, c2.id] {
        let child = ctx.node(id);
        assert_eq!(child.parent, Some(top.id));
        assert_eq!(child.depth(), mid_depth);
    }
    ctx.hierarchy.verify().unwrap();
}

#[rstest]
fn given_blocked_delete_when_clearing_debt_then_delete_allowed(ctx: Ctx) {
    let f = ctx.add("F", None, 0);
    let r = ctx.add("R", Some(f.id), 10_000);
    assert!(!ctx.hierarchy.can_delete(f.id).unwrap().is_allowed());

    ctx.hierarchy.clear_debt(&[r.id]).unwrap();

    assert_eq!(ctx.hierarchy.can_delete(f.id).unwrap(), Deletability::Allowed);
    assert_eq!(ctx.node(r.id).debt, Amount::ZERO);
}

#[rstest]
fn given_unknown_id_when_clearing_debt_then_nothing_cleared(ctx: Ctx) {
    let f = ctx.add("F", None, 0);
    let r = ctx.add("R", Some(f.id), 10_000);

    let err = ctx.hierarchy.clear_debt(&[r.id, SupplierId(404)]).unwrap_err();

    assert_eq!(err.code(), "not_found");
    assert_eq!(ctx.node(r.id).debt, Amount::from_cents(10_000));
}

#[rstest]
fn given_supplier_with_products_when_deleting_then_products_removed(ctx: Ctx) {
    let f = ctx.add("F", None, 0);
    let product = ctx
        .products
        .create(NewProduct {
            name: "TV".into(),
            model: "X-100".into(),
            release_date: NaiveDate::from_ymd_opt(2023, 5, 1).unwrap(),
            supplier: f.id,
        })
        .unwrap();

    ctx.hierarchy.delete(f.id).unwrap();

    assert_eq!(ctx.products.get(product.id).unwrap_err().code(), "not_found");
    assert!(ctx.products.list(None).unwrap().is_empty());
}

// ============================================================
// bulk delete
// ============================================================

#[rstest]
fn given_mixed_batch_when_bulk_deleting_then_only_allowed_removed(ctx: Ctx) {
    // Arrange: F -> R1 -> E1, F -> R2 -> E2(50)
    let f = ctx.add("F", None, 0);
    let r1 = ctx.add("R1", Some(f.id), 0);
    let e1 = ctx.add("E1", Some(r1.id), 0);
    let r2 = ctx.add("R2", Some(f.id), 0);
    let e2 = ctx.add("E2", Some(r2.id), 5_000);
    let before = ctx.revision();

    // Act
    let outcome = ctx.hierarchy.delete_many(&[r1.id, r2.id]).unwrap();

    // Assert
    assert_eq!(outcome.deleted.len(), 1);
    assert_eq!(outcome.deleted[0].id, r1.id);
    assert_eq!(outcome.refused.len(), 1);
    assert_eq!(outcome.refused[0].node.id, r2.id);
    assert_eq!(outcome.refused[0].blocker.blocking_id(), e2.id);
    assert_eq!(outcome.refused[0].to_error().code(), "deletion_blocked");

    assert_eq!(ctx.node(e1.id).parent, Some(f.id));
    assert_eq!(ctx.node(e1.id).depth(), 1);
    assert_eq!(ctx.node(e2.id).parent, Some(r2.id));
    assert_eq!(ctx.revision(), before + 1);
}

#[rstest]
fn given_parent_and_child_in_batch_when_bulk_deleting_then_grandchild_reaches_survivor(
    ctx: Ctx,
) {
    // Arrange: A -> B -> C -> D
    let a = ctx.add("A", None, 0);
    let b = ctx.add("B", Some(a.id), 0);
    let c = ctx.add("C", Some(b.id), 0);
    let d = ctx.add("D", Some(c.id), 0);

    // Act
    let outcome = ctx.hierarchy.delete_many(&[c.id, b.id]).unwrap();

    // Assert
    assert_eq!(outcome.deleted.len(), 2);
    assert!(outcome.refused.is_empty());
    assert_eq!(ctx.node(d.id).parent, Some(a.id));
    assert_eq!(ctx.node(d.id).depth(), 1);
}

#[rstest]
fn given_whole_chain_in_batch_when_bulk_deleting_then_leaf_becomes_root(ctx: Ctx) {
    let a = ctx.add("A", None, 0);
    let b = ctx.add("B", Some(a.id), 0);
    let c = ctx.add("C", Some(b.id), 0);

    ctx.hierarchy.delete_many(&[a.id, b.id]).unwrap();

    let c = ctx.node(c.id);
    assert!(c.is_root());
    assert_eq!((c.tree_id(), c.left_bound(), c.right_bound()), (1, 1, 2));
}

#[rstest]
fn given_unknown_id_in_batch_when_bulk_deleting_then_nothing_deleted(ctx: Ctx) {
    let a = ctx.add("A", None, 0);
    let before = ctx.revision();

    let err = ctx
        .hierarchy
        .delete_many(&[a.id, SupplierId(404)])
        .unwrap_err();

    assert_eq!(err.code(), "not_found");
    assert!(ctx.hierarchy.get(a.id).is_ok());
    assert_eq!(ctx.revision(), before);
}

// ============================================================
// queries
// ============================================================

#[rstest]
fn given_chain_when_querying_then_ancestors_and_descendants_follow_encoding(ctx: Ctx) {
    let a = ctx.add("A", None, 0);
    let b = ctx.add("B", Some(a.id), 0);
    let c = ctx.add("C", Some(b.id), 0);
    ctx.add("Other", None, 0);

    let ancestors: Vec<SupplierId> = ctx
        .hierarchy
        .ancestors(c.id)
        .unwrap()
        .iter()
        .map(|n| n.id)
        .collect();
    let descendants: Vec<SupplierId> = ctx
        .hierarchy
        .descendants(a.id)
        .unwrap()
        .iter()
        .map(|n| n.id)
        .collect();

    assert_eq!(ancestors, vec![a.id, b.id]);
    assert_eq!(descendants, vec![b.id, c.id]);
}

#[rstest]
fn given_filter_when_listing_then_country_substring_and_city_exact(ctx: Ctx) {
    ctx.add("Moscow Plant", None, 0);
    ctx.hierarchy
        .create(NewSupplier {
            address: supplynet::domain::Address {
                country: "Belarus".into(),
                city: "Minsk".into(),
                street: "Nezavisimosti".into(),
                house_number: "4".into(),
            },
            ..draft("Minsk Plant", None, 0)
        })
        .unwrap();

    let by_country = ctx
        .hierarchy
        .list(&SupplierFilter {
            country: Some("bela".into()),
            city: None,
        })
        .unwrap();
    let by_city = ctx
        .hierarchy
        .list(&SupplierFilter {
            country: None,
            city: Some("moscow".into()),
        })
        .unwrap();

    assert_eq!(by_country.len(), 1);
    assert_eq!(by_country[0].name, "Minsk Plant");
    assert_eq!(by_city.len(), 1);
    assert_eq!(by_city[0].name, "Moscow Plant");
}

#[rstest]
fn given_consistent_forest_when_rebuilding_then_encoding_unchanged(ctx: Ctx) {
    let a = ctx.add("A", None, 0);
    ctx.add("B", Some(a.id), 0);
    ctx.add("C", None, 0);
    let before = ctx.hierarchy.list(&SupplierFilter::default()).unwrap();

    let stats = ctx.hierarchy.rebuild().unwrap();

    assert_eq!(stats.trees, 2);
    assert_eq!(stats.nodes, 3);
    assert_eq!(ctx.hierarchy.list(&SupplierFilter::default()).unwrap(), before);
}
