use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use proptest::prelude::*;
use proptest::sample::Index;

use supplynet::application::services::HierarchyService;
use supplynet::domain::tree_index::{rebuild, verify};
use supplynet::domain::{SupplierFilter, SupplierId, SupplierNode, TreeIndex};
use supplynet::infrastructure::{InMemoryLedgerStore, LedgerStore};
use supplynet::util::testing::{draft, supplier};

/// Each node either starts a tree or picks an earlier node as parent, so
/// the generated graph is always a forest.
fn forest_shape() -> impl Strategy<Value = Vec<(Option<Index>, u8)>> {
    prop::collection::vec((prop::option::of(any::<Index>()), 0u8..4), 1..40)
}

fn build_nodes(shape: &[(Option<Index>, u8)]) -> Vec<SupplierNode> {
    shape
        .iter()
        .enumerate()
        .map(|(i, (parent, name))| {
            let parent = match (i, parent) {
                (0, _) | (_, None) => None,
                (_, Some(idx)) => Some(idx.index(i) as u64 + 1),
            };
            // Few distinct names so sibling ties fall back to the id
            supplier(i as u64 + 1, &format!("n{name}"), parent)
        })
        .collect()
}

proptest! {
    #[test]
    fn given_random_forest_when_rebuilding_then_bounds_contiguous_per_tree(
        shape in forest_shape()
    ) {
        let mut nodes = build_nodes(&shape);

        let stats = rebuild(nodes.iter_mut()).unwrap();

        prop_assert_eq!(stats.nodes, nodes.len());
        let mut trees: BTreeMap<u32, Vec<u32>> = BTreeMap::new();
        for n in &nodes {
            trees.entry(n.tree_id()).or_default().extend([n.left_bound(), n.right_bound()]);
        }
        prop_assert_eq!(trees.len() as u32, stats.trees);
        for (_, mut bounds) in trees {
            bounds.sort_unstable();
            let expected: Vec<u32> = (1..=bounds.len() as u32).collect();
            prop_assert_eq!(bounds, expected);
        }

        let by_id: HashMap<SupplierId, &SupplierNode> = nodes.iter().map(|n| (n.id, n)).collect();
        for n in &nodes {
            let expected_depth = n.parent.map_or(0, |p| by_id[&p].depth() + 1);
            prop_assert_eq!(n.depth(), expected_depth);
        }
        prop_assert!(verify(nodes.iter()).is_ok());
    }

    #[test]
    fn given_rebuilt_forest_when_rebuilding_again_then_identical(shape in forest_shape()) {
        let mut nodes = build_nodes(&shape);
        rebuild(nodes.iter_mut()).unwrap();
        let first = nodes.clone();

        rebuild(nodes.iter_mut()).unwrap();

        prop_assert_eq!(first, nodes);
    }

    #[test]
    fn given_random_forest_when_querying_descendants_then_matches_parent_walk(
        shape in forest_shape()
    ) {
        let mut nodes = build_nodes(&shape);
        rebuild(nodes.iter_mut()).unwrap();
        let index = TreeIndex::new(nodes.clone());

        for node in &nodes {
            let mut expected: Vec<SupplierId> = nodes
                .iter()
                .filter(|candidate| {
                    let mut parent = candidate.parent;
                    while let Some(p) = parent {
                        if p == node.id {
                            return true;
                        }
                        parent = index.get(p).and_then(|n| n.parent);
                    }
                    false
                })
                .map(|n| n.id)
                .collect();
            expected.sort();
            let mut actual: Vec<SupplierId> = index.descendants_of(node).map(|n| n.id).collect();
            actual.sort();
            prop_assert_eq!(actual, expected);
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn given_random_forest_when_deleting_node_then_children_promoted(
        shape in prop::collection::vec(prop::option::of(any::<Index>()), 2..16),
        victim in any::<Index>(),
    ) {
        let store: Arc<dyn LedgerStore> = Arc::new(InMemoryLedgerStore::new());
        let service = HierarchyService::new(store, true);
        let mut ids: Vec<SupplierId> = Vec::new();
        for (i, parent) in shape.iter().enumerate() {
            let parent = match (i, parent) {
                (0, _) | (_, None) => None,
                (_, Some(idx)) => Some(ids[idx.index(i)]),
            };
            ids.push(service.create(draft(&format!("node {i}"), parent, 0)).unwrap().id);
        }
        let victim = service.get(ids[victim.index(ids.len())]).unwrap();
        let children = service.children(victim.id).unwrap();

        service.delete(victim.id).unwrap();

        for child in children {
            let child = service.get(child.id).unwrap();
            prop_assert_eq!(child.parent, victim.parent);
            prop_assert_eq!(child.depth(), victim.depth());
        }
        prop_assert_eq!(
            service.list(&SupplierFilter::default()).unwrap().len(),
            ids.len() - 1
        );
        prop_assert!(service.verify().is_ok());
    }
}
