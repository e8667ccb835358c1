//! Nested-set index over the supplier forest.
//!
//! Every node carries `(tree_id, left_bound, right_bound, depth)`. A node's
//! descendants are exactly the nodes of the same tree whose bounds lie
//! strictly inside its own, so ancestry questions need no recursion.
//!
//! Bounds are numbered per tree starting at 1; a tree of `n` nodes uses
//! every integer in `1..=2n` exactly once.

use std::collections::HashMap;

use itertools::Itertools;
use tracing::{debug, instrument, trace};

use crate::domain::arena::{NodeData, TreeArena, Visit};
use crate::domain::entities::{SupplierId, SupplierNode, TreePosition};
use crate::domain::error::{DomainError, DomainResult};

/// Outcome of a full renumbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RebuildStats {
    pub trees: u32,
    pub nodes: usize,
}

/// Recompute the encoding of the whole forest from parent pointers.
///
/// Roots and siblings are visited in (name, id) order, trees are numbered
/// from 1 in root order. The result depends only on the parent graph and
/// the names, so calling it twice yields the same encoding.
///
/// Fails without touching any node if a parent pointer dangles or the
/// parent graph contains a cycle.
#[instrument(level = "debug", skip(nodes))]
pub fn rebuild<'a, I>(nodes: I) -> DomainResult<RebuildStats>
where
    I: IntoIterator<Item = &'a mut SupplierNode>,
{
    let mut nodes: Vec<&'a mut SupplierNode> = nodes.into_iter().collect();
    let positions = layout(nodes.iter().map(|n| &**n))?;

    for node in nodes.iter_mut() {
        if let Some(position) = positions.get(&node.id) {
            node.place(*position);
        }
    }

    let stats = RebuildStats {
        trees: positions.values().map(|p| p.tree_id()).max().unwrap_or(0),
        nodes: positions.len(),
    };
    debug!("rebuild: {} nodes in {} trees", stats.nodes, stats.trees);
    Ok(stats)
}

/// Compute positions for every node without assigning them.
fn layout<'a, I>(nodes: I) -> DomainResult<HashMap<SupplierId, TreePosition>>
where
    I: IntoIterator<Item = &'a SupplierNode>,
{
    let nodes: Vec<&SupplierNode> = nodes.into_iter().collect();
    let mut arena = TreeArena::with_capacity(nodes.len());
    let mut slots = HashMap::with_capacity(nodes.len());

    for node in &nodes {
        let idx = arena.insert_node(NodeData {
            id: node.id,
            name: node.name.clone(),
        });
        slots.insert(node.id, idx);
    }
    for node in &nodes {
        if let Some(parent) = node.parent {
            let parent_idx = slots.get(&parent).ok_or_else(|| {
                DomainError::CorruptIndex(format!(
                    "supplier {} references missing parent {}",
                    node.id, parent
                ))
            })?;
            arena.attach(slots[&node.id], *parent_idx);
        }
    }
    arena.sort_children();

    let mut positions = HashMap::with_capacity(nodes.len());
    for (tree_no, root) in arena.roots().into_iter().enumerate() {
        let tree_id = tree_no as u32 + 1;
        let mut counter = 1u32;
        let mut open: HashMap<_, (u32, u32)> = HashMap::new();

        for visit in arena.walk(root) {
            match visit {
                Visit::Enter { idx, depth } => {
                    open.insert(idx, (counter, depth));
                    counter += 1;
                }
                Visit::Exit { idx } => {
                    let (left, depth) = open.remove(&idx).unwrap_or((counter, 0));
                    if let Some(node) = arena.get_node(idx) {
                        positions.insert(
                            node.data.id,
                            TreePosition::new(tree_id, left, counter, depth),
                        );
                    }
                    counter += 1;
                }
            }
        }
        trace!("layout: tree {} spans 1..{}", tree_id, counter - 1);
    }

    if positions.len() != nodes.len() {
        // Nodes unreachable from any root sit on a parent cycle.
        let stranded = nodes
            .iter()
            .filter(|n| !positions.contains_key(&n.id))
            .sorted_by_key(|n| n.id)
            .next();
        if let Some(node) = stranded {
            let parent = node
                .parent
                .map(|p| p.to_string())
                .unwrap_or_else(|| "-".to_string());
            return Err(DomainError::Cycle {
                node: node.name.clone(),
                parent,
            });
        }
    }
    Ok(positions)
}

/// Check that the stored encoding is a valid nested-set encoding of the
/// stored parent pointers: contiguous numbering per tree, proper nesting,
/// `depth == parent depth + 1`, and tree ids numbered `1..=k`.
#[instrument(level = "debug", skip(nodes))]
pub fn verify<'a, I>(nodes: I) -> DomainResult<()>
where
    I: IntoIterator<Item = &'a SupplierNode>,
{
    let corrupt = |msg: String| Err(DomainError::CorruptIndex(msg));
    let by_tree = nodes
        .into_iter()
        .sorted_by_key(|n| (n.tree_id(), n.left_bound()))
        .chunk_by(|n| n.tree_id());

    let mut expected_tree = 1u32;
    for (tree_id, members) in &by_tree {
        if tree_id != expected_tree {
            return corrupt(format!("expected tree {expected_tree}, found tree {tree_id}"));
        }
        expected_tree += 1;

        let members: Vec<&SupplierNode> = members.collect();
        let mut seen = vec![false; members.len() * 2 + 1];
        for node in &members {
            for bound in [node.left_bound(), node.right_bound()] {
                let slot = bound as usize;
                if slot == 0 || slot >= seen.len() || seen[slot] {
                    return corrupt(format!(
                        "tree {tree_id}: bound {bound} of {} is out of range or reused",
                        node.id
                    ));
                }
                seen[slot] = true;
            }
            if node.left_bound() >= node.right_bound() {
                return corrupt(format!("{}: left bound not below right bound", node.id));
            }
        }

        let mut stack: Vec<&SupplierNode> = Vec::new();
        for node in members {
            while stack
                .last()
                .is_some_and(|top| top.right_bound() < node.left_bound())
            {
                stack.pop();
            }
            match stack.last() {
                None => {
                    if node.left_bound() != 1 || node.parent.is_some() || node.depth() != 0 {
                        return corrupt(format!("tree {tree_id}: {} is not a valid root", node.id));
                    }
                }
                Some(top) => {
                    if node.right_bound() > top.right_bound() {
                        return corrupt(format!("{} overlaps {}", node.id, top.id));
                    }
                    if node.parent != Some(top.id) {
                        return corrupt(format!(
                            "{} is nested under {} but points at {:?}",
                            node.id, top.id, node.parent
                        ));
                    }
                    if node.depth() != top.depth() + 1 {
                        return corrupt(format!("{} has depth {}", node.id, node.depth()));
                    }
                }
            }
            stack.push(node);
        }
    }
    Ok(())
}

/// Read-only snapshot of the forest ordered by `(tree_id, left_bound)`.
#[derive(Debug, Clone, Default)]
pub struct TreeIndex {
    nodes: Vec<SupplierNode>,
    slots: HashMap<SupplierId, usize>,
}

impl TreeIndex {
    pub fn new<I>(nodes: I) -> Self
    where
        I: IntoIterator<Item = SupplierNode>,
    {
        let nodes: Vec<SupplierNode> = nodes
            .into_iter()
            .sorted_by_key(|n| (n.tree_id(), n.left_bound()))
            .collect();
        let slots = nodes.iter().enumerate().map(|(i, n)| (n.id, i)).collect();
        Self { nodes, slots }
    }

    pub fn get(&self, id: SupplierId) -> Option<&SupplierNode> {
        self.slots.get(&id).map(|&i| &self.nodes[i])
    }

    /// All nodes in pre-order, tree by tree.
    pub fn iter(&self) -> impl Iterator<Item = &SupplierNode> {
        self.nodes.iter()
    }

    pub fn roots(&self) -> impl Iterator<Item = &SupplierNode> {
        self.nodes.iter().filter(|n| n.depth() == 0)
    }

    /// Nodes strictly inside `node`'s interval, in pre-order.
    pub fn descendants_of(&self, node: &SupplierNode) -> Descendants<'_> {
        let key = (node.tree_id(), node.left_bound());
        let start = self
            .nodes
            .partition_point(|n| (n.tree_id(), n.left_bound()) <= key);
        Descendants {
            rest: &self.nodes[start..],
            tree_id: node.tree_id(),
            right_bound: node.right_bound(),
        }
    }

    /// Direct children: descendants exactly one level below.
    pub fn children_of<'a>(
        &'a self,
        node: &SupplierNode,
    ) -> impl Iterator<Item = &'a SupplierNode> + 'a {
        let depth = node.depth() + 1;
        self.descendants_of(node).filter(move |n| n.depth() == depth)
    }

    /// Nodes whose interval contains `node`, root first.
    pub fn ancestors_of(&self, node: &SupplierNode) -> Vec<&SupplierNode> {
        let position = *node.position();
        self.nodes
            .iter()
            .filter(|n| n.position().contains(&position))
            .collect()
    }

    pub fn level_of(node: &SupplierNode) -> u32 {
        node.depth()
    }

    /// True if `candidate` is `node` itself or one of its descendants.
    pub fn is_self_or_descendant(&self, node: &SupplierNode, candidate: SupplierId) -> bool {
        candidate == node.id || self.descendants_of(node).any(|d| d.id == candidate)
    }
}

/// Lazy pre-order sequence of a node's descendants.
#[derive(Debug, Clone)]
pub struct Descendants<'a> {
    rest: &'a [SupplierNode],
    tree_id: u32,
    right_bound: u32,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a SupplierNode;

    fn next(&mut self) -> Option<Self::Item> {
        let (first, rest) = self.rest.split_first()?;
        if first.tree_id() != self.tree_id || first.left_bound() >= self.right_bound {
            self.rest = &[];
            return None;
        }
        self.rest = rest;
        Some(first)
    }
}
