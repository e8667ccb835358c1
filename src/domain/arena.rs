use generational_arena::{Arena, Index};
use tracing::instrument;

use crate::domain::entities::SupplierId;

/// Data payload for forest nodes: just what ordering and identity need.
#[derive(Debug, Clone)]
pub struct NodeData {
    pub id: SupplierId,
    /// Sibling sort key
    pub name: String,
}

/// Node in the arena-based forest.
#[derive(Debug)]
pub struct TreeNode {
    pub data: NodeData,
    /// Index of parent node in the arena, None for root nodes
    pub parent: Option<Index>,
    /// Indices of child nodes, in sibling order once sorted
    pub children: Vec<Index>,
}

/// Arena-based forest built from a parent-pointer graph.
///
/// Nodes are inserted first and linked afterwards, so parents may arrive
/// after their children.
#[derive(Debug, Default)]
pub struct TreeArena {
    arena: Arena<TreeNode>,
}

impl TreeArena {
    pub fn new() -> Self {
        Self {
            arena: Arena::new(),
        }
    }

    pub fn with_capacity(n: usize) -> Self {
        Self {
            arena: Arena::with_capacity(n),
        }
    }

    #[instrument(level = "trace", skip(self))]
    pub fn insert_node(&mut self, data: NodeData) -> Index {
        self.arena.insert(TreeNode {
            data,
            parent: None,
            children: Vec::new(),
        })
    }

    /// Link `child` below `parent`. Returns false if either index is stale.
    #[instrument(level = "trace", skip(self))]
    pub fn attach(&mut self, child: Index, parent: Index) -> bool {
        if self.arena.get(child).is_none() {
            return false;
        }
        match self.arena.get_mut(parent) {
            Some(p) => p.children.push(child),
            None => return false,
        }
        if let Some(c) = self.arena.get_mut(child) {
            c.parent = Some(parent);
        }
        true
    }

    pub fn get_node(&self, idx: Index) -> Option<&TreeNode> {
        self.arena.get(idx)
    }

    /// Roots in sibling order (name, then id).
    pub fn roots(&self) -> Vec<Index> {
        let mut roots: Vec<Index> = self
            .arena
            .iter()
            .filter(|(_, node)| node.parent.is_none())
            .map(|(idx, _)| idx)
            .collect();
        roots.sort_by(|a, b| self.sibling_key(*a).cmp(&self.sibling_key(*b)));
        roots
    }

    /// Order every child list by (name, id) so traversal is deterministic.
    #[instrument(level = "debug", skip(self))]
    pub fn sort_children(&mut self) {
        let keys: Vec<(Index, Vec<Index>)> = self
            .arena
            .iter()
            .filter(|(_, node)| node.children.len() > 1)
            .map(|(idx, node)| {
                let mut children = node.children.clone();
                children.sort_by(|a, b| self.sibling_key(*a).cmp(&self.sibling_key(*b)));
                (idx, children)
            })
            .collect();
        for (idx, children) in keys {
            if let Some(node) = self.arena.get_mut(idx) {
                node.children = children;
            }
        }
    }

    fn sibling_key(&self, idx: Index) -> Option<(&str, SupplierId)> {
        self.arena
            .get(idx)
            .map(|node| (node.data.name.as_str(), node.data.id))
    }

    /// Enter/exit walk over the tree below `root`.
    #[instrument(level = "trace", skip(self))]
    pub fn walk(&self, root: Index) -> Walk<'_> {
        Walk::new(self, root)
    }
}

/// One step of a depth-first walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visit {
    Enter { idx: Index, depth: u32 },
    Exit { idx: Index },
}

/// Depth-first walk emitting an `Enter` before and an `Exit` after every
/// subtree, children in stored order.
pub struct Walk<'a> {
    arena: &'a TreeArena,
    stack: Vec<(Index, u32, bool)>,
}

impl<'a> Walk<'a> {
    fn new(arena: &'a TreeArena, root: Index) -> Self {
        let mut stack = Vec::new();
        if arena.get_node(root).is_some() {
            stack.push((root, 0, false));
        }
        Self { arena, stack }
    }
}

impl<'a> Iterator for Walk<'a> {
    type Item = Visit;

    fn next(&mut self) -> Option<Self::Item> {
        let (idx, depth, entered) = self.stack.pop()?;
        if entered {
            return Some(Visit::Exit { idx });
        }
        self.stack.push((idx, depth, true));
        if let Some(node) = self.arena.get_node(idx) {
            // Push children in reverse order for left-to-right traversal
            for &child in node.children.iter().rev() {
                self.stack.push((child, depth + 1, false));
            }
        }
        Some(Visit::Enter { idx, depth })
    }
}
