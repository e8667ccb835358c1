//! Tree rendering for the terminal.

use termtree::Tree;

use crate::domain::{SupplierNode, TreeIndex};

/// Fold finished subtrees into their parents until `keep` levels remain.
fn fold(stack: &mut Vec<Tree<String>>, keep: usize) {
    while stack.len() > keep {
        if let Some(done) = stack.pop() {
            if let Some(parent) = stack.last_mut() {
                parent.push(done);
            }
        }
    }
}

/// Build the display tree of `root` from the pre-order descendant walk.
pub fn subtree<F>(index: &TreeIndex, root: &SupplierNode, label: F) -> Tree<String>
where
    F: Fn(&SupplierNode) -> String,
{
    let base = root.depth();
    let mut stack = vec![Tree::new(label(root))];
    for node in index.descendants_of(root) {
        fold(&mut stack, (node.depth() - base) as usize);
        stack.push(Tree::new(label(node)));
    }
    fold(&mut stack, 1);
    stack.pop().unwrap_or_else(|| Tree::new(label(root)))
}

/// One display tree per root, in tree id order.
pub fn forest<F>(index: &TreeIndex, label: F) -> Vec<Tree<String>>
where
    F: Fn(&SupplierNode) -> String,
{
    index
        .roots()
        .map(|root| subtree(index, root, &label))
        .collect()
}
