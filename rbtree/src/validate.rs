use crate::node::{NodeId, NodeStore, StoreExt};
use crate::tree::RbTree;

/// A violated red-black tree property or a broken link.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvariantError {
    #[error("root {0:?} is red")]
    RedRoot(NodeId),

    #[error("root {root:?} has parent {parent:?}")]
    RootHasParent { root: NodeId, parent: NodeId },

    #[error("child {child:?} of {parent:?} links to parent {actual:?}")]
    BrokenParentLink {
        parent: NodeId,
        child: NodeId,
        actual: Option<NodeId>,
    },

    #[error("red node {parent:?} has red child {child:?}")]
    DoubleRed { parent: NodeId, child: NodeId },

    #[error("black height below {node:?} differs: {left} on the left, {right} on the right")]
    BlackHeightMismatch {
        node: NodeId,
        left: usize,
        right: usize,
    },

    #[error("{node:?} is not ordered before its successor {next:?}")]
    OutOfOrder { node: NodeId, next: NodeId },
}

impl RbTree {
    /// Number of black nodes on the path from the root to its leftmost
    /// absent child.
    pub fn black_height<S>(&self, store: &S) -> usize
    where
        S: NodeStore + ?Sized,
    {
        let mut height = 0;
        let mut node = self.root();
        while let Some(x) = node {
            if store.color(x).is_black() {
                height += 1;
            }
            node = store.left(x);
        }

        height
    }

    /// Checks the red-black properties and the parent links of every node.
    ///
    /// Returns the black height of the tree. Key order is not checked, the
    /// tree doesn't know about keys.
    pub fn validate<S>(&self, store: &S) -> Result<usize, InvariantError>
    where
        S: NodeStore + ?Sized,
    {
        let Some(root) = self.root() else {
            return Ok(0);
        };

        if let Some(parent) = store.parent(root) {
            return Err(InvariantError::RootHasParent { root, parent });
        }
        if store.color(root).is_red() {
            return Err(InvariantError::RedRoot(root));
        }

        validate_subtree(store, root)
    }
}

/// Returns the black height of the subtree at `node`, including `node`.
fn validate_subtree<S>(store: &S, node: NodeId) -> Result<usize, InvariantError>
where
    S: NodeStore + ?Sized,
{
    let mut heights = [0; 2];
    for (height, child) in heights.iter_mut().zip([store.left(node), store.right(node)]) {
        let Some(child) = child else {
            continue;
        };

        let actual = store.parent(child);
        if actual != Some(node) {
            return Err(InvariantError::BrokenParentLink {
                parent: node,
                child,
                actual,
            });
        }
        if store.color(node).is_red() && store.color(child).is_red() {
            return Err(InvariantError::DoubleRed {
                parent: node,
                child,
            });
        }

        *height = validate_subtree(store, child)?;
    }

    let [left, right] = heights;
    if left != right {
        return Err(InvariantError::BlackHeightMismatch { node, left, right });
    }

    Ok(left + usize::from(store.color(node).is_black()))
}
