use core::cmp::Ordering;

use tracing::trace;

use crate::iter::Iter;
use crate::node::{Color, NodeId, NodeStore, Position, StoreExt};

/// Red-black tree over nodes owned by a [`NodeStore`].
///
/// The tree only holds the root handle. It never compares keys: the caller
/// finds the slot for a new node (see [`RbTree::search`]), [`link`]s the node
/// there and calls [`insert_fixup`] to restore the red-black properties.
///
/// [`link`]: RbTree::link
/// [`insert_fixup`]: RbTree::insert_fixup
#[derive(Debug, Default, PartialEq, Eq)]
pub struct RbTree {
    root: Option<NodeId>,
}

impl RbTree {
    pub const fn new() -> Self {
        Self { root: None }
    }

    #[inline]
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Number of nodes in the tree.
    ///
    /// This walks the whole tree, callers that need the length often should
    /// keep track of it themselves.
    pub fn count<S>(&self, store: &S) -> usize
    where
        S: NodeStore + ?Sized,
    {
        fn inner<S: NodeStore + ?Sized>(store: &S, node: Option<NodeId>) -> usize {
            match node {
                Some(node) => 1 + inner(store, store.left(node)) + inner(store, store.right(node)),
                None => 0,
            }
        }

        inner(store, self.root)
    }

    /// Smallest node of the tree.
    pub fn first<S>(&self, store: &S) -> Option<NodeId>
    where
        S: NodeStore + ?Sized,
    {
        self.root.map(|root| Self::minimum(store, root))
    }

    /// Largest node of the tree.
    pub fn last<S>(&self, store: &S) -> Option<NodeId>
    where
        S: NodeStore + ?Sized,
    {
        self.root.map(|root| Self::maximum(store, root))
    }

    /// Leftmost node of the subtree rooted at `node`.
    pub fn minimum<S>(store: &S, node: NodeId) -> NodeId
    where
        S: NodeStore + ?Sized,
    {
        let mut x = node;
        while let Some(left) = store.left(x) {
            x = left;
        }

        x
    }

    /// Rightmost node of the subtree rooted at `node`.
    pub fn maximum<S>(store: &S, node: NodeId) -> NodeId
    where
        S: NodeStore + ?Sized,
    {
        let mut x = node;
        while let Some(right) = store.right(x) {
            x = right;
        }

        x
    }

    /// In-order successor of `node`, `None` if `node` is the last one.
    pub fn next<S>(store: &S, node: NodeId) -> Option<NodeId>
    where
        S: NodeStore + ?Sized,
    {
        //       +---------- 34 ---------+
        //       |                       |
        // +---- 2 ----+                 58 ----+
        // |           |                        |
        // 1      +--- 9 ----+              +-- 77 --+
        //        |          |              |        |
        //     +- 6       +- 20 -+      +- 71 -+     82
        //     |          |      |      |      |
        //     5         12 -+   24    67      75
        //                   |
        //                   13

        // 9 -> 12, 2 -> 5, 58 -> 67 ...
        // Everything in the right subtree is larger than `node` but smaller than
        // any larger ancestor, so the successor is the minimum of that subtree.
        if let Some(right) = store.right(node) {
            return Some(Self::minimum(store, right));
        }

        // 6 -> 9, 1 -> 2, 13 -> 20, 24 -> 34 ...
        // Climb while we are a right child. The first ancestor reached from its
        // left subtree is the successor.
        let mut x = node;
        let mut parent = store.parent(x);
        while let Some(p) = parent {
            if store.right(p) != Some(x) {
                break;
            }
            x = p;
            parent = store.parent(x);
        }

        parent
    }

    /// In-order predecessor of `node`, `None` if `node` is the first one.
    pub fn prev<S>(store: &S, node: NodeId) -> Option<NodeId>
    where
        S: NodeStore + ?Sized,
    {
        // 2 -> 1, 9 -> 6, 20 -> 13, 77 -> 75
        if let Some(left) = store.left(node) {
            return Some(Self::maximum(store, left));
        }

        // 12 -> 9, 58 -> 34, 67 -> 58
        let mut x = node;
        let mut parent = store.parent(x);
        while let Some(p) = parent {
            if store.left(p) != Some(x) {
                break;
            }
            x = p;
            parent = store.parent(x);
        }

        parent
    }

    /// Iterates the nodes in ascending order, `.rev()` for descending order.
    pub fn iter<'a, S>(&self, store: &'a S) -> Iter<'a, S>
    where
        S: NodeStore + ?Sized,
    {
        Iter::new(store, self.first(store), self.last(store))
    }

    /// Descends from the root looking for a node.
    ///
    /// `f` returns the ordering of the searched key relative to the key of the
    /// given node. Returns `Ok(node)` for the first node where `f` returns
    /// [`Ordering::Equal`], otherwise `Err(position)` with the empty slot where
    /// a node with that key should be [`link`](RbTree::link)ed.
    pub fn search<S, F>(&self, store: &S, mut f: F) -> Result<NodeId, Position>
    where
        S: NodeStore + ?Sized,
        F: FnMut(NodeId) -> Ordering,
    {
        let Some(mut x) = self.root else {
            return Err(Position::Root);
        };

        loop {
            match f(x) {
                Ordering::Less => match store.left(x) {
                    Some(left) => x = left,
                    None => return Err(Position::Left(x)),
                },
                Ordering::Equal => return Ok(x),
                Ordering::Greater => match store.right(x) {
                    Some(right) => x = right,
                    None => return Err(Position::Right(x)),
                },
            }
        }
    }

    /// Links an unlinked `node` into the empty slot at `position`.
    ///
    /// This doesn't rebalance, [`insert_fixup`](RbTree::insert_fixup) must be
    /// called right after.
    pub fn link<S>(&mut self, store: &mut S, node: NodeId, position: Position)
    where
        S: NodeStore + ?Sized,
    {
        debug_assert!(
            store.left(node).is_none() && store.right(node).is_none(),
            "only unlinked nodes can be linked"
        );

        store.set_parent(node, position.parent());
        match position {
            Position::Root => {
                debug_assert!(self.root.is_none(), "root slot is occupied");
                self.root = Some(node);
            }
            Position::Left(parent) => {
                debug_assert!(store.left(parent).is_none(), "left slot is occupied");
                store.set_left(parent, Some(node));
            }
            Position::Right(parent) => {
                debug_assert!(store.right(parent).is_none(), "right slot is occupied");
                store.set_right(parent, Some(node));
            }
        }
    }

    /// Links `node` at `position` and rebalances.
    pub fn insert<S>(&mut self, store: &mut S, node: NodeId, position: Position)
    where
        S: NodeStore + ?Sized,
    {
        self.link(store, node, position);
        self.insert_fixup(store, node);
    }

    /// Restores the red-black properties after `node` was [`link`](RbTree::link)ed.
    pub fn insert_fixup<S>(&mut self, store: &mut S, node: NodeId)
    where
        S: NodeStore + ?Sized,
    {
        let mut node = node;
        // Red parent has a red child. There is only ever one such violation.
        // At first it's the new node and its parent. If we take the "red uncle"
        // branch then at next iteration it's the grandparent and its parent.
        // The other branches fix the violation and stop.
        while let Some(mut parent) = store.parent(node).filter(|&p| store.color(p).is_red()) {
            // parent is red and thus not the root, the grandparent must exist
            let grand_parent = store.parent_of(parent);
            debug_assert!(store.color(grand_parent).is_black());

            if store.left(grand_parent) == Some(parent) {
                match store.right(grand_parent) {
                    Some(uncle) if store.color(uncle).is_red() => {
                        //     +--- gp:b ---+               +--- gp:r ---+
                        //     |            |               |            |
                        //  + p:r +      + u:r +   -->   + p:b +      + u:b +
                        //  |     |      |     |         |     |      |     |
                        // n:r   a:b    b:b   c:b       n:r   a:b    b:b   c:b
                        //
                        // Black height through gp is unchanged, but gp may now
                        // have a red parent.
                        trace!(?node, "insert fixup: red uncle, recolor");
                        store.set_color(parent, Color::Black);
                        store.set_color(uncle, Color::Black);
                        store.set_color(grand_parent, Color::Red);
                        node = grand_parent;
                    }
                    _ => {
                        if store.right(parent) == Some(node) {
                            //       +--- gp:b ---+             +--- gp:b ---+
                            //       |            |             |            |
                            //  + p:r +          u:b   -->  + n:r +         u:b
                            //  |     |                     |     |
                            // a:b  + n:r +               + p:r + c:b
                            //      |     |               |     |
                            //     b:b   c:b             a:b   b:b
                            trace!(?node, "insert fixup: inner grandchild, rotate parent");
                            self.rotate_left(store, parent);
                            core::mem::swap(&mut parent, &mut node);
                        }

                        //       +--- gp:b ---+              +--- p:b ---+
                        //       |            |              |           |
                        //  + p:r +          u:b   -->     n:r      + gp:r +
                        //  |     |                                 |      |
                        // n:r   a:b                               a:b    u:b
                        trace!(?node, "insert fixup: outer grandchild, rotate grandparent");
                        store.set_color(parent, Color::Black);
                        store.set_color(grand_parent, Color::Red);
                        self.rotate_right(store, grand_parent);
                        break;
                    }
                }
            } else {
                // same as above with left and right switched
                match store.left(grand_parent) {
                    Some(uncle) if store.color(uncle).is_red() => {
                        trace!(?node, "insert fixup: red uncle, recolor");
                        store.set_color(parent, Color::Black);
                        store.set_color(uncle, Color::Black);
                        store.set_color(grand_parent, Color::Red);
                        node = grand_parent;
                    }
                    _ => {
                        if store.left(parent) == Some(node) {
                            trace!(?node, "insert fixup: inner grandchild, rotate parent");
                            self.rotate_right(store, parent);
                            core::mem::swap(&mut parent, &mut node);
                        }

                        trace!(?node, "insert fixup: outer grandchild, rotate grandparent");
                        store.set_color(parent, Color::Black);
                        store.set_color(grand_parent, Color::Red);
                        self.rotate_left(store, grand_parent);
                        break;
                    }
                }
            }
        }

        if let Some(root) = self.root {
            store.set_color(root, Color::Black);
        }
    }

    /// Unlinks `node` from the tree and rebalances.
    ///
    /// Afterwards `node` is reset to the unlinked state and can be inserted
    /// again.
    pub fn remove<S>(&mut self, store: &mut S, node: NodeId)
    where
        S: NodeStore + ?Sized,
    {
        debug_assert!(
            store.parent(node).is_some() || self.root == Some(node),
            "node is not linked into this tree"
        );

        if let Some(parent) = self.erase(store, node) {
            self.erase_fixup(store, parent);
        }
        store.node_mut(node).init();
    }

    /// Removes `node` from the tree structure.
    ///
    /// Returns the parent of a position that lost one black node, if any.
    fn erase<S>(&mut self, store: &mut S, node: NodeId) -> Option<NodeId>
    where
        S: NodeStore + ?Sized,
    {
        //       ┌────────── 34 ─────────┐
        //       │                       │
        // ┌──── 2 ────┐                 58 ────┐
        // │           │                        │
        // 1      ┌─── 9 ────┐              ┌── 77 ──┐
        //        │          │              │        │
        //     ┌─ 6       ┌─ 20 ─┐      ┌─ 71 ─┐     82
        //     │          │      │      │      │
        //     5         12 ─┐   24    67      75
        //                   │
        //                   13
        let parent = store.parent(node);
        let color = store.color(node);

        match (store.left(node), store.right(node)) {
            (None, right) => {
                // `node` has no children or only a right one, e.g. 1, 12, 58 above.
                // Replace `node` with its right child or nothing.
                trace!(?node, "erase: splice right child");
                self.replace_subtree(store, node, right);
                match right {
                    // A single child is red and its parent black, so the child
                    // can take over the black of `node`.
                    Some(right) => {
                        store.set_parent(right, parent);
                        store.set_color(right, color);
                        None
                    }
                    None if color.is_black() => parent,
                    None => None,
                }
            }
            (Some(left), None) => {
                // e.g. 6 above
                trace!(?node, "erase: splice left child");
                self.replace_subtree(store, node, Some(left));
                store.set_parent(left, parent);
                store.set_color(left, color);
                None
            }
            (Some(left), Some(right)) => {
                // Replace `node` with its successor, the minimum of the right subtree.
                // The successor has no left child.
                let successor = Self::minimum(store, right);
                let successor_child = store.right(successor);
                let successor_color = store.color(successor);

                //  a) the successor is the right child of `node`, it can take
                //     the place of `node` together with its right subtree,
                //     e.g. remove 20, 77 above
                //  b) otherwise the successor is first replaced by its own right
                //     child and then takes over the right subtree of `node`,
                //     e.g. remove 9 above, successor is 12
                let successor_parent = if successor == right {
                    trace!(?node, ?successor, "erase: splice right child as successor");
                    successor
                } else {
                    trace!(?node, ?successor, "erase: detach successor");
                    let successor_parent = store.parent_of(successor);
                    store.set_left(successor_parent, successor_child);
                    store.set_right(successor, Some(right));
                    store.set_parent(right, Some(successor));
                    successor_parent
                };

                store.set_left(successor, Some(left));
                store.set_parent(left, Some(successor));
                self.replace_subtree(store, node, Some(successor));
                store.set_parent(successor, parent);
                store.set_color(successor, color);

                match successor_child {
                    // The red child takes over the black the successor took away
                    // from its old place.
                    Some(child) => {
                        store.set_parent(child, Some(successor_parent));
                        store.set_color(child, Color::Black);
                        None
                    }
                    None if successor_color.is_black() => Some(successor_parent),
                    None => None,
                }
            }
        }
    }

    /// Restores the black height below `parent` where one of its child
    /// positions is one black node short.
    fn erase_fixup<S>(&mut self, store: &mut S, parent: NodeId)
    where
        S: NodeStore + ?Sized,
    {
        // `node` is the deficient position, absent at first.
        // The sibling of a deficient position always exists: the path through
        // `node` has at least one black node less than paths through the
        // sibling and that can't hold for an absent sibling.
        let mut node: Option<NodeId> = None;
        let mut parent = parent;

        loop {
            if store.right(parent) != node {
                // deficient position is the left child
                let mut sibling = store
                    .right(parent)
                    .expect("sibling of a deficient position must exist");

                if store.color(sibling).is_red() {
                    // case 1
                    //     ┌─── p:b ───┐                ┌─── p:r ───┐                    ┌─── s:b ───┐
                    //     │           │                │           │                    │           │
                    // ┌─ x:b ─┐   ┌─ s:r ─┐   ──►  ┌─ x:b ─┐   ┌─ s:b ─┐   ──►      ┌─ p:r ─┐      d:b
                    // │       │   │       │        │       │   │       │            │       │
                    // a       b  c:b     d:b       a       b  c:b     d:b       ┌─ x:b ─┐  c:b
                    //                                                           │       │
                    //                                                           a       b
                    // Paths through x still miss a black node but x has gained a
                    // red parent and a black sibling, one of cases 2, 3 or 4 follows.
                    trace!(?parent, "erase fixup: red sibling, rotate left");
                    store.set_color(sibling, Color::Black);
                    store.set_color(parent, Color::Red);
                    self.rotate_left(store, parent);
                    sibling = store
                        .right(parent)
                        .expect("children of a red sibling must exist");
                }

                let near = store.left(sibling);
                let far = store.right(sibling);

                if store.is_black(near) && store.is_black(far) {
                    // case 2
                    //     ┌─── p:c ───┐                ┌─── p:c ───┐
                    //     │           │                │           │
                    // ┌─ x:b ─┐   ┌─ s:b ─┐   ──►  ┌─ x:b ─┐   ┌─ s:r ─┐
                    // │       │   │       │        │       │   │       │
                    // a       b  c:b     d:b       a       b  c:b     d:b
                    //
                    // Both subtrees of p are now short by one. A red p absorbs
                    // it by turning black, otherwise p becomes the deficient
                    // position and we move up.
                    store.set_color(sibling, Color::Red);
                    if store.color(parent).is_red() {
                        trace!(?parent, "erase fixup: black nephews, recolor red parent");
                        store.set_color(parent, Color::Black);
                        break;
                    }

                    trace!(?parent, "erase fixup: black nephews, propagate");
                    node = Some(parent);
                    match store.parent(parent) {
                        Some(grand_parent) => parent = grand_parent,
                        None => break,
                    }
                    continue;
                }

                if store.is_black(far) {
                    // case 3
                    //    ┌───── p:c ─────┐                ┌─── p:c ───┐
                    //    │               │                │           │
                    // ┌─ x:b ─┐      ┌─ s:b ─┐   ──►  ┌─ x:b ─┐   ┌─ c:b ─┐
                    // │       │      │       │        │       │   │       │
                    // a       b  ┌─ c:r ─┐  d:b       a       b   e   ┌─ s:r ─┐
                    //            │       │                            │       │
                    //            e       f                            f      d:b
                    //
                    // Turns into case 4.
                    trace!(?parent, "erase fixup: red near nephew, rotate sibling");
                    if let Some(near) = near {
                        store.set_color(near, Color::Black);
                    }
                    store.set_color(sibling, Color::Red);
                    self.rotate_right(store, sibling);
                    sibling = store
                        .right(parent)
                        .expect("the rotated nephew replaces the sibling");
                }

                // case 4
                //     ┌─── p:c ───┐                     ┌── s:c ──┐
                //     │           │                     │         │
                // ┌─ x:b ─┐   ┌─ s:b ─┐   ──►       ┌─ p:b ─┐    d:b
                // │       │   │       │             │       │
                // a       b  c:?     d:r       ┌─ x:b ─┐   c:?
                //                              │       │
                //                              a       b
                //
                // x gains a black ancestor, the paths through d keep theirs
                // because d turns black.
                trace!(?parent, "erase fixup: red far nephew, rotate parent");
                store.set_color(sibling, store.color(parent));
                store.set_color(parent, Color::Black);
                if let Some(far) = store.right(sibling) {
                    store.set_color(far, Color::Black);
                }
                self.rotate_left(store, parent);
                break;
            } else {
                // same as above with left and right switched
                let mut sibling = store
                    .left(parent)
                    .expect("sibling of a deficient position must exist");

                if store.color(sibling).is_red() {
                    trace!(?parent, "erase fixup: red sibling, rotate right");
                    store.set_color(sibling, Color::Black);
                    store.set_color(parent, Color::Red);
                    self.rotate_right(store, parent);
                    sibling = store
                        .left(parent)
                        .expect("children of a red sibling must exist");
                }

                let near = store.right(sibling);
                let far = store.left(sibling);

                if store.is_black(near) && store.is_black(far) {
                    store.set_color(sibling, Color::Red);
                    if store.color(parent).is_red() {
                        trace!(?parent, "erase fixup: black nephews, recolor red parent");
                        store.set_color(parent, Color::Black);
                        break;
                    }

                    trace!(?parent, "erase fixup: black nephews, propagate");
                    node = Some(parent);
                    match store.parent(parent) {
                        Some(grand_parent) => parent = grand_parent,
                        None => break,
                    }
                    continue;
                }

                if store.is_black(far) {
                    trace!(?parent, "erase fixup: red near nephew, rotate sibling");
                    if let Some(near) = near {
                        store.set_color(near, Color::Black);
                    }
                    store.set_color(sibling, Color::Red);
                    self.rotate_left(store, sibling);
                    sibling = store
                        .left(parent)
                        .expect("the rotated nephew replaces the sibling");
                }

                trace!(?parent, "erase fixup: red far nephew, rotate parent");
                store.set_color(sibling, store.color(parent));
                store.set_color(parent, Color::Black);
                if let Some(far) = store.left(sibling) {
                    store.set_color(far, Color::Black);
                }
                self.rotate_right(store, parent);
                break;
            }
        }
    }

    /// Points the slot that holds `old` at `new`.
    ///
    /// The parent link of `new` is left to the caller.
    fn replace_subtree<S>(&mut self, store: &mut S, old: NodeId, new: Option<NodeId>)
    where
        S: NodeStore + ?Sized,
    {
        match store.position(old) {
            Position::Root => self.root = new,
            Position::Left(parent) => store.set_left(parent, new),
            Position::Right(parent) => store.set_right(parent, new),
        }
    }

    /// Rotates `node` down to the left, its right child takes its place.
    ///
    /// Does nothing if `node` has no right child.
    pub fn rotate_left<S>(&mut self, store: &mut S, node: NodeId)
    where
        S: NodeStore + ?Sized,
    {
        //    p                       p
        //    |                       |
        // +-node-+               +-right-+
        // |      |      -->      |       |
        // a  +-right-+       +-node-+    c
        //    |       |       |      |
        //    b       c       a      b
        // where a, b, c can be any subtrees
        let Some(right) = store.right(node) else {
            return;
        };

        // attach b to node
        let b = store.left(right);
        store.set_right(node, b);
        if let Some(b) = b {
            store.set_parent(b, Some(node));
        }

        // attach right to parent
        let parent = store.parent(node);
        self.replace_subtree(store, node, Some(right));
        store.set_parent(right, parent);

        // attach node to right
        store.set_left(right, Some(node));
        store.set_parent(node, Some(right));
    }

    /// Rotates `node` down to the right, its left child takes its place.
    ///
    /// Does nothing if `node` has no left child.
    pub fn rotate_right<S>(&mut self, store: &mut S, node: NodeId)
    where
        S: NodeStore + ?Sized,
    {
        //         p              p
        //         |              |
        //     +-node-+       +-left-+
        //     |      |       |      |
        // +-left-+   c  -->  a  +-node-+
        // |      |              |      |
        // a      b              b      c
        // where a, b, c can be any subtrees
        let Some(left) = store.left(node) else {
            return;
        };

        // attach b to node
        let b = store.right(left);
        store.set_left(node, b);
        if let Some(b) = b {
            store.set_parent(b, Some(node));
        }

        // attach left to parent
        let parent = store.parent(node);
        self.replace_subtree(store, node, Some(left));
        store.set_parent(left, parent);

        // attach node to left
        store.set_right(left, Some(node));
        store.set_parent(node, Some(left));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{Linked, RbNode};

    const DATA: [u32; 10] = [50, 15, 68, 5, 75, 6, 1, 2, 8, 10];
    const ORDERED_DATA: [u32; 10] = [1, 2, 5, 6, 8, 10, 15, 50, 68, 75];

    const LONG_DATA: [u32; 71] = [
        640, 1, 2, 3, 6, 7, 8, 9, 10, 11, 14, 15, 270, 17, 19, 20, 21, 22, 280, 25, 26, 28, 30,
        31, 32, 34, 35, 930, 38, 39, 40, 170, 43, 44, 46, 48, 49, 50, 51, 53, 54, 55, 58, 59, 60,
        64, 65, 66, 450, 69, 71, 72, 75, 79, 80, 81, 82, 84, 85, 86, 470, 89, 92, 93, 94, 95, 96,
        97, 99, 230, 620,
    ];
    const LONG_DELETION_ORDER: [usize; 71] = [
        46, 64, 49, 0, 41, 8, 1, 7, 13, 60, 29, 65, 59, 32, 31, 52, 14, 5, 12, 68, 37, 4, 47, 33,
        48, 69, 3, 16, 50, 35, 66, 40, 62, 44, 36, 10, 57, 27, 56, 9, 20, 58, 22, 2, 6, 26, 25,
        17, 70, 45, 21, 43, 38, 63, 55, 28, 23, 39, 53, 42, 34, 18, 54, 24, 30, 61, 11, 51, 15,
        67, 19,
    ];

    #[derive(Debug)]
    struct Holder {
        data: u32,
        link: RbNode,
    }

    impl Linked for Holder {
        fn rb_node(&self) -> &RbNode {
            &self.link
        }

        fn rb_node_mut(&mut self) -> &mut RbNode {
            &mut self.link
        }
    }

    /// Records of a test tree, `holders[i]` is addressed by `NodeId::new(i)`.
    fn holders(data: &[u32]) -> Vec<Holder> {
        data.iter()
            .map(|&data| Holder {
                data,
                link: RbNode::new(),
            })
            .collect()
    }

    /// Places holder `id` by its data, equal data goes to the right.
    fn insert_holder(tree: &mut RbTree, holders: &mut Vec<Holder>, id: NodeId) {
        let records: &Vec<Holder> = holders;
        let data = records[id.index()].data;
        let position = match tree.search(records, |x| match data.cmp(&records[x.index()].data) {
            Ordering::Equal => Ordering::Greater,
            ord => ord,
        }) {
            Ok(_) => unreachable!("equal keys are sent right"),
            Err(position) => position,
        };
        tree.insert(holders, id, position);
    }

    fn build(data: &[u32]) -> (RbTree, Vec<Holder>) {
        let mut tree = RbTree::new();
        let mut holders = holders(data);
        for i in 0..data.len() {
            insert_holder(&mut tree, &mut holders, NodeId::new(i));
        }
        (tree, holders)
    }

    fn collect(tree: &RbTree, holders: &Vec<Holder>) -> Vec<u32> {
        tree.iter(holders)
            .map(|id| holders[id.index()].data)
            .collect()
    }

    fn data_of(holders: &[Holder], id: Option<NodeId>) -> Option<u32> {
        id.map(|id| holders[id.index()].data)
    }

    /// Asserts that no red node has a red child, by walking first/next.
    fn assert_no_double_red(tree: &RbTree, holders: &Vec<Holder>) {
        for id in tree.iter(holders) {
            let node = holders.node(id);
            if node.color().is_red() {
                assert!(holders.is_black(node.left()), "red node had a red left child");
                assert!(holders.is_black(node.right()), "red node had a red right child");
            }
        }
    }

    #[test]
    fn create() {
        let tree = RbTree::new();
        assert_eq!(tree.root(), None);
        assert!(tree.is_empty());
        assert_eq!(tree, RbTree::default());
    }

    #[test]
    fn empty() {
        let mut tree = RbTree::new();
        let mut holders = holders(&[3]);
        assert!(tree.is_empty());

        insert_holder(&mut tree, &mut holders, NodeId::new(0));
        assert!(!tree.is_empty());
        assert_eq!(tree.root(), Some(NodeId::new(0)));
        assert_eq!(holders[0].link.color(), Color::Black);
    }

    #[test]
    fn count() {
        let mut tree = RbTree::new();
        let mut holders = holders(&DATA);
        assert_eq!(tree.count(&holders), 0);

        for i in 0..DATA.len() {
            insert_holder(&mut tree, &mut holders, NodeId::new(i));
            assert_eq!(tree.count(&holders), i + 1);
        }
    }

    #[test]
    fn first_last() {
        let (tree, holders) = build(&DATA);
        assert_eq!(data_of(&holders, tree.first(&holders)), Some(1));
        assert_eq!(data_of(&holders, tree.last(&holders)), Some(75));
    }

    #[test]
    fn next() {
        let (tree, holders) = build(&DATA);

        let mut node = tree.first(&holders);
        for expected in ORDERED_DATA {
            assert_eq!(data_of(&holders, node), Some(expected));
            node = node.and_then(|node| RbTree::next(&holders, node));
        }
        assert_eq!(node, None);
    }

    #[test]
    fn previous() {
        let (tree, holders) = build(&DATA);

        let mut node = tree.last(&holders);
        for expected in ORDERED_DATA.into_iter().rev() {
            assert_eq!(data_of(&holders, node), Some(expected));
            node = node.and_then(|node| RbTree::prev(&holders, node));
        }
        assert_eq!(node, None);
    }

    #[test]
    fn empty_boundaries() {
        let tree = RbTree::new();
        let holders = holders(&[]);
        assert_eq!(tree.first(&holders), None);
        assert_eq!(tree.last(&holders), None);
        assert_eq!(tree.iter(&holders).next(), None);

        let (tree, holders) = build(&DATA);
        let first = tree.first(&holders).unwrap();
        let last = tree.last(&holders).unwrap();
        assert_eq!(RbTree::prev(&holders, first), None);
        assert_eq!(RbTree::next(&holders, last), None);
    }

    #[test]
    fn insert_scenario() {
        let mut tree = RbTree::new();
        let mut holders = holders(&DATA);

        for i in 0..DATA.len() {
            insert_holder(&mut tree, &mut holders, NodeId::new(i));
            tree.validate(&holders).unwrap();
        }

        assert_eq!(collect(&tree, &holders), ORDERED_DATA);
        // 50:b
        // ├── 6:r
        // │   ├── 2:b (1:r, 5:r)
        // │   └── 10:b (8:r, 15:r)
        // └── 68:b
        //     └── 75:r
        assert_eq!(data_of(&holders, tree.root()), Some(50));
        assert_eq!(tree.validate(&holders), Ok(2));
    }

    #[test]
    fn remove_scenario() {
        let (mut tree, mut holders) = build(&DATA);
        let fifty = NodeId::new(0);
        let sixty_eight = NodeId::new(2);
        let old_left = holders.left(fifty);
        assert!(old_left.is_some() && holders.right(fifty).is_some());

        tree.remove(&mut holders, fifty);

        // the successor took the place of 50
        assert_eq!(tree.root(), Some(sixty_eight));
        assert_eq!(holders.left(sixty_eight), old_left);
        assert_eq!(holders.color(sixty_eight), Color::Black);
        assert_eq!(tree.count(&holders), 9);
        assert_eq!(collect(&tree, &holders), [1, 2, 5, 6, 8, 10, 15, 68, 75]);
        tree.validate(&holders).unwrap();

        // the removed node is unlinked
        assert_eq!(holders[0].link, RbNode::new());
    }

    #[test]
    fn insert() {
        let mut tree = RbTree::new();
        let mut holders = holders(&LONG_DATA);

        for i in 0..LONG_DATA.len() {
            let old_black_height = tree.black_height(&holders);
            insert_holder(&mut tree, &mut holders, NodeId::new(i));
            let new_black_height = tree.black_height(&holders);

            assert_eq!(tree.count(&holders), i + 1);
            let delta = new_black_height as isize - old_black_height as isize;
            assert!(delta == 0 || delta == 1, "insertion changed black height by {delta}");
            assert!(holders.is_black(tree.root()), "root must be black");
            assert_no_double_red(&tree, &holders);
            assert_eq!(tree.validate(&holders), Ok(new_black_height));
        }

        let mut sorted = LONG_DATA;
        sorted.sort();
        assert_eq!(collect(&tree, &holders), sorted);
    }

    #[test]
    fn remove() {
        let (mut tree, mut holders) = build(&LONG_DATA);

        for (i, &index) in LONG_DELETION_ORDER.iter().enumerate() {
            let old_black_height = tree.black_height(&holders);
            tree.remove(&mut holders, NodeId::new(index));
            let new_black_height = tree.black_height(&holders);

            assert_eq!(tree.count(&holders), LONG_DATA.len() - 1 - i);
            let delta = new_black_height as isize - old_black_height as isize;
            assert!(delta == 0 || delta == -1, "removal changed black height by {delta}");
            assert!(holders.is_black(tree.root()), "root must be black");
            assert_no_double_red(&tree, &holders);
            assert_eq!(tree.validate(&holders), Ok(new_black_height));
        }

        assert!(tree.is_empty());
    }

    #[test]
    fn reinsert_removed() {
        let (mut tree, mut holders) = build(&DATA);
        for i in [0, 3, 7] {
            tree.remove(&mut holders, NodeId::new(i));
        }
        for i in [7, 0, 3] {
            insert_holder(&mut tree, &mut holders, NodeId::new(i));
            tree.validate(&holders).unwrap();
        }
        assert_eq!(collect(&tree, &holders), ORDERED_DATA);
    }

    fn permutations(n: usize) -> Vec<Vec<usize>> {
        if n == 0 {
            return vec![Vec::new()];
        }
        let mut out = Vec::new();
        for perm in permutations(n - 1) {
            for at in 0..=perm.len() {
                let mut perm = perm.clone();
                perm.insert(at, n - 1);
                out.push(perm);
            }
        }
        out
    }

    #[test]
    fn all_small_permutations() {
        for n in 1..=6 {
            let data: Vec<u32> = (0..n as u32).collect();
            let orders = permutations(n);
            for (k, inserts) in orders.iter().enumerate() {
                let mut tree = RbTree::new();
                let mut holders = holders(&data);
                for &i in inserts {
                    let before = tree.black_height(&holders);
                    insert_holder(&mut tree, &mut holders, NodeId::new(i));
                    let after = tree.validate(&holders).unwrap();
                    assert!(after == before || after == before + 1, "{inserts:?}");
                }
                assert_eq!(collect(&tree, &holders), data);

                // pair every insertion order with a different removal order
                let removals = &orders[(k * 7 + 3) % orders.len()];
                let mut live: Vec<u32> = data.clone();
                for &i in removals {
                    let before = tree.black_height(&holders);
                    tree.remove(&mut holders, NodeId::new(i));
                    live.retain(|&d| d != data[i]);
                    let after = tree.validate(&holders).unwrap();
                    assert!(after == before || after + 1 == before, "{inserts:?} {removals:?}");
                    assert_eq!(collect(&tree, &holders), live);
                }
                assert!(tree.is_empty());
            }
        }
    }

    #[test]
    fn search() {
        let (tree, holders) = build(&DATA);
        let find = |key: u32| tree.search(&holders, |x| key.cmp(&holders[x.index()].data));

        assert_eq!(find(50), Ok(NodeId::new(0)));
        assert_eq!(find(10), Ok(NodeId::new(9)));
        // 9 would go between 8 and 10, 8 is a leaf
        assert_eq!(find(9), Err(Position::Right(NodeId::new(8))));
        assert_eq!(find(100), Err(Position::Right(NodeId::new(4))));
        assert_eq!(RbTree::new().search(&holders, |_| Ordering::Less), Err(Position::Root));
    }

    #[test]
    fn link_without_fixup() {
        let mut tree = RbTree::new();
        let mut holders = holders(&[12, 9]);
        tree.link(&mut holders, NodeId::new(0), Position::Root);

        assert_eq!(tree.root(), Some(NodeId::new(0)));
        // nothing was recolored
        assert_eq!(holders.color(NodeId::new(0)), Color::Red);
        assert!(tree.validate(&holders).is_err());

        tree.insert_fixup(&mut holders, NodeId::new(0));
        assert_eq!(tree.validate(&holders), Ok(1));

        tree.link(&mut holders, NodeId::new(1), Position::Left(NodeId::new(0)));
        assert_eq!(holders.parent(NodeId::new(1)), Some(NodeId::new(0)));
        assert_eq!(holders.left(NodeId::new(0)), Some(NodeId::new(1)));
        tree.insert_fixup(&mut holders, NodeId::new(1));
        assert_eq!(tree.validate(&holders), Ok(1));
    }

    #[derive(Debug, PartialEq)]
    struct Shape {
        data: u32,
        parent: Option<u32>,
        left: Option<Box<Shape>>,
        right: Option<Box<Shape>>,
    }

    impl Shape {
        fn leaf(data: u32, parent: u32) -> Self {
            Self {
                data,
                parent: Some(parent),
                left: None,
                right: None,
            }
        }

        fn of(holders: &[Holder], id: NodeId) -> Self {
            let node = holders.node(id);
            Self {
                data: holders[id.index()].data,
                parent: data_of(holders, node.parent()),
                left: node.left().map(|left| Box::new(Self::of(holders, left))),
                right: node.right().map(|right| Box::new(Self::of(holders, right))),
            }
        }
    }

    #[test]
    fn rotate_roundtrip() {
        // plain bst links, the shape is all that matters here
        let mut tree = RbTree::new();
        let mut holders = holders(&[12, 9, 15, 14, 16]);
        let id = |data: u32| NodeId::new([12, 9, 15, 14, 16].iter().position(|&d| d == data).unwrap());
        tree.link(&mut holders, id(12), Position::Root);
        tree.link(&mut holders, id(9), Position::Left(id(12)));
        tree.link(&mut holders, id(15), Position::Right(id(12)));
        tree.link(&mut holders, id(14), Position::Left(id(15)));
        tree.link(&mut holders, id(16), Position::Right(id(15)));

        let expected0 = Shape {
            data: 12,
            parent: None,
            left: Some(Box::new(Shape::leaf(9, 12))),
            right: Some(Box::new(Shape {
                data: 15,
                parent: Some(12),
                left: Some(Box::new(Shape::leaf(14, 15))),
                right: Some(Box::new(Shape::leaf(16, 15))),
            })),
        };
        assert_eq!(Shape::of(&holders, tree.root().unwrap()), expected0);

        tree.rotate_left(&mut holders, tree.root().unwrap());
        let expected1 = Shape {
            data: 15,
            parent: None,
            left: Some(Box::new(Shape {
                data: 12,
                parent: Some(15),
                left: Some(Box::new(Shape::leaf(9, 12))),
                right: Some(Box::new(Shape::leaf(14, 12))),
            })),
            right: Some(Box::new(Shape::leaf(16, 15))),
        };
        assert_eq!(Shape::of(&holders, tree.root().unwrap()), expected1);

        tree.rotate_left(&mut holders, tree.root().unwrap());
        let expected2 = Shape {
            data: 16,
            parent: None,
            left: Some(Box::new(Shape {
                data: 15,
                parent: Some(16),
                left: Some(Box::new(Shape {
                    data: 12,
                    parent: Some(15),
                    left: Some(Box::new(Shape::leaf(9, 12))),
                    right: Some(Box::new(Shape::leaf(14, 12))),
                })),
                right: None,
            })),
            right: None,
        };
        assert_eq!(Shape::of(&holders, tree.root().unwrap()), expected2);

        // 16 has no right child, nothing happens
        tree.rotate_left(&mut holders, tree.root().unwrap());
        assert_eq!(Shape::of(&holders, tree.root().unwrap()), expected2);

        tree.rotate_left(&mut holders, id(12));
        let expected3 = Shape {
            data: 16,
            parent: None,
            left: Some(Box::new(Shape {
                data: 15,
                parent: Some(16),
                left: Some(Box::new(Shape {
                    data: 14,
                    parent: Some(15),
                    left: Some(Box::new(Shape {
                        data: 12,
                        parent: Some(14),
                        left: Some(Box::new(Shape::leaf(9, 12))),
                        right: None,
                    })),
                    right: None,
                })),
                right: None,
            })),
            right: None,
        };
        assert_eq!(Shape::of(&holders, tree.root().unwrap()), expected3);

        tree.rotate_right(&mut holders, id(14));
        assert_eq!(Shape::of(&holders, tree.root().unwrap()), expected2);

        tree.rotate_right(&mut holders, tree.root().unwrap());
        assert_eq!(Shape::of(&holders, tree.root().unwrap()), expected1);

        tree.rotate_right(&mut holders, tree.root().unwrap());
        assert_eq!(Shape::of(&holders, tree.root().unwrap()), expected0);
    }

    mod proptests {
        use proptest::prelude::*;
        use rand::seq::SliceRandom;
        use rand::SeedableRng;
        use rand_chacha::ChaCha8Rng;

        use super::*;

        #[cfg(not(miri))]
        const TREE_SIZE: usize = 1000;
        #[cfg(miri)]
        const TREE_SIZE: usize = 50;

        #[cfg(not(miri))]
        const PROPTEST_CASES: u32 = 500;
        #[cfg(miri)]
        const PROPTEST_CASES: u32 = 10;

        proptest!(
            #![proptest_config(ProptestConfig::with_cases(PROPTEST_CASES))]

            #[test]
            fn order(
                inserts in proptest::collection::hash_set(0..10000u32, 0..TREE_SIZE),
            ) {
                let data: Vec<_> = inserts.into_iter().collect();
                let (tree, holders) = build(&data);

                let mut sorted = data.clone();
                sorted.sort();
                prop_assert_eq!(collect(&tree, &holders), sorted.clone());

                let reversed: Vec<_> = tree
                    .iter(&holders)
                    .rev()
                    .map(|id| holders[id.index()].data)
                    .collect();
                sorted.reverse();
                prop_assert_eq!(reversed, sorted);
            }

            #[test]
            fn insert_remove(
                data in proptest::collection::vec(0..10000u32, 0..TREE_SIZE),
                seed in any::<u64>(),
            ) {
                let mut rng = ChaCha8Rng::seed_from_u64(seed);
                let mut tree = RbTree::new();
                let mut holders = holders(&data);

                // duplicates are fine, they go to the right
                for i in 0..data.len() {
                    let before = tree.black_height(&holders);
                    insert_holder(&mut tree, &mut holders, NodeId::new(i));
                    let after = tree.validate(&holders);
                    prop_assert!(after == Ok(before) || after == Ok(before + 1), "{:?}", after);
                }
                prop_assert_eq!(tree.count(&holders), data.len());

                let mut order: Vec<_> = (0..data.len()).collect();
                order.shuffle(&mut rng);
                // remove half, put a quarter back, then remove everything
                let (first, rest) = order.split_at(data.len() / 2);
                let mut live = data.len();
                for &i in first {
                    let before = tree.black_height(&holders);
                    tree.remove(&mut holders, NodeId::new(i));
                    live -= 1;
                    let after = tree.validate(&holders);
                    prop_assert!(after == Ok(before) || after == Ok(before - 1), "{:?}", after);
                    prop_assert_eq!(tree.count(&holders), live);
                }
                for &i in &first[..first.len() / 2] {
                    insert_holder(&mut tree, &mut holders, NodeId::new(i));
                    live += 1;
                    prop_assert!(tree.validate(&holders).is_ok());
                }
                for &i in first[..first.len() / 2].iter().chain(rest) {
                    tree.remove(&mut holders, NodeId::new(i));
                    live -= 1;
                    prop_assert!(tree.validate(&holders).is_ok());
                    prop_assert_eq!(tree.count(&holders), live);
                }
                prop_assert!(tree.is_empty());
            }
        );
    }
}
