use core::fmt;
use core::iter::FusedIterator;

use crate::node::{NodeId, NodeStore};
use crate::tree::RbTree;

/// In-order iterator over the nodes of an [`RbTree`].
///
/// Yields ascending handles from the front and descending handles from the
/// back, every node at most once.
pub struct Iter<'a, S: ?Sized> {
    store: &'a S,
    // Both `None` once the cursors have crossed.
    front: Option<NodeId>,
    back: Option<NodeId>,
}

impl<'a, S> Iter<'a, S>
where
    S: NodeStore + ?Sized,
{
    pub(crate) fn new(store: &'a S, first: Option<NodeId>, last: Option<NodeId>) -> Self {
        Self {
            store,
            front: first,
            back: last,
        }
    }

    fn finish(&mut self) {
        self.front = None;
        self.back = None;
    }
}

impl<S: ?Sized> Clone for Iter<'_, S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store,
            front: self.front,
            back: self.back,
        }
    }
}

impl<S: ?Sized> fmt::Debug for Iter<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Iter")
            .field("front", &self.front)
            .field("back", &self.back)
            .finish()
    }
}

impl<S> Iterator for Iter<'_, S>
where
    S: NodeStore + ?Sized,
{
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.front?;
        if self.back == Some(current) {
            self.finish();
        } else {
            self.front = RbTree::next(self.store, current);
        }

        Some(current)
    }
}

impl<S> DoubleEndedIterator for Iter<'_, S>
where
    S: NodeStore + ?Sized,
{
    fn next_back(&mut self) -> Option<Self::Item> {
        let current = self.back?;
        if self.front == Some(current) {
            self.finish();
        } else {
            self.back = RbTree::prev(self.store, current);
        }

        Some(current)
    }
}

impl<S> FusedIterator for Iter<'_, S> where S: NodeStore + ?Sized {}
