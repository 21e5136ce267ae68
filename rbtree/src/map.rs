use core::cmp::Ordering;
use core::fmt;
use core::iter::FusedIterator;
use core::mem;

use tracing::trace;

use crate::iter::Iter as NodeIter;
use crate::node::{NodeId, NodeStore, Position, RbNode};
use crate::tree::RbTree;
use crate::validate::InvariantError;

/// Total order over keys of an [`RbMap`].
pub trait Comparator<K: ?Sized> {
    fn compare(&self, a: &K, b: &K) -> Ordering;
}

/// Orders keys by their [`Ord`] implementation.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Natural;

impl<K: Ord + ?Sized> Comparator<K> for Natural {
    #[inline]
    fn compare(&self, a: &K, b: &K) -> Ordering {
        a.cmp(b)
    }
}

impl<K: ?Sized, F> Comparator<K> for F
where
    F: Fn(&K, &K) -> Ordering,
{
    #[inline]
    fn compare(&self, a: &K, b: &K) -> Ordering {
        self(a, b)
    }
}

struct Entry<K, V> {
    key: K,
    value: V,
    link: RbNode,
}

enum Slot<K, V> {
    Occupied(Entry<K, V>),
    Vacant,
}

/// Slab of map entries, handles are slot indices.
struct Entries<K, V> {
    slots: Vec<Slot<K, V>>,
    free: Vec<NodeId>,
}

impl<K, V> Entries<K, V> {
    const fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
        }
    }

    fn alloc(&mut self, key: K, value: V) -> NodeId {
        let entry = Slot::Occupied(Entry {
            key,
            value,
            link: RbNode::new(),
        });
        match self.free.pop() {
            Some(id) => {
                self.slots[id.index()] = entry;
                id
            }
            None => {
                self.slots.push(entry);
                NodeId::new(self.slots.len() - 1)
            }
        }
    }

    /// Takes the entry out of a slot whose node was already removed from the tree.
    fn release(&mut self, id: NodeId) -> (K, V) {
        match mem::replace(&mut self.slots[id.index()], Slot::Vacant) {
            Slot::Occupied(entry) => {
                self.free.push(id);
                (entry.key, entry.value)
            }
            Slot::Vacant => unreachable!("{id:?} released twice"),
        }
    }

    #[inline]
    fn entry(&self, id: NodeId) -> &Entry<K, V> {
        match &self.slots[id.index()] {
            Slot::Occupied(entry) => entry,
            Slot::Vacant => unreachable!("{id:?} refers to a vacant slot"),
        }
    }

    #[inline]
    fn entry_mut(&mut self, id: NodeId) -> &mut Entry<K, V> {
        match &mut self.slots[id.index()] {
            Slot::Occupied(entry) => entry,
            Slot::Vacant => unreachable!("{id:?} refers to a vacant slot"),
        }
    }

    #[inline]
    fn key(&self, id: NodeId) -> &K {
        &self.entry(id).key
    }

    fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
    }
}

impl<K, V> NodeStore for Entries<K, V> {
    #[inline]
    fn node(&self, id: NodeId) -> &RbNode {
        &self.entry(id).link
    }

    #[inline]
    fn node_mut(&mut self, id: NodeId) -> &mut RbNode {
        &mut self.entry_mut(id).link
    }
}

/// Ordered map on top of [`RbTree`].
///
/// Keys are unique under the comparator `C`. Node handles never leave the
/// map, so a removed entry can't be reached anymore.
pub struct RbMap<K, V, C = Natural> {
    tree: RbTree,
    entries: Entries<K, V>,
    len: usize,
    cmp: C,
}

impl<K: Ord, V> RbMap<K, V> {
    pub const fn new() -> Self {
        Self::with_comparator(Natural)
    }
}

impl<K, V, C> RbMap<K, V, C>
where
    C: Comparator<K>,
{
    pub const fn with_comparator(cmp: C) -> Self {
        Self {
            tree: RbTree::new(),
            entries: Entries::new(),
            len: 0,
            cmp,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn comparator(&self) -> &C {
        &self.cmp
    }

    fn search(&self, key: &K) -> Result<NodeId, Position> {
        self.tree
            .search(&self.entries, |x| self.cmp.compare(key, self.entries.key(x)))
    }

    fn key_value(&self, id: NodeId) -> (&K, &V) {
        let entry = self.entries.entry(id);
        (&entry.key, &entry.value)
    }

    /// Inserts a key-value pair, returning the old value if the key was
    /// already present. The stored key is kept in that case.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        match self.search(&key) {
            Ok(id) => Some(mem::replace(&mut self.entries.entry_mut(id).value, value)),
            Err(position) => {
                let id = self.entries.alloc(key, value);
                trace!(?id, ?position, "map: insert");
                self.tree.insert(&mut self.entries, id, position);
                self.len += 1;
                None
            }
        }
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.get_key_value(key).map(|(_, v)| v)
    }

    pub fn get_key_value(&self, key: &K) -> Option<(&K, &V)> {
        self.search(key).ok().map(|id| self.key_value(id))
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let id = self.search(key).ok()?;
        Some(&mut self.entries.entry_mut(id).value)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.search(key).is_ok()
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.remove_entry(key).map(|(_, v)| v)
    }

    pub fn remove_entry(&mut self, key: &K) -> Option<(K, V)> {
        let id = self.search(key).ok()?;
        Some(self.remove_node(id))
    }

    fn remove_node(&mut self, id: NodeId) -> (K, V) {
        trace!(?id, "map: remove");
        self.tree.remove(&mut self.entries, id);
        self.len -= 1;
        self.entries.release(id)
    }

    pub fn first_key_value(&self) -> Option<(&K, &V)> {
        self.tree
            .first(&self.entries)
            .map(|id| self.key_value(id))
    }

    pub fn last_key_value(&self) -> Option<(&K, &V)> {
        self.tree
            .last(&self.entries)
            .map(|id| self.key_value(id))
    }

    pub fn pop_first(&mut self) -> Option<(K, V)> {
        let id = self.tree.first(&self.entries)?;
        Some(self.remove_node(id))
    }

    pub fn pop_last(&mut self) -> Option<(K, V)> {
        let id = self.tree.last(&self.entries)?;
        Some(self.remove_node(id))
    }

    /// Entry with the next larger key after `key`, `key` must be in the map.
    pub fn successor(&self, key: &K) -> Option<(&K, &V)> {
        let id = self.search(key).ok()?;
        RbTree::next(&self.entries, id).map(|id| self.key_value(id))
    }

    /// Entry with the next smaller key before `key`, `key` must be in the map.
    pub fn predecessor(&self, key: &K) -> Option<(&K, &V)> {
        let id = self.search(key).ok()?;
        RbTree::prev(&self.entries, id).map(|id| self.key_value(id))
    }

    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            entries: &self.entries,
            nodes: self.tree.iter(&self.entries),
            len: self.len,
        }
    }

    pub fn keys(&self) -> impl DoubleEndedIterator<Item = &K> + '_ {
        self.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl DoubleEndedIterator<Item = &V> + '_ {
        self.iter().map(|(_, v)| v)
    }

    pub fn clear(&mut self) {
        self.tree = RbTree::new();
        self.entries.clear();
        self.len = 0;
    }

    /// Checks the tree structure, the strict key order and the length.
    ///
    /// Returns the black height of the tree.
    pub fn check_invariants(&self) -> Result<usize, InvariantError> {
        let black_height = self.tree.validate(&self.entries)?;

        let mut nodes = self.tree.iter(&self.entries);
        if let Some(mut node) = nodes.next() {
            for next in nodes {
                if self
                    .cmp
                    .compare(self.entries.key(node), self.entries.key(next))
                    .is_ge()
                {
                    return Err(InvariantError::OutOfOrder { node, next });
                }
                node = next;
            }
        }

        debug_assert_eq!(self.tree.count(&self.entries), self.len);
        Ok(black_height)
    }
}

impl<K, V, C> Default for RbMap<K, V, C>
where
    C: Comparator<K> + Default,
{
    fn default() -> Self {
        Self::with_comparator(C::default())
    }
}

impl<K, V, C> fmt::Debug for RbMap<K, V, C>
where
    K: fmt::Debug,
    V: fmt::Debug,
    C: Comparator<K>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V, C> Extend<(K, V)> for RbMap<K, V, C>
where
    C: Comparator<K>,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl<K, V, C> FromIterator<(K, V)> for RbMap<K, V, C>
where
    C: Comparator<K> + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::default();
        map.extend(iter);
        map
    }
}

impl<'a, K, V, C> IntoIterator for &'a RbMap<K, V, C>
where
    C: Comparator<K>,
{
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over the entries of an [`RbMap`] in key order.
pub struct Iter<'a, K, V> {
    entries: &'a Entries<K, V>,
    nodes: NodeIter<'a, Entries<K, V>>,
    len: usize,
}

impl<K, V> Clone for Iter<'_, K, V> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries,
            nodes: self.nodes.clone(),
            len: self.len,
        }
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.nodes.next()?;
        self.len -= 1;
        let entry = self.entries.entry(id);
        Some((&entry.key, &entry.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.len, Some(self.len))
    }
}

impl<K, V> DoubleEndedIterator for Iter<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        let id = self.nodes.next_back()?;
        self.len -= 1;
        let entry = self.entries.entry(id);
        Some((&entry.key, &entry.value))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

impl<K, V> FusedIterator for Iter<'_, K, V> {}
