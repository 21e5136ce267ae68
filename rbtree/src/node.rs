use core::fmt;

/// Color of a red-black tree node.
///
/// Absent children count as [`Black`](Color::Black).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Color {
    Red,
    Black,
}

impl Color {
    /// Returns `true` if the color is [`Red`].
    ///
    /// [`Red`]: Color::Red
    #[must_use]
    pub fn is_red(&self) -> bool {
        matches!(self, Self::Red)
    }

    /// Returns `true` if the color is [`Black`].
    ///
    /// [`Black`]: Color::Black
    #[must_use]
    pub fn is_black(&self) -> bool {
        matches!(self, Self::Black)
    }
}

/// Stable handle of a record inside the caller's [`NodeStore`].
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

impl NodeId {
    #[inline]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<usize> for NodeId {
    fn from(index: usize) -> Self {
        Self(index)
    }
}

/// Linkage fields of a tree node, embedded in the caller's record.
///
/// The links can only be changed by [`RbTree`](crate::RbTree) operations,
/// the caller only ever reads them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RbNode {
    pub(crate) color: Color,
    pub(crate) parent: Option<NodeId>,
    pub(crate) left: Option<NodeId>,
    pub(crate) right: Option<NodeId>,
}

impl RbNode {
    /// Creates an unlinked node: red, without parent or children.
    pub const fn new() -> Self {
        Self {
            color: Color::Red,
            parent: None,
            left: None,
            right: None,
        }
    }

    /// Resets the node to the unlinked state so that it can be inserted again.
    pub fn init(&mut self) {
        *self = Self::new();
    }

    #[inline]
    pub fn color(&self) -> Color {
        self.color
    }

    #[inline]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    #[inline]
    pub fn left(&self) -> Option<NodeId> {
        self.left
    }

    #[inline]
    pub fn right(&self) -> Option<NodeId> {
        self.right
    }
}

impl Default for RbNode {
    fn default() -> Self {
        Self::new()
    }
}

/// Slot a node is linked into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    /// The root slot of the tree.
    Root,
    /// Left child slot of the given parent.
    Left(NodeId),
    /// Right child slot of the given parent.
    Right(NodeId),
}

impl Position {
    /// Parent owning the slot, `None` for the root slot.
    pub fn parent(&self) -> Option<NodeId> {
        match *self {
            Position::Root => None,
            Position::Left(parent) | Position::Right(parent) => Some(parent),
        }
    }
}

/// Arena of records that embed an [`RbNode`].
///
/// The tree never owns nodes, it only asks the store for the linkage of the
/// node behind a handle. Handing out a handle that is not in the store is a
/// contract violation and is allowed to panic.
pub trait NodeStore {
    fn node(&self, id: NodeId) -> &RbNode;

    fn node_mut(&mut self, id: NodeId) -> &mut RbNode;
}

/// Record type that embeds the tree linkage.
///
/// ```
/// use rbtree::{Linked, RbNode};
///
/// struct Timer {
///     deadline: u64,
///     link: RbNode,
/// }
///
/// impl Linked for Timer {
///     fn rb_node(&self) -> &RbNode {
///         &self.link
///     }
///
///     fn rb_node_mut(&mut self) -> &mut RbNode {
///         &mut self.link
///     }
/// }
/// ```
pub trait Linked {
    fn rb_node(&self) -> &RbNode;

    fn rb_node_mut(&mut self) -> &mut RbNode;
}

impl Linked for RbNode {
    fn rb_node(&self) -> &RbNode {
        self
    }

    fn rb_node_mut(&mut self) -> &mut RbNode {
        self
    }
}

impl<T: Linked> NodeStore for [T] {
    #[inline]
    fn node(&self, id: NodeId) -> &RbNode {
        self[id.index()].rb_node()
    }

    #[inline]
    fn node_mut(&mut self, id: NodeId) -> &mut RbNode {
        self[id.index()].rb_node_mut()
    }
}

impl<T: Linked> NodeStore for Vec<T> {
    #[inline]
    fn node(&self, id: NodeId) -> &RbNode {
        self.as_slice().node(id)
    }

    #[inline]
    fn node_mut(&mut self, id: NodeId) -> &mut RbNode {
        self.as_mut_slice().node_mut(id)
    }
}

/// Accessors over a [`NodeStore`] that make the tree algorithms readable.
pub(crate) trait StoreExt: NodeStore {
    #[inline]
    fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    /// Parent of a node that is known not to be the root.
    #[inline]
    fn parent_of(&self, id: NodeId) -> NodeId {
        self.node(id)
            .parent
            .expect("a non-root node must have a parent")
    }

    #[inline]
    fn set_parent(&mut self, id: NodeId, parent: Option<NodeId>) {
        self.node_mut(id).parent = parent;
    }

    #[inline]
    fn left(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).left
    }

    #[inline]
    fn set_left(&mut self, id: NodeId, left: Option<NodeId>) {
        self.node_mut(id).left = left;
    }

    #[inline]
    fn right(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).right
    }

    #[inline]
    fn set_right(&mut self, id: NodeId, right: Option<NodeId>) {
        self.node_mut(id).right = right;
    }

    #[inline]
    fn color(&self, id: NodeId) -> Color {
        self.node(id).color
    }

    #[inline]
    fn set_color(&mut self, id: NodeId, color: Color) {
        self.node_mut(id).color = color;
    }

    /// Absent nodes are black.
    #[inline]
    fn is_black(&self, id: Option<NodeId>) -> bool {
        id.map_or(true, |id| self.color(id).is_black())
    }

    /// Slot the node currently occupies.
    #[inline]
    fn position(&self, id: NodeId) -> Position {
        match self.parent(id) {
            Some(parent) if self.left(parent) == Some(id) => Position::Left(parent),
            Some(parent) => {
                debug_assert_eq!(self.right(parent), Some(id), "parent does not link back");
                Position::Right(parent)
            }
            None => Position::Root,
        }
    }
}

impl<S: NodeStore + ?Sized> StoreExt for S {}
