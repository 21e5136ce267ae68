//! Intrusive red-black tree.
//!
//! Records embed an [`RbNode`] and live in a caller owned arena, addressed by
//! [`NodeId`] handles. [`RbTree`] only keeps the root handle and rebalances the
//! links, key comparison stays with the caller:
//!
//! ```
//! use rbtree::{Linked, NodeId, RbNode, RbTree};
//!
//! struct Item {
//!     key: u32,
//!     link: RbNode,
//! }
//!
//! impl Linked for Item {
//!     fn rb_node(&self) -> &RbNode {
//!         &self.link
//!     }
//!
//!     fn rb_node_mut(&mut self) -> &mut RbNode {
//!         &mut self.link
//!     }
//! }
//!
//! let mut items: Vec<_> = [50, 15, 68, 5]
//!     .into_iter()
//!     .map(|key| Item { key, link: RbNode::new() })
//!     .collect();
//! let mut tree = RbTree::new();
//!
//! for i in 0..items.len() {
//!     let key = items[i].key;
//!     let position = tree
//!         .search(&items, |x| key.cmp(&items[x.index()].key))
//!         .unwrap_err();
//!     tree.insert(&mut items, NodeId::new(i), position);
//! }
//!
//! let keys: Vec<_> = tree.iter(&items).map(|x| items[x.index()].key).collect();
//! assert_eq!(keys, [5, 15, 50, 68]);
//!
//! tree.remove(&mut items, NodeId::new(0));
//! assert_eq!(tree.count(&items), 3);
//! ```
//!
//! [`RbMap`] is an ordered map built this way.

#![deny(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]
#![forbid(unsafe_code)]

mod iter;
mod map;
mod node;
mod tree;
mod validate;

pub use iter::Iter;
pub use map::{Comparator, Iter as MapIter, Natural, RbMap};
pub use node::{Color, Linked, NodeId, NodeStore, Position, RbNode};
pub use tree::RbTree;
pub use validate::InvariantError;
