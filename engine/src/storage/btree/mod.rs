//! Read-only B-tree over cache-resident pages.
//!
//! # Structure
//!
//! The B-tree consists of:
//! - Internal nodes: store separator keys and child page pointers
//! - Leaf nodes: store key-value pairs
//!
//! Trees are produced in one pass by [`TreeBuilder`] and read by
//! [`LookupFsm`], which never blocks on I/O: it stops whenever a page is not
//! resident and is resumed through [`advance`] once the page arrives.
//!
//! # Usage
//!
//! ```
//! use engine::storage::btree::{LookupFsm, LookupResult, Step, TreeBuilder, advance};
//! use engine::storage::PageCache;
//!
//! let tree = TreeBuilder::new(16, 16)
//!     .build([("apple", "red"), ("banana", "yellow")])
//!     .expect("sorted input");
//! let cache = PageCache::new(tree.into_memory_store(), 8);
//!
//! let mut lookup = LookupFsm::init_lookup(&cache, "banana").expect("short key");
//! let mut step = advance(&mut lookup, None).expect("advance");
//! while step == Step::Incomplete {
//!     for event in cache.complete_pending() {
//!         step = advance(&mut lookup, Some(&event)).expect("advance");
//!     }
//! }
//! assert_eq!(lookup.into_result(), Some(LookupResult::Found(b"yellow".to_vec())));
//! ```

mod builder;
mod driver;
mod lookup;
mod node;

pub use builder::{BuildError, BuiltTree, TreeBuilder};
pub use driver::advance;
pub use lookup::{LookupError, LookupFsm, LookupResult, LookupStage, MAX_DEPTH, Step};
pub use node::{
    DATA_SPACE, InternalNode, LeafEntry, LeafNode, MAX_KEY_SIZE, MAX_VALUE_SIZE, Node, NodeError,
    NodeHeader, NodeType,
};
