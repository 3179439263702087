//! Fixtures shared by the in-crate test suites.

use std::path::PathBuf;

use crate::storage::btree::{BuiltTree, TreeBuilder};
use crate::storage::{MemoryStore, PageCache};

/// `count` sorted entries: `key-0000` maps to `value-0`, and so on.
#[must_use]
pub fn tree_entries(count: usize) -> Vec<(Vec<u8>, Vec<u8>)> {
    (0..count)
        .map(|i| {
            (
                format!("key-{i:04}").into_bytes(),
                format!("value-{i}").into_bytes(),
            )
        })
        .collect()
}

/// Build a tree over [`tree_entries`].
#[allow(clippy::expect_used)]
#[must_use]
pub fn build_tree(count: usize, fanout: usize, leaf_capacity: usize) -> BuiltTree {
    TreeBuilder::new(fanout, leaf_capacity)
        .build(tree_entries(count))
        .expect("fixture entries are sorted and small")
}

/// A cold cache over a tree of `count` fixture entries, big enough to hold
/// the whole tree.
#[must_use]
pub fn cache_with_keys(count: usize, fanout: usize, leaf_capacity: usize) -> PageCache<MemoryStore> {
    let tree = build_tree(count, fanout, leaf_capacity);
    let capacity = tree.pages.len().max(1);
    PageCache::new(tree.into_memory_store(), capacity)
}

/// A path for a database file inside a fresh temporary directory. The
/// directory is removed when the returned guard drops.
#[allow(clippy::expect_used)]
#[must_use]
pub fn temp_db_path() -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join("tree.db");
    (dir, path)
}
