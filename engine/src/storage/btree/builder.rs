//! Bottom-up bulk loading of a read-only B-tree.
//!
//! Sorted entries are packed into leaves left to right, then each level of
//! internal nodes is built over the one below until a single root remains.
//! Page ids are handed out in build order starting at 1; page 0 is the
//! superblock.

use std::path::Path;

use crate::storage::btree::node::{InternalNode, LeafEntry, LeafNode, MAX_KEY_SIZE, MAX_VALUE_SIZE};
use crate::storage::file::FileStore;
use crate::storage::io::{MemoryStore, StorageError};
use crate::storage::page::{Page, PageId};
use crate::storage::superblock::{NULL_PAGE_ID, SUPERBLOCK_PAGE_ID, Superblock};

/// Builds the pages of a tree from sorted key-value pairs.
#[derive(Debug, Clone, Copy)]
pub struct TreeBuilder {
    fanout: usize,
    leaf_capacity: usize,
}

/// The pages of a freshly built tree, superblock included.
#[derive(Debug)]
pub struct BuiltTree {
    pub pages: Vec<(PageId, Page)>,
    pub superblock: Superblock,
    /// Number of levels; 0 for an empty tree, 1 when the root is a leaf.
    pub depth: u32,
    pub entry_count: usize,
}

/// First key under a node, paired with the node's page.
struct LevelEntry {
    first_key: Vec<u8>,
    page_id: PageId,
}

impl TreeBuilder {
    /// Create a builder placing at most `fanout` children under an internal
    /// node and at most `leaf_capacity` entries in a leaf. Nodes are also cut
    /// short when the next item would overflow the page.
    ///
    /// # Panics
    /// Panics if `fanout` is less than 2 or `leaf_capacity` is 0.
    #[must_use]
    pub fn new(fanout: usize, leaf_capacity: usize) -> Self {
        assert!(fanout >= 2, "fanout must be at least 2");
        assert!(leaf_capacity > 0, "leaf capacity must be greater than 0");
        Self {
            fanout,
            leaf_capacity,
        }
    }

    /// Build a tree over `entries`, which must be sorted by key with no
    /// duplicates.
    pub fn build<I, K, V>(&self, entries: I) -> Result<BuiltTree, BuildError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<Vec<u8>>,
        V: Into<Vec<u8>>,
    {
        let mut pages = Vec::new();
        let mut next_page_id: PageId = SUPERBLOCK_PAGE_ID + 1;
        let mut allocate = || {
            let page_id = next_page_id;
            next_page_id += 1;
            page_id
        };

        let mut level = Vec::new();
        let mut leaf = LeafNode::new();
        let mut entry_count = 0;
        let mut previous_key: Option<Vec<u8>> = None;

        for (key, value) in entries {
            let entry = LeafEntry {
                key: key.into(),
                value: value.into(),
            };
            Self::validate(&entry, previous_key.as_deref(), entry_count)?;
            previous_key = Some(entry.key.clone());

            if leaf.entries.len() == self.leaf_capacity || !leaf.can_fit(&entry) {
                level.push(Self::flush_leaf(&mut leaf, allocate(), &mut pages));
            }
            leaf.entries.push(entry);
            entry_count += 1;
        }
        if !leaf.entries.is_empty() {
            level.push(Self::flush_leaf(&mut leaf, allocate(), &mut pages));
        }

        let mut depth = u32::from(!level.is_empty());
        while level.len() > 1 {
            level = self.build_level(level, &mut allocate, &mut pages);
            depth += 1;
        }

        let root_page = level.first().map_or(NULL_PAGE_ID, |root| root.page_id);
        let superblock = Superblock {
            total_page_count: next_page_id,
            root_page,
            ..Superblock::new()
        };
        pages.insert(0, (SUPERBLOCK_PAGE_ID, superblock.to_page()));

        tracing::debug!(
            entries = entry_count,
            pages = next_page_id,
            depth,
            root_page,
            "built tree"
        );

        Ok(BuiltTree {
            pages,
            superblock,
            depth,
            entry_count,
        })
    }

    fn validate(entry: &LeafEntry, previous: Option<&[u8]>, index: usize) -> Result<(), BuildError> {
        if entry.key.len() > MAX_KEY_SIZE {
            return Err(BuildError::KeyTooLarge {
                index,
                len: entry.key.len(),
            });
        }
        if entry.value.len() > MAX_VALUE_SIZE {
            return Err(BuildError::ValueTooLarge {
                index,
                len: entry.value.len(),
            });
        }
        match previous.map(|previous| previous.cmp(entry.key.as_slice())) {
            Some(std::cmp::Ordering::Equal) => Err(BuildError::DuplicateKey { index }),
            Some(std::cmp::Ordering::Greater) => Err(BuildError::Unsorted { index }),
            _ => Ok(()),
        }
    }

    fn build_level(
        &self,
        children: Vec<LevelEntry>,
        allocate: &mut impl FnMut() -> PageId,
        pages: &mut Vec<(PageId, Page)>,
    ) -> Vec<LevelEntry> {
        let mut parents = Vec::new();
        let mut children = children.into_iter();
        let Some(first) = children.next() else {
            return parents;
        };

        let mut first_key = first.first_key;
        let mut node = InternalNode::new(first.page_id);
        for child in children {
            if node.children.len() == self.fanout || !node.can_fit(child.first_key.len()) {
                parents.push(Self::flush_internal(
                    std::mem::take(&mut first_key),
                    &node,
                    allocate(),
                    pages,
                ));
                first_key = child.first_key;
                node = InternalNode::new(child.page_id);
            } else {
                node.push(child.first_key, child.page_id);
            }
        }
        parents.push(Self::flush_internal(first_key, &node, allocate(), pages));
        parents
    }

    fn flush_leaf(
        leaf: &mut LeafNode,
        page_id: PageId,
        pages: &mut Vec<(PageId, Page)>,
    ) -> LevelEntry {
        let node = std::mem::take(leaf);
        let mut page = Page::new();
        node.write_to_page(&mut page);
        pages.push((page_id, page));

        let first_key = node
            .entries
            .into_iter()
            .next()
            .map(|entry| entry.key)
            .unwrap_or_default();
        LevelEntry {
            first_key,
            page_id,
        }
    }

    fn flush_internal(
        first_key: Vec<u8>,
        node: &InternalNode,
        page_id: PageId,
        pages: &mut Vec<(PageId, Page)>,
    ) -> LevelEntry {
        let mut page = Page::new();
        node.write_to_page(&mut page);
        pages.push((page_id, page));
        LevelEntry {
            first_key,
            page_id,
        }
    }
}

impl BuiltTree {
    #[must_use]
    pub const fn root_page(&self) -> PageId {
        self.superblock.root_page
    }

    /// Move the pages into an in-memory store.
    #[must_use]
    pub fn into_memory_store(self) -> MemoryStore {
        MemoryStore::from_pages(self.pages)
    }

    /// Write the pages to a new database file at `path`.
    pub fn write_to_file(&self, path: &Path) -> Result<(), StorageError> {
        FileStore::create(path, &self.pages)
    }
}

/// Reasons a set of entries cannot be built into a tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// Entry `index` has a key longer than `MAX_KEY_SIZE`.
    KeyTooLarge { index: usize, len: usize },
    /// Entry `index` has a value longer than `MAX_VALUE_SIZE`.
    ValueTooLarge { index: usize, len: usize },
    /// Entry `index` sorts before the entry preceding it.
    Unsorted { index: usize },
    /// Entry `index` repeats the key of the entry preceding it.
    DuplicateKey { index: usize },
}

impl std::fmt::Display for BuildError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::KeyTooLarge { index, len } => {
                write!(f, "entry {index}: key is {len} bytes (max {MAX_KEY_SIZE})")
            }
            Self::ValueTooLarge { index, len } => {
                write!(f, "entry {index}: value is {len} bytes (max {MAX_VALUE_SIZE})")
            }
            Self::Unsorted { index } => write!(f, "entry {index}: keys are not sorted"),
            Self::DuplicateKey { index } => write!(f, "entry {index}: duplicate key"),
        }
    }
}

impl std::error::Error for BuildError {}
