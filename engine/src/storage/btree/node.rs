//! B-tree node types and serialization.
//!
//! The B-tree uses 8KB pages with the following node types:
//! - Internal nodes: store separator keys and child page pointers
//! - Leaf nodes: store key-value pairs
//!
//! Keys and values are variable-length byte strings.

#![allow(clippy::cast_possible_truncation)]

use crate::storage::page::{PAGE_SIZE, Page, PageError, PageHeader, PageId, PageType};

/// Maximum key length in bytes.
pub const MAX_KEY_SIZE: usize = 250;

/// Maximum value size that can be stored inline in a leaf.
pub const MAX_VALUE_SIZE: usize = 1024;

/// Node header layout (after page header):
/// - `node_type`: 1 byte (0 = internal, 1 = leaf)
/// - `key_count`: 2 bytes
///
/// Total: 3 bytes
const NODE_HEADER_SIZE: usize = 3;

/// Offset where node data starts (after page header + node header).
const DATA_OFFSET: usize = PageHeader::SIZE + NODE_HEADER_SIZE;

/// Available space for node data.
pub const DATA_SPACE: usize = PAGE_SIZE - DATA_OFFSET;

/// Bytes used by a child pointer.
const CHILD_SIZE: usize = 8;

/// Bytes used by a length prefix.
const LEN_SIZE: usize = 2;

/// Node type discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum NodeType {
    Internal = 0,
    Leaf = 1,
}

impl TryFrom<u8> for NodeType {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Internal),
            1 => Ok(Self::Leaf),
            _ => Err(value),
        }
    }
}

/// Header information for a B-tree node.
#[derive(Debug, Clone, Copy)]
pub struct NodeHeader {
    pub node_type: NodeType,
    pub key_count: u16,
}

impl NodeHeader {
    /// Read a node header from a page.
    pub fn from_page(page: &Page) -> Result<Self, NodeError> {
        let offset = PageHeader::SIZE;
        let node_type =
            NodeType::try_from(page.read_u8(offset)).map_err(NodeError::InvalidNodeType)?;
        let key_count = page.read_u16(offset + 1);

        Ok(Self {
            node_type,
            key_count,
        })
    }

    /// Write a node header to a page.
    pub fn write_to_page(&self, page: &mut Page) {
        let offset = PageHeader::SIZE;
        page.write_u8(offset, self.node_type as u8);
        page.write_u16(offset + 1, self.key_count);
    }
}

/// Bounds-checked reader over the data region of a node page.
struct NodeReader<'a> {
    page: &'a Page,
    offset: usize,
}

impl<'a> NodeReader<'a> {
    const fn new(page: &'a Page) -> Self {
        Self {
            page,
            offset: DATA_OFFSET,
        }
    }

    fn bytes(&mut self, len: usize) -> Result<&'a [u8], NodeError> {
        let bytes = self
            .page
            .get_bytes(self.offset, len)
            .ok_or(NodeError::Truncated {
                offset: self.offset,
            })?;
        self.offset += len;
        Ok(bytes)
    }

    fn u16(&mut self) -> Result<u16, NodeError> {
        let bytes = self.bytes(LEN_SIZE)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    fn u64(&mut self) -> Result<u64, NodeError> {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(self.bytes(CHILD_SIZE)?);
        Ok(u64::from_le_bytes(buf))
    }

    fn prefixed(&mut self) -> Result<&'a [u8], NodeError> {
        let len = self.u16()? as usize;
        self.bytes(len)
    }
}

/// A decoded node page.
#[derive(Debug)]
pub enum Node {
    Internal(InternalNode),
    Leaf(LeafNode),
}

impl Node {
    /// Classify and decode a node page.
    pub fn from_page(page: &Page) -> Result<Self, NodeError> {
        let page_header = PageHeader::from_page(page)?;
        let header = NodeHeader::from_page(page)?;

        match (page_header.page_type, header.node_type) {
            (PageType::BTreeInternal, NodeType::Internal) => {
                InternalNode::decode(page, header).map(Self::Internal)
            }
            (PageType::BTreeLeaf, NodeType::Leaf) => LeafNode::decode(page, header).map(Self::Leaf),
            _ => Err(NodeError::WrongNodeType),
        }
    }

    #[must_use]
    pub const fn node_type(&self) -> NodeType {
        match self {
            Self::Internal(_) => NodeType::Internal,
            Self::Leaf(_) => NodeType::Leaf,
        }
    }
}

/// An internal (non-leaf) B-tree node.
///
/// Stores N separator keys and N+1 child pointers.
/// `Child[i]` contains keys < `Key[i]`
/// `Child[i+1]` contains keys >= `Key[i]`
#[derive(Debug, Default)]
pub struct InternalNode {
    /// Keys in sorted order.
    pub keys: Vec<Vec<u8>>,
    /// Child page pointers. `children.len()` == `keys.len()` + 1
    pub children: Vec<PageId>,
}

impl InternalNode {
    /// Create an internal node over a leftmost child.
    #[must_use]
    pub fn new(first_child: PageId) -> Self {
        Self {
            keys: Vec::new(),
            children: vec![first_child],
        }
    }

    /// Append a separator and the child to its right.
    pub fn push(&mut self, key: Vec<u8>, right_child: PageId) {
        self.keys.push(key);
        self.children.push(right_child);
    }

    /// Serialized size of the data region.
    #[must_use]
    pub fn encoded_size(&self) -> usize {
        CHILD_SIZE
            + self
                .keys
                .iter()
                .map(|k| LEN_SIZE + k.len() + CHILD_SIZE)
                .sum::<usize>()
    }

    /// Check whether one more separator of `key_len` bytes would fit.
    #[must_use]
    pub fn can_fit(&self, key_len: usize) -> bool {
        self.encoded_size() + LEN_SIZE + key_len + CHILD_SIZE <= DATA_SPACE
    }

    /// Read an internal node from a page.
    pub fn from_page(page: &Page) -> Result<Self, NodeError> {
        match Node::from_page(page)? {
            Node::Internal(node) => Ok(node),
            Node::Leaf(_) => Err(NodeError::WrongNodeType),
        }
    }

    fn decode(page: &Page, header: NodeHeader) -> Result<Self, NodeError> {
        let key_count = header.key_count as usize;
        let mut keys = Vec::with_capacity(key_count);
        let mut children = Vec::with_capacity(key_count + 1);
        let mut reader = NodeReader::new(page);

        children.push(reader.u64()?);
        for _ in 0..key_count {
            keys.push(reader.prefixed()?.to_vec());
            children.push(reader.u64()?);
        }

        Ok(Self { keys, children })
    }

    /// Write an internal node to a page and seal its checksum.
    pub fn write_to_page(&self, page: &mut Page) {
        debug_assert_eq!(self.children.len(), self.keys.len() + 1);
        let page_header = PageHeader {
            page_type: PageType::BTreeInternal,
            flags: 0,
            checksum: 0,
        };
        page.as_bytes_mut().fill(0);
        page.write_bytes(0, &page_header.to_bytes());
        NodeHeader {
            node_type: NodeType::Internal,
            key_count: self.keys.len() as u16,
        }
        .write_to_page(page);

        let mut offset = DATA_OFFSET;
        page.write_u64(offset, self.children[0]);
        offset += CHILD_SIZE;

        for (key, child) in self.keys.iter().zip(&self.children[1..]) {
            page.write_u16(offset, key.len() as u16);
            offset += LEN_SIZE;
            page.write_bytes(offset, key);
            offset += key.len();
            page.write_u64(offset, *child);
            offset += CHILD_SIZE;
        }

        page.seal();
    }

    /// Find the child index for a given key.
    #[must_use]
    pub fn find_child_index(&self, key: &[u8]) -> usize {
        // Number of separators <= key; an exact match goes right.
        self.keys.partition_point(|k| k.as_slice() <= key)
    }

    /// Page id of the child whose range covers `key`.
    #[must_use]
    pub fn lookup(&self, key: &[u8]) -> PageId {
        self.children[self.find_child_index(key)]
    }
}

/// A key-value entry in a leaf node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafEntry {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

impl LeafEntry {
    /// Serialized size of this entry.
    #[must_use]
    pub fn encoded_size(&self) -> usize {
        LEN_SIZE + self.key.len() + LEN_SIZE + self.value.len()
    }
}

/// A leaf B-tree node.
#[derive(Debug, Default)]
pub struct LeafNode {
    /// Entries in sorted order by key.
    pub entries: Vec<LeafEntry>,
}

impl LeafNode {
    /// Create a new empty leaf node.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Serialized size of the data region.
    #[must_use]
    pub fn encoded_size(&self) -> usize {
        self.entries.iter().map(LeafEntry::encoded_size).sum()
    }

    /// Check if a new entry would fit in this node.
    #[must_use]
    pub fn can_fit(&self, entry: &LeafEntry) -> bool {
        self.encoded_size() + entry.encoded_size() <= DATA_SPACE
    }

    /// Read a leaf node from a page.
    pub fn from_page(page: &Page) -> Result<Self, NodeError> {
        match Node::from_page(page)? {
            Node::Leaf(node) => Ok(node),
            Node::Internal(_) => Err(NodeError::WrongNodeType),
        }
    }

    fn decode(page: &Page, header: NodeHeader) -> Result<Self, NodeError> {
        let entry_count = header.key_count as usize;
        let mut entries = Vec::with_capacity(entry_count);
        let mut reader = NodeReader::new(page);

        for _ in 0..entry_count {
            let key = reader.prefixed()?.to_vec();
            let value = reader.prefixed()?.to_vec();
            entries.push(LeafEntry { key, value });
        }

        Ok(Self { entries })
    }

    /// Write a leaf node to a page and seal its checksum.
    pub fn write_to_page(&self, page: &mut Page) {
        let page_header = PageHeader {
            page_type: PageType::BTreeLeaf,
            flags: 0,
            checksum: 0,
        };
        page.as_bytes_mut().fill(0);
        page.write_bytes(0, &page_header.to_bytes());
        NodeHeader {
            node_type: NodeType::Leaf,
            key_count: self.entries.len() as u16,
        }
        .write_to_page(page);

        let mut offset = DATA_OFFSET;
        for entry in &self.entries {
            page.write_u16(offset, entry.key.len() as u16);
            offset += LEN_SIZE;
            page.write_bytes(offset, &entry.key);
            offset += entry.key.len();

            page.write_u16(offset, entry.value.len() as u16);
            offset += LEN_SIZE;
            page.write_bytes(offset, &entry.value);
            offset += entry.value.len();
        }

        page.seal();
    }

    /// Get a value by key.
    #[must_use]
    pub fn lookup(&self, key: &[u8]) -> Option<&[u8]> {
        self.entries
            .binary_search_by(|e| e.key.as_slice().cmp(key))
            .ok()
            .map(|i| self.entries[i].value.as_slice())
    }
}

/// Errors that can occur when decoding B-tree nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeError {
    /// The page header is unreadable.
    Page(PageError),
    /// Unknown node type byte.
    InvalidNodeType(u8),
    /// Page type and node type disagree, or the caller expected the other kind.
    WrongNodeType,
    /// An entry runs past the end of the page.
    Truncated { offset: usize },
}

impl std::fmt::Display for NodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Page(e) => write!(f, "invalid node page: {e}"),
            Self::InvalidNodeType(v) => write!(f, "invalid node type: 0x{v:02x}"),
            Self::WrongNodeType => write!(f, "wrong node type for operation"),
            Self::Truncated { offset } => write!(f, "node entry truncated at offset {offset}"),
        }
    }
}

impl std::error::Error for NodeError {}

impl From<PageError> for NodeError {
    fn from(e: PageError) -> Self {
        Self::Page(e)
    }
}
