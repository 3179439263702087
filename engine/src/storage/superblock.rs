//! Superblock structure and serialization.
//!
//! The superblock occupies page 0 and records where the tree's root lives.
//! Page 0 can never hold a node, so a root id of 0 doubles as the null id
//! for an empty tree.

// PAGE_SIZE is a compile-time constant that fits in u32.
#![allow(clippy::cast_possible_truncation)]

use crate::storage::page::{PAGE_SIZE, Page, PageId};

/// Magic number identifying a database file: "BTLOOKUP"
pub const MAGIC: [u8; 8] = *b"BTLOOKUP";

/// Current format version.
pub const FORMAT_VERSION: u32 = 1;

/// Page id of the superblock.
pub const SUPERBLOCK_PAGE_ID: PageId = 0;

/// Page id that denotes "no node".
pub const NULL_PAGE_ID: PageId = 0;

/// Page size as u32 for storage in superblock.
const PAGE_SIZE_U32: u32 = PAGE_SIZE as u32;

/// Superblock field offsets.
mod offsets {
    pub const MAGIC: usize = 0;
    pub const FORMAT_VERSION: usize = 8;
    pub const PAGE_SIZE: usize = 12;
    pub const TOTAL_PAGE_COUNT: usize = 16;
    pub const ROOT_PAGE: usize = 24;
    // 32-8191: reserved
}

/// Metadata stored in page 0.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Superblock {
    /// Format version number.
    pub format_version: u32,
    /// Page size in bytes (should always be `PAGE_SIZE`).
    pub page_size: u32,
    /// Total number of pages in the file, superblock included.
    pub total_page_count: u64,
    /// Root page of the tree, `NULL_PAGE_ID` when the tree is empty.
    pub root_page: PageId,
}

impl Superblock {
    /// Create a superblock for an empty database.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            format_version: FORMAT_VERSION,
            page_size: PAGE_SIZE_U32,
            total_page_count: 1,
            root_page: NULL_PAGE_ID,
        }
    }

    /// Write the superblock into an existing page buffer.
    pub fn write_to_page(&self, page: &mut Page) {
        page.as_bytes_mut().fill(0);
        page.write_bytes(offsets::MAGIC, &MAGIC);
        page.write_u32(offsets::FORMAT_VERSION, self.format_version);
        page.write_u32(offsets::PAGE_SIZE, self.page_size);
        page.write_u64(offsets::TOTAL_PAGE_COUNT, self.total_page_count);
        page.write_u64(offsets::ROOT_PAGE, self.root_page);
    }

    /// Serialize the superblock into a fresh page.
    #[must_use]
    pub fn to_page(&self) -> Page {
        let mut page = Page::new();
        self.write_to_page(&mut page);
        page
    }

    /// Deserialize a superblock from a page.
    pub fn from_page(page: &Page) -> Result<Self, SuperblockError> {
        let mut magic = [0u8; 8];
        magic.copy_from_slice(page.read_bytes(offsets::MAGIC, 8));
        if magic != MAGIC {
            return Err(SuperblockError::InvalidMagic(magic));
        }

        let format_version = page.read_u32(offsets::FORMAT_VERSION);
        if format_version != FORMAT_VERSION {
            return Err(SuperblockError::UnsupportedVersion(format_version));
        }

        let page_size = page.read_u32(offsets::PAGE_SIZE);
        if page_size != PAGE_SIZE_U32 {
            return Err(SuperblockError::InvalidPageSize(page_size));
        }

        let total_page_count = page.read_u64(offsets::TOTAL_PAGE_COUNT);
        let root_page = page.read_u64(offsets::ROOT_PAGE);
        if root_page >= total_page_count {
            return Err(SuperblockError::RootOutOfRange {
                root_page,
                total_page_count,
            });
        }

        Ok(Self {
            format_version,
            page_size,
            total_page_count,
            root_page,
        })
    }
}

impl Default for Superblock {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors that can occur when reading a superblock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SuperblockError {
    /// Invalid magic number.
    InvalidMagic([u8; 8]),
    /// Unsupported format version.
    UnsupportedVersion(u32),
    /// Invalid page size.
    InvalidPageSize(u32),
    /// The root id points past the end of the file.
    RootOutOfRange {
        root_page: PageId,
        total_page_count: u64,
    },
}

impl std::fmt::Display for SuperblockError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidMagic(magic) => {
                write!(
                    f,
                    "invalid magic number: {:?}",
                    String::from_utf8_lossy(magic)
                )
            }
            Self::UnsupportedVersion(v) => write!(f, "unsupported format version: {v}"),
            Self::InvalidPageSize(s) => write!(f, "invalid page size: {s}"),
            Self::RootOutOfRange {
                root_page,
                total_page_count,
            } => write!(
                f,
                "root page {root_page} outside a file of {total_page_count} pages"
            ),
        }
    }
}

impl std::error::Error for SuperblockError {}
