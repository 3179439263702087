//! Backing storage the block cache fetches pages from.
//!
//! This module provides a `PageStore` trait that abstracts over where page
//! bytes come from, allowing the cache to read from a real database file in
//! production and from memory in tests.
//!
//! # Design
//!
//! The trait is read-only and takes `&self`. Fetches are issued
//! from the host's blocking I/O workers while lookups keep running on the
//! event loop, so a store must be shareable across threads.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use crate::storage::buffer_pool::BufferPool;
use crate::storage::page::{PAGE_SIZE, Page, PageId};
use crate::storage::superblock::SuperblockError;

/// Errors that can occur during storage operations.
#[derive(Debug)]
pub enum StorageError {
    /// I/O error.
    Io(std::io::Error),
    /// Page out of bounds.
    PageOutOfBounds { page_id: PageId, total_pages: u64 },
    /// Superblock error.
    Superblock(SuperblockError),
    /// Injected fault for testing.
    InjectedFault(String),
    /// Buffer pool exhausted - no buffers available.
    BufferPoolExhausted,
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::PageOutOfBounds {
                page_id,
                total_pages,
            } => write!(
                f,
                "page {page_id} out of bounds (total pages: {total_pages})"
            ),
            Self::Superblock(e) => write!(f, "superblock error: {e}"),
            Self::InjectedFault(msg) => write!(f, "injected fault: {msg}"),
            Self::BufferPoolExhausted => write!(f, "buffer pool exhausted"),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Superblock(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<SuperblockError> for StorageError {
    fn from(e: SuperblockError) -> Self {
        Self::Superblock(e)
    }
}

/// Read access to page-addressed storage.
///
/// # Implementation Notes
///
/// Implementations must ensure:
/// - `read_page` returns the full `PAGE_SIZE` bytes last written for a page
/// - `read_page` leases its buffer from the given pool and reports
///   `BufferPoolExhausted` instead of allocating when the pool is empty
/// - reads of ids `>= total_pages()` fail with `PageOutOfBounds`
pub trait PageStore: Send + Sync {
    /// Read a page into a buffer leased from `pool`.
    fn read_page(&self, page_id: PageId, pool: &Arc<BufferPool>) -> Result<Page, StorageError>;

    /// Get the total number of pages in storage.
    fn total_pages(&self) -> u64;
}

/// In-memory page store.
///
/// Holds a copy of every page. Faults can be injected per page to exercise
/// the fetch-failure path of the cache.
#[derive(Default)]
pub struct MemoryStore {
    pages: Mutex<HashMap<PageId, Box<[u8]>>>,
    faulty: Mutex<HashSet<PageId>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding the given pages.
    pub fn from_pages<I>(pages: I) -> Self
    where
        I: IntoIterator<Item = (PageId, Page)>,
    {
        let store = Self::new();
        for (page_id, page) in pages {
            store.write_page(page_id, &page);
        }
        store
    }

    /// Store a copy of `page` under `page_id`, replacing any previous content.
    #[allow(clippy::expect_used)] // Mutex poisoning indicates unrecoverable state
    pub fn write_page(&self, page_id: PageId, page: &Page) {
        self.pages
            .lock()
            .expect("lock poisoned")
            .insert(page_id, page.as_bytes().into());
    }

    /// Make every subsequent read of `page_id` fail.
    #[allow(clippy::expect_used)] // Mutex poisoning indicates unrecoverable state
    pub fn inject_fault(&self, page_id: PageId) {
        self.faulty.lock().expect("lock poisoned").insert(page_id);
    }

    /// Undo `inject_fault`.
    #[allow(clippy::expect_used)] // Mutex poisoning indicates unrecoverable state
    pub fn clear_fault(&self, page_id: PageId) {
        self.faulty.lock().expect("lock poisoned").remove(&page_id);
    }
}

impl PageStore for MemoryStore {
    #[allow(clippy::expect_used)] // Mutex poisoning indicates unrecoverable state
    fn read_page(&self, page_id: PageId, pool: &Arc<BufferPool>) -> Result<Page, StorageError> {
        if self.faulty.lock().expect("lock poisoned").contains(&page_id) {
            return Err(StorageError::InjectedFault(format!(
                "read of page {page_id}"
            )));
        }

        let pages = self.pages.lock().expect("lock poisoned");
        let bytes = pages
            .get(&page_id)
            .ok_or_else(|| StorageError::PageOutOfBounds {
                page_id,
                total_pages: pages.len() as u64,
            })?;
        debug_assert_eq!(bytes.len(), PAGE_SIZE);

        let mut page = pool.lease().ok_or(StorageError::BufferPoolExhausted)?;
        page.as_bytes_mut().copy_from_slice(bytes);
        Ok(page)
    }

    #[allow(clippy::expect_used)] // Mutex poisoning indicates unrecoverable state
    fn total_pages(&self) -> u64 {
        self.pages.lock().expect("lock poisoned").len() as u64
    }
}
