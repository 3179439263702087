//! Page storage and the block cache.
//!
//! # File Format
//!
//! A tree is stored in a single file of 8KB pages:
//!
//! - Page 0: Superblock (magic, format version, page count, root page)
//! - Pages 1-N: B-tree nodes, written bottom-up by the tree builder
//!
//! Every node page starts with a `PageHeader` carrying a CRC32 of the page.
//!
//! # Reading
//!
//! Nothing reads pages directly. Lookups go through a [`BlockCache`], which
//! answers from memory or requests the page and reports it pending; the host
//! completes requests off the event loop with [`PageCache::complete_pending`].

pub mod btree;
mod buffer_pool;
mod cache;
mod file;
mod io;
mod page;
mod superblock;

pub use buffer_pool::{BufferPool, DEFAULT_POOL_CAPACITY};
pub use cache::{
    Acquire, BlockCache, CacheError, CacheStats, PageCache, PageHandle, PinnedPage,
};
pub use file::FileStore;
pub use io::{MemoryStore, PageStore, StorageError};
pub use page::{PAGE_SIZE, Page, PageError, PageHeader, PageId, PageType};
pub use superblock::{NULL_PAGE_ID, SUPERBLOCK_PAGE_ID, Superblock, SuperblockError};
