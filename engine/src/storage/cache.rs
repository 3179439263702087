//! Block cache: the non-blocking page service lookups run against.
//!
//! # Contract
//!
//! [`BlockCache`] is everything a traversal needs from the cache:
//! - `acquire` never blocks. A resident page comes back pinned; anything else
//!   is requested from storage and reported as [`Acquire::Pending`]. The
//!   caller is woken later by an [`Event::PageReady`] and must call `acquire`
//!   again.
//! - Every [`PageHandle`] returned by `acquire` must go back through exactly
//!   one `release`. Handles are move-only, so a second release of the same
//!   handle does not compile; [`PinnedPage`] adds release-on-drop so that no
//!   exit path can leak a pin.
//!
//! [`PageCache`] is the in-process implementation. It does not try to be
//! clever about what stays resident: when the buffer pool runs dry it drops
//! whichever unpinned frame it finds first.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::event::Event;
use crate::storage::buffer_pool::BufferPool;
use crate::storage::io::{PageStore, StorageError};
use crate::storage::page::{Page, PageError, PageId};
use crate::storage::superblock::{NULL_PAGE_ID, SUPERBLOCK_PAGE_ID};

/// Proof that a page is pinned in the cache.
///
/// Only obtainable from [`BlockCache::acquire`] and only consumable by
/// [`BlockCache::release`].
#[derive(Debug)]
pub struct PageHandle {
    page_id: PageId,
    page: Arc<Page>,
}

impl PageHandle {
    /// Wrap a pinned page. Intended for `BlockCache` implementations.
    #[must_use]
    pub const fn new(page_id: PageId, page: Arc<Page>) -> Self {
        Self { page_id, page }
    }

    #[must_use]
    pub const fn page_id(&self) -> PageId {
        self.page_id
    }

    #[must_use]
    pub fn page(&self) -> &Page {
        &self.page
    }
}

/// Outcome of a non-blocking acquire.
#[derive(Debug)]
pub enum Acquire {
    /// The page is resident and now pinned.
    Ready(PageHandle),
    /// The page has been requested; a `PageReady` event will follow.
    Pending,
}

/// The cache operations a traversal depends on.
pub trait BlockCache {
    /// Identifier of the superblock page. Constant for the process.
    fn superblock_id(&self) -> PageId;

    /// Pin `page_id` if resident, otherwise request it and return `Pending`.
    fn acquire(&self, page_id: PageId) -> Result<Acquire, CacheError>;

    /// Unpin a previously acquired page.
    fn release(&self, handle: PageHandle, dirty: bool) -> Result<(), CacheError>;

    /// Whether `page_id` denotes "no node".
    fn is_block_id_null(&self, page_id: PageId) -> bool;
}

/// A pinned page that is released when this value is released or dropped.
pub struct PinnedPage<'c, C: BlockCache + ?Sized> {
    cache: &'c C,
    /// Always `Some` until released.
    handle: Option<PageHandle>,
}

impl<'c, C: BlockCache + ?Sized> PinnedPage<'c, C> {
    /// Acquire `page_id`, returning `None` while the page is pending.
    pub fn acquire(cache: &'c C, page_id: PageId) -> Result<Option<Self>, CacheError> {
        match cache.acquire(page_id)? {
            Acquire::Ready(handle) => Ok(Some(Self {
                cache,
                handle: Some(handle),
            })),
            Acquire::Pending => Ok(None),
        }
    }

    /// # Panics
    /// Never in practice: the handle is only taken by `release` and `drop`,
    /// which both consume the pin.
    #[must_use]
    pub fn page(&self) -> &Page {
        match &self.handle {
            Some(handle) => handle.page(),
            None => unreachable!("pinned page read after release"),
        }
    }

    #[must_use]
    pub fn page_id(&self) -> PageId {
        self.handle.as_ref().map_or(NULL_PAGE_ID, PageHandle::page_id)
    }

    /// Unpin the page, surfacing any error from the cache.
    pub fn release(mut self) -> Result<(), CacheError> {
        match self.handle.take() {
            Some(handle) => self.cache.release(handle, false),
            None => Ok(()),
        }
    }
}

impl<C: BlockCache + ?Sized> Drop for PinnedPage<'_, C> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            let page_id = handle.page_id();
            if let Err(e) = self.cache.release(handle, false) {
                tracing::error!(page_id, error = %e, "failed to release pinned page on drop");
            }
        }
    }
}

impl<C: BlockCache + ?Sized> std::fmt::Debug for PinnedPage<'_, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PinnedPage")
            .field("page_id", &self.page_id())
            .finish_non_exhaustive()
    }
}

/// Errors reported by the block cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Reading the page from storage failed.
    Fetch { page_id: PageId, message: String },
    /// The page was read but failed verification.
    Corrupt { page_id: PageId, error: PageError },
    /// `release` was called for a page with no outstanding pin.
    NotPinned(PageId),
    /// A read-only cache was asked to accept a dirty page.
    DirtyRelease(PageId),
}

impl std::fmt::Display for CacheError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fetch { page_id, message } => {
                write!(f, "failed to fetch page {page_id}: {message}")
            }
            Self::Corrupt { page_id, error } => write!(f, "page {page_id} is corrupt: {error}"),
            Self::NotPinned(page_id) => write!(f, "page {page_id} released without a pin"),
            Self::DirtyRelease(page_id) => {
                write!(f, "page {page_id} released dirty into a read-only cache")
            }
        }
    }
}

impl std::error::Error for CacheError {}

/// Point-in-time copy of the cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Acquires answered from a resident page.
    pub hits: u64,
    /// Acquires that had to request the page.
    pub misses: u64,
    /// Pins handed out.
    pub acquires: u64,
    /// Pins returned.
    pub releases: u64,
    /// Pages read from storage.
    pub fetches: u64,
    /// Unpinned frames dropped to make room.
    pub evictions: u64,
}

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    acquires: AtomicU64,
    releases: AtomicU64,
    fetches: AtomicU64,
    evictions: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            acquires: self.acquires.load(Ordering::Relaxed),
            releases: self.releases.load(Ordering::Relaxed),
            fetches: self.fetches.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}

struct Frame {
    page: Arc<Page>,
    pins: u32,
}

#[derive(Default)]
struct CacheState {
    frames: HashMap<PageId, Frame>,
    /// Requested pages in request order.
    requested: VecDeque<PageId>,
    /// Same ids as `requested`, for deduplication.
    requested_set: HashSet<PageId>,
    /// Fetch failures waiting to be reported to the next acquirer.
    failed: HashMap<PageId, CacheError>,
}

impl CacheState {
    fn request(&mut self, page_id: PageId) {
        if self.requested_set.insert(page_id) {
            self.requested.push_back(page_id);
        }
    }

    /// Drop one unpinned frame, returning its id, or `None` if every frame is pinned.
    fn evict_one(&mut self) -> Option<PageId> {
        let victim = self
            .frames
            .iter()
            .find(|(_, frame)| frame.pins == 0)
            .map(|(page_id, _)| *page_id)?;
        self.frames.remove(&victim);
        Some(victim)
    }
}

/// Result of trying to bring one page into the cache.
enum FetchOutcome {
    Installed,
    Failed(CacheError),
    /// No buffer could be freed; the request stays queued.
    Deferred,
}

/// In-process block cache over a [`PageStore`].
///
/// # Invariants
/// - A frame with `pins > 0` is never evicted.
/// - Resident frames never exceed the buffer pool capacity.
pub struct PageCache<S: PageStore> {
    store: S,
    pool: Arc<BufferPool>,
    state: Mutex<CacheState>,
    counters: Counters,
}

impl<S: PageStore> PageCache<S> {
    /// Create a cache over `store` holding at most `capacity` pages.
    ///
    /// # Panics
    /// Panics if capacity is 0.
    #[must_use]
    pub fn new(store: S, capacity: usize) -> Self {
        Self {
            store,
            pool: BufferPool::new(capacity),
            state: Mutex::new(CacheState::default()),
            counters: Counters::default(),
        }
    }

    /// The backing store.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    #[allow(clippy::expect_used)] // Mutex poisoning indicates unrecoverable state
    fn lock(&self) -> std::sync::MutexGuard<'_, CacheState> {
        self.state.lock().expect("lock poisoned")
    }

    /// Serve every outstanding fetch request.
    ///
    /// This is the I/O completion hook of the host event loop. It performs the
    /// reads synchronously, so hosts call it off the event loop thread. Returns
    /// one `PageReady` event per request that was resolved, including failed
    /// ones (the failure is reported by the next `acquire`).
    pub fn complete_pending(&self) -> Vec<Event> {
        let batch: Vec<PageId> = {
            let mut state = self.lock();
            state.requested_set.clear();
            state.requested.drain(..).collect()
        };

        let mut events = Vec::with_capacity(batch.len());
        let mut deferred = Vec::new();
        for page_id in batch {
            match self.fetch(page_id) {
                FetchOutcome::Installed => events.push(Event::PageReady(page_id)),
                FetchOutcome::Failed(error) => {
                    tracing::warn!(page_id, %error, "page fetch failed");
                    self.lock().failed.insert(page_id, error);
                    events.push(Event::PageReady(page_id));
                }
                FetchOutcome::Deferred => deferred.push(page_id),
            }
        }

        if !deferred.is_empty() {
            tracing::debug!(count = deferred.len(), "fetches deferred, every frame pinned");
            let mut state = self.lock();
            for page_id in deferred {
                state.request(page_id);
            }
        }

        events
    }

    /// Load a page synchronously, so later acquires hit.
    pub fn warm(&self, page_id: PageId) -> Result<(), CacheError> {
        match self.fetch(page_id) {
            FetchOutcome::Installed => Ok(()),
            FetchOutcome::Failed(error) => Err(error),
            FetchOutcome::Deferred => Err(CacheError::Fetch {
                page_id,
                message: StorageError::BufferPoolExhausted.to_string(),
            }),
        }
    }

    fn fetch(&self, page_id: PageId) -> FetchOutcome {
        {
            let mut state = self.lock();
            if state.frames.contains_key(&page_id) {
                return FetchOutcome::Installed;
            }
            if self.pool.available() == 0 {
                match state.evict_one() {
                    Some(victim) => {
                        Counters::bump(&self.counters.evictions);
                        tracing::debug!(victim, page_id, "dropped unpinned frame");
                    }
                    None => return FetchOutcome::Deferred,
                }
            }
        }

        Counters::bump(&self.counters.fetches);
        let page = match self.store.read_page(page_id, &self.pool) {
            Ok(page) => page,
            Err(StorageError::BufferPoolExhausted) => return FetchOutcome::Deferred,
            Err(e) => {
                return FetchOutcome::Failed(CacheError::Fetch {
                    page_id,
                    message: e.to_string(),
                });
            }
        };

        // The superblock has no page header and carries no checksum.
        if page_id != SUPERBLOCK_PAGE_ID {
            if let Err(error) = page.verify_checksum() {
                return FetchOutcome::Failed(CacheError::Corrupt { page_id, error });
            }
        }

        let mut state = self.lock();
        state.failed.remove(&page_id);
        match state.frames.entry(page_id) {
            Entry::Occupied(_) => {
                // Installed by another fetch while this one read; that frame
                // may already be pinned.
                tracing::trace!(page_id, "page already installed, read discarded");
            }
            Entry::Vacant(slot) => {
                slot.insert(Frame {
                    page: Arc::new(page),
                    pins: 0,
                });
                tracing::trace!(page_id, "page installed");
            }
        }
        FetchOutcome::Installed
    }

    /// Snapshot of the counters.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.counters.snapshot()
    }

    /// Total outstanding pins across all pages.
    #[must_use]
    pub fn pinned_pages(&self) -> u64 {
        self.lock()
            .frames
            .values()
            .map(|frame| u64::from(frame.pins))
            .sum()
    }

    /// Most pages resident at once since the cache was created.
    #[must_use]
    pub fn peak_resident(&self) -> usize {
        self.pool.high_water()
    }

    /// Number of pages requested but not yet fetched.
    #[must_use]
    pub fn pending_requests(&self) -> usize {
        self.lock().requested.len()
    }

    /// Whether `page_id` is currently resident.
    #[must_use]
    pub fn is_resident(&self, page_id: PageId) -> bool {
        self.lock().frames.contains_key(&page_id)
    }
}

impl<S: PageStore> BlockCache for PageCache<S> {
    fn superblock_id(&self) -> PageId {
        SUPERBLOCK_PAGE_ID
    }

    #[allow(clippy::disallowed_methods)] // Arc::clone is required for shared ownership
    fn acquire(&self, page_id: PageId) -> Result<Acquire, CacheError> {
        let mut state = self.lock();

        if let Some(error) = state.failed.remove(&page_id) {
            return Err(error);
        }

        if let Some(frame) = state.frames.get_mut(&page_id) {
            frame.pins += 1;
            Counters::bump(&self.counters.hits);
            Counters::bump(&self.counters.acquires);
            return Ok(Acquire::Ready(PageHandle::new(
                page_id,
                Arc::clone(&frame.page),
            )));
        }

        Counters::bump(&self.counters.misses);
        state.request(page_id);
        tracing::debug!(page_id, "page miss, fetch requested");
        Ok(Acquire::Pending)
    }

    fn release(&self, handle: PageHandle, dirty: bool) -> Result<(), CacheError> {
        let page_id = handle.page_id();
        // The handle's share of the page goes away before the frame can be evicted.
        drop(handle);

        let mut state = self.lock();
        let frame = state
            .frames
            .get_mut(&page_id)
            .filter(|frame| frame.pins > 0)
            .ok_or(CacheError::NotPinned(page_id))?;
        frame.pins -= 1;
        Counters::bump(&self.counters.releases);

        if dirty {
            return Err(CacheError::DirtyRelease(page_id));
        }
        Ok(())
    }

    fn is_block_id_null(&self, page_id: PageId) -> bool {
        page_id == NULL_PAGE_ID
    }
}
