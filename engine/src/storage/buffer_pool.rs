//! Page buffers for the block cache.
//!
//! Every resident page lives in a buffer leased from its cache's pool, so the
//! pool capacity is the cache capacity in pages. Buffers are allocated on
//! first use and recycled after that; a dropped [`Page`] hands its buffer
//! back.
//!
//! # Invariants
//!
//! - `leased <= capacity`
//! - Every buffer on the free list is `PAGE_SIZE` bytes

use std::sync::{Arc, Mutex, MutexGuard};

use crate::storage::page::{PAGE_SIZE, Page};

/// Default buffer pool capacity in pages (1024 pages = 8MB).
pub const DEFAULT_POOL_CAPACITY: usize = 1024;

/// A bounded set of page buffers shared by one cache.
pub struct BufferPool {
    state: Mutex<PoolState>,
    capacity: usize,
}

#[derive(Default)]
struct PoolState {
    /// Returned buffers ready for reuse.
    free: Vec<Box<[u8]>>,
    /// Buffers currently owned by a `Page`.
    leased: usize,
    /// Most buffers ever leased at once.
    high_water: usize,
}

impl BufferPool {
    /// Create a pool that leases at most `capacity` buffers at a time.
    ///
    /// # Panics
    /// Panics if capacity is 0.
    #[must_use]
    pub fn new(capacity: usize) -> Arc<Self> {
        assert!(capacity > 0, "Buffer pool capacity must be positive");
        Arc::new(Self {
            state: Mutex::new(PoolState::default()),
            capacity,
        })
    }

    #[allow(clippy::expect_used)] // Mutex poisoning indicates unrecoverable state
    fn lock(&self) -> MutexGuard<'_, PoolState> {
        self.state.lock().expect("lock poisoned")
    }

    /// Lease a page, or `None` if `capacity` pages are already out.
    ///
    /// A recycled buffer keeps whatever the previous page held; callers
    /// overwrite the whole page.
    #[allow(clippy::disallowed_methods)] // Arc::clone is required for shared ownership
    pub fn lease(self: &Arc<Self>) -> Option<Page> {
        let buffer = {
            let mut state = self.lock();
            if state.leased == self.capacity {
                return None;
            }
            state.leased += 1;
            state.high_water = state.high_water.max(state.leased);
            state.free.pop()
        };
        let buffer = buffer.unwrap_or_else(|| vec![0u8; PAGE_SIZE].into_boxed_slice());
        Some(Page::from_pool(buffer, Arc::clone(self)))
    }

    /// Take back a buffer leased by [`lease`](Self::lease).
    ///
    /// # Panics
    /// Panics if nothing is leased or the buffer has the wrong size (both
    /// indicate a bug).
    pub(crate) fn return_buffer(&self, buffer: Box<[u8]>) {
        assert_eq!(buffer.len(), PAGE_SIZE, "Buffer pool given a foreign buffer");
        let mut state = self.lock();
        assert!(
            state.leased > 0,
            "Buffer pool overflow: buffer returned while none leased"
        );
        state.leased -= 1;
        state.free.push(buffer);
    }

    /// Buffers that can still be leased.
    #[must_use]
    pub fn available(&self) -> usize {
        self.capacity - self.lock().leased
    }

    /// Buffers currently leased.
    #[must_use]
    pub fn leased(&self) -> usize {
        self.lock().leased
    }

    /// Most buffers leased at once since the pool was created.
    #[must_use]
    pub fn high_water(&self) -> usize {
        self.lock().high_water
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }
}
