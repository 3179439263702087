//! Common helpers for end-to-end tests.

pub use crate::event::Event;
pub use crate::storage::btree::{LookupError, LookupFsm, LookupResult, LookupStage, Step};
pub use crate::storage::{CacheError, PageCache, PageStore, SUPERBLOCK_PAGE_ID};
pub use crate::testing::{build_tree, cache_with_keys, temp_db_path, tree_entries};

/// Start a lookup for `key`.
#[allow(clippy::expect_used)]
pub fn start<'c, S: PageStore>(cache: &'c PageCache<S>, key: &str) -> LookupFsm<'c, PageCache<S>> {
    LookupFsm::init_lookup(cache, key.as_bytes()).expect("valid key")
}

/// Drive a lone lookup to completion. Returns the number of `advance` calls.
#[allow(clippy::expect_used)]
pub fn drive<S: PageStore>(cache: &PageCache<S>, fsm: &mut LookupFsm<'_, PageCache<S>>) -> u32 {
    let mut calls = 1;
    let mut step = fsm.advance(None).expect("first advance");
    while step == Step::Incomplete {
        let events = cache.complete_pending();
        assert_eq!(events.len(), 1, "a lone lookup waits on one page at a time");
        calls += 1;
        step = fsm.advance(Some(&events[0])).expect("advance");
    }
    assert_eq!(step, Step::Complete);
    calls
}

/// Look up `key` from scratch and return its result.
#[allow(clippy::expect_used)]
pub fn lookup<S: PageStore>(cache: &PageCache<S>, key: &str) -> LookupResult {
    let mut fsm = start(cache, key);
    drive(cache, &mut fsm);
    fsm.into_result().expect("complete lookup has a result")
}

/// Every pin handed out has been returned.
pub fn assert_balanced<S: PageStore>(cache: &PageCache<S>) {
    let stats = cache.stats();
    assert_eq!(stats.acquires, stats.releases, "unbalanced pins: {stats:?}");
    assert_eq!(cache.pinned_pages(), 0);
}
