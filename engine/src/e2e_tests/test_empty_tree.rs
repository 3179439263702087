//! A tree with no entries has a null root; lookups end at the superblock.

use crate::e2e_tests::helpers::*;

#[test]
fn test_empty_tree_not_found() {
    let tree = build_tree(0, 4, 4);
    assert_eq!(tree.depth, 0);
    let cache = PageCache::new(tree.into_memory_store(), 4);

    let mut fsm = start(&cache, "anything");
    assert_eq!(fsm.advance(None), Ok(Step::Incomplete));
    assert_eq!(fsm.stage(), LookupStage::AcquiringSuperblock);

    let events = cache.complete_pending();
    assert_eq!(events, vec![Event::PageReady(SUPERBLOCK_PAGE_ID)]);
    assert_eq!(fsm.advance(Some(&events[0])), Ok(Step::Complete));
    assert_eq!(fsm.result(), Some(&LookupResult::NotFound));

    // The superblock is the only page ever pinned.
    let stats = cache.stats();
    assert_eq!(stats.acquires, 1);
    assert_eq!(stats.releases, 1);
    assert_balanced(&cache);
}

#[test]
fn test_empty_tree_warm_superblock() {
    let cache = cache_with_keys(0, 4, 4);
    cache.warm(SUPERBLOCK_PAGE_ID).expect("warm superblock");

    let mut fsm = start(&cache, "anything");
    assert_eq!(fsm.advance(None), Ok(Step::Complete));
    assert_eq!(fsm.into_result(), Some(LookupResult::NotFound));
    assert_eq!(cache.stats().misses, 0);
}
