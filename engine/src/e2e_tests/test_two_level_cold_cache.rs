//! Internal root over two leaves, nothing but the superblock resident.

use crate::e2e_tests::helpers::*;

#[test]
fn test_two_level_cold_cache() {
    let tree = build_tree(4, 4, 2);
    assert_eq!(tree.depth, 2);
    let root = tree.root_page();
    let cache = PageCache::new(tree.into_memory_store(), 8);
    cache.warm(SUPERBLOCK_PAGE_ID).expect("warm superblock");

    let mut fsm = start(&cache, "key-0003a");

    // Root miss.
    assert_eq!(fsm.advance(None), Ok(Step::Incomplete));
    assert_eq!(fsm.stage(), LookupStage::AcquiringRoot);
    assert_eq!(fsm.outstanding(), Some(root));
    assert!(!fsm.holds_page());

    let events = cache.complete_pending();
    assert_eq!(events, vec![Event::PageReady(root)]);

    // Root resolves, child leaf misses.
    assert_eq!(fsm.advance(Some(&events[0])), Ok(Step::Incomplete));
    assert_eq!(fsm.stage(), LookupStage::AcquiringNode);
    let child = fsm.outstanding().expect("waiting on the child");
    assert_ne!(child, root);
    assert!(!fsm.holds_page());

    let events = cache.complete_pending();
    assert_eq!(events, vec![Event::PageReady(child)]);

    assert_eq!(fsm.advance(Some(&events[0])), Ok(Step::Complete));
    assert_eq!(fsm.result(), Some(&LookupResult::NotFound));

    // Superblock plus two node pins.
    let stats = cache.stats();
    assert_eq!(stats.acquires, 3);
    assert_eq!(stats.releases, 3);
    assert_balanced(&cache);
}

#[test]
fn test_cold_lookup_call_count_tracks_depth() {
    for (count, fanout, leaf_capacity) in [(1, 2, 1), (4, 2, 2), (64, 4, 4), (500, 3, 2)] {
        let tree = build_tree(count, fanout, leaf_capacity);
        let depth = tree.depth;
        let cache = PageCache::new(tree.into_memory_store(), 1024);

        let mut fsm = start(&cache, "key-0000");
        let calls = drive(&cache, &mut fsm);
        assert_eq!(calls, depth + 2, "count={count} fanout={fanout}");
        assert_eq!(
            fsm.into_result(),
            Some(LookupResult::Found(b"value-0".to_vec()))
        );

        // Second lookup on the now warm path finishes in one call.
        let mut fsm = start(&cache, "key-0000");
        assert_eq!(drive(&cache, &mut fsm), 1);
        assert_balanced(&cache);
    }
}
