//! Unreadable pages fail the lookup that needed them, and only that one.

use crate::e2e_tests::helpers::*;

#[test]
fn test_leaf_fetch_failure() {
    let tree = build_tree(4, 4, 2);
    let cache = PageCache::new(tree.into_memory_store(), 8);
    // Leaves are written first, so page 1 holds the smallest keys.
    cache.store().inject_fault(1);

    let mut fsm = start(&cache, "key-0000");
    let mut result = fsm.advance(None);
    while result == Ok(Step::Incomplete) {
        let events = cache.complete_pending();
        result = fsm.advance(Some(&events[0]));
    }

    assert!(
        matches!(
            result,
            Err(LookupError::Cache(CacheError::Fetch { page_id: 1, .. }))
        ),
        "unexpected result: {result:?}"
    );
    assert!(!fsm.is_complete());
    assert_eq!(fsm.stage(), LookupStage::Failed);
    assert_balanced(&cache);

    // Keys in the other leaf are unaffected.
    assert_eq!(
        lookup(&cache, "key-0003"),
        LookupResult::Found(b"value-3".to_vec())
    );

    // Once the page reads again, a new lookup succeeds; the failed one
    // stays failed.
    cache.store().clear_fault(1);
    assert!(fsm.advance(None).is_err());
    assert_eq!(fsm.stage(), LookupStage::Failed);
    assert_eq!(
        lookup(&cache, "key-0000"),
        LookupResult::Found(b"value-0".to_vec())
    );
}
