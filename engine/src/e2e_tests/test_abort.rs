//! Aborting a lookup at each point of its life.

use crate::e2e_tests::helpers::*;

#[test]
fn test_abort_before_first_advance() {
    let cache = cache_with_keys(16, 4, 4);
    let mut fsm = start(&cache, "key-0001");

    fsm.abort().expect("abort");
    assert_eq!(fsm.result(), Some(&LookupResult::Cancelled));
    assert_eq!(fsm.advance(None), Ok(Step::Complete));
    assert_eq!(cache.stats().acquires, 0);
    assert_eq!(cache.pending_requests(), 0);
}

#[test]
fn test_abort_while_fetch_outstanding() {
    let cache = cache_with_keys(16, 4, 4);
    let mut fsm = start(&cache, "key-0001");

    assert_eq!(fsm.advance(None), Ok(Step::Incomplete));
    fsm.abort().expect("abort");

    // The fetch is still in flight; the lookup finishes when it lands.
    assert!(fsm.is_cancel_pending());
    assert!(!fsm.is_complete());

    let events = cache.complete_pending();
    assert_eq!(fsm.advance(Some(&events[0])), Ok(Step::Complete));
    assert_eq!(fsm.result(), Some(&LookupResult::Cancelled));
    assert!(!fsm.is_cancel_pending());
    assert_balanced(&cache);

    // The page obtained for the aborted lookup stays cached.
    assert!(cache.is_resident(SUPERBLOCK_PAGE_ID));
}

#[test]
fn test_abort_mid_descent() {
    let cache = cache_with_keys(64, 4, 4);
    let mut fsm = start(&cache, "key-0042");

    assert_eq!(fsm.advance(None), Ok(Step::Incomplete));
    let events = cache.complete_pending();
    assert_eq!(fsm.advance(Some(&events[0])), Ok(Step::Incomplete));
    let events = cache.complete_pending();
    assert_eq!(fsm.advance(Some(&events[0])), Ok(Step::Incomplete));
    assert_eq!(fsm.stage(), LookupStage::AcquiringNode);

    fsm.abort().expect("abort");
    let events = cache.complete_pending();
    assert_eq!(fsm.advance(Some(&events[0])), Ok(Step::Complete));
    assert_eq!(fsm.into_result(), Some(LookupResult::Cancelled));
    assert_balanced(&cache);
}

#[test]
fn test_abort_after_complete_keeps_result() {
    let cache = cache_with_keys(16, 4, 4);
    let mut fsm = start(&cache, "key-0007");
    drive(&cache, &mut fsm);

    let stats = cache.stats();
    fsm.abort().expect("abort");
    assert_eq!(fsm.result(), Some(&LookupResult::Found(b"value-7".to_vec())));
    assert_eq!(cache.stats(), stats);
}
