//! Only disk events may resume a lookup, and a rejected wake-up ends it.

use crate::e2e_tests::helpers::*;
use crate::event::EventKind;

#[test]
fn test_network_event_fails_lookup() {
    let cache = cache_with_keys(16, 4, 4);
    let mut fsm = start(&cache, "key-0003");
    assert_eq!(fsm.advance(None), Ok(Step::Incomplete));

    let error = LookupError::InvalidEvent(EventKind::Network);
    assert_eq!(fsm.advance(Some(&Event::Network)), Err(error.clone()));
    assert_eq!(fsm.stage(), LookupStage::Failed);
    assert_eq!(fsm.outstanding(), None);

    // The superblock arrives, but the lookup does not pick it up again.
    let events = cache.complete_pending();
    assert_eq!(events, vec![Event::PageReady(SUPERBLOCK_PAGE_ID)]);
    let before = cache.stats();
    assert_eq!(fsm.advance(Some(&events[0])), Err(error.clone()));
    assert_eq!(fsm.advance(Some(&Event::Timer)), Err(error.clone()));
    assert_eq!(fsm.advance(None), Err(error));
    assert_eq!(cache.stats(), before);
    assert!(fsm.into_result().is_none());
    assert_balanced(&cache);
}

#[test]
fn test_timer_event_mid_descent_fails_lookup() {
    let cache = cache_with_keys(64, 4, 4);
    let mut fsm = start(&cache, "key-0040");
    let mut step = fsm.advance(None).expect("advance");
    while step == Step::Incomplete && fsm.stage() < LookupStage::AcquiringNode {
        let events = cache.complete_pending();
        step = fsm.advance(Some(&events[0])).expect("advance");
    }

    assert_eq!(
        fsm.advance(Some(&Event::Timer)),
        Err(LookupError::InvalidEvent(EventKind::Timer))
    );
    assert_eq!(fsm.stage(), LookupStage::Failed);
    fsm.abort().expect("abort on a failed lookup is a no-op");
    assert!(matches!(fsm.error(), Some(LookupError::InvalidEvent(_))));

    // Other lookups keep using the cache normally.
    assert_eq!(
        lookup(&cache, "key-0040"),
        LookupResult::Found(b"value-40".to_vec())
    );
    assert_balanced(&cache);
}

#[test]
fn test_stale_disk_event_is_harmless() {
    let cache = cache_with_keys(16, 4, 4);
    let mut fsm = start(&cache, "key-0003");
    assert_eq!(fsm.advance(None), Ok(Step::Incomplete));

    // A wake-up for a page nobody asked for only re-checks the superblock.
    assert_eq!(fsm.advance(Some(&Event::PageReady(99))), Ok(Step::Incomplete));
    assert_eq!(fsm.stage(), LookupStage::AcquiringSuperblock);
    assert_eq!(cache.stats().acquires, 0);
}
