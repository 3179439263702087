//! Many lookups share one cache and one stream of completions.

use crate::e2e_tests::helpers::*;

#[test]
fn test_concurrent_lookups_share_fetches() {
    let tree = build_tree(64, 4, 4);
    let depth = tree.depth;
    let cache = PageCache::new(tree.into_memory_store(), 64);

    let keys = ["key-0000", "key-0000", "key-0031", "key-0063", "key-0100"];
    let mut lookups: Vec<_> = keys.iter().map(|key| start(&cache, key)).collect();
    for fsm in &mut lookups {
        assert_eq!(fsm.advance(None), Ok(Step::Incomplete));
    }
    // Five misses on the superblock become one fetch.
    assert_eq!(cache.pending_requests(), 1);

    let mut rounds = 0;
    while lookups.iter().any(|fsm| !fsm.is_complete()) {
        rounds += 1;
        let events = cache.complete_pending();
        assert!(!events.is_empty(), "lookups stalled");
        for event in &events {
            let Event::PageReady(page_id) = *event else {
                continue;
            };
            for fsm in lookups
                .iter_mut()
                .filter(|fsm| fsm.outstanding() == Some(page_id))
            {
                fsm.advance(Some(event)).expect("advance");
            }
            assert_eq!(cache.pinned_pages(), 0);
        }
    }
    assert_eq!(rounds, depth + 1);

    let results: Vec<_> = lookups
        .into_iter()
        .map(|fsm| fsm.into_result().expect("complete"))
        .collect();
    assert_eq!(
        results,
        vec![
            LookupResult::Found(b"value-0".to_vec()),
            LookupResult::Found(b"value-0".to_vec()),
            LookupResult::Found(b"value-31".to_vec()),
            LookupResult::Found(b"value-63".to_vec()),
            LookupResult::NotFound,
        ]
    );

    // Superblock, root, three distinct second-level nodes and three distinct
    // leaves, each read from the store once.
    assert_eq!(cache.stats().fetches, 8);
    assert_balanced(&cache);
}

#[test]
fn test_lookups_on_many_threads() {
    let tree = build_tree(200, 4, 4);
    let page_count = tree.pages.len();
    let cache = PageCache::new(tree.into_memory_store(), page_count);

    // Each worker completes whatever fetches are queued, including other
    // workers' requests, and retries its own acquire after every pass.
    std::thread::scope(|scope| {
        for worker in 0..4 {
            let cache = &cache;
            scope.spawn(move || {
                for i in (worker..240).step_by(4) {
                    let mut fsm = start(cache, &format!("key-{i:04}"));
                    let mut step = fsm.advance(None).expect("first advance");
                    while step == Step::Incomplete {
                        if cache.complete_pending().is_empty() {
                            std::thread::yield_now();
                        }
                        let page_id = fsm.outstanding().expect("waiting lookup has a page");
                        step = fsm
                            .advance(Some(&Event::PageReady(page_id)))
                            .expect("advance");
                    }

                    let expected = if i < 200 {
                        LookupResult::Found(format!("value-{i}").into_bytes())
                    } else {
                        LookupResult::NotFound
                    };
                    assert_eq!(fsm.into_result(), Some(expected));
                }
            });
        }
    });

    // Every page was read at least once and nothing stayed pinned.
    assert!(cache.stats().fetches >= page_count as u64);
    assert!(cache.peak_resident() <= page_count);
    assert_balanced(&cache);
}
