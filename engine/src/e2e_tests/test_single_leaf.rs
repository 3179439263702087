//! The root is a leaf; with every page resident one call finishes the lookup.

use crate::e2e_tests::helpers::*;

#[test]
fn test_single_leaf_found_in_one_call() {
    let tree = build_tree(3, 4, 8);
    assert_eq!(tree.depth, 1);
    let root = tree.root_page();
    let cache = PageCache::new(tree.into_memory_store(), 4);
    cache.warm(SUPERBLOCK_PAGE_ID).expect("warm superblock");
    cache.warm(root).expect("warm root");

    let mut fsm = start(&cache, "key-0001");
    assert_eq!(fsm.advance(None), Ok(Step::Complete));
    assert_eq!(fsm.result(), Some(&LookupResult::Found(b"value-1".to_vec())));

    // Superblock plus one leaf pin.
    let stats = cache.stats();
    assert_eq!(stats.acquires, 2);
    assert_eq!(stats.releases, 2);
    assert_eq!(stats.misses, 0);
    assert_balanced(&cache);
}

#[test]
fn test_single_leaf_every_key() {
    let cache = cache_with_keys(8, 4, 8);
    for (key, value) in tree_entries(8) {
        let key = String::from_utf8(key).expect("ascii key");
        assert_eq!(lookup(&cache, &key), LookupResult::Found(value));
    }
    assert_eq!(lookup(&cache, "key-0008"), LookupResult::NotFound);
    assert_eq!(lookup(&cache, ""), LookupResult::NotFound);
    assert_balanced(&cache);
}
