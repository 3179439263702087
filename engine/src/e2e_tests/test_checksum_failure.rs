//! A node page whose checksum does not match is reported as corrupt.

use crate::e2e_tests::helpers::*;
use crate::storage::{MemoryStore, PAGE_SIZE};

#[test]
fn test_corrupt_leaf_detected() {
    let mut tree = build_tree(3, 4, 8);
    let root = tree.root_page();
    for (page_id, page) in &mut tree.pages {
        if *page_id == root {
            page.write_u8(PAGE_SIZE - 1, 0xA5);
        }
    }
    let cache = PageCache::new(MemoryStore::from_pages(tree.pages), 4);

    let mut fsm = start(&cache, "key-0001");
    let mut result = fsm.advance(None);
    while result == Ok(Step::Incomplete) {
        let events = cache.complete_pending();
        result = fsm.advance(Some(&events[0]));
    }

    assert!(
        matches!(
            result,
            Err(LookupError::Cache(CacheError::Corrupt { page_id, .. })) if page_id == root
        ),
        "unexpected result: {result:?}"
    );
    assert!(!cache.is_resident(root));
    assert_balanced(&cache);
}
