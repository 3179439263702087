//! Build a tree on disk, reopen it, and look keys up through the cache.

use crate::e2e_tests::helpers::*;
use crate::storage::FileStore;

#[test]
fn test_file_backed_lookup() {
    let (_dir, path) = temp_db_path();
    let tree = build_tree(300, 8, 8);
    tree.write_to_file(&path).expect("write tree");

    let store = FileStore::open(&path).expect("open tree");
    assert_eq!(store.superblock().root_page, tree.root_page());
    assert_eq!(
        store.superblock().total_page_count,
        u64::try_from(tree.pages.len()).expect("page count fits")
    );

    // Smaller than the tree, so the walk evicts as it goes.
    let cache = PageCache::new(store, 4);
    for i in (0..300).step_by(37) {
        let expected = format!("value-{i}").into_bytes();
        assert_eq!(
            lookup(&cache, &format!("key-{i:04}")),
            LookupResult::Found(expected)
        );
    }
    assert_eq!(lookup(&cache, "key-9999"), LookupResult::NotFound);
    assert!(cache.stats().evictions > 0);
    assert_eq!(cache.peak_resident(), 4);
    assert_balanced(&cache);
}
