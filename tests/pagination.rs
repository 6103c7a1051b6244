//! Pagination contract tests: window shape, cursor walks, and the
//! ordering invariant.

use livefeed::{paginate, CollectionStore, PostId, PostInput, StoreConfig};
use proptest::prelude::*;
use tempfile::TempDir;

fn store_with_posts(dir: &TempDir, count: u64) -> CollectionStore {
    let store = CollectionStore::create(StoreConfig {
        path: dir.path().join("feed"),
        create_if_missing: true,
    })
    .unwrap();
    for i in 1..=count {
        store
            .create_post(PostInput::new(
                format!("Post title {i}"),
                format!("Post content {i}"),
            ))
            .unwrap();
    }
    store
}

#[test]
fn test_window_scenario() {
    let dir = TempDir::new().unwrap();
    let store = store_with_posts(&dir, 4);

    let first = paginate(&store, 2, None);
    assert_eq!(
        first.edges.iter().map(|e| e.node.id.0).collect::<Vec<_>>(),
        vec![4, 3]
    );
    assert_eq!(first.page_info.end_cursor, Some(PostId(3)));
    assert!(first.page_info.has_next_page);
    assert_eq!(first.total_count, 4);

    let second = paginate(&store, 2, Some(PostId(3)));
    assert_eq!(
        second.edges.iter().map(|e| e.node.id.0).collect::<Vec<_>>(),
        vec![2, 1]
    );
    assert_eq!(second.page_info.end_cursor, Some(PostId(1)));
    assert!(!second.page_info.has_next_page);
    assert_eq!(second.total_count, 4);
}

#[test]
fn test_cursor_beyond_collection() {
    let dir = TempDir::new().unwrap();
    let store = store_with_posts(&dir, 3);

    let window = paginate(&store, 5, Some(PostId(1)));
    assert!(window.edges.is_empty());
    assert_eq!(window.page_info.end_cursor, None);
    assert!(!window.page_info.has_next_page);
    assert_eq!(window.total_count, 3);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// Walking pages from the top until `has_next_page` is false yields
    /// every post exactly once, in strictly descending id order.
    #[test]
    fn prop_cursor_walk_is_exhaustive(
        count in 0u64..20,
        deleted in proptest::collection::vec(1u64..20, 0..5),
        limit in 1usize..7,
    ) {
        let dir = TempDir::new().unwrap();
        let store = store_with_posts(&dir, count);
        for id in deleted {
            // Gaps in the id sequence must not break the walk.
            let _ = store.delete_post(PostId(id)).unwrap();
        }
        let expected = store.count_posts();

        let mut seen = Vec::new();
        let mut after = None;
        loop {
            let window = paginate(&store, limit, after);
            prop_assert_eq!(window.total_count, expected);
            for edge in &window.edges {
                seen.push(edge.node.id.0);
            }
            if !window.page_info.has_next_page {
                break;
            }
            after = window.page_info.end_cursor;
        }

        prop_assert_eq!(seen.len() as u64, expected);
        for pair in seen.windows(2) {
            prop_assert!(pair[0] > pair[1]);
        }
    }
}
