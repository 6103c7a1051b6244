//! Cursor pagination over the post collection.

use crate::store::CollectionStore;
use crate::types::{Post, PostId};
use serde::{Deserialize, Serialize};

/// One post in a window, paired with its cursor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostEdge {
    /// Cursor for this edge: the post's id.
    pub cursor: PostId,
    pub node: Post,
}

/// Window metadata.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageInfo {
    /// Id of the last edge; absent for an empty window.
    pub end_cursor: Option<PostId>,
    /// Whether posts older than `end_cursor` exist.
    pub has_next_page: bool,
}

/// One fetched page plus pagination metadata.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostConnection {
    pub total_count: u64,
    /// Strictly descending by id, no duplicates.
    pub edges: Vec<PostEdge>,
    pub page_info: PageInfo,
}

/// Build a window of at most `limit` posts with ids strictly below `after`
/// (from the top when `None`).
///
/// `total_count` and `has_next_page` are independent store queries, not
/// derived from the fetched page: they must reflect the full collection
/// regardless of window size. `has_next_page` counts posts below the end
/// cursor rather than over-fetching an extra row.
pub fn paginate(store: &CollectionStore, limit: usize, after: Option<PostId>) -> PostConnection {
    let edges: Vec<PostEdge> = store
        .list_posts(limit, after)
        .into_iter()
        .map(|post| PostEdge {
            cursor: post.id,
            node: post,
        })
        .collect();

    let end_cursor = edges.last().map(|edge| edge.cursor);
    let total_count = store.count_posts();
    let has_next_page = match end_cursor {
        Some(cursor) => store.count_posts_below(cursor) > 0,
        None => false,
    };

    PostConnection {
        total_count,
        edges,
        page_info: PageInfo {
            end_cursor,
            has_next_page,
        },
    }
}
