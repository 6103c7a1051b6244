//! Read-side resolvers over the collection store.

use crate::error::{FeedError, Result};
use crate::pagination::{paginate, PostConnection};
use crate::store::CollectionStore;
use crate::types::{Post, PostId, Transaction};
use std::sync::Arc;

/// Query surface: paginated post windows, point lookups, and the batched
/// transaction loader.
#[derive(Clone)]
pub struct QueryResolver {
    store: Arc<CollectionStore>,
}

impl QueryResolver {
    pub fn new(store: Arc<CollectionStore>) -> Self {
        Self { store }
    }

    /// A window of at most `limit` posts with ids strictly below `after`.
    pub fn posts(&self, limit: usize, after: Option<PostId>) -> PostConnection {
        paginate(&self.store, limit, after)
    }

    /// Point lookup of one post.
    pub fn post(&self, id: PostId) -> Result<Post> {
        self.store.get_post(id).ok_or(FeedError::PostNotFound(id))
    }

    /// Batched transaction loader: one store call for any number of posts,
    /// results grouped and ordered to match the caller's id order.
    pub fn transactions(&self, post_ids: &[PostId]) -> Vec<(PostId, Vec<Transaction>)> {
        self.store.transactions_for_posts(post_ids)
    }
}
