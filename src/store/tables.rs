//! In-memory tables for both collections.
//!
//! Pure data structures: no durability and no locking here. The store
//! journals every mutation before applying it, and replays the journal
//! through [`Tables::apply`] on open.

use super::journal::JournalOp;
use crate::types::{Post, PostId, Transaction, TransactionId};
use std::collections::{BTreeMap, HashMap};

/// Posts and transactions, plus the per-post index.
#[derive(Debug, Default)]
pub(crate) struct Tables {
    posts: BTreeMap<u64, Post>,
    transactions: BTreeMap<u64, Transaction>,
    /// Transaction ids per post, in insertion order.
    by_post: HashMap<u64, Vec<u64>>,
    next_post_id: u64,
    next_transaction_id: u64,
}

impl Tables {
    pub fn new() -> Self {
        Self {
            next_post_id: 1,
            next_transaction_id: 1,
            ..Default::default()
        }
    }

    /// Apply one journaled op. Used both for live commits and for replay.
    pub fn apply(&mut self, op: &JournalOp) {
        match op {
            JournalOp::InsertPost { post } => {
                self.next_post_id = self.next_post_id.max(post.id.0 + 1);
                self.posts.insert(post.id.0, post.clone());
            }
            JournalOp::UpdatePost { post } => {
                self.posts.insert(post.id.0, post.clone());
            }
            JournalOp::DeletePost { id } => {
                self.posts.remove(&id.0);
                if let Some(transaction_ids) = self.by_post.remove(&id.0) {
                    for transaction_id in transaction_ids {
                        self.transactions.remove(&transaction_id);
                    }
                }
            }
            JournalOp::InsertTransaction { transaction } => {
                self.next_transaction_id = self.next_transaction_id.max(transaction.id.0 + 1);
                self.by_post
                    .entry(transaction.post_id.0)
                    .or_default()
                    .push(transaction.id.0);
                self.transactions
                    .insert(transaction.id.0, transaction.clone());
            }
            JournalOp::UpdateTransaction { transaction } => {
                self.transactions
                    .insert(transaction.id.0, transaction.clone());
            }
            JournalOp::DeleteTransaction { id } => {
                if let Some(transaction) = self.transactions.remove(&id.0) {
                    if let Some(ids) = self.by_post.get_mut(&transaction.post_id.0) {
                        ids.retain(|candidate| *candidate != id.0);
                    }
                }
            }
        }
    }

    /// Next id a created post will receive.
    pub fn peek_post_id(&self) -> PostId {
        PostId(self.next_post_id)
    }

    /// Next id a created transaction will receive.
    pub fn peek_transaction_id(&self) -> TransactionId {
        TransactionId(self.next_transaction_id)
    }

    /// Posts with id strictly below `after` (all posts when absent or 0),
    /// newest first, at most `limit`.
    pub fn list_posts(&self, limit: usize, after: Option<PostId>) -> Vec<Post> {
        let upper = match after {
            Some(cursor) if cursor.0 > 0 => cursor.0,
            _ => u64::MAX,
        };
        self.posts
            .range(..upper)
            .rev()
            .take(limit)
            .map(|(_, post)| post.clone())
            .collect()
    }

    pub fn count_posts(&self) -> u64 {
        self.posts.len() as u64
    }

    pub fn count_posts_below(&self, cursor: PostId) -> u64 {
        self.posts.range(..cursor.0).count() as u64
    }

    pub fn get_post(&self, id: PostId) -> Option<&Post> {
        self.posts.get(&id.0)
    }

    pub fn get_transaction(&self, id: TransactionId) -> Option<&Transaction> {
        self.transactions.get(&id.0)
    }

    /// Transactions grouped by post, in the caller's post order; insertion
    /// order within each group.
    pub fn transactions_for_posts(&self, post_ids: &[PostId]) -> Vec<(PostId, Vec<Transaction>)> {
        post_ids
            .iter()
            .map(|post_id| {
                let group = self
                    .by_post
                    .get(&post_id.0)
                    .map(|ids| {
                        ids.iter()
                            .filter_map(|id| self.transactions.get(id).cloned())
                            .collect()
                    })
                    .unwrap_or_default();
                (*post_id, group)
            })
            .collect()
    }
}
