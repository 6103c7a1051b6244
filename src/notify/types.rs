//! Subscription types for live feed updates.

use crate::types::{ChangeKind, Post, PostId, Transaction, TransactionId};
use serde::{Deserialize, Serialize};

/// Configuration for a subscription.
#[derive(Clone, Debug)]
pub struct SubscriptionConfig {
    /// Max buffered events before dropping the subscriber.
    /// Default: 1000
    pub buffer_size: usize,
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self { buffer_size: 1000 }
    }
}

/// The channel an event is published on.
///
/// Post updates are published on both post topics as two independent
/// events, because list and detail observers filter differently.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Topic {
    /// The paginated post list.
    PostList,
    /// A single post, watched by id.
    PostDetail,
    /// The transactions of a single post.
    Transactions,
}

/// What a subscriber is watching. Data, not a closure, so relevance rules
/// are testable without a live subscription.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scope {
    /// List observers: a post event is relevant iff the observer's cursor
    /// lower bound is at or below the event's id. Updates to records an
    /// observer never paged near are filtered out; the bound is fixed at
    /// subscribe time.
    PostsAfter(PostId),

    /// Detail observers: relevant iff the event is for exactly this post.
    Post(PostId),

    /// Child-list observers: relevant iff the transaction belongs to this
    /// post.
    TransactionsOf(PostId),
}

impl Scope {
    /// The topic this scope listens on.
    pub fn topic(&self) -> Topic {
        match self {
            Scope::PostsAfter(_) => Topic::PostList,
            Scope::Post(_) => Topic::PostDetail,
            Scope::TransactionsOf(_) => Topic::Transactions,
        }
    }

    /// Whether an event is relevant to this scope.
    pub fn matches(&self, event: &FeedEvent) -> bool {
        match (self, event) {
            (Scope::PostsAfter(cursor), FeedEvent::Post(change)) => *cursor <= change.id,
            (Scope::Post(id), FeedEvent::Post(change)) => *id == change.id,
            (Scope::TransactionsOf(post_id), FeedEvent::Transaction(change)) => {
                *post_id == change.post_id
            }
            _ => false,
        }
    }
}

/// A change to one post.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostChange {
    pub kind: ChangeKind,
    pub id: PostId,
    /// Full record for Created/Updated; last known snapshot for Deleted.
    pub node: Option<Post>,
}

/// A change to one transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionChange {
    pub kind: ChangeKind,
    pub id: TransactionId,
    /// The owning post, so child-list observers can filter.
    pub post_id: PostId,
    pub node: Option<Transaction>,
}

/// Events delivered to subscribers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeedEvent {
    /// A post was created, updated, or deleted.
    Post(PostChange),

    /// A transaction was created, updated, or deleted.
    Transaction(TransactionChange),

    /// Terminal: the subscription was dropped. No further events follow.
    Dropped { reason: DropReason },
}

/// Why a subscription was dropped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    /// Send buffer overflowed (slow consumer).
    BufferOverflow,
    /// Explicitly unsubscribed.
    Unsubscribed,
    /// The notifier shut down.
    Shutdown,
}

/// Unique identifier for a subscription.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// Handle to a live subscription stream.
pub struct SubscriptionHandle {
    pub id: SubscriptionId,
    /// Channel the events arrive on.
    pub receiver: crossbeam_channel::Receiver<FeedEvent>,
}

impl SubscriptionHandle {
    /// Receive the next event (blocking).
    pub fn recv(&self) -> Result<FeedEvent, crossbeam_channel::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive an event (non-blocking).
    pub fn try_recv(&self) -> Result<FeedEvent, crossbeam_channel::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Receive with timeout.
    pub fn recv_timeout(
        &self,
        timeout: std::time::Duration,
    ) -> Result<FeedEvent, crossbeam_channel::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// Drain everything currently buffered, without blocking.
    pub fn drain(&self) -> Vec<FeedEvent> {
        self.receiver.try_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Timestamp;

    fn post_event(kind: ChangeKind, id: u64) -> FeedEvent {
        FeedEvent::Post(PostChange {
            kind,
            id: PostId(id),
            node: None,
        })
    }

    fn transaction_event(id: u64, post_id: u64) -> FeedEvent {
        FeedEvent::Transaction(TransactionChange {
            kind: ChangeKind::Created,
            id: TransactionId(id),
            post_id: PostId(post_id),
            node: None,
        })
    }

    #[test]
    fn test_list_scope_lower_bound() {
        let scope = Scope::PostsAfter(PostId(3));
        assert!(scope.matches(&post_event(ChangeKind::Created, 5)));
        assert!(scope.matches(&post_event(ChangeKind::Updated, 3)));
        assert!(!scope.matches(&post_event(ChangeKind::Updated, 2)));
    }

    #[test]
    fn test_detail_scope_exact_id() {
        let scope = Scope::Post(PostId(4));
        assert!(scope.matches(&post_event(ChangeKind::Updated, 4)));
        assert!(!scope.matches(&post_event(ChangeKind::Updated, 5)));
        assert!(!scope.matches(&transaction_event(1, 4)));
    }

    #[test]
    fn test_transactions_scope_parent_id() {
        let scope = Scope::TransactionsOf(PostId(2));
        assert!(scope.matches(&transaction_event(9, 2)));
        assert!(!scope.matches(&transaction_event(9, 3)));
        assert!(!scope.matches(&post_event(ChangeKind::Created, 2)));
    }

    #[test]
    fn test_event_wire_shape() {
        let event = FeedEvent::Post(PostChange {
            kind: ChangeKind::Deleted,
            id: PostId(7),
            node: Some(Post {
                id: PostId(7),
                title: "t".into(),
                content: "c".into(),
                created: Timestamp(1),
                updated: Timestamp(2),
            }),
        });
        let json: serde_json::Value = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "post");
        assert_eq!(json["kind"], "DELETED");
        assert_eq!(json["id"], 7);
        assert_eq!(json["node"]["title"], "t");
    }
}
