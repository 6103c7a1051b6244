//! Write-side resolvers: validate, write, re-read, publish, return.
//!
//! Event publication happens only after the store write commits; a failed
//! or rejected mutation never notifies any observer. `NotFound` outcomes
//! are typed failures to the direct caller and publish nothing, since no
//! state changed.

use crate::error::{FeedError, Result};
use crate::notify::{ChangeNotifier, FeedEvent, PostChange, Topic, TransactionChange};
use crate::store::CollectionStore;
use crate::types::{
    ChangeKind, Post, PostId, PostInput, PostPatch, Transaction, TransactionId, TransactionInput,
    TransactionPatch,
};
use std::sync::Arc;

/// Mutation surface for both collections.
#[derive(Clone)]
pub struct MutationResolver {
    store: Arc<CollectionStore>,
    notifier: Arc<ChangeNotifier>,
}

impl MutationResolver {
    pub fn new(store: Arc<CollectionStore>, notifier: Arc<ChangeNotifier>) -> Self {
        Self { store, notifier }
    }

    // --- Posts ---

    /// Create a post and announce it on the list topic.
    pub fn add_post(&self, input: PostInput) -> Result<Post> {
        require_content(&input.content)?;

        let id = self.store.create_post(input)?;
        let post = self
            .store
            .get_post(id)
            .ok_or(FeedError::PostNotFound(id))?;

        tracing::debug!(post = id.0, "post created");
        self.notifier.publish(
            Topic::PostList,
            FeedEvent::Post(PostChange {
                kind: ChangeKind::Created,
                id,
                node: Some(post.clone()),
            }),
        );

        Ok(post)
    }

    /// Patch a post and announce it to both list and detail observers as
    /// two independent events.
    pub fn edit_post(&self, id: PostId, patch: PostPatch) -> Result<Post> {
        require_patched_content(patch.content.as_deref())?;

        if !self.store.update_post(id, &patch)? {
            return Err(FeedError::PostNotFound(id));
        }
        let post = self
            .store
            .get_post(id)
            .ok_or(FeedError::PostNotFound(id))?;

        tracing::debug!(post = id.0, "post updated");
        self.notifier.publish(
            Topic::PostList,
            FeedEvent::Post(PostChange {
                kind: ChangeKind::Updated,
                id,
                node: Some(post.clone()),
            }),
        );
        self.notifier.publish(
            Topic::PostDetail,
            FeedEvent::Post(PostChange {
                kind: ChangeKind::Updated,
                id,
                node: Some(post.clone()),
            }),
        );

        Ok(post)
    }

    /// Delete a post (cascading its transactions) and announce the removal
    /// with the last known snapshot.
    pub fn delete_post(&self, id: PostId) -> Result<PostId> {
        let snapshot = self
            .store
            .get_post(id)
            .ok_or(FeedError::PostNotFound(id))?;

        if !self.store.delete_post(id)? {
            return Err(FeedError::PostNotFound(id));
        }

        tracing::debug!(post = id.0, "post deleted");
        self.notifier.publish(
            Topic::PostList,
            FeedEvent::Post(PostChange {
                kind: ChangeKind::Deleted,
                id,
                node: Some(snapshot),
            }),
        );

        Ok(id)
    }

    // --- Transactions ---

    /// Create a transaction and announce it to its post's observers.
    pub fn add_transaction(&self, input: TransactionInput) -> Result<Transaction> {
        require_content(&input.content)?;

        let id = self.store.create_transaction(input)?;
        let transaction = self
            .store
            .get_transaction(id)
            .ok_or(FeedError::TransactionNotFound(id))?;

        tracing::debug!(transaction = id.0, post = transaction.post_id.0, "transaction created");
        self.notifier.publish(
            Topic::Transactions,
            FeedEvent::Transaction(TransactionChange {
                kind: ChangeKind::Created,
                id,
                post_id: transaction.post_id,
                node: Some(transaction.clone()),
            }),
        );

        Ok(transaction)
    }

    /// Patch a transaction and announce it to its post's observers.
    pub fn edit_transaction(
        &self,
        id: TransactionId,
        patch: TransactionPatch,
    ) -> Result<Transaction> {
        require_patched_content(patch.content.as_deref())?;

        if !self.store.update_transaction(id, &patch)? {
            return Err(FeedError::TransactionNotFound(id));
        }
        let transaction = self
            .store
            .get_transaction(id)
            .ok_or(FeedError::TransactionNotFound(id))?;

        tracing::debug!(transaction = id.0, post = transaction.post_id.0, "transaction updated");
        self.notifier.publish(
            Topic::Transactions,
            FeedEvent::Transaction(TransactionChange {
                kind: ChangeKind::Updated,
                id,
                post_id: transaction.post_id,
                node: Some(transaction.clone()),
            }),
        );

        Ok(transaction)
    }

    /// Delete a transaction and announce the removal with the last known
    /// snapshot.
    pub fn delete_transaction(&self, id: TransactionId) -> Result<TransactionId> {
        let snapshot = self
            .store
            .get_transaction(id)
            .ok_or(FeedError::TransactionNotFound(id))?;

        if !self.store.delete_transaction(id)? {
            return Err(FeedError::TransactionNotFound(id));
        }

        tracing::debug!(transaction = id.0, post = snapshot.post_id.0, "transaction deleted");
        self.notifier.publish(
            Topic::Transactions,
            FeedEvent::Transaction(TransactionChange {
                kind: ChangeKind::Deleted,
                id,
                post_id: snapshot.post_id,
                node: Some(snapshot),
            }),
        );

        Ok(id)
    }
}

/// Content is required for both record kinds.
fn require_content(content: &str) -> Result<()> {
    if content.trim().is_empty() {
        return Err(FeedError::Validation("content is required".into()));
    }
    Ok(())
}

/// A patch may omit content, but may not blank it.
fn require_patched_content(content: Option<&str>) -> Result<()> {
    match content {
        Some(content) => require_content(content),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::Scope;
    use crate::notify::SubscriptionConfig;
    use crate::store::StoreConfig;
    use tempfile::TempDir;

    fn setup(dir: &TempDir) -> (MutationResolver, Arc<ChangeNotifier>) {
        let store = Arc::new(
            CollectionStore::create(StoreConfig {
                path: dir.path().join("feed"),
                create_if_missing: true,
            })
            .unwrap(),
        );
        let notifier = Arc::new(ChangeNotifier::new());
        (
            MutationResolver::new(store, Arc::clone(&notifier)),
            notifier,
        )
    }

    #[test]
    fn test_validation_rejected_before_write_and_publish() {
        let dir = TempDir::new().unwrap();
        let (mutations, notifier) = setup(&dir);
        let list = notifier.subscribe_posts(PostId(0));

        let err = mutations.add_post(PostInput::new("title", "  ")).unwrap_err();
        assert!(matches!(err, FeedError::Validation(_)));
        assert!(list.try_recv().is_err());
        assert_eq!(mutations.store.count_posts(), 0);
    }

    #[test]
    fn test_delete_missing_publishes_nothing() {
        let dir = TempDir::new().unwrap();
        let (mutations, notifier) = setup(&dir);
        let list = notifier.subscribe_posts(PostId(0));

        let err = mutations.delete_post(PostId(5)).unwrap_err();
        assert!(matches!(err, FeedError::PostNotFound(PostId(5))));
        assert!(list.try_recv().is_err());
    }

    #[test]
    fn test_edit_post_publishes_on_both_topics() {
        let dir = TempDir::new().unwrap();
        let (mutations, notifier) = setup(&dir);

        let post = mutations.add_post(PostInput::new("a", "1")).unwrap();
        let list = notifier.subscribe_posts(PostId(0));
        let detail = notifier.subscribe_post(post.id);

        mutations
            .edit_post(post.id, PostPatch::default().title("b"))
            .unwrap();

        let list_event = list.try_recv().unwrap();
        assert!(matches!(
            &list_event,
            FeedEvent::Post(change) if change.kind == ChangeKind::Updated
        ));
        let detail_event = detail.try_recv().unwrap();
        assert_eq!(list_event, detail_event);
        // Independent events: nothing else pending on either stream.
        assert!(list.try_recv().is_err());
        assert!(detail.try_recv().is_err());
    }

    #[test]
    fn test_create_respects_subscriber_cursor_bounds() {
        let dir = TempDir::new().unwrap();
        let (mutations, notifier) = setup(&dir);

        let from_top = notifier.subscribe_posts(PostId(0));
        let beyond = notifier.subscribe(
            Scope::PostsAfter(PostId(100)),
            SubscriptionConfig::default(),
        );

        let post = mutations.add_post(PostInput::new("a", "1")).unwrap();

        let event = from_top.try_recv().unwrap();
        assert!(matches!(
            event,
            FeedEvent::Post(change) if change.kind == ChangeKind::Created && change.id == post.id
        ));
        assert!(beyond.try_recv().is_err());
    }

    #[test]
    fn test_delete_event_carries_snapshot() {
        let dir = TempDir::new().unwrap();
        let (mutations, notifier) = setup(&dir);

        let post = mutations.add_post(PostInput::new("a", "1")).unwrap();
        let tx = mutations
            .add_transaction(TransactionInput::new(post.id, "tx", "9", "123"))
            .unwrap();
        let children = notifier.subscribe_transactions(post.id);

        mutations.delete_transaction(tx.id).unwrap();

        match children.try_recv().unwrap() {
            FeedEvent::Transaction(change) => {
                assert_eq!(change.kind, ChangeKind::Deleted);
                assert_eq!(change.id, tx.id);
                assert_eq!(change.node.unwrap().content, "tx");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_transaction_for_missing_post_rejected() {
        let dir = TempDir::new().unwrap();
        let (mutations, notifier) = setup(&dir);
        let children = notifier.subscribe_transactions(PostId(1));

        let err = mutations
            .add_transaction(TransactionInput::new(PostId(1), "tx", "0", "123"))
            .unwrap_err();
        assert!(matches!(err, FeedError::MissingPost(PostId(1))));
        assert!(children.try_recv().is_err());
    }
}
