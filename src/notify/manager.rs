//! Change notifier: broadcasts feed events to scoped subscribers.

use crossbeam_channel::{bounded, Sender};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use super::types::{
    DropReason, FeedEvent, Scope, SubscriptionConfig, SubscriptionHandle, SubscriptionId, Topic,
};
use crate::types::PostId;

/// Internal subscription state.
struct Subscription {
    scope: Scope,
    sender: Sender<FeedEvent>,
}

impl Subscription {
    /// Try to send an event. Returns false if the buffer is full or the
    /// receiver is gone (subscriber will be dropped).
    fn try_send(&self, event: FeedEvent) -> bool {
        match self.sender.try_send(event) {
            Ok(()) => true,
            Err(crossbeam_channel::TrySendError::Full(_)) => false,
            Err(crossbeam_channel::TrySendError::Disconnected(_)) => false,
        }
    }
}

/// Explicitly owned publish/subscribe hub for feed change events.
///
/// Delivery is fire-and-forget and at-most-once per subscriber registered
/// at the moment of publish; there is no buffering or replay for later
/// subscribers. Events on one topic reach a given subscriber in publish
/// order. Lifecycle is tied to the owning process: [`shutdown`] closes
/// every open stream.
///
/// [`shutdown`]: ChangeNotifier::shutdown
pub struct ChangeNotifier {
    /// Active subscriptions by ID.
    subscriptions: RwLock<HashMap<SubscriptionId, Subscription>>,
    /// Counter for generating subscription IDs.
    next_id: AtomicU64,
    /// Set once by shutdown; later subscribes get an already-closed stream.
    closed: AtomicBool,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self {
            subscriptions: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            closed: AtomicBool::new(false),
        }
    }

    /// Register a subscriber for everything its scope deems relevant.
    pub fn subscribe(&self, scope: Scope, config: SubscriptionConfig) -> SubscriptionHandle {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let (sender, receiver) = bounded(config.buffer_size);

        if self.closed.load(Ordering::SeqCst) {
            // Stream is born closed: sender dropped, receiver disconnects.
            return SubscriptionHandle { id, receiver };
        }

        self.subscriptions
            .write()
            .insert(id, Subscription { scope, sender });

        SubscriptionHandle { id, receiver }
    }

    /// Watch the post list from a cursor lower bound.
    pub fn subscribe_posts(&self, after: PostId) -> SubscriptionHandle {
        self.subscribe(Scope::PostsAfter(after), SubscriptionConfig::default())
    }

    /// Watch a single post.
    pub fn subscribe_post(&self, id: PostId) -> SubscriptionHandle {
        self.subscribe(Scope::Post(id), SubscriptionConfig::default())
    }

    /// Watch the transactions of a post.
    pub fn subscribe_transactions(&self, post_id: PostId) -> SubscriptionHandle {
        self.subscribe(Scope::TransactionsOf(post_id), SubscriptionConfig::default())
    }

    /// Unsubscribe and clean up. Idempotent; safe after shutdown.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        let mut subs = self.subscriptions.write();
        if let Some(sub) = subs.remove(&id) {
            // Terminal event, best effort.
            let _ = sub.sender.try_send(FeedEvent::Dropped {
                reason: DropReason::Unsubscribed,
            });
        }
    }

    /// Close every open subscription stream. Further publishes reach no
    /// one; further subscribes return already-closed streams.
    pub fn shutdown(&self) {
        self.closed.store(true, Ordering::SeqCst);
        let mut subs = self.subscriptions.write();
        for (_, sub) in subs.drain() {
            let _ = sub.sender.try_send(FeedEvent::Dropped {
                reason: DropReason::Shutdown,
            });
        }
    }

    /// Get subscription count.
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.read().len()
    }

    /// Deliver `event` to every current subscriber of `topic` whose scope
    /// matches. Subscribers that cannot keep up are dropped.
    pub fn publish(&self, topic: Topic, event: FeedEvent) {
        let mut to_remove = Vec::new();

        {
            let subs = self.subscriptions.read();
            for (id, sub) in subs.iter() {
                if sub.scope.topic() == topic && sub.scope.matches(&event) {
                    if !sub.try_send(event.clone()) {
                        to_remove.push(*id);
                    }
                }
            }
        }

        if !to_remove.is_empty() {
            let mut subs = self.subscriptions.write();
            for id in to_remove {
                if let Some(sub) = subs.remove(&id) {
                    tracing::warn!(subscription = id.0, "dropping slow subscriber");
                    let _ = sub.sender.try_send(FeedEvent::Dropped {
                        reason: DropReason::BufferOverflow,
                    });
                }
            }
        }
    }
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new()
    }
}
