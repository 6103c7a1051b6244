//! Reconciler for a single watched post.

use super::{Outcome, Ticket};
use crate::notify::{FeedEvent, PostChange};
use crate::types::{ChangeKind, Post, PostId, PostPatch};

struct PendingOp {
    ticket: Ticket,
    snapshot: Option<Post>,
}

/// One observer's cache of a single post, e.g. a detail/edit page.
pub struct PostDetailView {
    watched: PostId,
    post: Option<Post>,
    pending: Vec<PendingOp>,
    next_ticket: u64,
}

impl PostDetailView {
    pub fn new(watched: PostId, post: Option<Post>) -> Self {
        Self {
            watched,
            post,
            pending: Vec::new(),
            next_ticket: 1,
        }
    }

    pub fn watched(&self) -> PostId {
        self.watched
    }

    pub fn post(&self) -> Option<&Post> {
        self.post.as_ref()
    }

    /// Merge one feed event. Events for other posts are ignored.
    pub fn apply_event(&mut self, event: &FeedEvent) {
        let change = match event {
            FeedEvent::Post(change) if change.id == self.watched => change,
            _ => return,
        };
        self.apply(change);
    }

    fn apply(&mut self, change: &PostChange) {
        match change.kind {
            ChangeKind::Created | ChangeKind::Updated => {
                if change.node.is_some() {
                    self.post = change.node.clone();
                }
            }
            ChangeKind::Deleted => self.post = None,
        }
    }

    /// Apply a patch before the server confirms it.
    pub fn optimistic_update(&mut self, patch: &PostPatch) -> Ticket {
        let ticket = Ticket(self.next_ticket);
        self.next_ticket += 1;
        self.pending.push(PendingOp {
            ticket,
            snapshot: self.post.clone(),
        });

        if let Some(post) = &mut self.post {
            if let Some(title) = &patch.title {
                post.title = title.clone();
            }
            if let Some(content) = &patch.content {
                post.content = content.clone();
            }
        }
        ticket
    }

    /// Settle an optimistic update with the mutation's outcome.
    pub fn resolve_update(&mut self, ticket: Ticket, outcome: Outcome<Post>) {
        let pos = match self.pending.iter().position(|op| op.ticket == ticket) {
            Some(pos) => pos,
            None => return,
        };
        let snapshot = self.pending.remove(pos).snapshot;
        match outcome {
            Outcome::Confirmed(post) => self.apply(&PostChange {
                kind: ChangeKind::Updated,
                id: post.id,
                node: Some(post),
            }),
            Outcome::Failed => self.post = snapshot,
        }
    }
}
