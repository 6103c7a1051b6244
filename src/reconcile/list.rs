//! Reconciler for the paginated post window.

use super::{Outcome, Ticket};
use crate::notify::{FeedEvent, PostChange};
use crate::pagination::PostConnection;
use crate::types::{ChangeKind, Post, PostId, PostPatch};

/// A post as cached by an observer. `id` is `None` while the entry is an
/// unconfirmed optimistic create.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CachedPost {
    pub id: Option<PostId>,
    pub title: String,
    pub content: String,
    ticket: Option<Ticket>,
}

impl CachedPost {
    fn confirmed(post: &Post) -> Self {
        Self {
            id: Some(post.id),
            title: post.title.clone(),
            content: post.content.clone(),
            ticket: None,
        }
    }

    /// True once the entry has a store-assigned id.
    pub fn is_confirmed(&self) -> bool {
        self.id.is_some()
    }

    /// Placeholders sort as newest; everything else by id.
    fn sort_key(&self) -> u64 {
        self.id.map(|id| id.0).unwrap_or(u64::MAX)
    }
}

/// A not-yet-created post, as the observer expects it to look.
#[derive(Clone, Debug)]
pub struct PostDraft {
    pub title: String,
    pub content: String,
}

impl PostDraft {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
        }
    }
}

#[derive(Clone)]
struct WindowSnapshot {
    entries: Vec<CachedPost>,
    total_count: u64,
    has_next_page: bool,
}

struct PendingOp {
    ticket: Ticket,
    snapshot: WindowSnapshot,
}

/// One observer's cached window over the post list.
///
/// The window is kept strictly descending by id (placeholders count as
/// newest). Events the window has already absorbed are idempotent, and
/// events for records outside the window are ignored.
pub struct PostListView {
    entries: Vec<CachedPost>,
    total_count: u64,
    has_next_page: bool,
    pending: Vec<PendingOp>,
    next_ticket: u64,
}

impl PostListView {
    /// Seed the view from a fetched page.
    pub fn from_connection(connection: &PostConnection) -> Self {
        Self {
            entries: connection
                .edges
                .iter()
                .map(|edge| CachedPost::confirmed(&edge.node))
                .collect(),
            total_count: connection.total_count,
            has_next_page: connection.page_info.has_next_page,
            pending: Vec::new(),
            next_ticket: 1,
        }
    }

    /// Absorb a further (older) page, for load-more flows. Server-side
    /// metadata replaces the cached values; duplicate ids are skipped.
    pub fn merge_page(&mut self, connection: &PostConnection) {
        for edge in &connection.edges {
            if self.position_of(edge.node.id).is_none() {
                self.entries.push(CachedPost::confirmed(&edge.node));
            }
        }
        self.entries.sort_by(|a, b| b.sort_key().cmp(&a.sort_key()));
        self.total_count = connection.total_count;
        self.has_next_page = connection.page_info.has_next_page;
    }

    // --- Accessors ---

    pub fn entries(&self) -> &[CachedPost] {
        &self.entries
    }

    pub fn total_count(&self) -> u64 {
        self.total_count
    }

    pub fn has_next_page(&self) -> bool {
        self.has_next_page
    }

    /// Id of the last confirmed entry; the cursor a next-page fetch or a
    /// list subscription would use.
    pub fn end_cursor(&self) -> Option<PostId> {
        self.entries.iter().rev().find_map(|entry| entry.id)
    }

    /// Number of unresolved optimistic mutations.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    // --- Event merge ---

    /// Merge one feed event. Non-post events are ignored.
    pub fn apply_event(&mut self, event: &FeedEvent) {
        if let FeedEvent::Post(change) = event {
            self.apply(change);
        }
    }

    fn apply(&mut self, change: &PostChange) {
        match change.kind {
            ChangeKind::Created => {
                let node = match &change.node {
                    Some(node) => node,
                    None => return,
                };
                if let Some(pos) = self.position_of(change.id) {
                    // Duplicate delivery, or confirmation of an entry we
                    // already hold: replace in place.
                    let ticket = self.entries[pos].ticket;
                    self.entries[pos] = CachedPost {
                        ticket,
                        ..CachedPost::confirmed(node)
                    };
                } else if let Some(pos) = self.oldest_placeholder() {
                    // The event confirms the oldest unconfirmed create.
                    let ticket = self.entries[pos].ticket;
                    self.entries[pos] = CachedPost {
                        ticket,
                        ..CachedPost::confirmed(node)
                    };
                } else {
                    self.insert_ordered(CachedPost::confirmed(node));
                    self.total_count += 1;
                }
            }
            ChangeKind::Updated => {
                let node = match &change.node {
                    Some(node) => node,
                    None => return,
                };
                // Absent entries are never inserted by an update.
                if let Some(pos) = self.position_of(change.id) {
                    let ticket = self.entries[pos].ticket;
                    self.entries[pos] = CachedPost {
                        ticket,
                        ..CachedPost::confirmed(node)
                    };
                }
            }
            ChangeKind::Deleted => {
                // Already removed (e.g. by a local optimistic delete): ignore.
                if let Some(pos) = self.position_of(change.id) {
                    self.entries.remove(pos);
                    self.total_count = self.total_count.saturating_sub(1);
                }
            }
        }
    }

    // --- Optimistic mutations ---

    /// Apply a create before the server confirms it. The entry carries a
    /// placeholder id until the confirming event or response arrives.
    pub fn optimistic_create(&mut self, draft: PostDraft) -> Ticket {
        let ticket = self.issue_ticket();
        self.entries.insert(
            0,
            CachedPost {
                id: None,
                title: draft.title,
                content: draft.content,
                ticket: Some(ticket),
            },
        );
        self.total_count += 1;
        ticket
    }

    /// Apply a patch before the server confirms it.
    pub fn optimistic_update(&mut self, id: PostId, patch: &PostPatch) -> Ticket {
        let ticket = self.issue_ticket();
        if let Some(pos) = self.position_of(id) {
            if let Some(title) = &patch.title {
                self.entries[pos].title = title.clone();
            }
            if let Some(content) = &patch.content {
                self.entries[pos].content = content.clone();
            }
        }
        ticket
    }

    /// Apply a delete before the server confirms it.
    pub fn optimistic_delete(&mut self, id: PostId) -> Ticket {
        let ticket = self.issue_ticket();
        if let Some(pos) = self.position_of(id) {
            self.entries.remove(pos);
            self.total_count = self.total_count.saturating_sub(1);
        }
        ticket
    }

    /// Settle an optimistic create with the mutation's outcome.
    pub fn resolve_create(&mut self, ticket: Ticket, outcome: Outcome<Post>) {
        let snapshot = match self.take_pending(ticket) {
            Some(snapshot) => snapshot,
            None => return,
        };
        match outcome {
            Outcome::Confirmed(post) => {
                if let Some(pos) = self.position_of_ticket(ticket) {
                    if self
                        .entries
                        .iter()
                        .enumerate()
                        .any(|(i, e)| i != pos && e.id == Some(post.id))
                    {
                        // The confirmed record is already cached (e.g.
                        // merged in from a page fetch): drop the duplicate.
                        self.entries.remove(pos);
                        self.total_count = self.total_count.saturating_sub(1);
                    } else {
                        self.entries[pos] = CachedPost::confirmed(&post);
                    }
                } else {
                    // Placeholder already resolved by the feed event.
                    self.apply(&PostChange {
                        kind: ChangeKind::Created,
                        id: post.id,
                        node: Some(post),
                    });
                }
            }
            Outcome::Failed => self.restore(snapshot),
        }
    }

    /// Settle an optimistic update with the mutation's outcome.
    pub fn resolve_update(&mut self, ticket: Ticket, outcome: Outcome<Post>) {
        let snapshot = match self.take_pending(ticket) {
            Some(snapshot) => snapshot,
            None => return,
        };
        match outcome {
            Outcome::Confirmed(post) => self.apply(&PostChange {
                kind: ChangeKind::Updated,
                id: post.id,
                node: Some(post),
            }),
            Outcome::Failed => self.restore(snapshot),
        }
    }

    /// Settle an optimistic delete with the mutation's outcome.
    pub fn resolve_delete(&mut self, ticket: Ticket, outcome: Outcome<PostId>) {
        let snapshot = match self.take_pending(ticket) {
            Some(snapshot) => snapshot,
            None => return,
        };
        match outcome {
            // The window already reflects the removal.
            Outcome::Confirmed(_) => {}
            Outcome::Failed => self.restore(snapshot),
        }
    }

    // --- Internals ---

    fn issue_ticket(&mut self) -> Ticket {
        let ticket = Ticket(self.next_ticket);
        self.next_ticket += 1;
        self.pending.push(PendingOp {
            ticket,
            snapshot: WindowSnapshot {
                entries: self.entries.clone(),
                total_count: self.total_count,
                has_next_page: self.has_next_page,
            },
        });
        ticket
    }

    fn take_pending(&mut self, ticket: Ticket) -> Option<WindowSnapshot> {
        let pos = self.pending.iter().position(|op| op.ticket == ticket)?;
        Some(self.pending.remove(pos).snapshot)
    }

    fn restore(&mut self, snapshot: WindowSnapshot) {
        self.entries = snapshot.entries;
        self.total_count = snapshot.total_count;
        self.has_next_page = snapshot.has_next_page;
    }

    fn position_of(&self, id: PostId) -> Option<usize> {
        self.entries.iter().position(|entry| entry.id == Some(id))
    }

    fn position_of_ticket(&self, ticket: Ticket) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| entry.ticket == Some(ticket))
    }

    /// Oldest unconfirmed placeholder: the last one, since new placeholders
    /// go to the front.
    fn oldest_placeholder(&self) -> Option<usize> {
        self.entries.iter().rposition(|entry| entry.id.is_none())
    }

    fn insert_ordered(&mut self, entry: CachedPost) {
        let key = entry.sort_key();
        let pos = self
            .entries
            .iter()
            .position(|existing| existing.sort_key() < key)
            .unwrap_or(self.entries.len());
        self.entries.insert(pos, entry);
    }
}
