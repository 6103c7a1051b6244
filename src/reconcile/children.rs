//! Reconciler for one post's transaction list.

use super::{Outcome, Ticket};
use crate::notify::{FeedEvent, TransactionChange};
use crate::types::{ChangeKind, PostId, Transaction, TransactionId, TransactionPatch};

/// A transaction as cached by an observer. `id` is `None` while the entry
/// is an unconfirmed optimistic create.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CachedTransaction {
    pub id: Option<TransactionId>,
    pub content: String,
    pub balance: String,
    pub time_stamp: String,
    ticket: Option<Ticket>,
}

impl CachedTransaction {
    fn confirmed(transaction: &Transaction) -> Self {
        Self {
            id: Some(transaction.id),
            content: transaction.content.clone(),
            balance: transaction.balance.clone(),
            time_stamp: transaction.time_stamp.clone(),
            ticket: None,
        }
    }

    pub fn is_confirmed(&self) -> bool {
        self.id.is_some()
    }
}

/// A not-yet-created transaction, as the observer expects it to look.
#[derive(Clone, Debug)]
pub struct TransactionDraft {
    pub content: String,
    pub balance: String,
    pub time_stamp: String,
}

impl TransactionDraft {
    pub fn new(
        content: impl Into<String>,
        balance: impl Into<String>,
        time_stamp: impl Into<String>,
    ) -> Self {
        Self {
            content: content.into(),
            balance: balance.into(),
            time_stamp: time_stamp.into(),
        }
    }
}

struct PendingOp {
    ticket: Ticket,
    snapshot: Vec<CachedTransaction>,
}

/// One observer's cached transaction list for a single post. Entries keep
/// insertion order; new transactions append at the end.
pub struct TransactionListView {
    post_id: PostId,
    entries: Vec<CachedTransaction>,
    pending: Vec<PendingOp>,
    next_ticket: u64,
}

impl TransactionListView {
    /// Seed the view from a loaded transaction list.
    pub fn new(post_id: PostId, transactions: &[Transaction]) -> Self {
        Self {
            post_id,
            entries: transactions.iter().map(CachedTransaction::confirmed).collect(),
            pending: Vec::new(),
            next_ticket: 1,
        }
    }

    pub fn post_id(&self) -> PostId {
        self.post_id
    }

    pub fn entries(&self) -> &[CachedTransaction] {
        &self.entries
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    // --- Event merge ---

    /// Merge one feed event. Events for other posts (or non-transaction
    /// events) are ignored.
    pub fn apply_event(&mut self, event: &FeedEvent) {
        if let FeedEvent::Transaction(change) = event {
            if change.post_id == self.post_id {
                self.apply(change);
            }
        }
    }

    fn apply(&mut self, change: &TransactionChange) {
        match change.kind {
            ChangeKind::Created => {
                let node = match &change.node {
                    Some(node) => node,
                    None => return,
                };
                if let Some(pos) = self.position_of(change.id) {
                    let ticket = self.entries[pos].ticket;
                    self.entries[pos] = CachedTransaction {
                        ticket,
                        ..CachedTransaction::confirmed(node)
                    };
                } else if let Some(pos) = self.oldest_placeholder() {
                    let ticket = self.entries[pos].ticket;
                    self.entries[pos] = CachedTransaction {
                        ticket,
                        ..CachedTransaction::confirmed(node)
                    };
                } else {
                    self.entries.push(CachedTransaction::confirmed(node));
                }
            }
            ChangeKind::Updated => {
                let node = match &change.node {
                    Some(node) => node,
                    None => return,
                };
                if let Some(pos) = self.position_of(change.id) {
                    let ticket = self.entries[pos].ticket;
                    self.entries[pos] = CachedTransaction {
                        ticket,
                        ..CachedTransaction::confirmed(node)
                    };
                }
            }
            ChangeKind::Deleted => {
                if let Some(pos) = self.position_of(change.id) {
                    self.entries.remove(pos);
                }
            }
        }
    }

    // --- Optimistic mutations ---

    /// Append an unconfirmed create at the end of the list.
    pub fn optimistic_create(&mut self, draft: TransactionDraft) -> Ticket {
        let ticket = self.issue_ticket();
        self.entries.push(CachedTransaction {
            id: None,
            content: draft.content,
            balance: draft.balance,
            time_stamp: draft.time_stamp,
            ticket: Some(ticket),
        });
        ticket
    }

    /// Apply a patch before the server confirms it.
    pub fn optimistic_update(&mut self, id: TransactionId, patch: &TransactionPatch) -> Ticket {
        let ticket = self.issue_ticket();
        if let Some(pos) = self.position_of(id) {
            if let Some(content) = &patch.content {
                self.entries[pos].content = content.clone();
            }
            if let Some(balance) = &patch.balance {
                self.entries[pos].balance = balance.clone();
            }
            if let Some(time_stamp) = &patch.time_stamp {
                self.entries[pos].time_stamp = time_stamp.clone();
            }
        }
        ticket
    }

    /// Apply a delete before the server confirms it.
    pub fn optimistic_delete(&mut self, id: TransactionId) -> Ticket {
        let ticket = self.issue_ticket();
        if let Some(pos) = self.position_of(id) {
            self.entries.remove(pos);
        }
        ticket
    }

    /// Settle an optimistic create with the mutation's outcome.
    pub fn resolve_create(&mut self, ticket: Ticket, outcome: Outcome<Transaction>) {
        let snapshot = match self.take_pending(ticket) {
            Some(snapshot) => snapshot,
            None => return,
        };
        match outcome {
            Outcome::Confirmed(transaction) => {
                if let Some(pos) = self.position_of_ticket(ticket) {
                    if self
                        .entries
                        .iter()
                        .enumerate()
                        .any(|(i, e)| i != pos && e.id == Some(transaction.id))
                    {
                        self.entries.remove(pos);
                    } else {
                        self.entries[pos] = CachedTransaction::confirmed(&transaction);
                    }
                } else {
                    self.apply(&TransactionChange {
                        kind: ChangeKind::Created,
                        id: transaction.id,
                        post_id: transaction.post_id,
                        node: Some(transaction),
                    });
                }
            }
            Outcome::Failed => self.entries = snapshot,
        }
    }

    /// Settle an optimistic update with the mutation's outcome.
    pub fn resolve_update(&mut self, ticket: Ticket, outcome: Outcome<Transaction>) {
        let snapshot = match self.take_pending(ticket) {
            Some(snapshot) => snapshot,
            None => return,
        };
        match outcome {
            Outcome::Confirmed(transaction) => self.apply(&TransactionChange {
                kind: ChangeKind::Updated,
                id: transaction.id,
                post_id: transaction.post_id,
                node: Some(transaction),
            }),
            Outcome::Failed => self.entries = snapshot,
        }
    }

    /// Settle an optimistic delete with the mutation's outcome.
    pub fn resolve_delete(&mut self, ticket: Ticket, outcome: Outcome<TransactionId>) {
        let snapshot = match self.take_pending(ticket) {
            Some(snapshot) => snapshot,
            None => return,
        };
        match outcome {
            Outcome::Confirmed(_) => {}
            Outcome::Failed => self.entries = snapshot,
        }
    }

    // --- Internals ---

    fn issue_ticket(&mut self) -> Ticket {
        let ticket = Ticket(self.next_ticket);
        self.next_ticket += 1;
        self.pending.push(PendingOp {
            ticket,
            snapshot: self.entries.clone(),
        });
        ticket
    }

    fn take_pending(&mut self, ticket: Ticket) -> Option<Vec<CachedTransaction>> {
        let pos = self.pending.iter().position(|op| op.ticket == ticket)?;
        Some(self.pending.remove(pos).snapshot)
    }

    fn position_of(&self, id: TransactionId) -> Option<usize> {
        self.entries.iter().position(|entry| entry.id == Some(id))
    }

    fn position_of_ticket(&self, ticket: Ticket) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| entry.ticket == Some(ticket))
    }

    /// Oldest unconfirmed placeholder: the first one, since new
    /// placeholders append at the end.
    fn oldest_placeholder(&self) -> Option<usize> {
        self.entries.iter().position(|entry| entry.id.is_none())
    }
}
