//! Client-side reconciliation of cached windows.
//!
//! Each view is one observer's in-memory cache of a query result. Views
//! merge relevant change events and optimistic local mutations without
//! re-querying, and they roll an optimistic mutation back to the exact
//! pre-mutation state when the underlying call fails.
//!
//! The optimistic flow is two explicit transitions: an `optimistic_*` call
//! applies the expected effect and returns a [`Ticket`]; `resolve_*` with
//! an [`Outcome`] either confirms the entry (matching by id, or by the
//! pending placeholder for creates) or restores the snapshot taken when
//! the ticket was issued.

mod children;
mod detail;
mod list;

pub use children::{CachedTransaction, TransactionDraft, TransactionListView};
pub use detail::PostDetailView;
pub use list::{CachedPost, PostDraft, PostListView};

/// Identifier for an in-flight optimistic mutation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Ticket(pub u64);

/// How the underlying mutation ended.
#[derive(Clone, Debug)]
pub enum Outcome<R> {
    /// The mutation succeeded; carries what the resolver returned.
    Confirmed(R),
    /// The mutation failed for any reason; the optimistic entry must be
    /// rolled back.
    Failed,
}
