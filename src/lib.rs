//! # Live Feed
//!
//! A live-updating, cursor-paginated collection store: posts with
//! per-post transactions, kept consistent for every connected observer as
//! creates, updates, and deletes happen concurrently.
//!
//! ## Core Concepts
//!
//! - **Store**: journaled, authoritative tables for posts and their
//!   transactions, with cascade delete
//! - **Windows**: cursor-paginated pages over the post list, newest first
//! - **Events**: change notifications fanned out to scoped subscribers
//! - **Reconcilers**: per-observer caches that merge events and optimistic
//!   local mutations without re-querying
//!
//! ## Example
//!
//! ```ignore
//! use livefeed::{
//!     ChangeNotifier, CollectionStore, MutationResolver, PostId, PostInput,
//!     PostListView, QueryResolver, StoreConfig,
//! };
//! use std::sync::Arc;
//!
//! let store = Arc::new(CollectionStore::open_or_create(StoreConfig {
//!     path: "./my-feed".into(),
//!     ..Default::default()
//! })?);
//! let notifier = Arc::new(ChangeNotifier::new());
//!
//! let queries = QueryResolver::new(Arc::clone(&store));
//! let mutations = MutationResolver::new(Arc::clone(&store), Arc::clone(&notifier));
//!
//! // An observer loads a page and watches for changes past its cursor.
//! let window = queries.posts(10, None);
//! let mut view = PostListView::from_connection(&window);
//! let stream = notifier.subscribe_posts(window.page_info.end_cursor.unwrap_or(PostId(0)));
//!
//! // Another caller mutates; the observer merges the event.
//! mutations.add_post(PostInput::new("Hello", "world"))?;
//! for event in stream.drain() {
//!     view.apply_event(&event);
//! }
//! ```

pub mod error;
pub mod mutation;
pub mod notify;
pub mod pagination;
pub mod query;
pub mod reconcile;
pub mod store;
pub mod types;

// Re-exports
pub use error::{FeedError, Result};
pub use mutation::MutationResolver;
pub use notify::{
    ChangeNotifier, DropReason, FeedEvent, PostChange, Scope, SubscriptionConfig,
    SubscriptionHandle, SubscriptionId, Topic, TransactionChange,
};
pub use pagination::{paginate, PageInfo, PostConnection, PostEdge};
pub use query::QueryResolver;
pub use reconcile::{
    CachedPost, CachedTransaction, Outcome, PostDetailView, PostDraft, PostListView, Ticket,
    TransactionDraft, TransactionListView,
};
pub use store::{CollectionStore, StoreConfig};
pub use types::*;
