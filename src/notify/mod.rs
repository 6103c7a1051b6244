//! Publish/subscribe fan-out of change events to scoped observers.

mod manager;
mod types;

pub use manager::ChangeNotifier;
pub use types::{
    DropReason, FeedEvent, PostChange, Scope, SubscriptionConfig, SubscriptionHandle,
    SubscriptionId, Topic, TransactionChange,
};
