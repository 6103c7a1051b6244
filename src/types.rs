//! Core types for the feed store.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Unique identifier for a post.
///
/// Assigned by the store on creation, monotonically increasing, stable for
/// the record's lifetime. Doubles as the pagination cursor: a page ends at
/// the id of its last edge, and the next page selects ids strictly below it.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PostId(pub u64);

impl fmt::Debug for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PostId({})", self.0)
    }
}

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a transaction.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TransactionId(pub u64);

impl fmt::Debug for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TransactionId({})", self.0)
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Microseconds since Unix epoch.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    /// Current time.
    pub fn now() -> Self {
        let duration = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("Time went backwards");
        Timestamp(duration.as_micros() as i64)
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({})", self.0)
    }
}

/// A post record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    /// Unique identifier (assigned by store).
    pub id: PostId,

    pub title: String,

    pub content: String,

    /// When the record was created (assigned by store).
    pub created: Timestamp,

    /// When the record was last written (assigned by store).
    pub updated: Timestamp,
}

/// Input for creating a post (before id/timestamps are assigned).
#[derive(Clone, Debug)]
pub struct PostInput {
    pub title: String,
    pub content: String,
}

impl PostInput {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
        }
    }
}

/// Partial update for a post. `None` fields are left untouched.
#[derive(Clone, Debug, Default)]
pub struct PostPatch {
    pub title: Option<String>,
    pub content: Option<String>,
}

impl PostPatch {
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }
}

/// A transaction record, scoped to a post.
///
/// `balance` is a text-encoded numeric value and `time_stamp` an external,
/// opaque timestamp string; both are caller-owned and never interpreted by
/// the store. `created`/`updated` are store-assigned.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique identifier (assigned by store).
    pub id: TransactionId,

    /// Owning post. Deleting the post cascades to its transactions.
    pub post_id: PostId,

    pub content: String,

    pub balance: String,

    pub time_stamp: String,

    pub created: Timestamp,

    pub updated: Timestamp,
}

/// Input for creating a transaction.
#[derive(Clone, Debug)]
pub struct TransactionInput {
    pub post_id: PostId,
    pub content: String,
    pub balance: String,
    pub time_stamp: String,
}

impl TransactionInput {
    pub fn new(
        post_id: PostId,
        content: impl Into<String>,
        balance: impl Into<String>,
        time_stamp: impl Into<String>,
    ) -> Self {
        Self {
            post_id,
            content: content.into(),
            balance: balance.into(),
            time_stamp: time_stamp.into(),
        }
    }
}

/// Partial update for a transaction. `None` fields are left untouched.
#[derive(Clone, Debug, Default)]
pub struct TransactionPatch {
    pub content: Option<String>,
    pub balance: Option<String>,
    pub time_stamp: Option<String>,
}

impl TransactionPatch {
    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn balance(mut self, balance: impl Into<String>) -> Self {
        self.balance = Some(balance.into());
        self
    }

    pub fn time_stamp(mut self, time_stamp: impl Into<String>) -> Self {
        self.time_stamp = Some(time_stamp.into());
        self
    }
}

/// The effect a change event describes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeKind {
    Created,
    Updated,
    Deleted,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_display() {
        assert_eq!(PostId(7).to_string(), "7");
        assert_eq!(format!("{:?}", TransactionId(3)), "TransactionId(3)");
    }

    #[test]
    fn test_patch_builders() {
        let patch = PostPatch::default().title("a").content("b");
        assert_eq!(patch.title.as_deref(), Some("a"));
        assert_eq!(patch.content.as_deref(), Some("b"));

        let patch = TransactionPatch::default().content("c");
        assert_eq!(patch.content.as_deref(), Some("c"));
        assert!(patch.balance.is_none());
        assert!(patch.time_stamp.is_none());
    }

    #[test]
    fn test_change_kind_wire_shape() {
        let json = serde_json::to_string(&ChangeKind::Created).unwrap();
        assert_eq!(json, "\"CREATED\"");
    }
}
