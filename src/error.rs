//! Error types for the feed store.

use crate::types::{PostId, TransactionId};
use thiserror::Error;

/// Main error type for feed operations.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Post not found: {0}")]
    PostNotFound(PostId),

    #[error("Transaction not found: {0}")]
    TransactionNotFound(TransactionId),

    #[error("Transaction references missing post: {0}")]
    MissingPost(PostId),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Corruption detected: {0}")]
    Corruption(String),

    #[error("Store is locked by another process")]
    Locked,

    #[error("Store not initialized")]
    NotInitialized,

    #[error("Invalid store format: {0}")]
    InvalidFormat(String),
}

impl FeedError {
    /// True for the not-found family, so idempotent callers can match
    /// without enumerating variants.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            FeedError::PostNotFound(_) | FeedError::TransactionNotFound(_)
        )
    }
}

impl From<rmp_serde::encode::Error> for FeedError {
    fn from(e: rmp_serde::encode::Error) -> Self {
        FeedError::Serialization(e.to_string())
    }
}

impl From<rmp_serde::decode::Error> for FeedError {
    fn from(e: rmp_serde::decode::Error) -> Self {
        FeedError::Deserialization(e.to_string())
    }
}

/// Result type for feed operations.
pub type Result<T> = std::result::Result<T, FeedError>;
