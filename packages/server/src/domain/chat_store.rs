//! Persistence boundary for chat messages.
//!
//! Requests carry no transaction semantics. A failed request is reported to
//! the caller and never retried here.

use async_trait::async_trait;
use thiserror::Error;

use super::{entity::ChatDispatchEnvelope, value_object::Identity};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChatStoreError {
    #[error("chat store unreachable: {0}")]
    Unreachable(String),

    #[error("chat store rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("unexpected chat store response: {0}")]
    InvalidResponse(String),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatStore: Send + Sync {
    /// Persist one delivered message.
    async fn store_message(&self, envelope: &ChatDispatchEnvelope) -> Result<(), ChatStoreError>;

    /// Messages visible to `identity` (global ones, plus direct messages it
    /// sent or received), oldest first, at most `limit`.
    async fn recent_messages(
        &self,
        identity: &Identity,
        limit: usize,
    ) -> Result<Vec<ChatDispatchEnvelope>, ChatStoreError>;
}
