//! ChatStore used when no store is configured: stores nothing, remembers nothing.

use async_trait::async_trait;

use crate::domain::{ChatDispatchEnvelope, ChatStore, ChatStoreError, Identity};

#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledChatStore;

#[async_trait]
impl ChatStore for DisabledChatStore {
    async fn store_message(&self, _envelope: &ChatDispatchEnvelope) -> Result<(), ChatStoreError> {
        Ok(())
    }

    async fn recent_messages(
        &self,
        _identity: &Identity,
        _limit: usize,
    ) -> Result<Vec<ChatDispatchEnvelope>, ChatStoreError> {
        Ok(Vec::new())
    }
}
