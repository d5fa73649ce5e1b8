//! Outbound delivery trait.
//!
//! Each connection owns an unbounded channel drained by its socket writer, so
//! pushing never waits on the network.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use super::value_object::ConnectionId;

/// Sending half of a connection's outbound queue (serialized JSON frames).
pub type PusherChannel = mpsc::UnboundedSender<String>;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MessagePushError {
    #[error("connection '{0}' not found")]
    ConnectionNotFound(String),

    #[error("failed to push message: {0}")]
    PushFailed(String),
}

#[async_trait]
pub trait MessagePusher: Send + Sync {
    async fn register_client(&self, connection_id: ConnectionId, sender: PusherChannel);

    async fn unregister_client(&self, connection_id: &ConnectionId);

    /// Deliver one frame to one connection.
    async fn push_to(
        &self,
        connection_id: &ConnectionId,
        content: &str,
    ) -> Result<(), MessagePushError>;

    /// Deliver one frame to every target. Missing or closed targets are skipped.
    ///
    /// Returns the number of connections the frame was queued for.
    async fn broadcast(&self, targets: &[ConnectionId], content: &str) -> usize;
}
