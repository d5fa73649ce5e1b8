//! WebSocket を使った MessagePusher 実装
//!
//! ## 責務
//!
//! - 接続ごとの `UnboundedSender` を管理
//! - 接続へのフレーム送信（push_to, broadcast）
//!
//! WebSocket の生成は UI 層（`ui/handler/websocket.rs`）で行われ、
//! ここでは生成された sender を受け取って送信にのみ使用します。

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{ConnectionId, MessagePushError, MessagePusher, PusherChannel};

/// WebSocket を使った MessagePusher 実装
pub struct WebSocketMessagePusher {
    /// Key: connection id, Value: 送信キュー
    clients: Arc<Mutex<HashMap<ConnectionId, PusherChannel>>>,
}

impl WebSocketMessagePusher {
    pub fn new(clients: Arc<Mutex<HashMap<ConnectionId, PusherChannel>>>) -> Self {
        Self { clients }
    }
}

impl Default for WebSocketMessagePusher {
    fn default() -> Self {
        Self::new(Arc::new(Mutex::new(HashMap::new())))
    }
}

#[async_trait]
impl MessagePusher for WebSocketMessagePusher {
    async fn register_client(&self, connection_id: ConnectionId, sender: PusherChannel) {
        let mut clients = self.clients.lock().await;
        tracing::debug!("Connection '{}' registered to MessagePusher", connection_id);
        clients.insert(connection_id, sender);
    }

    async fn unregister_client(&self, connection_id: &ConnectionId) {
        let mut clients = self.clients.lock().await;
        clients.remove(connection_id);
        tracing::debug!(
            "Connection '{}' unregistered from MessagePusher",
            connection_id
        );
    }

    async fn push_to(
        &self,
        connection_id: &ConnectionId,
        content: &str,
    ) -> Result<(), MessagePushError> {
        let clients = self.clients.lock().await;

        let sender = clients
            .get(connection_id)
            .ok_or_else(|| MessagePushError::ConnectionNotFound(connection_id.to_string()))?;
        sender
            .send(content.to_string())
            .map_err(|e| MessagePushError::PushFailed(e.to_string()))?;
        tracing::trace!("Pushed message to connection '{}'", connection_id);
        Ok(())
    }

    async fn broadcast(&self, targets: &[ConnectionId], content: &str) -> usize {
        let clients = self.clients.lock().await;
        let mut delivered = 0;

        for target in targets {
            match clients.get(target) {
                // 送信に失敗した接続はスキップ（切断処理側で片付けられる）
                Some(sender) => match sender.send(content.to_string()) {
                    Ok(()) => delivered += 1,
                    Err(e) => {
                        tracing::debug!("Failed to push message to '{}': {}", target, e)
                    }
                },
                None => {
                    tracing::debug!("Connection '{}' not found during broadcast, skipping", target)
                }
            }
        }

        delivered
    }
}
