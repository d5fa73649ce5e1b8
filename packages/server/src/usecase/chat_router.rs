//! UseCase: Chat Router
//!
//! 全体チャット・ダイレクトメッセージ・ルームチャットの配信と履歴の取得。
//!
//! 配信は必ずメモリ上の宛先に先に行い、その後で外部ストアへの保存を試みる。
//! 保存の失敗はログに残すだけで、配信は取り消さない。

use std::sync::Arc;

use rallyhub_shared::time::{Clock, timestamp_to_rfc3339};

use crate::{
    config::MAX_HISTORY_LIMIT,
    domain::{
        ChatDispatchEnvelope, ChatScope, ChatStore, ConnectedClient, ConnectionId,
        ConnectionRepository, Identity, MessageBody, RoomId, RoomRepository, Timestamp,
    },
    infrastructure::dto::websocket::{ChatMessageDto, ServerEvent},
};

use super::{
    broadcast::Broadcaster,
    error::{DirectMessageError, FriendRequestError, GlobalChatError, RoomChatError},
    stats::ServerStats,
};

/// Chat Router のユースケース
pub struct ChatRouter {
    connections: Arc<dyn ConnectionRepository>,
    rooms: Arc<dyn RoomRepository>,
    broadcaster: Arc<Broadcaster>,
    store: Arc<dyn ChatStore>,
    stats: Arc<ServerStats>,
    clock: Arc<dyn Clock>,
    /// `get_history` で件数が省略された時の件数
    history_limit: usize,
}

impl ChatRouter {
    pub fn new(
        connections: Arc<dyn ConnectionRepository>,
        rooms: Arc<dyn RoomRepository>,
        broadcaster: Arc<Broadcaster>,
        store: Arc<dyn ChatStore>,
        stats: Arc<ServerStats>,
        clock: Arc<dyn Clock>,
        history_limit: usize,
    ) -> Self {
        Self {
            connections,
            rooms,
            broadcaster,
            store,
            stats,
            clock,
            history_limit,
        }
    }

    /// 全体チャット（送信者を含む全接続に配信）
    pub async fn send_global(
        &self,
        sender: &ConnectionId,
        body: MessageBody,
    ) -> Result<ChatDispatchEnvelope, GlobalChatError> {
        let client = self
            .connections
            .get(sender)
            .await
            .ok_or_else(|| GlobalChatError::NotConnected(sender.clone()))?;

        let envelope = self.envelope(&client, ChatScope::Global, body);
        let delivered = self
            .broadcaster
            .to_all(&ServerEvent::ChatMessage {
                message: ChatMessageDto::from(&envelope),
            })
            .await;
        tracing::debug!(
            "Global message from '{}' delivered to {} connection(s)",
            client.identity,
            delivered
        );

        self.finish_delivery(&envelope).await;
        Ok(envelope)
    }

    /// ダイレクトメッセージ
    ///
    /// 宛先がオンラインなら宛先に `direct_message`、送信者に `direct_message_sent` を送る。
    /// オフラインなら何も配信・保存せず `TargetOffline` を返す。
    pub async fn send_direct(
        &self,
        sender: &ConnectionId,
        to: Identity,
        body: MessageBody,
    ) -> Result<ChatDispatchEnvelope, DirectMessageError> {
        let client = self
            .connections
            .get(sender)
            .await
            .ok_or_else(|| DirectMessageError::NotConnected(sender.clone()))?;
        let Some(target) = self.connections.find_by_identity(&to).await else {
            tracing::debug!("Direct message from '{}' to offline '{}'", client.identity, to);
            return Err(DirectMessageError::TargetOffline(to));
        };

        let envelope = self.envelope(&client, ChatScope::Direct { to }, body);
        let message = ChatMessageDto::from(&envelope);
        self.broadcaster
            .to_connection(
                &target.connection_id,
                &ServerEvent::DirectMessage {
                    message: message.clone(),
                },
            )
            .await;
        self.broadcaster
            .to_connection(sender, &ServerEvent::DirectMessageSent { message })
            .await;

        self.finish_delivery(&envelope).await;
        Ok(envelope)
    }

    /// フレンド申請の中継
    ///
    /// 宛先がオンラインなら宛先に `friend_request_received`、送信者に `friend_request_sent` を送る。
    /// 申請そのものは保存しない（保存は外部サービスの責務）。
    pub async fn send_friend_request(
        &self,
        sender: &ConnectionId,
        to: Identity,
    ) -> Result<(), FriendRequestError> {
        let client = self
            .connections
            .get(sender)
            .await
            .ok_or_else(|| FriendRequestError::NotConnected(sender.clone()))?;
        let Some(target) = self.connections.find_by_identity(&to).await else {
            tracing::debug!("Friend request from '{}' to offline '{}'", client.identity, to);
            return Err(FriendRequestError::TargetOffline(to));
        };

        self.broadcaster
            .to_connection(
                &target.connection_id,
                &ServerEvent::FriendRequestReceived {
                    from: client.identity.to_string(),
                    from_display_name: client.display_name.to_string(),
                    timestamp: timestamp_to_rfc3339(self.clock.now_millis()),
                },
            )
            .await;
        self.broadcaster
            .to_connection(sender, &ServerEvent::FriendRequestSent { to: to.to_string() })
            .await;

        tracing::info!("'{}' sent a friend request to '{}'", client.identity, to);
        Ok(())
    }

    /// ルームチャット（プレイヤーと観戦者の全員に配信）
    pub async fn send_to_room(
        &self,
        sender: &ConnectionId,
        room_id: RoomId,
        body: MessageBody,
    ) -> Result<ChatDispatchEnvelope, RoomChatError> {
        let client = self
            .connections
            .get(sender)
            .await
            .ok_or_else(|| RoomChatError::NotConnected(sender.clone()))?;
        if self.rooms.get(&room_id).await.is_none() {
            return Err(RoomChatError::RoomNotFound(room_id));
        }

        let envelope = self.envelope(
            &client,
            ChatScope::Room {
                room_id: room_id.clone(),
            },
            body,
        );
        let delivered = self
            .broadcaster
            .to_room(
                &room_id,
                &ServerEvent::RoomChat {
                    room_id: room_id.to_string(),
                    message: ChatMessageDto::from(&envelope),
                },
            )
            .await;
        tracing::debug!(
            "Room message from '{}' delivered to {} member(s) of '{}'",
            client.identity,
            delivered,
            room_id
        );

        self.finish_delivery(&envelope).await;
        Ok(envelope)
    }

    /// 外部ストアから最近の履歴を取得し `chat_history` として送る
    ///
    /// ストアが失敗した場合は空の履歴を送る。送った件数を返す。
    pub async fn send_history(
        &self,
        connection_id: &ConnectionId,
        identity: &Identity,
        limit: Option<usize>,
    ) -> usize {
        let limit = limit
            .unwrap_or(self.history_limit)
            .clamp(1, MAX_HISTORY_LIMIT);
        let messages = match self.store.recent_messages(identity, limit).await {
            Ok(history) => history,
            Err(e) => {
                tracing::warn!("Failed to load chat history for '{}': {}", identity, e);
                Vec::new()
            }
        };

        let count = messages.len();
        self.broadcaster
            .to_connection(
                connection_id,
                &ServerEvent::ChatHistory {
                    messages: messages.iter().map(ChatMessageDto::from).collect(),
                },
            )
            .await;
        count
    }

    fn envelope(
        &self,
        client: &ConnectedClient,
        scope: ChatScope,
        body: MessageBody,
    ) -> ChatDispatchEnvelope {
        ChatDispatchEnvelope::new(
            client.identity.clone(),
            client.display_name.clone(),
            scope,
            body,
            Timestamp::new(self.clock.now_millis()),
        )
    }

    async fn finish_delivery(&self, envelope: &ChatDispatchEnvelope) {
        self.stats.record_message();
        if let Err(e) = self.store.store_message(envelope).await {
            tracing::warn!(
                "Failed to persist {} message from '{}': {}",
                envelope.scope.kind(),
                envelope.sender,
                e
            );
        }
    }
}
