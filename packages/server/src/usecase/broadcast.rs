//! UseCase: Broadcast Dispatcher
//!
//! 全てのコンポーネントが使う配信の基本操作。
//!
//! - `to_connection`: 単一の接続
//! - `to_room`: ルームの全メンバー（プレイヤーと観戦者）
//! - `to_all`: 接続中の全クライアント
//!
//! 配信は fire-and-forget で、確認応答や再送は行わない。配信前に切断された
//! 接続は黙ってスキップされる。

use std::sync::Arc;

use crate::{
    domain::{ConnectionId, ConnectionRepository, MessagePusher, RoomId, RoomRepository},
    infrastructure::dto::websocket::ServerEvent,
};

/// 配信のユースケース
pub struct Broadcaster {
    connections: Arc<dyn ConnectionRepository>,
    rooms: Arc<dyn RoomRepository>,
    message_pusher: Arc<dyn MessagePusher>,
}

impl Broadcaster {
    pub fn new(
        connections: Arc<dyn ConnectionRepository>,
        rooms: Arc<dyn RoomRepository>,
        message_pusher: Arc<dyn MessagePusher>,
    ) -> Self {
        Self {
            connections,
            rooms,
            message_pusher,
        }
    }

    fn encode(event: &ServerEvent) -> Option<String> {
        match serde_json::to_string(event) {
            Ok(json) => Some(json),
            Err(e) => {
                tracing::error!("Failed to serialize outbound event: {}", e);
                None
            }
        }
    }

    /// 単一の接続に配信。送れなかった場合は `false`
    pub async fn to_connection(&self, connection_id: &ConnectionId, event: &ServerEvent) -> bool {
        let Some(json) = Self::encode(event) else {
            return false;
        };
        match self.message_pusher.push_to(connection_id, &json).await {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!("Skipped delivery to '{}': {}", connection_id, e);
                false
            }
        }
    }

    /// 指定した接続群に配信し、配信できた数を返す
    pub async fn to_connections(&self, targets: &[ConnectionId], event: &ServerEvent) -> usize {
        if targets.is_empty() {
            return 0;
        }
        match Self::encode(event) {
            Some(json) => self.message_pusher.broadcast(targets, &json).await,
            None => 0,
        }
    }

    /// ルームの全メンバーに配信。存在しないルームは 0 件
    pub async fn to_room(&self, room_id: &RoomId, event: &ServerEvent) -> usize {
        let targets = self.rooms.member_ids(room_id).await;
        self.to_connections(&targets, event).await
    }

    /// 接続中の全クライアントに配信
    pub async fn to_all(&self, event: &ServerEvent) -> usize {
        let targets = self.connections.all_ids().await;
        self.to_connections(&targets, event).await
    }

    /// 指定した接続以外の全クライアントに配信
    pub async fn to_all_except(&self, excluded: &ConnectionId, event: &ServerEvent) -> usize {
        let targets: Vec<ConnectionId> = self
            .connections
            .all_ids()
            .await
            .into_iter()
            .filter(|id| id != excluded)
            .collect();
        self.to_connections(&targets, event).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{ConnectedClient, DisplayName, Identity, RoomKind, RoomMember, Timestamp},
        infrastructure::{
            message_pusher::WebSocketMessagePusher,
            repository::{InMemoryConnectionRepository, InMemoryRoomRepository},
        },
    };
    use tokio::sync::mpsc;

    struct Fixture {
        broadcaster: Broadcaster,
        connections: Arc<InMemoryConnectionRepository>,
        rooms: Arc<InMemoryRoomRepository>,
        pusher: Arc<WebSocketMessagePusher>,
    }

    fn fixture() -> Fixture {
        let connections = Arc::new(InMemoryConnectionRepository::new());
        let rooms = Arc::new(InMemoryRoomRepository::new());
        let pusher = Arc::new(WebSocketMessagePusher::default());
        Fixture {
            broadcaster: Broadcaster::new(connections.clone(), rooms.clone(), pusher.clone()),
            connections,
            rooms,
            pusher,
        }
    }

    async fn connect(f: &Fixture, name: &str) -> mpsc::UnboundedReceiver<String> {
        let id = ConnectionId::new(format!("conn-{}", name)).unwrap();
        let (tx, rx) = mpsc::unbounded_channel();
        f.connections
            .register(ConnectedClient::new(
                id.clone(),
                Identity::new(name.to_string()).unwrap(),
                DisplayName::new(name.to_string()).unwrap(),
                Timestamp::new(0),
            ))
            .await
            .unwrap();
        f.pusher.register_client(id, tx).await;
        rx
    }

    fn pong() -> ServerEvent {
        ServerEvent::Pong {
            timestamp: None,
            server_time: 1,
        }
    }

    #[tokio::test]
    async fn test_to_all_reaches_every_connection() {
        // テスト項目: 全体配信は全ての接続に届く
        // given (前提条件):
        let f = fixture();
        let mut alice = connect(&f, "alice").await;
        let mut bob = connect(&f, "bob").await;

        // when (操作):
        let delivered = f.broadcaster.to_all(&pong()).await;

        // then (期待する結果):
        assert_eq!(delivered, 2);
        assert!(alice.recv().await.unwrap().contains("\"type\":\"pong\""));
        assert!(bob.recv().await.unwrap().contains("\"type\":\"pong\""));
    }

    #[tokio::test]
    async fn test_to_room_only_reaches_members() {
        // テスト項目: ルーム配信はメンバーにだけ届く
        // given (前提条件):
        let f = fixture();
        let mut alice = connect(&f, "alice").await;
        let mut bob = connect(&f, "bob").await;
        let room_id = RoomId::new("r1".to_string()).unwrap();
        f.rooms
            .join(
                &room_id,
                RoomKind::Chat,
                RoomMember::new(
                    ConnectionId::new("conn-alice".to_string()).unwrap(),
                    Identity::new("alice".to_string()).unwrap(),
                    DisplayName::new("alice".to_string()).unwrap(),
                    Timestamp::new(0),
                ),
            )
            .await
            .unwrap();

        // when (操作):
        let delivered = f.broadcaster.to_room(&room_id, &pong()).await;

        // then (期待する結果):
        assert_eq!(delivered, 1);
        assert!(alice.recv().await.is_some());
        assert!(bob.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_disconnected_target_is_skipped_silently() {
        // テスト項目: 切断済みの接続への配信はエラーにならずスキップされる
        // given (前提条件):
        let f = fixture();
        let alice = connect(&f, "alice").await;
        drop(alice);

        // when (操作):
        let sent = f
            .broadcaster
            .to_connection(&ConnectionId::new("conn-alice".to_string()).unwrap(), &pong())
            .await;
        let unknown_room = f
            .broadcaster
            .to_room(&RoomId::new("nowhere".to_string()).unwrap(), &pong())
            .await;

        // then (期待する結果):
        assert!(!sent);
        assert_eq!(unknown_room, 0);
    }

    #[tokio::test]
    async fn test_to_all_except_skips_origin() {
        // テスト項目: 送信元を除いた全員に配信される
        // given (前提条件):
        let f = fixture();
        let mut alice = connect(&f, "alice").await;
        let mut bob = connect(&f, "bob").await;

        // when (操作):
        let delivered = f
            .broadcaster
            .to_all_except(&ConnectionId::new("conn-alice".to_string()).unwrap(), &pong())
            .await;

        // then (期待する結果):
        assert_eq!(delivered, 1);
        assert!(alice.try_recv().is_err());
        assert!(bob.recv().await.is_some());
    }
}
