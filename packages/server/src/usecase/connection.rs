//! UseCase: 接続と切断
//!
//! ## 接続
//!
//! 1. Connection Registry に登録（同じアイデンティティが接続中なら拒否）
//! 2. MessagePusher に送信チャンネルを登録
//! 3. 本人に `connected` と `online_users`、他の全員に `user_online` を送り、履歴を送る
//!
//! ## 切断
//!
//! 切断処理は接続ごとに一度だけ、WebSocket ハンドラの終了時に呼ばれる。
//! 進行中の対戦を一時停止してからルームを外れ、最後に登録を消す。

use std::sync::Arc;

use rallyhub_shared::time::{Clock, timestamp_to_rfc3339};

use crate::{
    domain::{
        BoundIdentity, ConnectedClient, ConnectionId, ConnectionRepository, MessagePusher,
        PusherChannel, RepositoryError, Timestamp,
    },
    infrastructure::dto::websocket::{ServerEvent, UserDto},
};

use super::{
    broadcast::Broadcaster, chat_router::ChatRouter, error::ConnectError,
    game_engine::GameEngine, room_directory::RoomDirectory, status::GetStatusUseCase,
};

/// 接続・切断のユースケース
pub struct ConnectionService {
    connections: Arc<dyn ConnectionRepository>,
    message_pusher: Arc<dyn MessagePusher>,
    broadcaster: Arc<Broadcaster>,
    directory: Arc<RoomDirectory>,
    engine: Arc<GameEngine>,
    chat: Arc<ChatRouter>,
    status: Arc<GetStatusUseCase>,
    clock: Arc<dyn Clock>,
}

impl ConnectionService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        connections: Arc<dyn ConnectionRepository>,
        message_pusher: Arc<dyn MessagePusher>,
        broadcaster: Arc<Broadcaster>,
        directory: Arc<RoomDirectory>,
        engine: Arc<GameEngine>,
        chat: Arc<ChatRouter>,
        status: Arc<GetStatusUseCase>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            connections,
            message_pusher,
            broadcaster,
            directory,
            engine,
            chat,
            status,
            clock,
        }
    }

    /// 接続を登録する
    ///
    /// # Returns
    ///
    /// * `Ok(ConnectedClient)` - 登録された接続
    /// * `Err(ConnectError::DuplicateIdentity)` - 同じアイデンティティが接続中
    pub async fn connect(
        &self,
        connection_id: ConnectionId,
        bound: BoundIdentity,
        sender: PusherChannel,
    ) -> Result<ConnectedClient, ConnectError> {
        let client = ConnectedClient::new(
            connection_id.clone(),
            bound.identity,
            bound.display_name,
            Timestamp::new(self.clock.now_millis()),
        );

        self.connections
            .register(client.clone())
            .await
            .map_err(|e| match e {
                RepositoryError::DuplicateIdentity(identity) => {
                    ConnectError::DuplicateIdentity(identity)
                }
                other => ConnectError::Registry(other),
            })?;
        self.message_pusher
            .register_client(connection_id, sender)
            .await;

        tracing::info!(
            "'{}' connected as '{}' ({})",
            client.connection_id,
            client.identity,
            client.display_name
        );
        Ok(client)
    }

    /// 接続直後の通知（welcome、オンライン一覧、参加通知、履歴）
    pub async fn announce(&self, client: &ConnectedClient, is_guest: bool) {
        let connection_id = &client.connection_id;
        let stats = self.status.execute().await;
        self.broadcaster
            .to_connection(
                connection_id,
                &ServerEvent::Connected {
                    connection_id: connection_id.to_string(),
                    identity: client.identity.to_string(),
                    display_name: client.display_name.to_string(),
                    is_guest,
                    server_time: timestamp_to_rfc3339(self.clock.now_millis()),
                    stats: stats.into(),
                },
            )
            .await;
        self.send_online_users(connection_id).await;
        self.broadcaster
            .to_all_except(
                connection_id,
                &ServerEvent::UserOnline {
                    user: UserDto::from(client),
                },
            )
            .await;
        self.chat
            .send_history(connection_id, &client.identity, None)
            .await;
    }

    /// 接続中のユーザー一覧を送る
    pub async fn send_online_users(&self, connection_id: &ConnectionId) {
        let users = self
            .connections
            .list()
            .await
            .iter()
            .map(UserDto::from)
            .collect();
        self.broadcaster
            .to_connection(connection_id, &ServerEvent::OnlineUsers { users })
            .await;
    }

    /// 切断処理
    ///
    /// 1. 送信チャンネルを外す
    /// 2. 参加中の対戦を一時停止
    /// 3. ルームから退出
    /// 4. 登録を削除し、他の全員に `user_offline` を送る
    pub async fn disconnect(&self, connection_id: &ConnectionId) {
        self.message_pusher.unregister_client(connection_id).await;

        let Some(client) = self.connections.get(connection_id).await else {
            tracing::debug!("'{}' already removed", connection_id);
            return;
        };

        self.engine.handle_disconnect(&client.identity).await;
        self.directory.remove_by_connection(connection_id).await;
        self.connections.unregister(connection_id).await;

        self.broadcaster
            .to_all(&ServerEvent::UserOffline {
                identity: client.identity.to_string(),
                display_name: client.display_name.to_string(),
            })
            .await;
        tracing::info!("'{}' ({}) disconnected", client.identity, connection_id);
    }
}
