//! UseCase: 管理者向けのサーバー統計
//!
//! 集計値に加えて、進行中のゲーム・ルーム・接続ユーザーの一覧を
//! WebSocket で返す。管理者として設定されたアイデンティティだけが取得できる。

use std::{collections::HashSet, sync::Arc};

use crate::{
    domain::{ConnectionId, ConnectionRepository, Identity, RoomRepository},
    infrastructure::dto::websocket::{GameSnapshotDto, RoomSnapshotDto, ServerEvent, UserDto},
};

use super::{
    broadcast::Broadcaster, error::ServerStatsError, game_engine::GameEngine,
    status::GetStatusUseCase,
};

/// 管理者向け統計取得のユースケース
pub struct GetServerStatsUseCase {
    connections: Arc<dyn ConnectionRepository>,
    rooms: Arc<dyn RoomRepository>,
    engine: Arc<GameEngine>,
    status: Arc<GetStatusUseCase>,
    broadcaster: Arc<Broadcaster>,
    admins: HashSet<Identity>,
}

impl GetServerStatsUseCase {
    pub fn new(
        connections: Arc<dyn ConnectionRepository>,
        rooms: Arc<dyn RoomRepository>,
        engine: Arc<GameEngine>,
        status: Arc<GetStatusUseCase>,
        broadcaster: Arc<Broadcaster>,
        admins: impl IntoIterator<Item = Identity>,
    ) -> Self {
        Self {
            connections,
            rooms,
            engine,
            status,
            broadcaster,
            admins: admins.into_iter().collect(),
        }
    }

    pub fn is_admin(&self, identity: &Identity) -> bool {
        self.admins.contains(identity)
    }

    /// 要求した接続に `server_stats` を送る
    ///
    /// # Returns
    ///
    /// * `Ok(())` - 送信した
    /// * `Err(ServerStatsError::NotAdmin)` - 管理者ではない（何も送らない）
    pub async fn execute(&self, connection_id: &ConnectionId) -> Result<(), ServerStatsError> {
        let client = self
            .connections
            .get(connection_id)
            .await
            .ok_or_else(|| ServerStatsError::NotConnected(connection_id.clone()))?;
        if !self.is_admin(&client.identity) {
            return Err(ServerStatsError::NotAdmin(client.identity));
        }

        let stats = self.status.execute().await;
        let games = self
            .engine
            .snapshots()
            .await
            .iter()
            .map(GameSnapshotDto::from)
            .collect();
        let rooms = self
            .rooms
            .list()
            .await
            .iter()
            .map(RoomSnapshotDto::from)
            .collect();
        let users = self
            .connections
            .list()
            .await
            .iter()
            .map(UserDto::from)
            .collect();

        self.broadcaster
            .to_connection(
                connection_id,
                &ServerEvent::ServerStats {
                    stats: stats.into(),
                    games,
                    rooms,
                    users,
                },
            )
            .await;
        tracing::info!("Server stats sent to '{}'", client.identity);
        Ok(())
    }
}
