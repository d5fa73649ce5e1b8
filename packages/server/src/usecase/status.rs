//! UseCase: サーバー状態の取得
//!
//! `/api/status` と接続時の `connected` イベントが使う集計値を返す。

use std::sync::Arc;

use rallyhub_shared::time::timestamp_to_rfc3339;

use crate::{
    domain::{ConnectionRepository, RoomRepository, Timestamp},
    infrastructure::dto::http::StatusDto,
};

use super::{game_engine::GameEngine, stats::ServerStats};

/// サーバー全体の集計値
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerStatus {
    pub connected_clients: usize,
    pub active_sessions: usize,
    pub rooms: usize,
    pub message_count: u64,
    pub uptime_seconds: u64,
    pub started_at: Timestamp,
}

impl From<ServerStatus> for StatusDto {
    fn from(status: ServerStatus) -> Self {
        Self {
            connected_clients: status.connected_clients,
            active_sessions: status.active_sessions,
            rooms: status.rooms,
            message_count: status.message_count,
            uptime_seconds: status.uptime_seconds,
            started_at: timestamp_to_rfc3339(status.started_at.value()),
        }
    }
}

/// サーバー状態取得のユースケース
pub struct GetStatusUseCase {
    connections: Arc<dyn ConnectionRepository>,
    rooms: Arc<dyn RoomRepository>,
    engine: Arc<GameEngine>,
    stats: Arc<ServerStats>,
}

impl GetStatusUseCase {
    pub fn new(
        connections: Arc<dyn ConnectionRepository>,
        rooms: Arc<dyn RoomRepository>,
        engine: Arc<GameEngine>,
        stats: Arc<ServerStats>,
    ) -> Self {
        Self {
            connections,
            rooms,
            engine,
            stats,
        }
    }

    /// 現在の集計値を取得（読み取りのみ）
    pub async fn execute(&self) -> ServerStatus {
        ServerStatus {
            connected_clients: self.connections.count().await,
            active_sessions: self.engine.active_count().await,
            rooms: self.rooms.count().await,
            message_count: self.stats.message_count(),
            uptime_seconds: self.stats.uptime_seconds(),
            started_at: self.stats.started_at(),
        }
    }
}
