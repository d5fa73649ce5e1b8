//! UseCase: ルーム・ゲームの参照（HTTP API 用、読み取りのみ）

use std::sync::Arc;

use crate::domain::{GameId, GameSession, Room, RoomId, RoomRepository};

use super::game_engine::GameEngine;

/// ルーム一覧取得のユースケース
pub struct GetRoomsUseCase {
    rooms: Arc<dyn RoomRepository>,
}

impl GetRoomsUseCase {
    pub fn new(rooms: Arc<dyn RoomRepository>) -> Self {
        Self { rooms }
    }

    /// 作成日時順のルーム一覧
    pub async fn execute(&self) -> Vec<Room> {
        self.rooms.list().await
    }
}

/// ルーム詳細取得のユースケース
pub struct GetRoomDetailUseCase {
    rooms: Arc<dyn RoomRepository>,
}

impl GetRoomDetailUseCase {
    pub fn new(rooms: Arc<dyn RoomRepository>) -> Self {
        Self { rooms }
    }

    pub async fn execute(&self, room_id: &RoomId) -> Option<Room> {
        self.rooms.get(room_id).await
    }
}

/// ゲームのスナップショット取得のユースケース
pub struct GetGameUseCase {
    engine: Arc<GameEngine>,
}

impl GetGameUseCase {
    pub fn new(engine: Arc<GameEngine>) -> Self {
        Self { engine }
    }

    /// 存在しない、または猶予期間を過ぎて破棄されたゲームは `None`
    pub async fn execute(&self, game_id: &GameId) -> Option<GameSession> {
        self.engine.snapshot(game_id).await
    }
}
