//! HTTP API endpoint handlers. All of them are read-only.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::{
    domain::{GameId, RoomId},
    infrastructure::dto::{
        http::{RoomDetailDto, RoomSummaryDto, StatusDto},
        websocket::GameSnapshotDto,
    },
    ui::state::AppState,
};

/// Health check endpoint
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Aggregate counters of the relay
pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<StatusDto> {
    let status = state.get_status_usecase.execute().await;
    Json(status.into())
}

/// Get list of rooms
pub async fn get_rooms(State(state): State<Arc<AppState>>) -> Json<Vec<RoomSummaryDto>> {
    let rooms = state.get_rooms_usecase.execute().await;
    Json(rooms.iter().map(RoomSummaryDto::from).collect())
}

/// Get room detail by ID
pub async fn get_room_detail(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<String>,
) -> Result<Json<RoomDetailDto>, StatusCode> {
    let room_id = RoomId::new(room_id).map_err(|_| StatusCode::NOT_FOUND)?;
    match state.get_room_detail_usecase.execute(&room_id).await {
        Some(room) => Ok(Json(RoomDetailDto::from(&room))),
        None => Err(StatusCode::NOT_FOUND),
    }
}

/// Get the current snapshot of a game session
pub async fn get_game(
    State(state): State<Arc<AppState>>,
    Path(game_id): Path<String>,
) -> Result<Json<GameSnapshotDto>, StatusCode> {
    let game_id = GameId::new(game_id).map_err(|_| StatusCode::NOT_FOUND)?;
    state
        .get_game_usecase
        .execute(&game_id)
        .await
        .map(|session| Json(GameSnapshotDto::from(&session)))
        .ok_or(StatusCode::NOT_FOUND)
}
