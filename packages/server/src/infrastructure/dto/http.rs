//! HTTP API response DTOs.

use serde::Serialize;

use crate::domain::{Role, RoomKind};

/// Aggregate counters exposed by `/api/status` and in the `connected` welcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusDto {
    pub connected_clients: usize,
    pub active_sessions: usize,
    pub rooms: usize,
    pub message_count: u64,
    pub uptime_seconds: u64,
    pub started_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummaryDto {
    pub id: String,
    pub kind: RoomKind,
    pub player_count: usize,
    pub spectator_count: usize,
    pub associated_session: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomDetailDto {
    pub id: String,
    pub kind: RoomKind,
    pub members: Vec<RoomMemberDetailDto>,
    pub associated_session: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomMemberDetailDto {
    pub identity: String,
    pub display_name: String,
    pub role: Role,
    pub joined_at: String,
}
