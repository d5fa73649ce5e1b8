//! WebSocket message DTOs.
//!
//! Every frame is a JSON object whose `type` field names the event
//! (snake_case); payload fields are camelCase.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{Ball, Field, GameSettings, GameStatus, Paddles, Role, RoomKind, Side};

use super::http::StatusDto;

// ========================================
// Client → Server
// ========================================

/// Events accepted from a connection.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ClientEvent {
    JoinRoom {
        room_id: String,
        #[serde(default)]
        kind: Option<RoomKind>,
    },
    LeaveRoom,
    CreateGame {
        #[serde(default)]
        settings: Option<GameSettingsDto>,
    },
    JoinGame {
        game_id: String,
    },
    GameAction {
        game_id: String,
        action: GameActionKind,
        #[serde(default)]
        value: Option<f64>,
    },
    ChatMessage {
        body: String,
    },
    DirectMessage {
        to: String,
        body: String,
    },
    RoomChat {
        room_id: String,
        body: String,
    },
    SendFriendRequest {
        to_user_id: String,
    },
    GetOnlineUsers,
    GetServerStats,
    GetHistory {
        #[serde(default)]
        limit: Option<usize>,
    },
    Ping {
        #[serde(default)]
        timestamp: Option<Value>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameActionKind {
    PaddleUp,
    PaddleDown,
}

/// Optional match settings supplied with `create_game`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSettingsDto {
    pub max_score: Option<u32>,
    pub paddle_speed: Option<f64>,
    pub ball_speed: Option<f64>,
}

// ========================================
// Server → Client
// ========================================

/// Events pushed to connections.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    Connected {
        connection_id: String,
        identity: String,
        display_name: String,
        is_guest: bool,
        server_time: String,
        stats: StatusDto,
    },
    UserOnline {
        user: UserDto,
    },
    UserOffline {
        identity: String,
        display_name: String,
    },
    OnlineUsers {
        users: Vec<UserDto>,
    },
    RoomJoined {
        room: RoomSnapshotDto,
        role: Role,
        side: Option<Side>,
    },
    RoomLeft {
        room_id: String,
    },
    RoomUpdate {
        room: RoomSnapshotDto,
    },
    GameCreated {
        game_id: String,
        settings: GameSettings,
    },
    GameJoined {
        game_id: String,
        role: Role,
        side: Option<Side>,
        game: GameSnapshotDto,
    },
    GameStarted {
        game_id: String,
        resumed: bool,
        game: GameSnapshotDto,
    },
    GameStateUpdate {
        game_id: String,
        status: GameStatus,
        ball: Ball,
        paddles: Paddles,
        timestamp: i64,
    },
    GamePaused {
        game_id: String,
        identity: String,
        display_name: String,
    },
    GameFinished {
        game_id: String,
        winner_side: Side,
        winner: Option<String>,
        score: ScoreDto,
        game: GameSnapshotDto,
    },
    ChatMessage {
        message: ChatMessageDto,
    },
    DirectMessage {
        message: ChatMessageDto,
    },
    DirectMessageSent {
        message: ChatMessageDto,
    },
    RoomChat {
        room_id: String,
        message: ChatMessageDto,
    },
    ChatHistory {
        messages: Vec<ChatMessageDto>,
    },
    FriendRequestReceived {
        from: String,
        from_display_name: String,
        timestamp: String,
    },
    FriendRequestSent {
        to: String,
    },
    ServerStats {
        stats: StatusDto,
        games: Vec<GameSnapshotDto>,
        rooms: Vec<RoomSnapshotDto>,
        users: Vec<UserDto>,
    },
    Pong {
        timestamp: Option<Value>,
        server_time: i64,
    },
    Error {
        code: String,
        message: String,
    },
}

impl ServerEvent {
    /// Notice sent to the originating connection of a failed request.
    pub fn error(code: &str, message: impl Into<String>) -> Self {
        ServerEvent::Error {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    pub identity: String,
    pub display_name: String,
    pub connected_at: String,
    pub current_room: Option<String>,
    pub is_playing: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomMemberDto {
    pub identity: String,
    pub display_name: String,
    pub joined_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSnapshotDto {
    pub id: String,
    pub kind: RoomKind,
    pub players: Vec<RoomMemberDto>,
    pub spectators: Vec<RoomMemberDto>,
    pub associated_session: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScoreDto {
    pub left: u32,
    pub right: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GamePlayerDto {
    pub identity: String,
    pub display_name: String,
    pub side: Side,
    pub connected: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSnapshotDto {
    pub id: String,
    pub status: GameStatus,
    pub host: String,
    pub settings: GameSettings,
    pub players: Vec<GamePlayerDto>,
    pub ball: Ball,
    pub paddles: Paddles,
    pub field: Field,
    pub score: ScoreDto,
    pub winner: Option<Side>,
    pub paused_by: Option<String>,
    pub created_at: String,
    pub started_at: Option<String>,
    pub finished_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessageDto {
    pub id: String,
    pub from: String,
    pub from_display_name: String,
    pub scope: String,
    pub target: Option<String>,
    pub body: String,
    pub sent_at: i64,
    pub timestamp: String,
}
