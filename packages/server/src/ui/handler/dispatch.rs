//! Inbound event dispatch table.
//!
//! Every text frame is parsed into a [`ClientEvent`] and routed to the
//! component that owns it. Malformed frames are dropped without a reply;
//! not-found conditions are answered with an `error` notice to the sender.

use rallyhub_shared::time::Clock;

use crate::{
    domain::{
        ConnectedClient, GameError, GameId, GameSettings, Identity, MessageBody, RoomId,
        ValueObjectError,
    },
    infrastructure::dto::websocket::{ClientEvent, ServerEvent},
    ui::state::AppState,
    usecase::{
        DirectMessageError, FriendRequestError, GameActionError, GlobalChatError, JoinGameError,
        RoomChatError, RoomJoinError, ServerStatsError,
    },
};

/// Why an inbound event produced no effect.
#[derive(Debug)]
enum Rejection {
    /// Malformed or ineffective; dropped with a debug log.
    Dropped(String),
    /// Reported to the sender as an `error` event.
    Notice { code: &'static str, message: String },
}

impl From<ValueObjectError> for Rejection {
    fn from(e: ValueObjectError) -> Self {
        Rejection::Dropped(e.to_string())
    }
}

impl From<RoomJoinError> for Rejection {
    fn from(e: RoomJoinError) -> Self {
        Rejection::Dropped(e.to_string())
    }
}

impl From<JoinGameError> for Rejection {
    fn from(e: JoinGameError) -> Self {
        match e {
            JoinGameError::NotFound(game_id) => Rejection::Notice {
                code: "game_not_found",
                message: format!("game '{}' not found", game_id),
            },
            JoinGameError::Join(e) => e.into(),
        }
    }
}

impl From<GameActionError> for Rejection {
    fn from(e: GameActionError) -> Self {
        match e {
            GameActionError::NotFound(game_id)
            | GameActionError::Rejected(GameError::NotFound(game_id)) => Rejection::Notice {
                code: "game_not_found",
                message: format!("game '{}' not found", game_id),
            },
            // input from non-participants and to inactive games is a no-op
            GameActionError::Rejected(e) => Rejection::Dropped(e.to_string()),
        }
    }
}

impl From<GlobalChatError> for Rejection {
    fn from(e: GlobalChatError) -> Self {
        Rejection::Dropped(e.to_string())
    }
}

impl From<DirectMessageError> for Rejection {
    fn from(e: DirectMessageError) -> Self {
        match e {
            DirectMessageError::TargetOffline(identity) => Rejection::Notice {
                code: "target_offline",
                message: format!("'{}' is offline", identity),
            },
            other => Rejection::Dropped(other.to_string()),
        }
    }
}

impl From<FriendRequestError> for Rejection {
    fn from(e: FriendRequestError) -> Self {
        match e {
            FriendRequestError::TargetOffline(identity) => Rejection::Notice {
                code: "target_offline",
                message: format!("'{}' is offline", identity),
            },
            other => Rejection::Dropped(other.to_string()),
        }
    }
}

impl From<ServerStatsError> for Rejection {
    fn from(e: ServerStatsError) -> Self {
        // stats requests from non-admins are ignored
        Rejection::Dropped(e.to_string())
    }
}

impl From<RoomChatError> for Rejection {
    fn from(e: RoomChatError) -> Self {
        match e {
            RoomChatError::RoomNotFound(room_id) => Rejection::Notice {
                code: "room_not_found",
                message: format!("room '{}' not found", room_id),
            },
            other => Rejection::Dropped(other.to_string()),
        }
    }
}

/// Handle one text frame from `client`.
pub async fn dispatch(state: &AppState, client: &ConnectedClient, text: &str) {
    let event = match serde_json::from_str::<ClientEvent>(text) {
        Ok(event) => event,
        Err(e) => {
            tracing::debug!("Dropped malformed frame from '{}': {}", client.identity, e);
            return;
        }
    };

    match handle(state, client, event).await {
        Ok(()) => {}
        Err(Rejection::Dropped(reason)) => {
            tracing::debug!("Dropped event from '{}': {}", client.identity, reason);
        }
        Err(Rejection::Notice { code, message }) => {
            tracing::debug!("Notice '{}' to '{}': {}", code, client.identity, message);
            state
                .broadcaster
                .to_connection(&client.connection_id, &ServerEvent::error(code, message))
                .await;
        }
    }
}

async fn handle(
    state: &AppState,
    client: &ConnectedClient,
    event: ClientEvent,
) -> Result<(), Rejection> {
    let connection_id = &client.connection_id;

    match event {
        ClientEvent::JoinRoom { room_id, kind } => {
            let room_id = RoomId::new(room_id)?;
            state
                .room_directory
                .join(connection_id, &room_id, kind.unwrap_or_default())
                .await?;
        }
        ClientEvent::LeaveRoom => {
            state.room_directory.leave(connection_id).await;
        }
        ClientEvent::CreateGame { settings } => {
            let settings: GameSettings = settings.map(Into::into).unwrap_or_default();
            state
                .room_directory
                .create_game(connection_id, settings)
                .await?;
        }
        ClientEvent::JoinGame { game_id } => {
            let game_id = GameId::new(game_id)?;
            state.room_directory.join_game(connection_id, &game_id).await?;
        }
        ClientEvent::GameAction {
            game_id,
            action,
            value,
        } => {
            let game_id = GameId::new(game_id)?;
            state
                .game_engine
                .apply_paddle_input(
                    &game_id,
                    &client.identity,
                    action.into(),
                    value.unwrap_or(1.0),
                )
                .await?;
        }
        ClientEvent::ChatMessage { body } => {
            let body = MessageBody::new(body)?;
            state.chat_router.send_global(connection_id, body).await?;
        }
        ClientEvent::DirectMessage { to, body } => {
            let to = Identity::new(to)?;
            let body = MessageBody::new(body)?;
            state.chat_router.send_direct(connection_id, to, body).await?;
        }
        ClientEvent::RoomChat { room_id, body } => {
            let room_id = RoomId::new(room_id)?;
            let body = MessageBody::new(body)?;
            state
                .chat_router
                .send_to_room(connection_id, room_id, body)
                .await?;
        }
        ClientEvent::SendFriendRequest { to_user_id } => {
            let to = Identity::new(to_user_id)?;
            state.chat_router.send_friend_request(connection_id, to).await?;
        }
        ClientEvent::GetServerStats => {
            state.get_server_stats_usecase.execute(connection_id).await?;
        }
        ClientEvent::GetOnlineUsers => {
            state
                .connection_service
                .send_online_users(connection_id)
                .await;
        }
        ClientEvent::GetHistory { limit } => {
            state
                .chat_router
                .send_history(connection_id, &client.identity, limit)
                .await;
        }
        ClientEvent::Ping { timestamp } => {
            state
                .broadcaster
                .to_connection(
                    connection_id,
                    &ServerEvent::Pong {
                        timestamp,
                        server_time: state.clock.now_millis(),
                    },
                )
                .await;
        }
    }

    Ok(())
}
