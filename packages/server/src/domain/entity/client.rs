//! ConnectedClient entity: presence record of one live connection.

use serde::Serialize;

use crate::domain::value_object::{ConnectionId, DisplayName, Identity, Role, RoomId, Timestamp};

/// Presence record owned by the connection registry.
///
/// `current_room` is set exactly while the connection is listed as a player or
/// spectator of that room.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectedClient {
    pub connection_id: ConnectionId,
    pub identity: Identity,
    pub display_name: DisplayName,
    pub connected_at: Timestamp,
    pub current_room: Option<RoomId>,
    pub is_playing: bool,
}

impl ConnectedClient {
    pub fn new(
        connection_id: ConnectionId,
        identity: Identity,
        display_name: DisplayName,
        connected_at: Timestamp,
    ) -> Self {
        Self {
            connection_id,
            identity,
            display_name,
            connected_at,
            current_room: None,
            is_playing: false,
        }
    }

    /// Record the room this client now belongs to.
    pub fn enter_room(&mut self, room_id: RoomId, role: Role) {
        self.current_room = Some(room_id);
        self.is_playing = role == Role::Player;
    }

    /// Clear room membership. Returns the room that was left, if any.
    pub fn leave_room(&mut self) -> Option<RoomId> {
        self.is_playing = false;
        self.current_room.take()
    }
}
