//! Room entity: a named grouping of connections with player/spectator membership.

use serde::Serialize;

use crate::domain::{
    error::RoomError,
    value_object::{ConnectionId, DisplayName, GameId, Identity, Role, RoomId, RoomKind, Timestamp},
};

/// Maximum number of players seated in a `game` room.
pub const MAX_GAME_PLAYERS: usize = 2;

/// One member of a room.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomMember {
    pub connection_id: ConnectionId,
    pub identity: Identity,
    pub display_name: DisplayName,
    pub joined_at: Timestamp,
}

impl RoomMember {
    pub fn new(
        connection_id: ConnectionId,
        identity: Identity,
        display_name: DisplayName,
        joined_at: Timestamp,
    ) -> Self {
        Self {
            connection_id,
            identity,
            display_name,
            joined_at,
        }
    }
}

/// Room aggregate.
///
/// Players keep join order (the first seated player is the left paddle).
/// Only `game` rooms seat players; lobby and chat members are all listed as
/// spectators.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: RoomId,
    pub kind: RoomKind,
    pub players: Vec<RoomMember>,
    pub spectators: Vec<RoomMember>,
    pub created_at: Timestamp,
    pub associated_session: Option<GameId>,
}

impl Room {
    pub fn new(id: RoomId, kind: RoomKind, created_at: Timestamp) -> Self {
        Self {
            id,
            kind,
            players: Vec::new(),
            spectators: Vec::new(),
            created_at,
            associated_session: None,
        }
    }

    /// Add a member and return the role it was given.
    ///
    /// A full game room never rejects a joiner: the joiner becomes a spectator.
    pub fn join(&mut self, member: RoomMember) -> Result<Role, RoomError> {
        if self.contains(&member.connection_id) {
            return Err(RoomError::AlreadyMember(self.id.clone()));
        }

        if self.kind == RoomKind::Game && self.players.len() < MAX_GAME_PLAYERS {
            self.players.push(member);
            Ok(Role::Player)
        } else {
            self.spectators.push(member);
            Ok(Role::Spectator)
        }
    }

    /// Remove a member from whichever list holds it.
    pub fn remove(&mut self, connection_id: &ConnectionId) -> Option<Role> {
        if let Some(pos) = self
            .players
            .iter()
            .position(|m| &m.connection_id == connection_id)
        {
            self.players.remove(pos);
            return Some(Role::Player);
        }
        if let Some(pos) = self
            .spectators
            .iter()
            .position(|m| &m.connection_id == connection_id)
        {
            self.spectators.remove(pos);
            return Some(Role::Spectator);
        }
        None
    }

    /// Move a seated player to the spectator list.
    ///
    /// Returns `false` when the connection is not a player of this room.
    pub fn demote_to_spectator(&mut self, connection_id: &ConnectionId) -> bool {
        match self
            .players
            .iter()
            .position(|m| &m.connection_id == connection_id)
        {
            Some(pos) => {
                let member = self.players.remove(pos);
                self.spectators.push(member);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, connection_id: &ConnectionId) -> bool {
        self.members().any(|m| &m.connection_id == connection_id)
    }

    pub fn role_of(&self, connection_id: &ConnectionId) -> Option<Role> {
        if self.players.iter().any(|m| &m.connection_id == connection_id) {
            Some(Role::Player)
        } else if self
            .spectators
            .iter()
            .any(|m| &m.connection_id == connection_id)
        {
            Some(Role::Spectator)
        } else {
            None
        }
    }

    /// Players first, then spectators.
    pub fn members(&self) -> impl Iterator<Item = &RoomMember> {
        self.players.iter().chain(self.spectators.iter())
    }

    pub fn member_connection_ids(&self) -> Vec<ConnectionId> {
        self.members().map(|m| m.connection_id.clone()).collect()
    }

    pub fn member_count(&self) -> usize {
        self.players.len() + self.spectators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty() && self.spectators.is_empty()
    }
}
