//! Repository traits.
//!
//! The core only talks to these traits; storage lives in the infrastructure
//! layer (dependency inversion). Every method is a single atomic step: callers
//! never hold a lock across two calls.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{
    entity::{ConnectedClient, GameSession, Room, RoomMember},
    error::{RepositoryError, RoomError},
    value_object::{ConnectionId, GameId, Identity, Role, RoomId, RoomKind},
};

/// A session shared between the engine's tick loop and event handlers.
pub type SharedGameSession = Arc<Mutex<GameSession>>;

/// Connection Registry storage.
#[async_trait]
pub trait ConnectionRepository: Send + Sync {
    /// Add a live connection. Fails if its identity is already connected.
    async fn register(&self, client: ConnectedClient) -> Result<(), RepositoryError>;

    /// Remove a connection and return its last record.
    async fn unregister(&self, connection_id: &ConnectionId) -> Option<ConnectedClient>;

    async fn get(&self, connection_id: &ConnectionId) -> Option<ConnectedClient>;

    async fn find_by_identity(&self, identity: &Identity) -> Option<ConnectedClient>;

    /// Update the room membership recorded for a connection.
    ///
    /// Returns `false` if the connection is unknown.
    async fn set_room(&self, connection_id: &ConnectionId, room: Option<(RoomId, Role)>) -> bool;

    /// All connections, oldest first.
    async fn list(&self) -> Vec<ConnectedClient>;

    async fn all_ids(&self) -> Vec<ConnectionId>;

    async fn count(&self) -> usize;
}

/// Outcome of removing a member from a room.
#[derive(Debug, Clone, PartialEq)]
pub struct RoomDeparture {
    pub role: Role,
    pub kind: RoomKind,
    /// Remaining room, or `None` when the room became empty and was deleted.
    pub room: Option<Room>,
}

/// Room Directory storage.
#[async_trait]
pub trait RoomRepository: Send + Sync {
    /// Add a member, creating the room with `kind` if it does not exist yet.
    ///
    /// Returns the assigned role and the room after the join.
    async fn join(
        &self,
        room_id: &RoomId,
        kind: RoomKind,
        member: RoomMember,
    ) -> Result<(Role, Room), RoomError>;

    /// Remove a member. Empty rooms are deleted in the same step.
    async fn leave(&self, room_id: &RoomId, connection_id: &ConnectionId)
    -> Option<RoomDeparture>;

    /// Move a seated player to the spectator list.
    async fn demote(&self, room_id: &RoomId, connection_id: &ConnectionId) -> Option<Room>;

    /// Link a room to the game session played in it.
    async fn set_session(&self, room_id: &RoomId, game_id: GameId) -> Result<(), RepositoryError>;

    async fn get(&self, room_id: &RoomId) -> Option<Room>;

    async fn list(&self) -> Vec<Room>;

    async fn member_ids(&self, room_id: &RoomId) -> Vec<ConnectionId>;

    async fn count(&self) -> usize;
}

/// Active game session table.
#[async_trait]
pub trait GameSessionRepository: Send + Sync {
    /// Store a new session. An existing session with the same id is kept and
    /// returned instead.
    async fn insert(&self, session: GameSession) -> SharedGameSession;

    async fn get(&self, game_id: &GameId) -> Option<SharedGameSession>;

    async fn remove(&self, game_id: &GameId) -> Option<SharedGameSession>;

    async fn ids(&self) -> Vec<GameId>;

    async fn count(&self) -> usize;
}
