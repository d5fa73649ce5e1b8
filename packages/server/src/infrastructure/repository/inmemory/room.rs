//! InMemory Room Repository.
//!
//! `Room` aggregates are stored directly, keyed by room id. Rooms are created
//! on first join and deleted in the same step as the departure that empties
//! them, so an empty room is never observable.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{
    ConnectionId, GameId, RepositoryError, Role, Room, RoomDeparture, RoomError, RoomId,
    RoomKind, RoomMember, RoomRepository,
};

/// In-memory Room Directory storage.
#[derive(Default, Clone)]
pub struct InMemoryRoomRepository {
    rooms: Arc<Mutex<HashMap<RoomId, Room>>>,
}

impl InMemoryRoomRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RoomRepository for InMemoryRoomRepository {
    async fn join(
        &self,
        room_id: &RoomId,
        kind: RoomKind,
        member: RoomMember,
    ) -> Result<(Role, Room), RoomError> {
        let mut rooms = self.rooms.lock().await;
        let room = rooms.entry(room_id.clone()).or_insert_with(|| {
            tracing::info!("Room '{}' created ({})", room_id, kind.as_str());
            Room::new(room_id.clone(), kind, member.joined_at)
        });
        let role = room.join(member)?;
        Ok((role, room.clone()))
    }

    async fn leave(
        &self,
        room_id: &RoomId,
        connection_id: &ConnectionId,
    ) -> Option<RoomDeparture> {
        let mut rooms = self.rooms.lock().await;
        let room = rooms.get_mut(room_id)?;
        let role = room.remove(connection_id)?;
        let kind = room.kind;

        if room.is_empty() {
            rooms.remove(room_id);
            tracing::info!("Room '{}' deleted (empty)", room_id);
            return Some(RoomDeparture {
                role,
                kind,
                room: None,
            });
        }
        Some(RoomDeparture {
            role,
            kind,
            room: Some(room.clone()),
        })
    }

    async fn demote(&self, room_id: &RoomId, connection_id: &ConnectionId) -> Option<Room> {
        let mut rooms = self.rooms.lock().await;
        let room = rooms.get_mut(room_id)?;
        room.demote_to_spectator(connection_id)
            .then(|| room.clone())
    }

    async fn set_session(&self, room_id: &RoomId, game_id: GameId) -> Result<(), RepositoryError> {
        let mut rooms = self.rooms.lock().await;
        let room = rooms
            .get_mut(room_id)
            .ok_or_else(|| RepositoryError::RoomNotFound(room_id.clone()))?;
        room.associated_session = Some(game_id);
        Ok(())
    }

    async fn get(&self, room_id: &RoomId) -> Option<Room> {
        let rooms = self.rooms.lock().await;
        rooms.get(room_id).cloned()
    }

    async fn list(&self) -> Vec<Room> {
        let rooms = self.rooms.lock().await;
        let mut list: Vec<Room> = rooms.values().cloned().collect();
        list.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        list
    }

    async fn member_ids(&self, room_id: &RoomId) -> Vec<ConnectionId> {
        let rooms = self.rooms.lock().await;
        rooms
            .get(room_id)
            .map(Room::member_connection_ids)
            .unwrap_or_default()
    }

    async fn count(&self) -> usize {
        let rooms = self.rooms.lock().await;
        rooms.len()
    }
}
