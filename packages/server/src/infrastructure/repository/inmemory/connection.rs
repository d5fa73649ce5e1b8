//! InMemory Connection Repository.
//!
//! Holds the Connection Registry: one `ConnectedClient` per live connection,
//! keyed by connection id, with a secondary identity index so presence lookups
//! and duplicate checks do not scan the table.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{
    ConnectedClient, ConnectionId, ConnectionRepository, Identity, RepositoryError, Role, RoomId,
};

#[derive(Default)]
struct Registry {
    clients: HashMap<ConnectionId, ConnectedClient>,
    by_identity: HashMap<Identity, ConnectionId>,
}

/// In-memory Connection Registry.
#[derive(Default, Clone)]
pub struct InMemoryConnectionRepository {
    registry: Arc<Mutex<Registry>>,
}

impl InMemoryConnectionRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConnectionRepository for InMemoryConnectionRepository {
    async fn register(&self, client: ConnectedClient) -> Result<(), RepositoryError> {
        let mut registry = self.registry.lock().await;
        if registry.by_identity.contains_key(&client.identity) {
            return Err(RepositoryError::DuplicateIdentity(client.identity));
        }
        registry
            .by_identity
            .insert(client.identity.clone(), client.connection_id.clone());
        registry
            .clients
            .insert(client.connection_id.clone(), client);
        Ok(())
    }

    async fn unregister(&self, connection_id: &ConnectionId) -> Option<ConnectedClient> {
        let mut registry = self.registry.lock().await;
        let client = registry.clients.remove(connection_id)?;
        if registry.by_identity.get(&client.identity) == Some(connection_id) {
            registry.by_identity.remove(&client.identity);
        }
        Some(client)
    }

    async fn get(&self, connection_id: &ConnectionId) -> Option<ConnectedClient> {
        let registry = self.registry.lock().await;
        registry.clients.get(connection_id).cloned()
    }

    async fn find_by_identity(&self, identity: &Identity) -> Option<ConnectedClient> {
        let registry = self.registry.lock().await;
        registry
            .by_identity
            .get(identity)
            .and_then(|id| registry.clients.get(id))
            .cloned()
    }

    async fn set_room(&self, connection_id: &ConnectionId, room: Option<(RoomId, Role)>) -> bool {
        let mut registry = self.registry.lock().await;
        let Some(client) = registry.clients.get_mut(connection_id) else {
            return false;
        };
        match room {
            Some((room_id, role)) => client.enter_room(room_id, role),
            None => {
                client.leave_room();
            }
        }
        true
    }

    async fn list(&self) -> Vec<ConnectedClient> {
        let registry = self.registry.lock().await;
        let mut clients: Vec<ConnectedClient> = registry.clients.values().cloned().collect();
        clients.sort_by(|a, b| {
            a.connected_at
                .cmp(&b.connected_at)
                .then_with(|| a.identity.cmp(&b.identity))
        });
        clients
    }

    async fn all_ids(&self) -> Vec<ConnectionId> {
        let registry = self.registry.lock().await;
        registry.clients.keys().cloned().collect()
    }

    async fn count(&self) -> usize {
        let registry = self.registry.lock().await;
        registry.clients.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DisplayName, Timestamp};

    fn client(conn: &str, identity: &str, at: i64) -> ConnectedClient {
        ConnectedClient::new(
            ConnectionId::new(conn.to_string()).unwrap(),
            Identity::new(identity.to_string()).unwrap(),
            DisplayName::new(identity.to_string()).unwrap(),
            Timestamp::new(at),
        )
    }

    #[tokio::test]
    async fn test_register_and_lookup_by_identity() {
        // テスト項目: 登録した接続を接続 ID とアイデンティティの両方で取得できる
        // given (前提条件):
        let repo = InMemoryConnectionRepository::new();

        // when (操作):
        repo.register(client("c1", "alice", 1)).await.unwrap();

        // then (期待する結果):
        let alice = Identity::new("alice".to_string()).unwrap();
        let by_identity = repo.find_by_identity(&alice).await.unwrap();
        assert_eq!(by_identity.connection_id.as_str(), "c1");
        assert!(
            repo.get(&ConnectionId::new("c1".to_string()).unwrap())
                .await
                .is_some()
        );
        assert_eq!(repo.count().await, 1);
    }

    #[tokio::test]
    async fn test_duplicate_identity_is_rejected() {
        // テスト項目: 同じアイデンティティの二重登録は拒否される
        // given (前提条件):
        let repo = InMemoryConnectionRepository::new();
        repo.register(client("c1", "alice", 1)).await.unwrap();

        // when (操作):
        let result = repo.register(client("c2", "alice", 2)).await;

        // then (期待する結果):
        assert_eq!(
            result,
            Err(RepositoryError::DuplicateIdentity(
                Identity::new("alice".to_string()).unwrap()
            ))
        );
        assert_eq!(repo.count().await, 1);
    }

    #[tokio::test]
    async fn test_unregister_frees_identity() {
        // テスト項目: 登録解除後は同じアイデンティティで再登録できる
        // given (前提条件):
        let repo = InMemoryConnectionRepository::new();
        repo.register(client("c1", "alice", 1)).await.unwrap();

        // when (操作):
        let removed = repo
            .unregister(&ConnectionId::new("c1".to_string()).unwrap())
            .await;
        let again = repo.register(client("c2", "alice", 2)).await;

        // then (期待する結果):
        assert_eq!(removed.unwrap().identity.as_str(), "alice");
        assert!(again.is_ok());
    }

    #[tokio::test]
    async fn test_set_room_updates_membership() {
        // テスト項目: ルーム所属とプレイ中フラグが更新される
        // given (前提条件):
        let repo = InMemoryConnectionRepository::new();
        repo.register(client("c1", "alice", 1)).await.unwrap();
        let c1 = ConnectionId::new("c1".to_string()).unwrap();
        let room = RoomId::new("g1".to_string()).unwrap();

        // when (操作):
        let updated = repo.set_room(&c1, Some((room.clone(), Role::Player))).await;

        // then (期待する結果):
        assert!(updated);
        let stored = repo.get(&c1).await.unwrap();
        assert_eq!(stored.current_room, Some(room));
        assert!(stored.is_playing);

        repo.set_room(&c1, None).await;
        let cleared = repo.get(&c1).await.unwrap();
        assert_eq!(cleared.current_room, None);
        assert!(!cleared.is_playing);
    }

    #[tokio::test]
    async fn test_list_is_ordered_by_connection_time() {
        // テスト項目: 一覧は接続時刻の古い順に並ぶ
        // given (前提条件):
        let repo = InMemoryConnectionRepository::new();
        repo.register(client("c2", "bob", 20)).await.unwrap();
        repo.register(client("c1", "alice", 10)).await.unwrap();

        // when (操作):
        let clients = repo.list().await;

        // then (期待する結果):
        let names: Vec<&str> = clients.iter().map(|c| c.identity.as_str()).collect();
        assert_eq!(names, vec!["alice", "bob"]);
    }
}
