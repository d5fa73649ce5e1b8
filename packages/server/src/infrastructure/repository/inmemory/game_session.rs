//! InMemory Game Session Repository: the active session table.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{GameId, GameSession, GameSessionRepository, SharedGameSession};

#[derive(Default, Clone)]
pub struct InMemoryGameSessionRepository {
    sessions: Arc<Mutex<HashMap<GameId, SharedGameSession>>>,
}

impl InMemoryGameSessionRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl GameSessionRepository for InMemoryGameSessionRepository {
    async fn insert(&self, session: GameSession) -> SharedGameSession {
        let mut sessions = self.sessions.lock().await;
        sessions
            .entry(session.id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(session)))
            .clone()
    }

    async fn get(&self, game_id: &GameId) -> Option<SharedGameSession> {
        let sessions = self.sessions.lock().await;
        sessions.get(game_id).cloned()
    }

    async fn remove(&self, game_id: &GameId) -> Option<SharedGameSession> {
        let mut sessions = self.sessions.lock().await;
        sessions.remove(game_id)
    }

    async fn ids(&self) -> Vec<GameId> {
        let sessions = self.sessions.lock().await;
        sessions.keys().cloned().collect()
    }

    async fn count(&self) -> usize {
        let sessions = self.sessions.lock().await;
        sessions.len()
    }
}
