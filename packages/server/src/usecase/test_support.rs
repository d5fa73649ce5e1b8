//! テスト用の共通ヘルパー

use std::{sync::Arc, time::Duration};

use rallyhub_shared::time::FixedClock;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::{
    config::GameEngineConfig,
    domain::{
        ConnectedClient, ConnectionId, ConnectionRepository, DisplayName, Identity, MessagePusher,
        Timestamp,
    },
    infrastructure::{
        message_pusher::WebSocketMessagePusher,
        repository::{
            InMemoryConnectionRepository, InMemoryGameSessionRepository, InMemoryRoomRepository,
        },
    },
};

use super::{Broadcaster, GameEngine, RoomDirectory};

pub const NOW: i64 = 1_700_000_000_000;

/// 短いティック間隔と猶予期間のエンジン設定
pub fn fast_engine_config() -> GameEngineConfig {
    GameEngineConfig {
        tick_interval: Duration::from_millis(5),
        finished_grace: Duration::from_millis(100),
    }
}

pub struct Harness {
    pub connections: Arc<InMemoryConnectionRepository>,
    pub rooms: Arc<InMemoryRoomRepository>,
    pub sessions: Arc<InMemoryGameSessionRepository>,
    pub pusher: Arc<WebSocketMessagePusher>,
    pub broadcaster: Arc<Broadcaster>,
    pub engine: Arc<GameEngine>,
    pub directory: Arc<RoomDirectory>,
    pub clock: Arc<FixedClock>,
}

impl Harness {
    pub fn new(engine_config: GameEngineConfig) -> Self {
        let connections = Arc::new(InMemoryConnectionRepository::new());
        let rooms = Arc::new(InMemoryRoomRepository::new());
        let sessions = Arc::new(InMemoryGameSessionRepository::new());
        let pusher = Arc::new(WebSocketMessagePusher::default());
        let clock = Arc::new(FixedClock::new(NOW));
        let broadcaster = Arc::new(Broadcaster::new(
            connections.clone(),
            rooms.clone(),
            pusher.clone(),
        ));
        let engine = Arc::new(GameEngine::new(
            sessions.clone(),
            broadcaster.clone(),
            clock.clone(),
            engine_config,
        ));
        let directory = Arc::new(RoomDirectory::new(
            connections.clone(),
            rooms.clone(),
            engine.clone(),
            broadcaster.clone(),
            clock.clone(),
        ));
        Self {
            connections,
            rooms,
            sessions,
            pusher,
            broadcaster,
            engine,
            directory,
            clock,
        }
    }

    /// 接続を登録し、受信キューを返す
    pub async fn connect(&self, name: &str) -> (ConnectionId, mpsc::UnboundedReceiver<String>) {
        let id = connection_id(name);
        let (tx, rx) = mpsc::unbounded_channel();
        self.connections
            .register(ConnectedClient::new(
                id.clone(),
                identity(name),
                DisplayName::new(name.to_string()).unwrap(),
                Timestamp::new(NOW),
            ))
            .await
            .unwrap();
        self.pusher.register_client(id.clone(), tx).await;
        (id, rx)
    }
}

pub fn connection_id(name: &str) -> ConnectionId {
    ConnectionId::new(format!("conn-{}", name)).unwrap()
}

pub fn identity(name: &str) -> Identity {
    Identity::new(name.to_string()).unwrap()
}

/// 受信済みのフレームを全て取り出す
pub fn drain(rx: &mut mpsc::UnboundedReceiver<String>) -> Vec<Value> {
    let mut events = Vec::new();
    while let Ok(frame) = rx.try_recv() {
        events.push(serde_json::from_str(&frame).unwrap());
    }
    events
}

/// 指定した type のイベントが届くまで待つ（他のイベントは読み捨てる）
pub async fn wait_for(rx: &mut mpsc::UnboundedReceiver<String>, event_type: &str) -> Value {
    let wait = async {
        loop {
            let frame = rx.recv().await.expect("channel closed");
            let value: Value = serde_json::from_str(&frame).unwrap();
            if value["type"] == event_type {
                return value;
            }
        }
    };
    tokio::time::timeout(Duration::from_secs(5), wait)
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for '{}'", event_type))
}

/// 取り出したイベントの type 一覧
pub fn types(events: &[Value]) -> Vec<String> {
    events
        .iter()
        .map(|e| e["type"].as_str().unwrap_or_default().to_string())
        .collect()
}
