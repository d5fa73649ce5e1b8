//! Runtime configuration of the relay.

use std::time::Duration;

use crate::infrastructure::chat_store::HttpChatStoreConfig;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_TICK_RATE: u32 = 60;
/// Highest accepted simulation rate in Hz.
pub const MAX_TICK_RATE: u32 = 1000;
pub const DEFAULT_FINISHED_GRACE: Duration = Duration::from_secs(30);
pub const DEFAULT_HISTORY_LIMIT: usize = 50;
/// Upper bound for `get_history` requests.
pub const MAX_HISTORY_LIMIT: usize = 500;

/// Timings of the Game Session Engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameEngineConfig {
    /// Interval between two simulation ticks of one session.
    pub tick_interval: Duration,
    /// How long a finished session stays queryable before eviction.
    pub finished_grace: Duration,
}

impl Default for GameEngineConfig {
    fn default() -> Self {
        Self::new(DEFAULT_TICK_RATE, DEFAULT_FINISHED_GRACE)
    }
}

impl GameEngineConfig {
    /// `tick_rate` is in Hz, clamped to `1..=MAX_TICK_RATE` so the interval
    /// is never zero.
    pub fn new(tick_rate: u32, finished_grace: Duration) -> Self {
        Self {
            tick_interval: Duration::from_secs(1) / tick_rate.clamp(1, MAX_TICK_RATE),
            finished_grace,
        }
    }
}

/// Everything the server binary needs to wire the relay.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub tick_rate: u32,
    pub finished_grace: Duration,
    /// External chat store; `None` disables persistence.
    pub store: Option<HttpChatStoreConfig>,
    pub history_limit: usize,
    /// Identities allowed to request `server_stats`.
    pub admins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            tick_rate: DEFAULT_TICK_RATE,
            finished_grace: DEFAULT_FINISHED_GRACE,
            store: None,
            history_limit: DEFAULT_HISTORY_LIMIT,
            admins: Vec::new(),
        }
    }
}

impl ServerConfig {
    pub fn engine_config(&self) -> GameEngineConfig {
        GameEngineConfig::new(self.tick_rate, self.finished_grace)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
