//! RallyHub relay server.
//!
//! Real-time rooms, chat and server-authoritative Pong matches over WebSocket.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin rallyhub-server
//! cargo run --bin rallyhub-server -- --host 0.0.0.0 --port 3000 --tick-rate 30
//! RALLYHUB_STORE_URL=https://store.example RALLYHUB_STORE_TOKEN=... cargo run --bin rallyhub-server
//! ```

use std::{sync::Arc, time::Duration};

use clap::Parser;
use rallyhub_server::{
    config::{
        DEFAULT_FINISHED_GRACE, DEFAULT_HISTORY_LIMIT, DEFAULT_HOST, DEFAULT_PORT,
        DEFAULT_TICK_RATE, MAX_TICK_RATE, ServerConfig,
    },
    domain::ChatStore,
    infrastructure::chat_store::{DisabledChatStore, HttpChatStore, HttpChatStoreConfig},
    ui::{AppState, Server},
};
use rallyhub_shared::{logger::setup_logger, time::SystemClock};

#[derive(Parser, Debug)]
#[command(name = "rallyhub-server")]
#[command(about = "Real-time multiplayer relay: rooms, chat and Pong over WebSocket", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, env = "RALLYHUB_HOST", default_value = DEFAULT_HOST)]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, env = "RALLYHUB_PORT", default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Simulation ticks per second of every game session
    #[arg(
        long,
        env = "RALLYHUB_TICK_RATE",
        default_value_t = DEFAULT_TICK_RATE,
        value_parser = clap::value_parser!(u32).range(1..=MAX_TICK_RATE as i64)
    )]
    tick_rate: u32,

    /// Seconds a finished game stays queryable before eviction
    #[arg(long, env = "RALLYHUB_FINISHED_GRACE_SECS", default_value_t = DEFAULT_FINISHED_GRACE.as_secs())]
    finished_grace_secs: u64,

    /// Base URL of the external chat store (persistence is disabled when unset)
    #[arg(long, env = "RALLYHUB_STORE_URL")]
    store_url: Option<String>,

    /// Bearer token for the external chat store
    #[arg(long, env = "RALLYHUB_STORE_TOKEN", default_value = "")]
    store_token: String,

    /// Number of messages sent as history on connect
    #[arg(long, env = "RALLYHUB_HISTORY_LIMIT", default_value_t = DEFAULT_HISTORY_LIMIT)]
    history_limit: usize,

    /// Identity allowed to request server stats (repeatable or comma separated)
    #[arg(long = "admin", env = "RALLYHUB_ADMINS", value_delimiter = ',')]
    admins: Vec<String>,

    /// Default log level (overridden by RUST_LOG)
    #[arg(long, env = "RALLYHUB_LOG_LEVEL", default_value = "info")]
    log_level: String,
}

impl From<Args> for ServerConfig {
    fn from(args: Args) -> Self {
        Self {
            host: args.host,
            port: args.port,
            tick_rate: args.tick_rate,
            finished_grace: Duration::from_secs(args.finished_grace_secs),
            store: args.store_url.map(|base_url| HttpChatStoreConfig {
                base_url,
                token: args.store_token,
            }),
            history_limit: args.history_limit,
            admins: args.admins,
        }
    }
}

/// Pick the chat store. An unusable store configuration falls back to no persistence.
async fn build_chat_store(config: &ServerConfig) -> Arc<dyn ChatStore> {
    let Some(store_config) = &config.store else {
        tracing::info!("No chat store configured; messages are not persisted");
        return Arc::new(DisabledChatStore);
    };

    match HttpChatStore::new(store_config) {
        Ok(store) => {
            if let Err(e) = store.ensure_schema().await {
                tracing::warn!("Failed to prepare chat store schema: {}", e);
            }
            tracing::info!("Persisting chat messages to {}", store_config.base_url);
            Arc::new(store)
        }
        Err(e) => {
            tracing::error!("Invalid chat store configuration: {}", e);
            Arc::new(DisabledChatStore)
        }
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), &args.log_level);

    let config = ServerConfig::from(args);
    tracing::info!(
        "Tick rate {} Hz, finished games kept for {}s",
        config.tick_rate,
        config.finished_grace.as_secs()
    );

    let store = build_chat_store(&config).await;
    let state = AppState::new(&config, store, Arc::new(SystemClock));

    if let Err(e) = Server::new(state).run(&config.bind_addr()).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
