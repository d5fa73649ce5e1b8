//! Shared application state and dependency wiring.

use std::sync::Arc;

use rallyhub_shared::time::Clock;

use crate::{
    config::ServerConfig,
    domain::{ChatStore, Identity, Timestamp},
    infrastructure::{
        message_pusher::WebSocketMessagePusher,
        repository::{
            InMemoryConnectionRepository, InMemoryGameSessionRepository, InMemoryRoomRepository,
        },
    },
    usecase::{
        Broadcaster, ChatRouter, ConnectionService, GameEngine, GetGameUseCase,
        GetRoomDetailUseCase, GetRoomsUseCase, GetServerStatsUseCase, GetStatusUseCase,
        RoomDirectory, ServerStats,
    },
};

/// Shared application state
pub struct AppState {
    pub connection_service: Arc<ConnectionService>,
    pub room_directory: Arc<RoomDirectory>,
    pub game_engine: Arc<GameEngine>,
    pub chat_router: Arc<ChatRouter>,
    pub broadcaster: Arc<Broadcaster>,
    pub get_status_usecase: Arc<GetStatusUseCase>,
    pub get_rooms_usecase: Arc<GetRoomsUseCase>,
    pub get_room_detail_usecase: Arc<GetRoomDetailUseCase>,
    pub get_game_usecase: Arc<GetGameUseCase>,
    pub get_server_stats_usecase: Arc<GetServerStatsUseCase>,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    /// Wire every component of the relay.
    ///
    /// Initialize dependencies in order:
    /// 1. Repositories (in-memory tables)
    /// 2. MessagePusher
    /// 3. UseCases
    pub fn new(config: &ServerConfig, store: Arc<dyn ChatStore>, clock: Arc<dyn Clock>) -> Self {
        // 1. Repositories
        let connections = Arc::new(InMemoryConnectionRepository::new());
        let rooms = Arc::new(InMemoryRoomRepository::new());
        let sessions = Arc::new(InMemoryGameSessionRepository::new());

        // 2. MessagePusher (WebSocket implementation)
        let message_pusher = Arc::new(WebSocketMessagePusher::default());

        // 3. UseCases
        let stats = Arc::new(ServerStats::new(Timestamp::new(clock.now_millis())));
        let broadcaster = Arc::new(Broadcaster::new(
            connections.clone(),
            rooms.clone(),
            message_pusher.clone(),
        ));
        let game_engine = Arc::new(GameEngine::new(
            sessions,
            broadcaster.clone(),
            clock.clone(),
            config.engine_config(),
        ));
        let room_directory = Arc::new(RoomDirectory::new(
            connections.clone(),
            rooms.clone(),
            game_engine.clone(),
            broadcaster.clone(),
            clock.clone(),
        ));
        let chat_router = Arc::new(ChatRouter::new(
            connections.clone(),
            rooms.clone(),
            broadcaster.clone(),
            store,
            stats.clone(),
            clock.clone(),
            config.history_limit,
        ));
        let get_status_usecase = Arc::new(GetStatusUseCase::new(
            connections.clone(),
            rooms.clone(),
            game_engine.clone(),
            stats,
        ));
        let admins = config.admins.iter().filter_map(|name| {
            Identity::try_from(name.trim())
                .inspect_err(|e| tracing::warn!("Ignoring admin entry '{}': {}", name, e))
                .ok()
        });
        let get_server_stats_usecase = Arc::new(GetServerStatsUseCase::new(
            connections.clone(),
            rooms.clone(),
            game_engine.clone(),
            get_status_usecase.clone(),
            broadcaster.clone(),
            admins,
        ));
        let connection_service = Arc::new(ConnectionService::new(
            connections,
            message_pusher,
            broadcaster.clone(),
            room_directory.clone(),
            game_engine.clone(),
            chat_router.clone(),
            get_status_usecase.clone(),
            clock.clone(),
        ));

        Self {
            connection_service,
            room_directory,
            get_rooms_usecase: Arc::new(GetRoomsUseCase::new(rooms.clone())),
            get_room_detail_usecase: Arc::new(GetRoomDetailUseCase::new(rooms)),
            get_game_usecase: Arc::new(GetGameUseCase::new(game_engine.clone())),
            get_server_stats_usecase,
            game_engine,
            chat_router,
            broadcaster,
            get_status_usecase,
            clock,
        }
    }
}
