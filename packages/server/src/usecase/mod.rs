//! UseCase layer: the relay's components built on the domain traits.

mod broadcast;
mod chat_router;
mod connection;
pub mod error;
mod game_engine;
mod query;
mod room_directory;
mod server_stats;
mod stats;
mod status;

#[cfg(test)]
mod test_support;

pub use broadcast::Broadcaster;
pub use chat_router::ChatRouter;
pub use connection::ConnectionService;
pub use error::{
    ConnectError, DirectMessageError, FriendRequestError, GameActionError, GlobalChatError,
    JoinGameError, RoomChatError, RoomJoinError, ServerStatsError,
};
pub use game_engine::GameEngine;
pub use query::{GetGameUseCase, GetRoomDetailUseCase, GetRoomsUseCase};
pub use room_directory::{JoinOutcome, RoomDirectory};
pub use server_stats::GetServerStatsUseCase;
pub use stats::ServerStats;
pub use status::{GetStatusUseCase, ServerStatus};
