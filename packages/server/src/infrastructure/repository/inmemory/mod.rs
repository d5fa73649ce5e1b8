//! In-memory repository implementations.

mod connection;
mod game_session;
mod room;

pub use connection::InMemoryConnectionRepository;
pub use game_session::InMemoryGameSessionRepository;
pub use room::InMemoryRoomRepository;
