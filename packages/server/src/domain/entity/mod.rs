//! Domain entities.

pub mod chat;
pub mod client;
pub mod game;
pub mod room;

pub use chat::{ChatDispatchEnvelope, ChatScope};
pub use client::ConnectedClient;
pub use game::{
    Ball, Field, GamePlayer, GameSession, GameSettings, GameStatus, Paddle, Paddles, Release,
    Seat, TickOutcome,
};
pub use room::{MAX_GAME_PLAYERS, Room, RoomMember};
