//! RallyHub relay library.
//!
//! A real-time multiplayer relay over WebSocket: connection presence, rooms,
//! global, direct and room chat, and server-authoritative Pong matches.

pub mod config;

// layers
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;
