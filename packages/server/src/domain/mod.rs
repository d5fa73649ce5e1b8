//! Domain layer: value objects, entities, and the traits the core depends on.

pub mod chat_store;
pub mod entity;
pub mod error;
pub mod identity;
pub mod message_pusher;
pub mod repository;
pub mod value_object;

pub use chat_store::{ChatStore, ChatStoreError};
pub use entity::*;
pub use error::{GameError, RepositoryError, RoomError, ValueObjectError};
pub use identity::{BoundIdentity, Handshake, bind_identity};
pub use message_pusher::{MessagePushError, MessagePusher, PusherChannel};
pub use repository::{
    ConnectionRepository, GameSessionRepository, RoomDeparture, RoomRepository,
    SharedGameSession,
};
pub use value_object::*;

#[cfg(test)]
pub use chat_store::MockChatStore;
