//! Value objects shared by every aggregate of the relay.
//!
//! String identifiers are validated once at the edge (DTO conversion) so the
//! rest of the core can rely on them being non-empty and bounded.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{
    error::ValueObjectError,
    identity::{GUEST_PREFIX, GUEST_SUFFIX_LEN},
};

/// Maximum length accepted for room, game, connection ids and display names.
pub const MAX_ID_LENGTH: usize = 128;

/// Maximum length of an identity. Identities carry bearer tokens verbatim,
/// so the cap sits at the usual HTTP header size limit.
pub const MAX_IDENTITY_LENGTH: usize = 8192;

/// Maximum length of a chat message body (after trimming).
pub const MAX_MESSAGE_LENGTH: usize = 2000;

macro_rules! string_value_object {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        string_value_object!($(#[$meta])* $name, $label, MAX_ID_LENGTH);
    };
    ($(#[$meta:meta])* $name:ident, $label:literal, $max:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: String) -> Result<Self, ValueObjectError> {
                if value.trim().is_empty() {
                    return Err(ValueObjectError::Empty($label));
                }
                if value.chars().count() > $max {
                    return Err(ValueObjectError::TooLong($label, $max));
                }
                Ok(Self(value))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_string(self) -> String {
                self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValueObjectError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl TryFrom<&str> for $name {
            type Error = ValueObjectError;

            fn try_from(value: &str) -> Result<Self, Self::Error> {
                Self::new(value.to_string())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_value_object!(
    /// Opaque handle of one live WebSocket connection.
    ConnectionId,
    "connection id"
);

string_value_object!(
    /// Stable participant name for the lifetime of a connection
    /// (externally issued user id or generated guest id).
    Identity,
    "identity",
    MAX_IDENTITY_LENGTH
);

string_value_object!(
    /// Human readable name shown to other participants.
    DisplayName,
    "display name"
);

string_value_object!(
    /// Caller-supplied room key. Doubles as an invite code.
    RoomId,
    "room id"
);

string_value_object!(
    /// Id of a game session. Equal to the id of the game room it is played in.
    GameId,
    "game id"
);

string_value_object!(
    /// Id of one chat message, fixed when the message is first dispatched.
    MessageId,
    "message id"
);

impl ConnectionId {
    /// Generate a fresh random connection id.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl Identity {
    /// Guest identity derived from the first characters of a connection id.
    pub fn guest(connection_id: &ConnectionId) -> Self {
        let suffix: String = connection_id
            .as_str()
            .chars()
            .take(GUEST_SUFFIX_LEN)
            .collect();
        Self(format!("{}{}", GUEST_PREFIX, suffix))
    }
}

impl MessageId {
    /// Generate a fresh id for a message being dispatched.
    pub fn generate() -> Self {
        Self(format!("msg_{}", uuid::Uuid::new_v4().simple()))
    }
}

impl GameId {
    /// Generate a fresh id for a game created through `create_game`.
    pub fn generate() -> Self {
        let simple = uuid::Uuid::new_v4().simple().to_string();
        Self(format!("game_{}", &simple[..12]))
    }

    /// The room a session is played in shares the session's id.
    pub fn room_id(&self) -> RoomId {
        RoomId(self.0.clone())
    }
}

impl From<&RoomId> for GameId {
    fn from(room_id: &RoomId) -> Self {
        GameId(room_id.0.clone())
    }
}

impl From<&Identity> for DisplayName {
    fn from(identity: &Identity) -> Self {
        DisplayName(identity.0.clone())
    }
}

/// Chat message body, trimmed and bounded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageBody(String);

impl MessageBody {
    pub fn new(value: String) -> Result<Self, ValueObjectError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ValueObjectError::Empty("message body"));
        }
        if trimmed.chars().count() > MAX_MESSAGE_LENGTH {
            return Err(ValueObjectError::TooLong("message body", MAX_MESSAGE_LENGTH));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

/// Unix timestamp in milliseconds (UTC).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    pub fn new(millis: i64) -> Self {
        Self(millis)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

/// What a room is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomKind {
    #[default]
    Lobby,
    Game,
    Chat,
}

impl RoomKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoomKind::Lobby => "lobby",
            RoomKind::Game => "game",
            RoomKind::Chat => "chat",
        }
    }
}

/// Membership role inside a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Player,
    Spectator,
}

/// Paddle side a player is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Left => f.write_str("left"),
            Side::Right => f.write_str("right"),
        }
    }
}

/// Direction of a paddle move request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaddleDirection {
    Up,
    Down,
}

impl PaddleDirection {
    /// Sign applied to the paddle's y coordinate (y grows downwards).
    pub fn sign(self) -> f64 {
        match self {
            PaddleDirection::Up => -1.0,
            PaddleDirection::Down => 1.0,
        }
    }
}
