//! Chat envelope: one message on its way through the router.

use serde::{Deserialize, Serialize};

use crate::domain::value_object::{
    DisplayName, Identity, MessageBody, MessageId, RoomId, Timestamp,
};

/// Where a chat message is delivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scope", rename_all = "lowercase")]
pub enum ChatScope {
    Global,
    Direct { to: Identity },
    Room { room_id: RoomId },
}

impl ChatScope {
    /// Short name used when the scope is persisted.
    pub fn kind(&self) -> &'static str {
        match self {
            ChatScope::Global => "global",
            ChatScope::Direct { .. } => "direct",
            ChatScope::Room { .. } => "room",
        }
    }

    /// Recipient identity or room id, if the scope has one.
    pub fn target(&self) -> Option<&str> {
        match self {
            ChatScope::Global => None,
            ChatScope::Direct { to } => Some(to.as_str()),
            ChatScope::Room { room_id } => Some(room_id.as_str()),
        }
    }
}

/// Transient message, built per send and dropped after delivery and storage.
///
/// The id is minted once here, so storing the same envelope twice writes one row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatDispatchEnvelope {
    pub id: MessageId,
    pub sender: Identity,
    pub sender_display_name: DisplayName,
    pub scope: ChatScope,
    pub body: MessageBody,
    pub sent_at: Timestamp,
}

impl ChatDispatchEnvelope {
    pub fn new(
        sender: Identity,
        sender_display_name: DisplayName,
        scope: ChatScope,
        body: MessageBody,
        sent_at: Timestamp,
    ) -> Self {
        Self {
            id: MessageId::generate(),
            sender,
            sender_display_name,
            scope,
            body,
            sent_at,
        }
    }

    /// Keep an id assigned earlier, e.g. when reading a stored message back.
    pub fn with_id(mut self, id: MessageId) -> Self {
        self.id = id;
        self
    }
}
