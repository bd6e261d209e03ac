//! Relay event payloads and their JSON wire encoding.
//!
//! The relay speaks named events with JSON payloads over a persistent
//! connection. Outbound requests ([`SendRequest`], [`EditRequest`]) expect a
//! confirmed [`Message`] in reply; everything else is one-way.

use serde::{Deserialize, Serialize};

use crate::{ChatId, Message, MessageId, SenderId, WireError};

/// Outbound typing indicator. Fire-and-forget, best-effort.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingStatus {
    /// Conversation the indicator applies to.
    pub chat_id: ChatId,
    /// Whether the local user is currently typing.
    pub is_typing: bool,
}

/// Outbound send request. The relay answers with the confirmed [`Message`],
/// carrying the canonical server-assigned id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendRequest {
    /// The authenticated author.
    pub sender_id: SenderId,
    /// The trimmed draft body.
    #[serde(rename = "message")]
    pub body: String,
    /// Client-assigned epoch milliseconds.
    pub time: u64,
    /// Target conversation.
    pub chat_id: ChatId,
    /// Result of the client-side profanity screen.
    pub contains_badword: bool,
    /// Id of the message being replied to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<MessageId>,
}

/// Outbound edit request. Carries both bodies for server-side audit; the
/// relay answers with the edited [`Message`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditRequest {
    /// The message being edited.
    pub id: MessageId,
    /// Conversation the message belongs to.
    pub chat_id: ChatId,
    /// Replacement body.
    #[serde(rename = "newMessage")]
    pub new_body: String,
    /// The body being replaced.
    #[serde(rename = "oldMessage")]
    pub old_body: String,
}

/// Events pushed by the relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerEvent {
    /// A new message from the peer. The relay is authoritative; there is no
    /// pending phase for inbound messages.
    ReceiveMessage(Message),
    /// The peer deleted a message.
    #[serde(rename_all = "camelCase")]
    DeleteMessage {
        /// The deleted message.
        id: MessageId,
        /// Conversation it belonged to.
        chat_id: ChatId,
    },
    /// The relay echoed an edit made by either party. May reference the
    /// message by its original id rather than its current one.
    EditMessage(Message),
    /// The peer read a message.
    #[serde(rename_all = "camelCase")]
    ReadMessage {
        /// The message that was read.
        message_id: MessageId,
        /// Conversation it belongs to.
        chat_id: ChatId,
    },
    /// The relay refused a send (rate limit or policy). Human-readable
    /// notice only; nothing to reconcile and nothing to retry.
    SendFailed {
        /// The notice text.
        message: String,
    },
}

impl ServerEvent {
    /// Serialize to JSON bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, WireError> {
        serde_json::to_vec(self).map_err(WireError::Serialization)
    }

    /// Deserialize from JSON bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, WireError> {
        serde_json::from_slice(bytes).map_err(WireError::Deserialization)
    }
}

/// Events emitted toward the relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientEvent {
    /// Typing indicator.
    TypingStatus(TypingStatus),
    /// Send a new message.
    SendMessage(SendRequest),
    /// Edit an existing message.
    EditMessage(EditRequest),
}

impl ClientEvent {
    /// Serialize to JSON bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, WireError> {
        serde_json::to_vec(self).map_err(WireError::Serialization)
    }

    /// Deserialize from JSON bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, WireError> {
        serde_json::from_slice(bytes).map_err(WireError::Deserialization)
    }
}
