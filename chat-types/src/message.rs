//! The message record and its lifecycle status.

use serde::{Deserialize, Serialize};

use crate::{ChatId, MessageId, SenderId};

/// Delivery status of a locally authored message.
///
/// Absent on the wire means [`MessageStatus::Sent`]; only the local client
/// ever produces `Pending` or `Failed`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    /// Awaiting transport confirmation.
    Pending,
    /// Confirmed by the relay.
    #[default]
    Sent,
    /// The transport call failed or timed out; the message is retryable.
    Failed,
}

impl MessageStatus {
    /// Check for the pending state.
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    /// Check for the sent state.
    pub fn is_sent(&self) -> bool {
        matches!(self, Self::Sent)
    }

    /// Check for the failed state.
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed)
    }
}

/// A single chat message.
///
/// The wire representation uses the relay's camelCase field names; the body
/// travels under the `message` key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Unique within the chat. Client-generated until the relay confirms.
    pub id: MessageId,
    /// Author of the message.
    pub sender_id: SenderId,
    /// Conversation this message belongs to.
    pub chat_id: ChatId,
    /// The body. An opaque encrypted blob until decrypted for display.
    #[serde(rename = "message")]
    pub body: String,
    /// Client-assigned epoch milliseconds; the total order key within a chat.
    /// Never revised by the relay.
    pub time: u64,
    /// Delivery status; omitted on the wire when sent.
    #[serde(default, skip_serializing_if = "MessageStatus::is_sent")]
    pub status: MessageStatus,
    /// Whether the body has been edited since first delivery.
    #[serde(default)]
    pub is_edited: bool,
    /// Prior bodies, oldest first. Grows only on confirmed edits.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub edit_history: Vec<String>,
    /// Result of the profanity screen, computed once when the message was
    /// authored and never recomputed on edit.
    #[serde(default)]
    pub contains_badword: bool,
    /// Whether the peer has read this message.
    #[serde(default)]
    pub is_read: bool,
    /// Id of the message this one replies to. Immutable once set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<MessageId>,
    /// The client-chosen id this message supersedes, when the relay assigned
    /// a different canonical id. Feeds the store's original-id index.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_id: Option<MessageId>,
}
