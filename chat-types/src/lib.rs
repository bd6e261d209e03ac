//! # chat-types
//!
//! Wire and domain types for the parley two-party chat client core.
//!
//! This crate provides the foundational types used across all parley crates:
//! - [`ChatId`], [`SenderId`], [`MessageId`], [`Identity`] - Identity types
//! - [`Message`], [`MessageStatus`] - The message record and its lifecycle
//! - [`ServerEvent`], [`ClientEvent`] - Relay event payloads
//! - [`WireError`] - Wire encoding errors

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod events;
mod ids;
mod message;

pub use error::WireError;
pub use events::{ClientEvent, EditRequest, SendRequest, ServerEvent, TypingStatus};
pub use ids::{ChatId, Identity, MessageId, SenderId};
pub use message::{Message, MessageStatus};
