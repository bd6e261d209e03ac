//! Transport abstraction for the chat engine.
//!
//! This module provides a pluggable transport layer that abstracts the
//! underlying relay connection (socket client, mock for testing).
//!
//! # Design
//!
//! The transport trait is async and connection-oriented:
//! - `connect()` establishes a connection
//! - `send_message()` / `edit_message()` are request/response calls that
//!   resolve to the relay's confirmed message
//! - `send_typing()` is fire-and-forget
//! - `next_event()` receives relay pushes
//! - `close()` gracefully terminates
//!
//! The engine assumes the connection is reliable once established;
//! reconnect policy belongs to the implementation.

mod mock;

pub use mock::MockTransport;

use async_trait::async_trait;
use thiserror::Error;

use parley_chat_types::{EditRequest, Message, SendRequest, ServerEvent, TypingStatus};

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Not connected.
    #[error("not connected")]
    NotConnected,

    /// Connection closed.
    #[error("connection closed")]
    ConnectionClosed,

    /// Send failed.
    #[error("send failed: {0}")]
    SendFailed(String),

    /// Receive failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(String),

    /// Request timed out.
    #[error("request timed out")]
    Timeout,
}

/// Transport trait for the relay connection.
///
/// Implementations handle the underlying connection mechanism (socket
/// client, mock, etc).
#[async_trait]
pub trait Transport: Send + Sync {
    /// Connect to the relay at the given address.
    async fn connect(&self, address: &str) -> Result<(), TransportError>;

    /// Send a new message and wait for the relay's confirmation, which
    /// carries the canonical server-assigned id.
    ///
    /// At most one delivery per call; failure means the message was not
    /// accepted.
    async fn send_message(&self, request: SendRequest) -> Result<Message, TransportError>;

    /// Edit a message and wait for the relay's echo of the edited message.
    async fn edit_message(&self, request: EditRequest) -> Result<Message, TransportError>;

    /// Emit a typing indicator. Best-effort.
    async fn send_typing(&self, status: TypingStatus) -> Result<(), TransportError>;

    /// Receive the next relay push event.
    ///
    /// Blocks until an event is available or the connection closes.
    async fn next_event(&self) -> Result<ServerEvent, TransportError>;

    /// Check if currently connected.
    fn is_connected(&self) -> bool;

    /// Close the connection gracefully.
    async fn close(&self) -> Result<(), TransportError>;
}
