//! Mock transport for testing.
//!
//! Allows queueing confirmations and push events and capturing outbound
//! traffic for verification.

use super::{Transport, TransportError};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use parley_chat_types::{
    ClientEvent, EditRequest, Message, SendRequest, ServerEvent, TypingStatus,
};

/// Mock transport for testing.
///
/// Request/response calls pop from a queue of confirmations; an empty queue
/// behaves like a timeout. Push events drain from their own queue;
/// [`MockTransport::keep_open`] controls whether an empty event queue reads
/// as a closed stream or an idle one.
#[derive(Debug, Default)]
pub struct MockTransport {
    inner: Arc<Mutex<MockTransportInner>>,
}

#[derive(Debug, Default)]
struct MockTransportInner {
    connected: bool,
    connected_address: Option<String>,
    sent: Vec<ClientEvent>,
    confirmations: VecDeque<Message>,
    events: VecDeque<ServerEvent>,
    keep_open: bool,
    fail_next_connect: Option<String>,
    fail_next_request: Option<String>,
    fail_next_typing: Option<String>,
    fail_next_event: Option<String>,
}

impl MockTransport {
    /// Create a new mock transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a confirmed message for the next `send_message` or
    /// `edit_message` call.
    pub fn queue_confirmation(&self, message: Message) {
        let mut inner = self.inner.lock().unwrap();
        inner.confirmations.push_back(message);
    }

    /// Queue a push event for `next_event`.
    pub fn queue_event(&self, event: ServerEvent) {
        let mut inner = self.inner.lock().unwrap();
        inner.events.push_back(event);
    }

    /// When set, `next_event` on an empty queue waits for events instead of
    /// reporting a closed stream.
    pub fn keep_open(&self, keep: bool) {
        let mut inner = self.inner.lock().unwrap();
        inner.keep_open = keep;
    }

    /// Get all outbound traffic, in order.
    pub fn sent_events(&self) -> Vec<ClientEvent> {
        let inner = self.inner.lock().unwrap();
        inner.sent.clone()
    }

    /// Get the last outbound event.
    pub fn last_sent(&self) -> Option<ClientEvent> {
        let inner = self.inner.lock().unwrap();
        inner.sent.last().cloned()
    }

    /// Get all typing indicators that were emitted.
    pub fn typing_emissions(&self) -> Vec<TypingStatus> {
        let inner = self.inner.lock().unwrap();
        inner
            .sent
            .iter()
            .filter_map(|event| match event {
                ClientEvent::TypingStatus(status) => Some(status.clone()),
                _ => None,
            })
            .collect()
    }

    /// Get the address that was connected to.
    pub fn connected_address(&self) -> Option<String> {
        let inner = self.inner.lock().unwrap();
        inner.connected_address.clone()
    }

    /// Cause the next connect() to fail with the given error.
    pub fn fail_next_connect(&self, error: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_next_connect = Some(error.to_string());
    }

    /// Cause the next send_message()/edit_message() to fail.
    pub fn fail_next_request(&self, error: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_next_request = Some(error.to_string());
    }

    /// Cause the next send_typing() to fail.
    pub fn fail_next_typing(&self, error: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_next_typing = Some(error.to_string());
    }

    /// Cause the next next_event() to fail.
    pub fn fail_next_event(&self, error: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_next_event = Some(error.to_string());
    }

    /// Clear all state (traffic, queues, connection).
    pub fn reset(&self) {
        let mut inner = self.inner.lock().unwrap();
        *inner = MockTransportInner::default();
    }
}

impl Clone for MockTransport {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn connect(&self, address: &str) -> Result<(), TransportError> {
        let mut inner = self.inner.lock().unwrap();

        if let Some(error) = inner.fail_next_connect.take() {
            return Err(TransportError::ConnectionFailed(error));
        }

        inner.connected = true;
        inner.connected_address = Some(address.to_string());
        Ok(())
    }

    async fn send_message(&self, request: SendRequest) -> Result<Message, TransportError> {
        let mut inner = self.inner.lock().unwrap();

        if !inner.connected {
            return Err(TransportError::NotConnected);
        }
        if let Some(error) = inner.fail_next_request.take() {
            return Err(TransportError::SendFailed(error));
        }

        inner.sent.push(ClientEvent::SendMessage(request));
        inner
            .confirmations
            .pop_front()
            .ok_or(TransportError::Timeout)
    }

    async fn edit_message(&self, request: EditRequest) -> Result<Message, TransportError> {
        let mut inner = self.inner.lock().unwrap();

        if !inner.connected {
            return Err(TransportError::NotConnected);
        }
        if let Some(error) = inner.fail_next_request.take() {
            return Err(TransportError::SendFailed(error));
        }

        inner.sent.push(ClientEvent::EditMessage(request));
        inner
            .confirmations
            .pop_front()
            .ok_or(TransportError::Timeout)
    }

    async fn send_typing(&self, status: TypingStatus) -> Result<(), TransportError> {
        let mut inner = self.inner.lock().unwrap();

        if !inner.connected {
            return Err(TransportError::NotConnected);
        }
        if let Some(error) = inner.fail_next_typing.take() {
            return Err(TransportError::SendFailed(error));
        }

        inner.sent.push(ClientEvent::TypingStatus(status));
        Ok(())
    }

    async fn next_event(&self) -> Result<ServerEvent, TransportError> {
        loop {
            {
                let mut inner = self.inner.lock().unwrap();

                if !inner.connected {
                    return Err(TransportError::NotConnected);
                }
                if let Some(error) = inner.fail_next_event.take() {
                    return Err(TransportError::ReceiveFailed(error));
                }
                if let Some(event) = inner.events.pop_front() {
                    return Ok(event);
                }
                if !inner.keep_open {
                    return Err(TransportError::ConnectionClosed);
                }
            }
            // Idle stream: poll until an event is queued.
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    fn is_connected(&self) -> bool {
        let inner = self.inner.lock().unwrap();
        inner.connected
    }

    async fn close(&self) -> Result<(), TransportError> {
        let mut inner = self.inner.lock().unwrap();
        inner.connected = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_chat_types::{ChatId, MessageId, MessageStatus, SenderId};

    fn request() -> SendRequest {
        SendRequest {
            sender_id: SenderId::new("u1"),
            body: "hi".into(),
            time: 1000,
            chat_id: ChatId::new("c1"),
            contains_badword: false,
            reply_to: None,
        }
    }

    fn confirmed(id: &str) -> Message {
        Message {
            id: MessageId::new(id),
            sender_id: SenderId::new("u1"),
            chat_id: ChatId::new("c1"),
            body: "hi".into(),
            time: 1000,
            status: MessageStatus::Sent,
            is_edited: false,
            edit_history: Vec::new(),
            contains_badword: false,
            is_read: false,
            reply_to: None,
            origin_id: None,
        }
    }

    // ===========================================
    // MockTransport Basic Tests
    // ===========================================

    #[tokio::test]
    async fn mock_transport_connects() {
        let transport = MockTransport::new();
        assert!(!transport.is_connected());

        transport.connect("test-relay").await.unwrap();

        assert!(transport.is_connected());
        assert_eq!(
            transport.connected_address(),
            Some("test-relay".to_string())
        );
    }

    #[tokio::test]
    async fn send_message_returns_queued_confirmation() {
        let transport = MockTransport::new();
        transport.connect("relay").await.unwrap();
        transport.queue_confirmation(confirmed("s1"));

        let echo = transport.send_message(request()).await.unwrap();
        assert_eq!(echo.id, MessageId::new("s1"));

        let sent = transport.sent_events();
        assert_eq!(sent.len(), 1);
        assert!(matches!(sent[0], ClientEvent::SendMessage(_)));
    }

    #[tokio::test]
    async fn send_message_without_confirmation_times_out() {
        let transport = MockTransport::new();
        transport.connect("relay").await.unwrap();

        let result = transport.send_message(request()).await;
        assert!(matches!(result, Err(TransportError::Timeout)));
    }

    #[tokio::test]
    async fn next_event_drains_queue_then_closes() {
        let transport = MockTransport::new();
        transport.connect("relay").await.unwrap();
        transport.queue_event(ServerEvent::SendFailed {
            message: "rate limited".into(),
        });

        assert!(matches!(
            transport.next_event().await,
            Ok(ServerEvent::SendFailed { .. })
        ));
        assert!(matches!(
            transport.next_event().await,
            Err(TransportError::ConnectionClosed)
        ));
    }

    #[tokio::test]
    async fn typing_emissions_are_filtered_from_traffic() {
        let transport = MockTransport::new();
        transport.connect("relay").await.unwrap();

        transport
            .send_typing(TypingStatus {
                chat_id: ChatId::new("c1"),
                is_typing: true,
            })
            .await
            .unwrap();

        let typing = transport.typing_emissions();
        assert_eq!(typing.len(), 1);
        assert!(typing[0].is_typing);
    }

    // ===========================================
    // Error Condition Tests
    // ===========================================

    #[tokio::test]
    async fn calls_without_connect_fail() {
        let transport = MockTransport::new();

        assert!(matches!(
            transport.send_message(request()).await,
            Err(TransportError::NotConnected)
        ));
        assert!(matches!(
            transport.next_event().await,
            Err(TransportError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn forced_connect_failure() {
        let transport = MockTransport::new();
        transport.fail_next_connect("network unreachable");

        let result = transport.connect("relay").await;
        assert!(matches!(result, Err(TransportError::ConnectionFailed(_))));
        assert!(!transport.is_connected());
    }

    #[tokio::test]
    async fn forced_request_failure_is_one_shot() {
        let transport = MockTransport::new();
        transport.connect("relay").await.unwrap();
        transport.fail_next_request("buffer full");
        transport.queue_confirmation(confirmed("s1"));

        let result = transport.send_message(request()).await;
        assert!(matches!(result, Err(TransportError::SendFailed(_))));

        // Next request should work and consume the confirmation.
        transport.send_message(request()).await.unwrap();
    }

    #[tokio::test]
    async fn forced_event_failure() {
        let transport = MockTransport::new();
        transport.connect("relay").await.unwrap();
        transport.fail_next_event("stream reset");

        let result = transport.next_event().await;
        assert!(matches!(result, Err(TransportError::ReceiveFailed(_))));
    }

    // ===========================================
    // Clone and Shared State Tests
    // ===========================================

    #[tokio::test]
    async fn clone_shares_state() {
        let transport1 = MockTransport::new();
        let transport2 = transport1.clone();

        transport1.connect("relay").await.unwrap();
        assert!(transport2.is_connected());

        transport2.queue_confirmation(confirmed("s1"));
        transport1.send_message(request()).await.unwrap();
        assert_eq!(transport2.sent_events().len(), 1);
    }

    #[tokio::test]
    async fn reset_clears_all() {
        let transport = MockTransport::new();
        transport.connect("relay").await.unwrap();
        transport.queue_confirmation(confirmed("s1"));
        transport.send_message(request()).await.unwrap();

        transport.reset();

        assert!(!transport.is_connected());
        assert!(transport.sent_events().is_empty());
        assert!(transport.connected_address().is_none());
    }

    #[tokio::test]
    async fn keep_open_waits_for_late_events() {
        let transport = MockTransport::new();
        transport.connect("relay").await.unwrap();
        transport.keep_open(true);

        let reader = transport.clone();
        let task = tokio::spawn(async move { reader.next_event().await });

        tokio::time::sleep(Duration::from_millis(20)).await;
        transport.queue_event(ServerEvent::SendFailed {
            message: "late".into(),
        });

        let event = task.await.unwrap().unwrap();
        assert!(matches!(event, ServerEvent::SendFailed { .. }));
    }
}
