//! Outbound intent orchestration.
//!
//! [`Synchronizer`] drives send and edit intents against the transport and
//! reconciles the results into the shared [`MessageStore`] with
//! optimistic-then-confirm semantics: the caller gets an immediate local
//! echo while the store converges to the relay's authoritative outcome. The
//! two-phase add-then-upgrade on send accommodates relays that assign a
//! canonical id distinct from the client-chosen one.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use parley_chat_core::{
    MessageStore, ProfanityFilter, StoreError, TypingThrottle, DEFAULT_TYPING_INTERVAL_MS,
};
use parley_chat_types::{
    ChatId, EditRequest, Identity, Message, MessageId, MessageStatus, SendRequest, SenderId,
    TypingStatus,
};
use thiserror::Error;
use tokio::sync::Mutex;

use crate::transport::{Transport, TransportError};

/// Errors surfaced past the synchronizer boundary.
///
/// Transport failures never appear here - they are absorbed into
/// [`SendOutcome::Failed`] and [`EditOutcome::Aborted`]. What remains is not
/// locally recoverable.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The store and the relay have diverged in a way further mutation
    /// cannot safely repair; the session must be invalidated and
    /// re-authenticated.
    #[error("store consistency violation: {0}")]
    Consistency(#[from] StoreError),

    /// The local user is not authenticated; outbound intents are refused.
    #[error("not authenticated")]
    NotAuthenticated,
}

/// Result of a send intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// The full optimistic round trip completed; the store holds exactly
    /// one sent message under the relay's canonical id.
    Delivered(MessageId),
    /// The transport call failed or timed out; the store holds one failed,
    /// retryable message under a fresh client id.
    Failed(MessageId),
    /// Nothing to do (empty draft, or a resend target that is not failed).
    Ignored,
}

/// Result of an edit intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOutcome {
    /// Body, edited flag and history updated together.
    Applied(MessageId),
    /// The transport call failed; the message is untouched and the edit UI
    /// state resets.
    Aborted,
    /// Nothing to do (empty replacement body).
    Ignored,
}

/// Configuration for the synchronizer.
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// The local user's authentication state.
    pub identity: Identity,
    /// Timeout for send and edit round trips.
    pub request_timeout: Duration,
    /// Ack timeout for fire-and-forget typing emissions.
    pub typing_timeout: Duration,
    /// Coalescing interval for typing emissions, in milliseconds.
    pub typing_interval_ms: u64,
}

impl ChatConfig {
    /// Create a configuration for an authenticated sender.
    pub fn new(sender: SenderId) -> Self {
        Self {
            identity: Identity::Authenticated(sender),
            ..Self::anonymous()
        }
    }

    /// Create a configuration with no authenticated sender. Outbound
    /// intents are refused until an identity is present.
    pub fn anonymous() -> Self {
        Self {
            identity: Identity::Anonymous,
            request_timeout: Duration::from_secs(10),
            typing_timeout: Duration::from_secs(5),
            typing_interval_ms: DEFAULT_TYPING_INTERVAL_MS,
        }
    }

    /// Set the send/edit round-trip timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the typing coalescing interval.
    pub fn with_typing_interval_ms(mut self, interval_ms: u64) -> Self {
        self.typing_interval_ms = interval_ms;
        self
    }
}

/// Orchestrates outbound intents against the transport and the store.
pub struct Synchronizer<T: Transport> {
    config: ChatConfig,
    transport: Arc<T>,
    store: Arc<Mutex<MessageStore>>,
    profanity: Arc<dyn ProfanityFilter>,
    throttle: std::sync::Mutex<TypingThrottle>,
}

impl<T: Transport> Synchronizer<T> {
    /// Create a synchronizer over a shared store.
    pub fn new(
        config: ChatConfig,
        transport: Arc<T>,
        store: Arc<Mutex<MessageStore>>,
        profanity: Arc<dyn ProfanityFilter>,
    ) -> Self {
        let throttle = std::sync::Mutex::new(TypingThrottle::new(config.typing_interval_ms));
        Self {
            config,
            transport,
            store,
            profanity,
            throttle,
        }
    }

    /// The shared store.
    pub fn store(&self) -> Arc<Mutex<MessageStore>> {
        Arc::clone(&self.store)
    }

    /// Submit a new message.
    ///
    /// The draft is trimmed and screened once for profanity, stamped with
    /// client time, and pushed through the optimistic round trip. Returns
    /// [`SendOutcome::Delivered`] only when the relay confirmed and the
    /// store reconciled the confirmation.
    pub async fn send(
        &self,
        chat_id: &ChatId,
        draft: &str,
        reply_to: Option<MessageId>,
    ) -> Result<SendOutcome, ClientError> {
        let sender = self
            .config
            .identity
            .sender()
            .ok_or(ClientError::NotAuthenticated)?
            .clone();
        let body = draft.trim();
        if body.is_empty() {
            return Ok(SendOutcome::Ignored);
        }

        // Submitting a draft ends the typing indicator.
        self.emit_typing_direct(chat_id, false).await;

        let request = SendRequest {
            sender_id: sender,
            body: body.to_string(),
            time: now_ms(),
            chat_id: chat_id.clone(),
            contains_badword: self.profanity.is_profane(body),
            reply_to,
        };
        self.dispatch(request).await
    }

    /// Retry a failed message through the same pipeline.
    ///
    /// The original `time`, `contains_badword` and `reply_to` are reused so
    /// the retry keeps its place in the conversation; only the id is fresh.
    /// Unknown or non-failed targets are ignored.
    pub async fn resend(
        &self,
        chat_id: &ChatId,
        id: &MessageId,
    ) -> Result<SendOutcome, ClientError> {
        let sender = self
            .config
            .identity
            .sender()
            .ok_or(ClientError::NotAuthenticated)?
            .clone();

        let failed = {
            let store = self.store.lock().await;
            store.get(chat_id, id).cloned()
        };
        let Some(failed) = failed else {
            return Ok(SendOutcome::Ignored);
        };
        if !failed.status.is_failed() {
            return Ok(SendOutcome::Ignored);
        }

        {
            let mut store = self.store.lock().await;
            store.remove_message(chat_id, id);
        }

        let request = SendRequest {
            sender_id: sender,
            body: failed.body,
            time: failed.time,
            chat_id: chat_id.clone(),
            contains_badword: failed.contains_badword,
            reply_to: failed.reply_to,
        };
        self.dispatch(request).await
    }

    /// Edit an existing message.
    ///
    /// Atomic: on success the body, the edited flag and the history change
    /// together in one store mutation; on transport failure nothing
    /// changes. The prior body travels with the request for server-side
    /// audit.
    pub async fn edit(
        &self,
        chat_id: &ChatId,
        id: &MessageId,
        new_body: &str,
    ) -> Result<EditOutcome, ClientError> {
        if !self.config.identity.is_authenticated() {
            return Err(ClientError::NotAuthenticated);
        }
        let new_body = new_body.trim();
        if new_body.is_empty() {
            return Ok(EditOutcome::Ignored);
        }

        let current = {
            let store = self.store.lock().await;
            store.get(chat_id, id).cloned()
        };
        let Some(current) = current else {
            // The UI is editing a message the store no longer has.
            return Err(ClientError::Consistency(StoreError::UnknownMessage {
                chat_id: chat_id.clone(),
                id: id.clone(),
            }));
        };

        let request = EditRequest {
            id: id.clone(),
            chat_id: chat_id.clone(),
            new_body: new_body.to_string(),
            old_body: current.body.clone(),
        };

        match self.request(self.transport.edit_message(request)).await {
            Ok(echo) => {
                let mut history = current.edit_history.clone();
                history.push(current.body.clone());

                let mut edited = echo;
                edited.is_edited = true;
                edited.edit_history = history;
                if edited.origin_id.is_none() {
                    edited.origin_id = Some(id.clone());
                }

                let mut store = self.store.lock().await;
                match store.update_message(edited, true) {
                    Ok(final_id) => Ok(EditOutcome::Applied(final_id)),
                    Err(err) => {
                        tracing::error!("edit reconciliation lost its target: {err}");
                        Err(ClientError::Consistency(err))
                    }
                }
            }
            Err(err) => {
                tracing::debug!(chat = %chat_id, "edit failed, leaving message untouched: {err}");
                Ok(EditOutcome::Aborted)
            }
        }
    }

    /// Record a typing-state change, emitting at most one indicator per
    /// configured interval. Fire-and-forget; transport errors are dropped.
    pub async fn set_typing(&self, chat_id: &ChatId, is_typing: bool) {
        let decision = {
            let mut throttle = self.throttle.lock().unwrap();
            throttle.offer(now_ms(), is_typing)
        };
        if let Some(state) = decision {
            self.emit_typing(chat_id, state).await;
        }
    }

    /// Deliver a coalesced trailing typing update, if one is held. Call
    /// after the throttle interval has passed (e.g. from the input loop).
    pub async fn flush_typing(&self, chat_id: &ChatId) {
        let decision = {
            let mut throttle = self.throttle.lock().unwrap();
            throttle.flush(now_ms())
        };
        if let Some(state) = decision {
            self.emit_typing(chat_id, state).await;
        }
    }

    /// Cancel an in-progress edit locally. No transport call for the edit
    /// itself, but the peer learns that typing stopped.
    pub async fn cancel_edit(&self, chat_id: &ChatId) {
        self.emit_typing_direct(chat_id, false).await;
    }

    /// Run one optimistic send round trip.
    async fn dispatch(&self, request: SendRequest) -> Result<SendOutcome, ClientError> {
        match self
            .request(self.transport.send_message(request.clone()))
            .await
        {
            Ok(confirmed) => {
                let placeholder_id = MessageId::random();

                // Placeholder and upgrade happen under one lock scope so no
                // reader or inbound event sees the intermediate state.
                let mut store = self.store.lock().await;
                store.add_message(placeholder(placeholder_id.clone(), &request));

                let mut upgraded = confirmed;
                upgraded.status = MessageStatus::Sent;
                upgraded.origin_id = Some(placeholder_id);

                match store.update_message(upgraded, false) {
                    Ok(final_id) => Ok(SendOutcome::Delivered(final_id)),
                    Err(err) => {
                        tracing::error!("send reconciliation lost its placeholder: {err}");
                        Err(ClientError::Consistency(err))
                    }
                }
            }
            Err(err) => {
                tracing::warn!(chat = %request.chat_id, "send failed: {err}");
                let failed_id = MessageId::random();
                let mut msg = placeholder(failed_id.clone(), &request);
                msg.status = MessageStatus::Failed;

                let mut store = self.store.lock().await;
                store.add_message(msg);
                Ok(SendOutcome::Failed(failed_id))
            }
        }
    }

    /// Apply the configured request timeout to a transport call.
    async fn request<F, R>(&self, call: F) -> Result<R, TransportError>
    where
        F: std::future::Future<Output = Result<R, TransportError>>,
    {
        match tokio::time::timeout(self.config.request_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout),
        }
    }

    /// Unthrottled emission (submit and edit-cancel bypass the coalescer).
    async fn emit_typing_direct(&self, chat_id: &ChatId, is_typing: bool) {
        {
            let mut throttle = self.throttle.lock().unwrap();
            throttle.mark_sent(now_ms(), is_typing);
        }
        self.emit_typing(chat_id, is_typing).await;
    }

    async fn emit_typing(&self, chat_id: &ChatId, is_typing: bool) {
        let status = TypingStatus {
            chat_id: chat_id.clone(),
            is_typing,
        };
        let result =
            tokio::time::timeout(self.config.typing_timeout, self.transport.send_typing(status))
                .await;
        match result {
            Ok(Ok(())) => {}
            Ok(Err(err)) => tracing::debug!("typing emission failed: {err}"),
            Err(_) => tracing::debug!("typing emission timed out"),
        }
    }
}

/// The optimistic local echo of an outbound request.
fn placeholder(id: MessageId, request: &SendRequest) -> Message {
    Message {
        id,
        sender_id: request.sender_id.clone(),
        chat_id: request.chat_id.clone(),
        body: request.body.clone(),
        time: request.time,
        status: MessageStatus::Pending,
        is_edited: false,
        edit_history: Vec::new(),
        contains_badword: request.contains_badword,
        is_read: false,
        reply_to: request.reply_to.clone(),
        origin_id: None,
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
