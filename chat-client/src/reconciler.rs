//! Inbound event reconciliation.
//!
//! [`EventReconciler`] consumes relay push events and applies them to the
//! shared [`MessageStore`] with idempotent, order-tolerant semantics. Events
//! for the same message are assumed to arrive in causal order from the
//! transport; the reconciler does not buffer or reorder.

use std::sync::Arc;

use parley_chat_core::MessageStore;
use parley_chat_types::ServerEvent;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;

use crate::notify::Notifier;
use crate::sync::ClientError;
use crate::transport::{Transport, TransportError};

/// Applies relay push events to the store.
pub struct EventReconciler<T, N> {
    transport: Arc<T>,
    store: Arc<Mutex<MessageStore>>,
    notifier: N,
}

impl<T, N> EventReconciler<T, N>
where
    T: Transport + 'static,
    N: Notifier + 'static,
{
    /// Create a reconciler over a shared store.
    pub fn new(transport: Arc<T>, store: Arc<Mutex<MessageStore>>, notifier: N) -> Self {
        Self {
            transport,
            store,
            notifier,
        }
    }

    /// Apply one relay event to the store.
    ///
    /// Safe to call repeatedly with the same event: new-message pushes are
    /// upserts, deletes and read receipts are no-ops when already applied.
    /// The only failure is a relayed edit whose target cannot be resolved -
    /// the store has diverged and the session must be invalidated.
    pub async fn apply(&self, event: ServerEvent) -> Result<(), ClientError> {
        match event {
            ServerEvent::ReceiveMessage(message) => {
                {
                    let mut store = self.store.lock().await;
                    store.add_message(message.clone());
                }
                self.notifier.message_received(&message);
                Ok(())
            }
            ServerEvent::DeleteMessage { id, chat_id } => {
                let mut store = self.store.lock().await;
                store.remove_message(&chat_id, &id);
                Ok(())
            }
            ServerEvent::EditMessage(mut message) => {
                message.is_edited = true;
                let mut store = self.store.lock().await;
                store.update_message(message, true)?;
                Ok(())
            }
            ServerEvent::ReadMessage {
                message_id,
                chat_id,
            } => {
                let mut store = self.store.lock().await;
                store.mark_read(&chat_id, &message_id);
                Ok(())
            }
            ServerEvent::SendFailed { message } => {
                // Notice only: no store mutation, no retry.
                self.notifier.send_rejected(&message);
                Ok(())
            }
        }
    }

    /// Start consuming relay events on a background task.
    ///
    /// The task runs until the stream closes, a consistency fault
    /// invalidates the session, or [`ReconcilerHandle::stop`] is called.
    /// Dropping the handle also stops the task.
    pub fn start(self) -> ReconcilerHandle {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => {
                        tracing::debug!("event reconciler stopped");
                        break;
                    }
                    event = self.transport.next_event() => match event {
                        Ok(event) => {
                            if let Err(err) = self.apply(event).await {
                                tracing::error!("inbound reconciliation failed: {err}");
                                self.notifier.session_invalidated();
                                break;
                            }
                        }
                        Err(TransportError::ConnectionClosed) => {
                            tracing::debug!("event stream closed");
                            break;
                        }
                        Err(err) => {
                            tracing::warn!("event stream error: {err}");
                            break;
                        }
                    }
                }
            }
        });
        ReconcilerHandle {
            shutdown: shutdown_tx,
            task,
        }
    }
}

/// Handle to a running reconciler task.
pub struct ReconcilerHandle {
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl ReconcilerHandle {
    /// Signal shutdown and wait for the task to finish. Events arriving
    /// after this returns are no longer applied.
    pub async fn stop(self) {
        let _ = self.shutdown.send(());
        let _ = self.task.await;
    }

    /// Check whether the task has already finished on its own.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
