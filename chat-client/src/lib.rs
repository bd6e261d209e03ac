//! # chat-client
//!
//! Async orchestration for the parley two-party chat core.
//!
//! This is the layer applications embed: it drives outbound intents against
//! the relay and reconciles inbound pushes into the shared message store.
//!
//! ## Features
//!
//! - **Optimistic sends**: immediate local echo, converging to the relay's
//!   authoritative outcome (sent or failed, always retryable on failure)
//! - **Idempotent inbound reconciliation**: relay pushes (new, edit, delete,
//!   read receipt, rejection notice) apply in causal order without duplicates
//! - **Transport Abstraction**: pluggable connection layer (socket, mock)
//! - **Pure Core**: all state logic lives in chat-core, instantly testable
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use parley_chat_client::{ChatConfig, EventReconciler, MockTransport, NullNotifier, Synchronizer};
//! use parley_chat_core::{MessageStore, WordListFilter};
//! use parley_chat_types::{ChatId, SenderId};
//! use tokio::sync::Mutex;
//!
//! let transport = Arc::new(MockTransport::new());
//! transport.connect("relay-address").await?;
//! let store = Arc::new(Mutex::new(MessageStore::new()));
//! let config = ChatConfig::new(SenderId::new("u1"));
//!
//! let sync = Synchronizer::new(config, Arc::clone(&transport), Arc::clone(&store),
//!     Arc::new(WordListFilter::default()));
//! let events = EventReconciler::new(transport, store, NullNotifier).start();
//!
//! sync.send(&ChatId::new("c1"), "hello", None).await?;
//! events.stop().await;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod notify;
pub mod reconciler;
pub mod sync;
pub mod transport;

pub use notify::{Notifier, NullNotifier};
pub use reconciler::{EventReconciler, ReconcilerHandle};
pub use sync::{ChatConfig, ClientError, EditOutcome, SendOutcome, Synchronizer};
pub use transport::{MockTransport, Transport, TransportError};
