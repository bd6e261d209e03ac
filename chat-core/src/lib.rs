//! # chat-core
//!
//! Pure logic for the parley chat client core (no I/O, instant tests).
//!
//! This crate holds the state and derivation logic of the engine without any
//! network or timer I/O, enabling fast unit tests.
//!
//! ## Design Philosophy
//!
//! All modules in this crate are **pure** - they take input and produce
//! output without side effects. This enables:
//! - Instant unit tests (no mocks, no async)
//! - Deterministic behavior (same input → same output)
//! - Easy reasoning about state transitions
//!
//! The actual I/O (transport calls, clocks, notification delivery) is
//! performed by `chat-client`, which drives these modules.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cipher;
pub mod profanity;
pub mod reply;
pub mod store;
pub mod throttle;
pub mod view;

pub use cipher::{MessageCipher, PlaintextCipher};
pub use profanity::{ProfanityFilter, WordListFilter};
pub use reply::{ReplyPreview, ReplyResolver};
pub use store::{MessageStore, StoreError};
pub use throttle::{TypingThrottle, DEFAULT_TYPING_INTERVAL_MS};
pub use view::{render_conversation, RenderedMessage};
