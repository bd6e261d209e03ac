//! Reply reference resolution.
//!
//! A reply points at an earlier message that may have been deleted or never
//! synced locally. Resolution happens against the store at display time,
//! independent of delivery order, and always produces a value - a missing
//! original is a normal display state, not an error.

use parley_chat_types::{ChatId, MessageId, SenderId};

use crate::{MessageCipher, MessageStore};

/// The resolved display form of a reply reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyPreview {
    /// The message is not a reply.
    NotAReply,
    /// The referenced message is gone (deleted or never synced). Rendered
    /// distinctly from a blank reply; never retried.
    Unavailable,
    /// The referenced message, decrypted for display.
    Quoted {
        /// Id of the original message.
        id: MessageId,
        /// Author of the original message.
        sender_id: SenderId,
        /// Decrypted body of the original message.
        body: String,
        /// Client timestamp of the original message.
        time: u64,
    },
}

/// Resolves reply references against the store.
pub struct ReplyResolver<'a> {
    store: &'a MessageStore,
    cipher: &'a dyn MessageCipher,
}

impl<'a> ReplyResolver<'a> {
    /// Create a resolver over the given store and display cipher.
    pub fn new(store: &'a MessageStore, cipher: &'a dyn MessageCipher) -> Self {
        Self { store, cipher }
    }

    /// Resolve a reply reference to its display form.
    pub fn resolve(&self, chat_id: &ChatId, reply_to: Option<&MessageId>) -> ReplyPreview {
        let Some(id) = reply_to else {
            return ReplyPreview::NotAReply;
        };
        match self.store.get(chat_id, id) {
            None => ReplyPreview::Unavailable,
            Some(original) => ReplyPreview::Quoted {
                id: original.id.clone(),
                sender_id: original.sender_id.clone(),
                body: self.cipher.decrypt(&original.body),
                time: original.time,
            },
        }
    }
}
