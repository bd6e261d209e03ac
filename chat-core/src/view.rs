//! Presentation-ready conversation derivation.

use parley_chat_types::{ChatId, Message};

use crate::{MessageCipher, MessageStore, ReplyPreview, ReplyResolver};

/// A message prepared for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    /// The underlying record, body still in wire form.
    pub message: Message,
    /// The decrypted display body.
    pub body: String,
    /// The resolved reply reference.
    pub reply: ReplyPreview,
}

/// Derive the sorted, decrypted, reply-annotated view of a conversation.
///
/// Messages come out ordered by client time ascending; each body is run
/// through the display cipher and each reply reference is resolved against
/// the current store state.
pub fn render_conversation(
    store: &MessageStore,
    chat_id: &ChatId,
    cipher: &dyn MessageCipher,
) -> Vec<RenderedMessage> {
    let resolver = ReplyResolver::new(store, cipher);
    store
        .sorted_messages(chat_id)
        .into_iter()
        .map(|msg| RenderedMessage {
            body: cipher.decrypt(&msg.body),
            reply: resolver.resolve(chat_id, msg.reply_to.as_ref()),
            message: msg.clone(),
        })
        .collect()
}
