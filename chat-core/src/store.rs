//! In-memory message state, keyed per conversation.
//!
//! [`MessageStore`] is the single shared mutable resource of the engine: the
//! synchronizer writes outbound results into it, the event reconciler writes
//! inbound events into it, and the view layer reads from it. It is plain
//! state; callers serialize access (the client crate holds it behind a
//! single mutex and each handler runs to completion).
//!
//! Besides the primary `(chat, id)` map the store keeps an original-id
//! index: when an authoritative update re-keys an entry (the relay assigned
//! a canonical id different from the local one), the old id keeps resolving
//! to the live entry. Relayed edits may reference a message by any id it has
//! ever had.

use std::collections::HashMap;

use parley_chat_types::{ChatId, Message, MessageId, SenderId};
use thiserror::Error;

/// Errors from store mutations.
///
/// Both variants mean the store and the relay have diverged; callers treat
/// them as fatal to the triggering operation rather than papering over with
/// a duplicate entry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// No live message matches the update.
    #[error("unknown message {id} in chat {chat_id}")]
    UnknownMessage {
        /// Conversation that was searched.
        chat_id: ChatId,
        /// The id that failed to resolve.
        id: MessageId,
    },

    /// More than one live message claims the same original id.
    #[error("original id {id} in chat {chat_id} matches {candidates} live messages")]
    AmbiguousMatch {
        /// Conversation that was searched.
        chat_id: ChatId,
        /// The original id that matched multiple entries.
        id: MessageId,
        /// How many live entries matched.
        candidates: usize,
    },
}

#[derive(Debug, Default)]
struct ChatHistory {
    messages: HashMap<MessageId, Message>,
    /// original id -> current ids of the entries that superseded it
    origin_index: HashMap<MessageId, Vec<MessageId>>,
}

impl ChatHistory {
    fn resolve_origin(&self, chat_id: &ChatId, id: &MessageId) -> Result<MessageId, StoreError> {
        let live: Vec<&MessageId> = self
            .origin_index
            .get(id)
            .map(|ids| {
                ids.iter()
                    .filter(|current| self.messages.contains_key(*current))
                    .collect()
            })
            .unwrap_or_default();

        match live.as_slice() {
            [] => Err(StoreError::UnknownMessage {
                chat_id: chat_id.clone(),
                id: id.clone(),
            }),
            [one] => Ok((*one).clone()),
            many => Err(StoreError::AmbiguousMatch {
                chat_id: chat_id.clone(),
                id: id.clone(),
                candidates: many.len(),
            }),
        }
    }

    fn rekey(&mut self, old: &MessageId, new: &MessageId) {
        // Chains: anything that resolved to the old id now resolves to the
        // new one, so an edit referencing the root of several renames still
        // lands on the live entry.
        for ids in self.origin_index.values_mut() {
            for id in ids.iter_mut() {
                if id == old {
                    *id = new.clone();
                }
            }
        }
        self.origin_index
            .entry(old.clone())
            .or_default()
            .push(new.clone());
    }
}

/// In-memory keyed collection of messages per conversation.
#[derive(Debug, Default)]
pub struct MessageStore {
    chats: HashMap<ChatId, ChatHistory>,
}

impl MessageStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a message, keyed by `(chat_id, id)`.
    pub fn add_message(&mut self, msg: Message) {
        self.chats
            .entry(msg.chat_id.clone())
            .or_default()
            .messages
            .insert(msg.id.clone(), msg);
    }

    /// Merge an authoritative update into an existing message.
    ///
    /// The target is located by, in order: the incoming id; the incoming
    /// `origin_id` (the pending-placeholder upgrade path, where the relay's
    /// canonical id replaces the client-chosen one); and, when
    /// `match_by_original_id` is set, the original-id index (relayed edits
    /// may reference a message by its root id). Zero live candidates in the
    /// index is [`StoreError::UnknownMessage`]; more than one is
    /// [`StoreError::AmbiguousMatch`].
    ///
    /// Merge rules: `body` and `status` follow the update; `time`,
    /// `sender_id`, `contains_badword` and a set `reply_to` stay with the
    /// existing entry; `edit_history` only grows; `is_read` and `is_edited`
    /// never flip back to false. An update arriving through the origin hint
    /// re-keys the entry to the relay's canonical id and records the old id
    /// in the original-id index; one resolved through the index keeps the
    /// live entry's id.
    ///
    /// Returns the message's final id.
    pub fn update_message(
        &mut self,
        incoming: Message,
        match_by_original_id: bool,
    ) -> Result<MessageId, StoreError> {
        let chat_id = incoming.chat_id.clone();
        let unknown = |id: &MessageId| StoreError::UnknownMessage {
            chat_id: chat_id.clone(),
            id: id.clone(),
        };

        let Some(chat) = self.chats.get_mut(&chat_id) else {
            return Err(unknown(&incoming.id));
        };

        // The located entry, and the id the merged entry keeps. An update
        // arriving through the origin hint carries the relay's new canonical
        // id; one resolved through the index referenced an old id, so the
        // live entry's id stands.
        let (target, final_id) = if chat.messages.contains_key(&incoming.id) {
            (incoming.id.clone(), incoming.id.clone())
        } else if let Some(orig) = incoming
            .origin_id
            .as_ref()
            .filter(|orig| chat.messages.contains_key(*orig))
        {
            (orig.clone(), incoming.id.clone())
        } else if match_by_original_id {
            let current = chat.resolve_origin(&chat_id, &incoming.id)?;
            (current.clone(), current)
        } else {
            return Err(unknown(&incoming.id));
        };

        let Some(existing) = chat.messages.remove(&target) else {
            return Err(unknown(&target));
        };

        let merged = merge(existing, incoming, final_id.clone());
        if final_id != target {
            chat.rekey(&target, &final_id);
        }
        chat.messages.insert(final_id.clone(), merged);
        Ok(final_id)
    }

    /// Delete a message. Deleting an absent id is a no-op.
    pub fn remove_message(&mut self, chat_id: &ChatId, id: &MessageId) {
        if let Some(chat) = self.chats.get_mut(chat_id) {
            chat.messages.remove(id);
            chat.origin_index.retain(|_, ids| {
                ids.retain(|current| current != id);
                !ids.is_empty()
            });
        }
    }

    /// Apply a read receipt. Idempotent; a no-op when the message is absent.
    pub fn mark_read(&mut self, chat_id: &ChatId, id: &MessageId) {
        if let Some(msg) = self
            .chats
            .get_mut(chat_id)
            .and_then(|chat| chat.messages.get_mut(id))
        {
            msg.is_read = true;
        }
    }

    /// Look up a message by id.
    pub fn get(&self, chat_id: &ChatId, id: &MessageId) -> Option<&Message> {
        self.chats.get(chat_id)?.messages.get(id)
    }

    /// All messages of a chat ordered by client time, ascending.
    ///
    /// Ties break on id so the order is deterministic regardless of
    /// insertion order.
    pub fn sorted_messages(&self, chat_id: &ChatId) -> Vec<&Message> {
        let mut msgs: Vec<&Message> = self
            .chats
            .get(chat_id)
            .map(|chat| chat.messages.values().collect())
            .unwrap_or_default();
        msgs.sort_by(|a, b| {
            a.time
                .cmp(&b.time)
                .then_with(|| a.id.as_str().cmp(b.id.as_str()))
        });
        msgs
    }

    /// Newest `time` among messages not authored by `own`.
    ///
    /// Feeds the embedding application's partner-inactivity notice.
    pub fn latest_peer_activity(&self, chat_id: &ChatId, own: &SenderId) -> Option<u64> {
        self.chats
            .get(chat_id)?
            .messages
            .values()
            .filter(|msg| &msg.sender_id != own)
            .map(|msg| msg.time)
            .max()
    }

    /// Number of live messages in a chat.
    pub fn len(&self, chat_id: &ChatId) -> usize {
        self.chats.get(chat_id).map_or(0, |chat| chat.messages.len())
    }

    /// Check whether a chat holds no messages.
    pub fn is_empty(&self, chat_id: &ChatId) -> bool {
        self.len(chat_id) == 0
    }

    /// Drop all state for a chat (conversation closed).
    pub fn clear_chat(&mut self, chat_id: &ChatId) {
        self.chats.remove(chat_id);
    }
}

/// Field-level reconciliation of an authoritative update into an existing
/// entry.
fn merge(existing: Message, incoming: Message, id: MessageId) -> Message {
    let edit_history = if incoming.edit_history.len() >= existing.edit_history.len() {
        incoming.edit_history
    } else {
        existing.edit_history
    };
    Message {
        id,
        sender_id: existing.sender_id,
        chat_id: existing.chat_id,
        body: incoming.body,
        // Client-assigned, never revised by the relay.
        time: existing.time,
        status: incoming.status,
        is_edited: existing.is_edited || incoming.is_edited,
        edit_history,
        // Screened once at creation.
        contains_badword: existing.contains_badword,
        is_read: existing.is_read || incoming.is_read,
        reply_to: existing.reply_to.or(incoming.reply_to),
        origin_id: existing.origin_id.or(incoming.origin_id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_chat_types::MessageStatus;

    fn chat() -> ChatId {
        ChatId::new("c1")
    }

    fn msg(id: &str, time: u64) -> Message {
        Message {
            id: MessageId::new(id),
            sender_id: SenderId::new("u1"),
            chat_id: chat(),
            body: format!("body-{id}"),
            time,
            status: MessageStatus::Sent,
            is_edited: false,
            edit_history: Vec::new(),
            contains_badword: false,
            is_read: false,
            reply_to: None,
            origin_id: None,
        }
    }

    fn pending(id: &str, time: u64) -> Message {
        Message {
            status: MessageStatus::Pending,
            ..msg(id, time)
        }
    }

    // ===========================================
    // Add / Get Tests
    // ===========================================

    #[test]
    fn add_then_get() {
        let mut store = MessageStore::new();
        store.add_message(msg("m1", 1000));

        let found = store.get(&chat(), &MessageId::new("m1")).unwrap();
        assert_eq!(found.body, "body-m1");
        assert_eq!(store.len(&chat()), 1);
    }

    #[test]
    fn add_is_an_upsert() {
        let mut store = MessageStore::new();
        store.add_message(msg("m1", 1000));

        let mut replacement = msg("m1", 1000);
        replacement.body = "replaced".into();
        store.add_message(replacement);

        assert_eq!(store.len(&chat()), 1);
        assert_eq!(store.get(&chat(), &MessageId::new("m1")).unwrap().body, "replaced");
    }

    #[test]
    fn get_unknown_returns_none() {
        let store = MessageStore::new();
        assert!(store.get(&chat(), &MessageId::new("nope")).is_none());
        assert!(store.is_empty(&chat()));
    }

    // ===========================================
    // Update Tests
    // ===========================================

    #[test]
    fn update_promotes_pending_to_sent() {
        let mut store = MessageStore::new();
        store.add_message(pending("m1", 1000));

        let update = msg("m1", 1000);
        let id = store.update_message(update, false).unwrap();

        assert_eq!(id, MessageId::new("m1"));
        let found = store.get(&chat(), &id).unwrap();
        assert!(found.status.is_sent());
    }

    #[test]
    fn update_unknown_id_fails() {
        let mut store = MessageStore::new();
        store.add_message(msg("m1", 1000));

        let result = store.update_message(msg("other", 1000), false);
        assert!(matches!(result, Err(StoreError::UnknownMessage { .. })));
    }

    #[test]
    fn update_on_empty_chat_fails() {
        let mut store = MessageStore::new();
        let result = store.update_message(msg("m1", 1000), true);
        assert!(matches!(result, Err(StoreError::UnknownMessage { .. })));
    }

    #[test]
    fn update_via_origin_hint_rekeys_entry() {
        let mut store = MessageStore::new();
        store.add_message(pending("client-1", 1000));

        // Relay confirmed under a canonical id.
        let mut confirmed = msg("server-1", 1000);
        confirmed.origin_id = Some(MessageId::new("client-1"));

        let id = store.update_message(confirmed, false).unwrap();
        assert_eq!(id, MessageId::new("server-1"));

        // Exactly one live entry, under the new id.
        assert_eq!(store.len(&chat()), 1);
        assert!(store.get(&chat(), &MessageId::new("client-1")).is_none());
        let found = store.get(&chat(), &MessageId::new("server-1")).unwrap();
        assert!(found.status.is_sent());
    }

    #[test]
    fn update_by_original_id_resolves_renamed_entry() {
        let mut store = MessageStore::new();
        store.add_message(pending("client-1", 1000));
        let mut confirmed = msg("server-1", 1000);
        confirmed.origin_id = Some(MessageId::new("client-1"));
        store.update_message(confirmed, false).unwrap();

        // A relayed edit referencing the old client id still lands.
        let mut edit = msg("client-1", 1000);
        edit.body = "edited".into();
        edit.is_edited = true;

        let id = store.update_message(edit, true).unwrap();
        assert_eq!(store.len(&chat()), 1);
        let found = store.get(&chat(), &id).unwrap();
        assert_eq!(found.body, "edited");
        assert!(found.is_edited);
    }

    #[test]
    fn update_by_original_id_follows_rename_chains() {
        let mut store = MessageStore::new();
        store.add_message(pending("a", 1000));

        let mut first = msg("b", 1000);
        first.origin_id = Some(MessageId::new("a"));
        store.update_message(first, false).unwrap();

        let mut second = msg("c", 1000);
        second.origin_id = Some(MessageId::new("b"));
        store.update_message(second, false).unwrap();

        // The root id resolves through both renames; the live entry keeps
        // its current id.
        let edit = msg("a", 1000);
        let id = store.update_message(edit, true).unwrap();
        assert_eq!(id, MessageId::new("c"));
        assert_eq!(store.len(&chat()), 1);
    }

    #[test]
    fn update_by_original_id_without_flag_fails() {
        let mut store = MessageStore::new();
        store.add_message(pending("client-1", 1000));
        let mut confirmed = msg("server-1", 1000);
        confirmed.origin_id = Some(MessageId::new("client-1"));
        store.update_message(confirmed, false).unwrap();

        let result = store.update_message(msg("client-1", 1000), false);
        assert!(matches!(result, Err(StoreError::UnknownMessage { .. })));
    }

    #[test]
    fn ambiguous_original_id_is_an_error() {
        let mut store = MessageStore::new();

        // Two live entries end up correlated to the same root id "x":
        // a confirmed rename x -> y, then a reused placeholder x renamed
        // x -> z.
        store.add_message(pending("x", 1000));
        let mut renamed = msg("y", 1000);
        renamed.origin_id = Some(MessageId::new("x"));
        store.update_message(renamed, false).unwrap();

        store.add_message(pending("x", 2000));
        let mut renamed = msg("z", 2000);
        renamed.origin_id = Some(MessageId::new("x"));
        store.update_message(renamed, false).unwrap();

        let result = store.update_message(msg("x", 1000), true);
        assert!(matches!(
            result,
            Err(StoreError::AmbiguousMatch { candidates: 2, .. })
        ));
    }

    // ===========================================
    // Merge Rule Tests
    // ===========================================

    #[test]
    fn merge_keeps_client_time() {
        let mut store = MessageStore::new();
        store.add_message(pending("m1", 1000));

        let mut update = msg("m1", 9999);
        update.body = "confirmed".into();
        store.update_message(update, false).unwrap();

        let found = store.get(&chat(), &MessageId::new("m1")).unwrap();
        assert_eq!(found.time, 1000);
        assert_eq!(found.body, "confirmed");
    }

    #[test]
    fn merge_keeps_reply_target() {
        let mut store = MessageStore::new();
        let mut original = pending("m1", 1000);
        original.reply_to = Some(MessageId::new("m0"));
        store.add_message(original);

        let mut update = msg("m1", 1000);
        update.reply_to = Some(MessageId::new("hijacked"));
        store.update_message(update, false).unwrap();

        let found = store.get(&chat(), &MessageId::new("m1")).unwrap();
        assert_eq!(found.reply_to, Some(MessageId::new("m0")));
    }

    #[test]
    fn merge_keeps_badword_screen() {
        let mut store = MessageStore::new();
        let mut original = pending("m1", 1000);
        original.contains_badword = true;
        store.add_message(original);

        store.update_message(msg("m1", 1000), false).unwrap();

        let found = store.get(&chat(), &MessageId::new("m1")).unwrap();
        assert!(found.contains_badword);
    }

    #[test]
    fn edit_history_only_grows() {
        let mut store = MessageStore::new();
        let mut original = msg("m1", 1000);
        original.edit_history = vec!["v1".into(), "v2".into()];
        original.is_edited = true;
        store.add_message(original);

        // An echo carrying a shorter history must not shrink it.
        let mut update = msg("m1", 1000);
        update.edit_history = vec!["v1".into()];
        store.update_message(update, false).unwrap();

        let found = store.get(&chat(), &MessageId::new("m1")).unwrap();
        assert_eq!(found.edit_history, vec!["v1".to_string(), "v2".to_string()]);
        assert!(found.is_edited);
    }

    #[test]
    fn read_flag_survives_edit_echo() {
        let mut store = MessageStore::new();
        let mut original = msg("m1", 1000);
        original.is_read = true;
        store.add_message(original);

        let mut update = msg("m1", 1000);
        update.body = "edited".into();
        store.update_message(update, false).unwrap();

        let found = store.get(&chat(), &MessageId::new("m1")).unwrap();
        assert!(found.is_read);
        assert_eq!(found.body, "edited");
    }

    // ===========================================
    // Remove / Read Receipt Tests
    // ===========================================

    #[test]
    fn remove_deletes_message() {
        let mut store = MessageStore::new();
        store.add_message(msg("m1", 1000));

        store.remove_message(&chat(), &MessageId::new("m1"));
        assert!(store.get(&chat(), &MessageId::new("m1")).is_none());
    }

    #[test]
    fn remove_is_idempotent() {
        let mut store = MessageStore::new();
        store.add_message(msg("m1", 1000));

        store.remove_message(&chat(), &MessageId::new("m1"));
        store.remove_message(&chat(), &MessageId::new("m1"));
        store.remove_message(&ChatId::new("other"), &MessageId::new("m1"));

        assert!(store.is_empty(&chat()));
    }

    #[test]
    fn removed_entry_no_longer_resolves_via_original_id() {
        let mut store = MessageStore::new();
        store.add_message(pending("client-1", 1000));
        let mut confirmed = msg("server-1", 1000);
        confirmed.origin_id = Some(MessageId::new("client-1"));
        store.update_message(confirmed, false).unwrap();

        store.remove_message(&chat(), &MessageId::new("server-1"));

        let result = store.update_message(msg("client-1", 1000), true);
        assert!(matches!(result, Err(StoreError::UnknownMessage { .. })));
    }

    #[test]
    fn mark_read_sets_flag() {
        let mut store = MessageStore::new();
        store.add_message(msg("m1", 1000));

        store.mark_read(&chat(), &MessageId::new("m1"));
        assert!(store.get(&chat(), &MessageId::new("m1")).unwrap().is_read);
    }

    #[test]
    fn mark_read_is_idempotent() {
        let mut store = MessageStore::new();
        store.add_message(msg("m1", 1000));

        store.mark_read(&chat(), &MessageId::new("m1"));
        let after_first = store.get(&chat(), &MessageId::new("m1")).unwrap().clone();
        store.mark_read(&chat(), &MessageId::new("m1"));
        let after_second = store.get(&chat(), &MessageId::new("m1")).unwrap().clone();

        assert_eq!(after_first, after_second);
    }

    #[test]
    fn mark_read_on_absent_is_a_no_op() {
        let mut store = MessageStore::new();
        store.mark_read(&chat(), &MessageId::new("ghost"));
        assert!(store.is_empty(&chat()));
    }

    // ===========================================
    // Derived Query Tests
    // ===========================================

    #[test]
    fn sorted_by_time_regardless_of_insertion_order() {
        let mut store = MessageStore::new();
        store.add_message(msg("late", 3000));
        store.add_message(msg("early", 1000));
        store.add_message(msg("mid", 2000));

        let times: Vec<u64> = store
            .sorted_messages(&chat())
            .iter()
            .map(|m| m.time)
            .collect();
        assert_eq!(times, vec![1000, 2000, 3000]);
    }

    #[test]
    fn sorted_ties_break_on_id() {
        let mut store = MessageStore::new();
        store.add_message(msg("b", 1000));
        store.add_message(msg("a", 1000));

        let ids: Vec<&str> = store
            .sorted_messages(&chat())
            .iter()
            .map(|m| m.id.as_str())
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn latest_peer_activity_skips_own_messages() {
        let mut store = MessageStore::new();
        store.add_message(msg("mine", 5000)); // sender u1

        let mut theirs = msg("theirs", 2000);
        theirs.sender_id = SenderId::new("u2");
        store.add_message(theirs);

        let latest = store.latest_peer_activity(&chat(), &SenderId::new("u1"));
        assert_eq!(latest, Some(2000));
    }

    #[test]
    fn latest_peer_activity_empty_chat_is_none() {
        let store = MessageStore::new();
        assert!(store
            .latest_peer_activity(&chat(), &SenderId::new("u1"))
            .is_none());
    }

    #[test]
    fn clear_chat_drops_everything() {
        let mut store = MessageStore::new();
        store.add_message(msg("m1", 1000));
        store.add_message(msg("m2", 2000));

        store.clear_chat(&chat());
        assert!(store.is_empty(&chat()));
        assert!(store.sorted_messages(&chat()).is_empty());
    }
}
