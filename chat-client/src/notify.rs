//! Notification seam toward the embedding application.

use parley_chat_types::Message;

/// Side-effect sink for user-visible signals.
///
/// Implementations bridge to whatever the platform offers (audio cue,
/// desktop notification, alert banner, auth teardown). Callbacks run on the
/// engine's event task and must not block.
pub trait Notifier: Send + Sync {
    /// A new message arrived from the peer.
    fn message_received(&self, message: &Message);

    /// The relay refused a send. Show the notice once; nothing was stored
    /// and nothing will be retried.
    fn send_rejected(&self, notice: &str);

    /// The local store and the relay have diverged beyond repair. The
    /// session must be torn down and re-authenticated.
    fn session_invalidated(&self);
}

/// No-op notifier for tests and headless use.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn message_received(&self, _message: &Message) {}

    fn send_rejected(&self, _notice: &str) {}

    fn session_invalidated(&self) {}
}
