//! Typing-status coalescing.
//!
//! Rate-limits typing indicator emissions to at most one per interval while
//! guaranteeing the final state is never dropped. Pure policy: the caller
//! supplies the clock and performs the actual emission, which keeps the
//! module instantly testable.

/// Default coalescing interval in milliseconds.
pub const DEFAULT_TYPING_INTERVAL_MS: u64 = 500;

/// Coalesces typing-status updates to at most one emission per interval.
///
/// [`offer`](TypingThrottle::offer) emits immediately when the window is
/// open and otherwise holds the latest state. A later
/// [`flush`](TypingThrottle::flush) delivers the held state once the window
/// reopens, skipping values equal to the last emission so the wire never
/// sees a redundant trailing update.
#[derive(Debug)]
pub struct TypingThrottle {
    interval_ms: u64,
    last_emit_at: Option<u64>,
    last_value: Option<bool>,
    held: Option<bool>,
}

impl TypingThrottle {
    /// Create a throttle with the given interval.
    pub fn new(interval_ms: u64) -> Self {
        Self {
            interval_ms,
            last_emit_at: None,
            last_value: None,
            held: None,
        }
    }

    /// Record a typing-state change. Returns the state to emit now, if any;
    /// otherwise the state is held for a later [`flush`](Self::flush).
    pub fn offer(&mut self, now_ms: u64, is_typing: bool) -> Option<bool> {
        self.held = Some(is_typing);
        if self.window_closed(now_ms) {
            return None;
        }
        self.take_held(now_ms)
    }

    /// Deliver a held state once the interval has elapsed. Returns the state
    /// to emit, if any; a held state equal to the last emission is dropped.
    pub fn flush(&mut self, now_ms: u64) -> Option<bool> {
        if self.window_closed(now_ms) {
            return None;
        }
        match self.held {
            Some(value) if Some(value) != self.last_value => self.take_held(now_ms),
            _ => {
                self.held = None;
                None
            }
        }
    }

    /// Record an emission performed outside the throttle (submit and
    /// edit-cancel send the indicator directly).
    pub fn mark_sent(&mut self, now_ms: u64, is_typing: bool) {
        self.last_emit_at = Some(now_ms);
        self.last_value = Some(is_typing);
        self.held = None;
    }

    /// Whether a state is waiting for a flush.
    pub fn has_held(&self) -> bool {
        self.held.is_some()
    }

    fn window_closed(&self, now_ms: u64) -> bool {
        self.last_emit_at
            .is_some_and(|at| now_ms.saturating_sub(at) < self.interval_ms)
    }

    fn take_held(&mut self, now_ms: u64) -> Option<bool> {
        let value = self.held.take()?;
        self.last_emit_at = Some(now_ms);
        self.last_value = Some(value);
        Some(value)
    }
}

impl Default for TypingThrottle {
    fn default() -> Self {
        Self::new(DEFAULT_TYPING_INTERVAL_MS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_offer_emits_immediately() {
        let mut throttle = TypingThrottle::new(500);
        assert_eq!(throttle.offer(0, true), Some(true));
    }

    #[test]
    fn offers_inside_window_are_held() {
        let mut throttle = TypingThrottle::new(500);
        assert_eq!(throttle.offer(0, true), Some(true));
        assert_eq!(throttle.offer(100, true), None);
        assert!(throttle.has_held());
    }

    #[test]
    fn rapid_same_state_offers_coalesce_to_one_emission() {
        let mut throttle = TypingThrottle::new(500);
        assert_eq!(throttle.offer(0, true), Some(true));
        assert_eq!(throttle.offer(100, true), None);
        // The held state equals the last emission; nothing extra goes out.
        assert_eq!(throttle.flush(600), None);
        assert!(!throttle.has_held());
    }

    #[test]
    fn flush_delivers_changed_trailing_state() {
        let mut throttle = TypingThrottle::new(500);
        assert_eq!(throttle.offer(0, true), Some(true));
        assert_eq!(throttle.offer(100, false), None);
        assert_eq!(throttle.flush(600), Some(false));
    }

    #[test]
    fn flush_inside_window_waits() {
        let mut throttle = TypingThrottle::new(500);
        throttle.offer(0, true);
        throttle.offer(100, false);
        assert_eq!(throttle.flush(200), None);
        // Still held for a later flush.
        assert!(throttle.has_held());
        assert_eq!(throttle.flush(600), Some(false));
    }

    #[test]
    fn latest_held_state_wins() {
        let mut throttle = TypingThrottle::new(500);
        throttle.offer(0, true);
        throttle.offer(100, false);
        throttle.offer(200, true);
        // Latest state equals the last emission, so the flush is silent.
        assert_eq!(throttle.flush(600), None);
    }

    #[test]
    fn offer_after_window_emits_again() {
        let mut throttle = TypingThrottle::new(500);
        assert_eq!(throttle.offer(0, true), Some(true));
        assert_eq!(throttle.offer(600, false), Some(false));
    }

    #[test]
    fn mark_sent_resets_window_and_drops_held() {
        let mut throttle = TypingThrottle::new(500);
        throttle.offer(0, true);
        throttle.offer(100, false);

        // A direct emission (e.g. submit sends typing=false itself).
        throttle.mark_sent(200, false);
        assert!(!throttle.has_held());
        assert_eq!(throttle.flush(800), None);

        // And the window restarts from the direct emission.
        assert_eq!(throttle.offer(300, true), None);
    }
}
