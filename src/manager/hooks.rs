//! Raw transport event hooks.
//!
//! One slot per event kind. Setting a hook replaces the previous one.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use tracing::warn;

use crate::transport::TransportEvent;

// ============================================================================
// Types
// ============================================================================

/// Hook callback, invoked with the raw transport event.
pub type Hook = Arc<dyn Fn(&TransportEvent) + Send + Sync>;

// ============================================================================
// Hooks
// ============================================================================

/// Caller-registered raw event callbacks.
#[derive(Default, Clone)]
pub(crate) struct Hooks {
    /// Called on `Open`.
    pub on_open: Option<Hook>,
    /// Called on `Close`.
    pub on_close: Option<Hook>,
    /// Called on `Error`.
    pub on_error: Option<Hook>,
    /// Called on `Message`, before envelope dispatch.
    pub on_message: Option<Hook>,
}

impl Hooks {
    /// Returns the hook registered for the kind of `event`.
    pub(crate) fn for_event(&self, event: &TransportEvent) -> Option<Hook> {
        let slot = match event {
            TransportEvent::Open => &self.on_open,
            TransportEvent::Close { .. } => &self.on_close,
            TransportEvent::Error { .. } => &self.on_error,
            TransportEvent::Message { .. } => &self.on_message,
        };
        slot.clone()
    }
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("on_open", &self.on_open.is_some())
            .field("on_close", &self.on_close.is_some())
            .field("on_error", &self.on_error.is_some())
            .field("on_message", &self.on_message.is_some())
            .finish()
    }
}

/// Runs `hook` with `event`, containing any panic.
pub(crate) fn run_hook(hook: &Hook, event: &TransportEvent) {
    if catch_unwind(AssertUnwindSafe(|| hook(event))).is_err() {
        warn!(event = event.name(), "Event hook panicked");
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_for_event_picks_matching_slot() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = Arc::clone(&calls);

        let hooks = Hooks {
            on_close: Some(Arc::new(move |_: &TransportEvent| {
                calls_clone.fetch_add(1, Ordering::SeqCst);
            })),
            ..Hooks::default()
        };

        assert!(hooks.for_event(&TransportEvent::Open).is_none());
        let hook = hooks.for_event(&TransportEvent::close(None, "")).unwrap();
        run_hook(&hook, &TransportEvent::close(None, ""));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_panicking_hook_is_contained() {
        let hook: Hook = Arc::new(|_: &TransportEvent| panic!("hook failure"));
        run_hook(&hook, &TransportEvent::Open);
    }
}
