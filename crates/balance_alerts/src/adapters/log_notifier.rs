// Rust guideline compliant 2026-10-19

//! Logging adapter for the `Notifier` port, used by the simulator.
//!
//! Every notification is logged line by line and recorded. While failure is
//! switched on, sends return `NotifyError::DeliveryFailed` and nothing is
//! recorded.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use domain::{Notification, Notifier, NotifyError};

/// `Notifier` adapter that logs and records notifications.
///
/// Clones share the recorded list and the failure switch.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier {
    sent: Rc<RefCell<Vec<Notification>>>,
    failing: Rc<Cell<bool>>,
}

impl LogNotifier {
    /// Create a notifier that delivers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent sends fail (`true`) or succeed (`false`).
    pub fn set_failing(&self, failing: bool) {
        self.failing.set(failing);
    }

    /// Notifications delivered so far.
    #[must_use]
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.borrow().clone()
    }

    /// Number of notifications delivered so far.
    #[must_use]
    pub fn count(&self) -> usize {
        self.sent.borrow().len()
    }

    /// Forget every recorded notification.
    pub fn clear(&self) {
        self.sent.borrow_mut().clear();
    }
}

impl Notifier for LogNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        if self.failing.get() {
            tracing::warn!("log_notifier.send: simulated delivery failure");
            return Err(NotifyError::DeliveryFailed { reason: "simulated failure".to_owned() });
        }
        let mode = if notification.is_silent() { "silent" } else { "ALERT" };
        tracing::info!(mode, "log_notifier.message");
        for line in notification.text.lines() {
            tracing::info!("    {line}");
        }
        self.sent.borrow_mut().push(notification.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
