// Rust guideline compliant 2026-10-19

//! In-memory adapter for the `StateStore` port.
//!
//! Clones share one record, so a harness can keep a handle, inspect what the
//! engine persisted, and hand another clone to a restarted engine.

use std::cell::RefCell;
use std::rc::Rc;

use domain::{AlertState, StateStore, StoreError};

/// `StateStore` adapter holding the record in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    record: Rc<RefCell<Option<AlertState>>>,
}

impl InMemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The last saved record, if any.
    #[must_use]
    pub fn saved(&self) -> Option<AlertState> {
        *self.record.borrow()
    }

    /// Overwrite the record directly, bypassing the engine.
    pub fn put(&self, state: AlertState) {
        *self.record.borrow_mut() = Some(state);
    }
}

impl StateStore for InMemoryStore {
    async fn load(&self) -> Result<Option<AlertState>, StoreError> {
        Ok(self.saved())
    }

    async fn save(&self, state: &AlertState) -> Result<(), StoreError> {
        self.put(*state);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::InMemoryStore;
    use domain::{AlertState, StateStore as _};

    #[tokio::test]
    async fn starts_empty() {
        assert_eq!(InMemoryStore::new().load().await.unwrap(), None);
    }

    #[tokio::test]
    async fn clones_share_the_record() {
        let store = InMemoryStore::new();
        let handle = store.clone();
        let state = AlertState { last_alert_at: Some(5.0), current_interval_min: 60.0, alert_count: 1 };
        store.save(&state).await.unwrap();
        assert_eq!(handle.saved(), Some(state));
        assert_eq!(handle.load().await.unwrap(), Some(state));
    }
}
