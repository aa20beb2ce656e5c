// Rust guideline compliant 2026-10-19

//! Shared domain types for the balance-alert service.
//!
//! Defines `BalanceSnapshot`, `Runway`, `AlertState`, `Notification`, and the
//! hexagonal port traits: `BalanceSource`, `Notifier`, and `StateStore`.
//! Every other crate in the workspace depends on this one; it depends on no
//! workspace crate itself.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Balance data
// ---------------------------------------------------------------------------

/// One reading of the account, taken once per poll.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BalanceSnapshot {
    /// Account balance in USD. Any sign.
    pub balance: f64,
    /// Current spend rate in USD per hour. Zero means nothing is running.
    pub spend_per_hr: f64,
}

impl BalanceSnapshot {
    /// `true` when something is consuming credit (`spend_per_hr > 0`).
    #[must_use]
    pub fn is_spending(&self) -> bool {
        self.spend_per_hr > 0.0
    }

    /// Hours until the balance reaches `stop_balance` at the current spend rate.
    ///
    /// Returns [`Runway::Unbounded`] when nothing is spending. The finite value
    /// may be negative when the balance is already past `stop_balance`.
    #[must_use]
    pub fn runway(&self, stop_balance: f64) -> Runway {
        if self.is_spending() {
            Runway::Finite {
                hours: (self.balance - stop_balance) / self.spend_per_hr,
            }
        } else {
            Runway::Unbounded
        }
    }
}

/// Time left before the balance hits the stop point.
///
/// Descriptive only: rendered in messages, never used for alert decisions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Runway {
    /// Spend rate is positive; `hours` may be negative or very large.
    Finite {
        /// Remaining hours at the current spend rate.
        hours: f64,
    },
    /// Spend rate is zero; the balance is not moving.
    Unbounded,
}

// ---------------------------------------------------------------------------
// Alert state
// ---------------------------------------------------------------------------

/// The persisted alert-streak record.
///
/// Serialized as `{"last_alert_at": number|null, "current_interval_min": number, "alert_count": integer}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlertState {
    /// Epoch seconds (UTC) of the last delivered alert; `None` outside a streak.
    pub last_alert_at: Option<f64>,
    /// Minimum minutes before the next repeated alert.
    pub current_interval_min: f64,
    /// Alerts delivered since the last recovery.
    pub alert_count: u32,
}

impl AlertState {
    /// State with no active streak and the interval at its initial value.
    #[must_use]
    pub fn fresh(initial_interval_min: f64) -> Self {
        Self {
            last_alert_at: None,
            current_interval_min: initial_interval_min,
            alert_count: 0,
        }
    }

    /// `true` while at least one alert of the current streak was delivered.
    #[must_use]
    pub fn is_alerting(&self) -> bool {
        self.alert_count > 0
    }
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

/// How loudly a notification should be delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    /// Should interrupt the recipient (low-balance and depleted alerts).
    Alerting,
    /// Delivered without an audible notification (recovery, daily report).
    Silent,
}

/// A rendered message ready for a [`Notifier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Message body (HTML subset understood by the chat transport).
    pub text: String,
    /// Delivery priority.
    pub priority: Priority,
}

impl Notification {
    /// Build an [`Priority::Alerting`] notification.
    #[must_use]
    pub fn alerting(text: impl Into<String>) -> Self {
        Self { text: text.into(), priority: Priority::Alerting }
    }

    /// Build a [`Priority::Silent`] notification.
    #[must_use]
    pub fn silent(text: impl Into<String>) -> Self {
        Self { text: text.into(), priority: Priority::Silent }
    }

    /// `true` for [`Priority::Silent`].
    #[must_use]
    pub fn is_silent(&self) -> bool {
        self.priority == Priority::Silent
    }
}

// ---------------------------------------------------------------------------
// Port errors
// ---------------------------------------------------------------------------

/// Errors from the `BalanceSource` hexagonal port.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FetchError {
    /// The request could not be completed (connect, timeout, HTTP status).
    #[error("balance request failed: {reason}")]
    Transport {
        /// Human-readable description.
        reason: String,
    },
    /// The API answered with an error payload.
    #[error("balance API error: {reason}")]
    Api {
        /// Human-readable description.
        reason: String,
    },
    /// The response could not be interpreted as a balance.
    #[error("malformed balance response: {reason}")]
    Malformed {
        /// Human-readable description.
        reason: String,
    },
}

/// Errors from the `Notifier` hexagonal port.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NotifyError {
    /// Notification could not be delivered.
    #[error("delivery failed: {reason}")]
    DeliveryFailed {
        /// Human-readable description.
        reason: String,
    },
}

/// Errors from the `StateStore` hexagonal port.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    /// The backing store could not be read or written.
    #[error("state store unavailable: {reason}")]
    Unavailable {
        /// Human-readable description.
        reason: String,
    },
    /// A record exists but cannot be decoded.
    #[error("state record corrupt: {reason}")]
    Corrupt {
        /// Human-readable description.
        reason: String,
    },
}

// ---------------------------------------------------------------------------
// Ports
// ---------------------------------------------------------------------------

/// Hexagonal port: where balance readings come from.
///
/// Implementations own their retry policy; an `Err` means retries are
/// exhausted and the current poll is abandoned.
#[expect(
    async_fn_in_trait,
    reason = "no dyn dispatch needed; internal workspace only"
)]
pub trait BalanceSource {
    /// Fetch the current balance and spend rate.
    ///
    /// # Errors
    ///
    /// Returns a [`FetchError`] when no snapshot could be obtained.
    async fn fetch(&self) -> Result<BalanceSnapshot, FetchError>;
}

/// Hexagonal port: delivery of rendered notifications.
#[expect(
    async_fn_in_trait,
    reason = "no dyn dispatch needed; internal workspace only"
)]
pub trait Notifier {
    /// Deliver one notification.
    ///
    /// # Errors
    ///
    /// Returns `NotifyError::DeliveryFailed` when the message was not delivered.
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// Hexagonal port: durable storage for the single [`AlertState`] record.
#[expect(
    async_fn_in_trait,
    reason = "no dyn dispatch needed; internal workspace only"
)]
pub trait StateStore {
    /// Load the stored record. `Ok(None)` when nothing has been saved yet.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Corrupt` for an undecodable record, or
    /// `StoreError::Unavailable` when the store cannot be read.
    async fn load(&self) -> Result<Option<AlertState>, StoreError>;

    /// Replace the stored record with `state`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Unavailable` when the write did not complete.
    async fn save(&self, state: &AlertState) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    // 24.0 is exactly representable; assert_eq! is intentional.
    #[expect(clippy::float_cmp, reason = "exact binary fractions")]
    fn runway_measured_from_stop_balance() {
        let snap = BalanceSnapshot { balance: 50.0, spend_per_hr: 2.0 };
        assert_eq!(snap.runway(2.0), Runway::Finite { hours: 24.0 });
        let Runway::Finite { hours } = snap.runway(0.0) else {
            panic!("expected finite runway");
        };
        assert_eq!(hours, 25.0);
    }

    #[test]
    fn runway_negative_past_stop_balance() {
        let snap = BalanceSnapshot { balance: -1800.0, spend_per_hr: 5.0 };
        assert_eq!(snap.runway(0.0), Runway::Finite { hours: -360.0 });
    }

    #[test]
    fn zero_spend_is_unbounded() {
        let snap = BalanceSnapshot { balance: -2000.0, spend_per_hr: 0.0 };
        assert!(!snap.is_spending());
        assert_eq!(snap.runway(0.0), Runway::Unbounded);
    }

    #[test]
    fn fresh_state_is_not_alerting() {
        let state = AlertState::fresh(120.0);
        assert!(!state.is_alerting());
        assert!(state.last_alert_at.is_none());
        assert_eq!(state.alert_count, 0);
    }

    #[test]
    fn alert_state_json_shape() {
        let state = AlertState {
            last_alert_at: Some(1_700_000_000.5),
            current_interval_min: 60.0,
            alert_count: 1,
        };
        let json = serde_json::to_value(state).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "last_alert_at": 1_700_000_000.5,
                "current_interval_min": 60.0,
                "alert_count": 1
            })
        );
        let fresh = serde_json::to_string(&AlertState::fresh(120.0)).unwrap();
        assert!(fresh.contains("\"last_alert_at\":null"), "got {fresh}");
    }

    #[test]
    fn notification_priorities() {
        assert!(Notification::silent("ok").is_silent());
        assert!(!Notification::alerting("low").is_silent());
        assert_eq!(Notification::alerting("low").priority, Priority::Alerting);
    }

    #[test]
    fn error_messages() {
        let e = NotifyError::DeliveryFailed { reason: "timeout".to_owned() };
        assert_eq!(e.to_string(), "delivery failed: timeout");
        let e = FetchError::Api { reason: "unauthorized".to_owned() };
        assert_eq!(e.to_string(), "balance API error: unauthorized");
        let e = StoreError::Corrupt { reason: "eof".to_owned() };
        assert_eq!(e.to_string(), "state record corrupt: eof");
    }

    /// Verify that all three AFIT port traits compile with a minimal implementation.
    #[tokio::test]
    async fn port_trait_struct_impl() {
        struct AllPorts {
            stored: RefCell<Option<AlertState>>,
        }

        impl BalanceSource for AllPorts {
            async fn fetch(&self) -> Result<BalanceSnapshot, FetchError> {
                Ok(BalanceSnapshot { balance: 1.0, spend_per_hr: 0.5 })
            }
        }

        impl Notifier for AllPorts {
            async fn send(&self, _notification: &Notification) -> Result<(), NotifyError> {
                Ok(())
            }
        }

        impl StateStore for AllPorts {
            async fn load(&self) -> Result<Option<AlertState>, StoreError> {
                Ok(*self.stored.borrow())
            }

            async fn save(&self, state: &AlertState) -> Result<(), StoreError> {
                *self.stored.borrow_mut() = Some(*state);
                Ok(())
            }
        }

        let ports = AllPorts { stored: RefCell::new(None) };
        assert!(ports.fetch().await.unwrap().is_spending());
        ports.send(&Notification::silent("hi")).await.unwrap();
        assert!(ports.load().await.unwrap().is_none());
        ports.save(&AlertState::fresh(15.0)).await.unwrap();
        assert_eq!(ports.load().await.unwrap(), Some(AlertState::fresh(15.0)));
    }
}
