// Rust guideline compliant 2026-10-19

//! Pure alert decision: `(config, state, snapshot, now) -> Decision`.
//!
//! ```text
//! Normal   --balance < threshold-------------------------> Alerting (alert #1)
//! Alerting --balance < threshold, cooldown elapsed-------> Alerting (alert #N+1, interval decays)
//! Alerting --balance < threshold, cooldown running-------> Alerting (hold)
//! Alerting --balance >= threshold + hysteresis-----------> Normal   (recovery notice, reset)
//! any      --threshold <= balance < threshold + hyst.----> unchanged (hold)
//! ```
//!
//! A zero spend rate swaps the low-balance alert for the depleted alert;
//! cadence and recovery are shared.

use domain::{AlertState, BalanceSnapshot};

use crate::AlertConfig;

/// Which alert template a low reading calls for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertKind {
    /// Balance under the threshold while pods are still spending.
    LowBalance,
    /// Balance under the threshold with a zero spend rate (pods stopped).
    Depleted,
}

/// Outcome of one decision step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Decision {
    /// Nothing to send and nothing to change.
    Hold,
    /// Send an alert; apply `on_delivered` only if delivery succeeds.
    Alert {
        /// Template to render.
        kind: AlertKind,
        /// State after a successful delivery.
        on_delivered: AlertState,
    },
    /// End the streak; apply `reset` whatever happens to the notice.
    Recover {
        /// `true` when a streak was active and a recovery notice is due.
        announce: bool,
        /// The fresh state to persist.
        reset: AlertState,
    },
}

/// Decide what a single poll should do.
///
/// `now_ts` is the current time in epoch seconds (UTC). Only the balance
/// relative to the threshold and the recovery line, the zero/non-zero spend
/// rate, and the cooldown drive the result; the runway never does.
#[must_use]
pub fn decide(
    config: &AlertConfig,
    state: &AlertState,
    snapshot: &BalanceSnapshot,
    now_ts: f64,
) -> Decision {
    if snapshot.balance < config.low_balance_usd {
        if !cooldown_elapsed(state, now_ts) {
            return Decision::Hold;
        }
        let kind = if snapshot.is_spending() {
            AlertKind::LowBalance
        } else {
            AlertKind::Depleted
        };
        return Decision::Alert {
            kind,
            on_delivered: AlertState {
                last_alert_at: Some(now_ts),
                current_interval_min: config.next_interval(state.current_interval_min),
                alert_count: state.alert_count.saturating_add(1),
            },
        };
    }

    if snapshot.balance >= config.recovery_threshold() {
        let reset = config.fresh_state();
        if state.is_alerting() || *state != reset {
            return Decision::Recover { announce: state.is_alerting(), reset };
        }
    }

    // Healthy with a fresh state, or inside the hysteresis band.
    Decision::Hold
}

/// `true` when a new alert may go out: first of a streak, or the interval has passed.
fn cooldown_elapsed(state: &AlertState, now_ts: f64) -> bool {
    match state.last_alert_at {
        None => true,
        Some(last) => (now_ts - last) / 60.0 >= state.current_interval_min,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::{AlertKind, Decision, decide};
    use crate::AlertConfig;
    use domain::{AlertState, BalanceSnapshot};

    const T0: f64 = 1_700_000_000.0;

    fn config() -> AlertConfig {
        AlertConfig::builder(20.0)
            .hysteresis_usd(2.0)
            .initial_interval_minutes(120.0)
            .decay_factor(0.5)
            .minimum_interval_minutes(15.0)
            .build()
            .unwrap()
    }

    fn snap(balance: f64, spend_per_hr: f64) -> BalanceSnapshot {
        BalanceSnapshot { balance, spend_per_hr }
    }

    fn alerting(last_alert_at: f64, interval: f64, count: u32) -> AlertState {
        AlertState {
            last_alert_at: Some(last_alert_at),
            current_interval_min: interval,
            alert_count: count,
        }
    }

    #[test]
    fn healthy_balance_holds() {
        let c = config();
        assert_eq!(decide(&c, &c.fresh_state(), &snap(100.0, 2.5), T0), Decision::Hold);
    }

    #[test]
    fn first_crossing_alerts_immediately() {
        let c = config();
        let d = decide(&c, &c.fresh_state(), &snap(15.0, 1.2), T0);
        assert_eq!(
            d,
            Decision::Alert {
                kind: AlertKind::LowBalance,
                on_delivered: alerting(T0, 60.0, 1),
            }
        );
    }

    #[test]
    fn exactly_at_threshold_is_not_low() {
        let c = config();
        assert_eq!(decide(&c, &c.fresh_state(), &snap(20.0, 1.0), T0), Decision::Hold);
        assert_eq!(decide(&c, &c.fresh_state(), &snap(20.1, 1.0), T0), Decision::Hold);
    }

    #[test]
    fn cooldown_running_holds() {
        let c = config();
        let state = alerting(T0, 60.0, 1);
        assert_eq!(decide(&c, &state, &snap(15.0, 1.0), T0 + 30.0 * 60.0), Decision::Hold);
        assert_eq!(decide(&c, &state, &snap(15.0, 1.0), T0 + 59.9 * 60.0), Decision::Hold);
    }

    #[test]
    fn cooldown_boundary_is_inclusive() {
        let c = config();
        let state = alerting(T0, 60.0, 1);
        let d = decide(&c, &state, &snap(15.0, 1.0), T0 + 60.0 * 60.0);
        assert_eq!(
            d,
            Decision::Alert {
                kind: AlertKind::LowBalance,
                on_delivered: alerting(T0 + 3600.0, 30.0, 2),
            }
        );
    }

    #[test]
    fn interval_floors_at_minimum() {
        let c = config();
        let state = alerting(T0, 15.0, 5);
        let Decision::Alert { on_delivered, .. } = decide(&c, &state, &snap(1.0, 1.0), T0 + 900.0)
        else {
            panic!("expected an alert");
        };
        assert!((on_delivered.current_interval_min - 15.0).abs() < f64::EPSILON);
        assert_eq!(on_delivered.alert_count, 6);
    }

    #[test]
    fn zero_spend_yields_depleted_kind() {
        let c = config();
        let d = decide(&c, &c.fresh_state(), &snap(-5.0, 0.0), T0);
        assert!(matches!(d, Decision::Alert { kind: AlertKind::Depleted, .. }), "{d:?}");

        let d = decide(&c, &c.fresh_state(), &snap(-5.0, 0.01), T0);
        assert!(matches!(d, Decision::Alert { kind: AlertKind::LowBalance, .. }), "{d:?}");
    }

    #[test]
    fn depleted_shares_cooldown() {
        let c = config();
        let state = alerting(T0, 60.0, 1);
        assert_eq!(decide(&c, &state, &snap(-2.0, 0.0), T0 + 600.0), Decision::Hold);
    }

    #[test]
    fn recovery_from_alerting_announces_and_resets() {
        let c = config();
        let state = alerting(T0, 30.0, 2);
        let d = decide(&c, &state, &snap(25.0, 1.0), T0 + 60.0);
        assert_eq!(d, Decision::Recover { announce: true, reset: c.fresh_state() });
    }

    #[test]
    fn recovery_line_is_inclusive() {
        let c = config();
        let state = alerting(T0, 30.0, 2);
        let d = decide(&c, &state, &snap(22.0, 1.0), T0);
        assert!(matches!(d, Decision::Recover { announce: true, .. }), "{d:?}");
    }

    #[test]
    fn recovery_with_zero_spend() {
        let c = config();
        let state = alerting(T0, 60.0, 1);
        let d = decide(&c, &state, &snap(30.0, 0.0), T0);
        assert_eq!(d, Decision::Recover { announce: true, reset: c.fresh_state() });
    }

    #[test]
    fn hysteresis_band_holds_while_alerting() {
        let c = config();
        let state = alerting(T0, 60.0, 1);
        for balance in [20.0, 21.0, 21.99] {
            for spend in [0.0, 1.0] {
                assert_eq!(
                    decide(&c, &state, &snap(balance, spend), T0 + 86_400.0),
                    Decision::Hold,
                    "balance {balance} spend {spend}"
                );
            }
        }
    }

    #[test]
    fn stale_interval_reset_without_announcement() {
        let c = config();
        let state = AlertState { last_alert_at: None, current_interval_min: 30.0, alert_count: 0 };
        let d = decide(&c, &state, &snap(100.0, 1.0), T0);
        assert_eq!(d, Decision::Recover { announce: false, reset: c.fresh_state() });
    }

    #[test]
    fn negative_threshold_scenario() {
        let c = AlertConfig::builder(-1500.0).build().unwrap();
        let fresh = c.fresh_state();
        assert_eq!(decide(&c, &fresh, &snap(-1000.0, 5.0), T0), Decision::Hold);
        assert!(matches!(
            decide(&c, &fresh, &snap(-1800.0, 5.0), T0),
            Decision::Alert { kind: AlertKind::LowBalance, .. }
        ));
        assert!(matches!(
            decide(&c, &fresh, &snap(-2000.0, 0.0), T0),
            Decision::Alert { kind: AlertKind::Depleted, .. }
        ));
    }

    #[test]
    fn stop_balance_never_drives_decisions() {
        // Stop balance above the threshold: still silent while balance >= threshold.
        let c = AlertConfig::builder(20.0).pod_stop_balance_usd(50.0).build().unwrap();
        assert_eq!(decide(&c, &c.fresh_state(), &snap(30.0, 5.0), T0), Decision::Hold);
    }
}
