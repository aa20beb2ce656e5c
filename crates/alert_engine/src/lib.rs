// Rust guideline compliant 2026-10-19

//! Alert decision engine -- turns balance readings into low-balance alerts,
//! depleted alerts, and recovery notices, with hysteresis and decaying
//! repeat intervals.
//!
//! Entry points: [`AlertEngine::poll_and_alert`], [`AlertEngine::send_daily_report`],
//! and the pure [`decide`] function. Configuration via [`AlertConfig::builder`].

mod decision;
mod engine;

pub use decision::{AlertKind, Decision, decide};
pub use engine::{AlertEngine, PollOutcome, ReportOutcome};

use domain::AlertState;

// ---------------------------------------------------------------------------
// EngineError
// ---------------------------------------------------------------------------

/// Errors raised while building the engine configuration.
///
/// Runtime failures (fetch, delivery, storage) never surface as errors; they
/// are logged and reported through [`PollOutcome`] / [`ReportOutcome`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
    /// The supplied configuration is invalid.
    #[error("invalid alert configuration: {reason}")]
    InvalidConfig {
        /// Human-readable description of the problem.
        reason: String,
    },
}

// ---------------------------------------------------------------------------
// AlertConfig + builder
// ---------------------------------------------------------------------------

/// Thresholds and back-off parameters for the engine.
///
/// Construct via [`AlertConfig::builder`].
#[derive(Debug, Clone, PartialEq)]
pub struct AlertConfig {
    /// Balance below which alerting starts. May be negative.
    pub low_balance_usd: f64,
    /// Balance at which the provider stops pods. Only used for runway text.
    pub pod_stop_balance_usd: f64,
    /// Repeat interval at the start of a streak, in minutes.
    pub alert_initial_interval_minutes: f64,
    /// Multiplier applied to the interval after each alert, in `(0, 1)`.
    pub alert_decay_factor: f64,
    /// Floor for the repeat interval, in minutes.
    pub alert_minimum_interval_minutes: f64,
    /// Margin above the threshold required to declare recovery.
    pub alert_hysteresis_usd: f64,
}

/// Builder for [`AlertConfig`].
///
/// Obtain via [`AlertConfig::builder`]; finalize with [`build`](Self::build).
#[derive(Debug)]
pub struct AlertConfigBuilder {
    low_balance_usd: f64,
    pod_stop_balance_usd: f64,
    alert_initial_interval_minutes: f64,
    alert_decay_factor: f64,
    alert_minimum_interval_minutes: f64,
    alert_hysteresis_usd: f64,
}

impl AlertConfig {
    /// Create a builder. The threshold is the only required parameter.
    ///
    /// Default values: `pod_stop_balance_usd = 0`, `initial = 120 min`,
    /// `decay = 0.5`, `minimum = 15 min`, `hysteresis = $2`.
    #[must_use]
    pub fn builder(low_balance_usd: f64) -> AlertConfigBuilder {
        AlertConfigBuilder {
            low_balance_usd,
            pod_stop_balance_usd: 0.0,
            alert_initial_interval_minutes: 120.0,
            alert_decay_factor: 0.5,
            alert_minimum_interval_minutes: 15.0,
            alert_hysteresis_usd: 2.0,
        }
    }

    /// Balance at or above which an active streak ends.
    #[must_use]
    pub fn recovery_threshold(&self) -> f64 {
        self.low_balance_usd + self.alert_hysteresis_usd
    }

    /// State used at startup and after every recovery.
    #[must_use]
    pub fn fresh_state(&self) -> AlertState {
        AlertState::fresh(self.alert_initial_interval_minutes)
    }

    /// Interval that follows `current` after one more delivered alert.
    #[must_use]
    pub fn next_interval(&self, current: f64) -> f64 {
        (current * self.alert_decay_factor).max(self.alert_minimum_interval_minutes)
    }

    /// Repair a loaded record so it satisfies the state invariants.
    ///
    /// The interval is clamped to the configured floor (or reset when it is
    /// not a finite number), and `alert_count` / `last_alert_at` are made to
    /// agree: a streak without a timestamp is dropped.
    #[must_use]
    pub fn normalize(&self, state: AlertState) -> AlertState {
        let current_interval_min = if state.current_interval_min.is_finite() {
            state.current_interval_min.max(self.alert_minimum_interval_minutes)
        } else {
            self.alert_initial_interval_minutes
        };
        let last_alert_at = state.last_alert_at.filter(|ts| ts.is_finite());
        match (state.alert_count, last_alert_at) {
            (0, _) | (_, None) => AlertState {
                last_alert_at: None,
                current_interval_min,
                alert_count: 0,
            },
            (alert_count, Some(ts)) => AlertState {
                last_alert_at: Some(ts),
                current_interval_min,
                alert_count,
            },
        }
    }
}

impl AlertConfigBuilder {
    /// Override the balance at which pods stop.
    #[must_use]
    pub fn pod_stop_balance_usd(mut self, usd: f64) -> Self {
        self.pod_stop_balance_usd = usd;
        self
    }

    /// Override the first repeat interval of a streak.
    #[must_use]
    pub fn initial_interval_minutes(mut self, minutes: f64) -> Self {
        self.alert_initial_interval_minutes = minutes;
        self
    }

    /// Override the interval decay factor.
    #[must_use]
    pub fn decay_factor(mut self, factor: f64) -> Self {
        self.alert_decay_factor = factor;
        self
    }

    /// Override the interval floor.
    #[must_use]
    pub fn minimum_interval_minutes(mut self, minutes: f64) -> Self {
        self.alert_minimum_interval_minutes = minutes;
        self
    }

    /// Override the recovery margin.
    #[must_use]
    pub fn hysteresis_usd(mut self, usd: f64) -> Self {
        self.alert_hysteresis_usd = usd;
        self
    }

    /// Validate and build the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConfig`] when a value is not finite, the
    /// decay factor is outside `(0, 1)`, an interval is not positive, the
    /// initial interval is below the minimum, or the hysteresis is negative.
    #[must_use = "the Result must be checked; use ? or unwrap"]
    pub fn build(self) -> Result<AlertConfig, EngineError> {
        let invalid = |reason: &str| EngineError::InvalidConfig { reason: reason.to_owned() };

        let all_finite = [
            self.low_balance_usd,
            self.pod_stop_balance_usd,
            self.alert_initial_interval_minutes,
            self.alert_decay_factor,
            self.alert_minimum_interval_minutes,
            self.alert_hysteresis_usd,
        ]
        .iter()
        .all(|v| v.is_finite());
        if !all_finite {
            return Err(invalid("all values must be finite numbers"));
        }
        if !(self.alert_decay_factor > 0.0 && self.alert_decay_factor < 1.0) {
            return Err(invalid("alert_decay_factor must be in (0, 1)"));
        }
        if self.alert_minimum_interval_minutes <= 0.0 {
            return Err(invalid("alert_minimum_interval_minutes must be > 0"));
        }
        if self.alert_initial_interval_minutes < self.alert_minimum_interval_minutes {
            return Err(invalid(
                "alert_initial_interval_minutes must be >= alert_minimum_interval_minutes",
            ));
        }
        if self.alert_hysteresis_usd < 0.0 {
            return Err(invalid("alert_hysteresis_usd must be >= 0"));
        }

        Ok(AlertConfig {
            low_balance_usd: self.low_balance_usd,
            pod_stop_balance_usd: self.pod_stop_balance_usd,
            alert_initial_interval_minutes: self.alert_initial_interval_minutes,
            alert_decay_factor: self.alert_decay_factor,
            alert_minimum_interval_minutes: self.alert_minimum_interval_minutes,
            alert_hysteresis_usd: self.alert_hysteresis_usd,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
#[expect(clippy::float_cmp, reason = "values are exact binary fractions")]
mod tests {
    use super::{AlertConfig, EngineError};
    use domain::AlertState;

    fn config() -> AlertConfig {
        AlertConfig::builder(20.0).build().unwrap()
    }

    #[test]
    fn builder_defaults() {
        let c = config();
        assert_eq!(c.low_balance_usd, 20.0);
        assert_eq!(c.pod_stop_balance_usd, 0.0);
        assert_eq!(c.alert_initial_interval_minutes, 120.0);
        assert_eq!(c.alert_decay_factor, 0.5);
        assert_eq!(c.alert_minimum_interval_minutes, 15.0);
        assert_eq!(c.alert_hysteresis_usd, 2.0);
        assert_eq!(c.recovery_threshold(), 22.0);
    }

    #[test]
    fn negative_threshold_and_stop_balance_accepted() {
        let c = AlertConfig::builder(-1500.0).pod_stop_balance_usd(-2000.0).build().unwrap();
        assert_eq!(c.recovery_threshold(), -1498.0);
    }

    #[test]
    fn config_rejects_decay_out_of_range() {
        for bad in [0.0, 1.0, -0.5, 1.5] {
            let result = AlertConfig::builder(20.0).decay_factor(bad).build();
            assert!(
                matches!(result, Err(EngineError::InvalidConfig { .. })),
                "decay {bad} must be rejected"
            );
        }
    }

    #[test]
    fn config_rejects_bad_intervals() {
        let zero_min = AlertConfig::builder(20.0).minimum_interval_minutes(0.0).build();
        assert!(matches!(zero_min, Err(EngineError::InvalidConfig { .. })));

        let initial_below_min = AlertConfig::builder(20.0)
            .initial_interval_minutes(10.0)
            .minimum_interval_minutes(15.0)
            .build();
        assert!(matches!(initial_below_min, Err(EngineError::InvalidConfig { .. })));
    }

    #[test]
    fn config_rejects_negative_hysteresis_and_nan() {
        let neg = AlertConfig::builder(20.0).hysteresis_usd(-1.0).build();
        assert!(matches!(neg, Err(EngineError::InvalidConfig { .. })));
        let nan = AlertConfig::builder(f64::NAN).build();
        assert!(matches!(nan, Err(EngineError::InvalidConfig { .. })));
    }

    #[test]
    fn interval_sequence_converges_to_minimum() {
        let c = config();
        let mut interval = c.alert_initial_interval_minutes;
        let mut seen = vec![interval];
        for _ in 0..10 {
            let next = c.next_interval(interval);
            assert!(next <= interval, "interval must not grow: {interval} -> {next}");
            assert!(next >= c.alert_minimum_interval_minutes);
            interval = next;
            seen.push(interval);
        }
        assert_eq!(&seen[..5], &[120.0, 60.0, 30.0, 15.0, 15.0]);
        assert_eq!(interval, 15.0);
    }

    #[test]
    fn normalize_clamps_interval_to_minimum() {
        let c = config();
        let repaired = c.normalize(AlertState {
            last_alert_at: Some(100.0),
            current_interval_min: 3.0,
            alert_count: 2,
        });
        assert_eq!(repaired.current_interval_min, 15.0);
        assert_eq!(repaired.alert_count, 2);
    }

    #[test]
    fn normalize_clears_inconsistent_streak() {
        let c = config();
        let no_timestamp = c.normalize(AlertState {
            last_alert_at: None,
            current_interval_min: 60.0,
            alert_count: 3,
        });
        assert_eq!(no_timestamp.alert_count, 0);

        let no_count = c.normalize(AlertState {
            last_alert_at: Some(100.0),
            current_interval_min: f64::INFINITY,
            alert_count: 0,
        });
        assert!(no_count.last_alert_at.is_none());
        assert_eq!(no_count.current_interval_min, 120.0);
    }

    #[test]
    fn normalize_keeps_valid_state() {
        let c = config();
        let state = AlertState { last_alert_at: Some(1.5), current_interval_min: 60.0, alert_count: 1 };
        assert_eq!(c.normalize(state), state);
        assert_eq!(c.normalize(c.fresh_state()), c.fresh_state());
    }
}
