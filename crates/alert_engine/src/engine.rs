// Rust guideline compliant 2026-10-19

//! The stateful engine: load state once, then for each poll fetch, decide,
//! notify, and persist.

use chrono::{DateTime, Utc};
use domain::{
    AlertState, BalanceSnapshot, BalanceSource, FetchError, Notification, Notifier, NotifyError,
    StateStore,
};
use tokio::sync::Mutex;

use crate::decision::{AlertKind, Decision, decide};
use crate::AlertConfig;

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// What a call to [`AlertEngine::poll_and_alert`] did.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// The balance source failed; nothing was decided.
    FetchFailed(FetchError),
    /// No notification was due.
    NoAction,
    /// An alert was delivered and the streak advanced.
    AlertSent {
        /// Template used.
        kind: AlertKind,
        /// Alerts delivered in this streak, including this one.
        alert_count: u32,
    },
    /// An alert was due but delivery failed; state is unchanged.
    AlertFailed {
        /// Template that was attempted.
        kind: AlertKind,
        /// The delivery error.
        error: NotifyError,
    },
    /// The streak ended and the state was reset.
    Recovered {
        /// `Some(Ok)` when the notice was delivered, `Some(Err)` when delivery
        /// failed, `None` when no streak was active and nothing was announced.
        notice: Option<Result<(), NotifyError>>,
    },
}

/// What a call to [`AlertEngine::send_daily_report`] did.
#[derive(Debug, Clone, PartialEq)]
pub enum ReportOutcome {
    /// The report was delivered.
    Sent,
    /// The balance source failed; nothing was sent.
    FetchFailed(FetchError),
    /// The report was rendered but delivery failed.
    DeliveryFailed(NotifyError),
}

// ---------------------------------------------------------------------------
// AlertEngine
// ---------------------------------------------------------------------------

/// Balance-alert engine over three injected ports.
///
/// Generic over `B: BalanceSource`, `N: Notifier`, and `S: StateStore` for
/// static dispatch. The load-decide-notify-save sequence runs under an async
/// mutex, so overlapping calls on one engine are serialized.
#[derive(Debug)]
pub struct AlertEngine<B, N, S> {
    config: AlertConfig,
    source: B,
    notifier: N,
    store: S,
    state: Mutex<AlertState>,
}

impl<B, N, S> AlertEngine<B, N, S>
where
    B: BalanceSource,
    N: Notifier,
    S: StateStore,
{
    /// Build an engine and load its state from `store`.
    ///
    /// A missing, unreadable, or corrupt record falls back to fresh state with
    /// a warning; this never fails.
    pub async fn new(config: AlertConfig, source: B, notifier: N, store: S) -> Self {
        let state = match store.load().await {
            Ok(Some(loaded)) => {
                let repaired = config.normalize(loaded);
                if repaired != loaded {
                    tracing::warn!(?loaded, ?repaired, "engine.state.repaired");
                }
                repaired
            }
            Ok(None) => {
                tracing::info!("engine.state.fresh: no stored state");
                config.fresh_state()
            }
            Err(e) => {
                tracing::warn!(error = %e, "engine.state.load_failed: starting fresh");
                config.fresh_state()
            }
        };
        tracing::debug!(?state, "engine.state.loaded");
        Self { config, source, notifier, store, state: Mutex::new(state) }
    }

    /// The engine configuration.
    #[must_use]
    pub fn config(&self) -> &AlertConfig {
        &self.config
    }

    /// The injected balance source (shared with the chat command listener).
    #[must_use]
    pub fn source(&self) -> &B {
        &self.source
    }

    /// The injected notifier.
    #[must_use]
    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    /// The injected state store.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Snapshot of the in-memory state.
    pub async fn state(&self) -> AlertState {
        *self.state.lock().await
    }

    /// Run one low-balance check against the wall clock.
    pub async fn poll_and_alert(&self) -> PollOutcome {
        self.poll_and_alert_at(Utc::now()).await
    }

    /// Run one low-balance check as of `now`.
    ///
    /// Fetch failures abort before any decision. Alert-delivery failures leave
    /// the state untouched so the next poll retries with the same interval.
    /// Recovery resets the state even when the notice cannot be delivered.
    pub async fn poll_and_alert_at(&self, now: DateTime<Utc>) -> PollOutcome {
        let snapshot = match self.source.fetch().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::error!(error = %e, "engine.poll.fetch_failed");
                return PollOutcome::FetchFailed(e);
            }
        };
        tracing::debug!(
            balance = snapshot.balance,
            spend_per_hr = snapshot.spend_per_hr,
            "engine.poll.snapshot"
        );

        let mut state = self.state.lock().await;
        match decide(&self.config, &state, &snapshot, epoch_seconds(now)) {
            Decision::Hold => PollOutcome::NoAction,
            Decision::Alert { kind, on_delivered } => {
                let notification = self.render_alert(kind, &snapshot, now);
                match self.notifier.send(&notification).await {
                    Ok(()) => {
                        *state = on_delivered;
                        self.persist(&state).await;
                        tracing::info!(
                            ?kind,
                            alert_count = state.alert_count,
                            next_interval_min = state.current_interval_min,
                            "engine.poll.alert_sent"
                        );
                        PollOutcome::AlertSent { kind, alert_count: state.alert_count }
                    }
                    Err(error) => {
                        tracing::error!(?kind, %error, "engine.poll.alert_failed: will retry next poll");
                        PollOutcome::AlertFailed { kind, error }
                    }
                }
            }
            Decision::Recover { announce, reset } => {
                // Saved before the notice so a cancelled send cannot keep the streak.
                *state = reset;
                self.persist(&state).await;
                let notice = if announce {
                    let text = templates::balance_recovered(
                        snapshot.balance,
                        self.config.recovery_threshold(),
                    );
                    let result = self.notifier.send(&Notification::silent(text)).await;
                    match &result {
                        Ok(()) => tracing::info!("engine.poll.recovery_sent"),
                        Err(e) => tracing::error!(error = %e, "engine.poll.recovery_failed"),
                    }
                    Some(result)
                } else {
                    None
                };
                PollOutcome::Recovered { notice }
            }
        }
    }

    /// Fetch a snapshot and deliver the silent daily summary, as of the wall clock.
    pub async fn send_daily_report(&self) -> ReportOutcome {
        self.send_daily_report_at(Utc::now()).await
    }

    /// Fetch a snapshot and deliver the silent daily summary, as of `now`.
    ///
    /// Does not read or write alert state.
    pub async fn send_daily_report_at(&self, now: DateTime<Utc>) -> ReportOutcome {
        let snapshot = match self.source.fetch().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::error!(error = %e, "engine.daily.fetch_failed");
                return ReportOutcome::FetchFailed(e);
            }
        };
        let text = templates::daily_report(&snapshot, self.config.pod_stop_balance_usd, now);
        match self.notifier.send(&Notification::silent(text)).await {
            Ok(()) => {
                tracing::info!(balance = snapshot.balance, "engine.daily.sent");
                ReportOutcome::Sent
            }
            Err(e) => {
                tracing::error!(error = %e, "engine.daily.delivery_failed");
                ReportOutcome::DeliveryFailed(e)
            }
        }
    }

    fn render_alert(
        &self,
        kind: AlertKind,
        snapshot: &BalanceSnapshot,
        now: DateTime<Utc>,
    ) -> Notification {
        let text = match kind {
            AlertKind::LowBalance => templates::low_balance_alert(
                snapshot,
                self.config.low_balance_usd,
                self.config.pod_stop_balance_usd,
                now,
            ),
            AlertKind::Depleted => templates::depleted_alert(
                snapshot.balance,
                self.config.low_balance_usd,
                self.config.pod_stop_balance_usd,
            ),
        };
        Notification::alerting(text)
    }

    /// Save `state`; a failure is logged and the in-memory value is kept, so
    /// the next mutation writes it again.
    async fn persist(&self, state: &AlertState) {
        if let Err(e) = self.store.save(state).await {
            tracing::error!(error = %e, "engine.state.save_failed");
        }
    }
}

/// Epoch seconds with millisecond resolution.
fn epoch_seconds(now: DateTime<Utc>) -> f64 {
    #[expect(
        clippy::cast_precision_loss,
        reason = "epoch milliseconds stay far below 2^53"
    )]
    let millis = now.timestamp_millis() as f64;
    millis / 1000.0
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
