// Rust guideline compliant 2026-10-19

//! Offline simulation of the alert engine.
//!
//! Replays fixed balance scenarios against in-memory adapters on a virtual
//! clock, then drives a seeded random walk and checks the state invariants
//! after every poll. No network access and no state file are involved.
//!
//! # Usage
//!
//! ```text
//! cargo run --bin balance_alerts_simulate
//! RUST_LOG=debug cargo run --bin balance_alerts_simulate
//! ```
//!
//! Exits with an error when any expectation fails.

#[path = "adapters/in_memory_store.rs"]
mod in_memory_store;
#[path = "adapters/log_notifier.rs"]
mod log_notifier;
mod logging;
#[path = "adapters/scripted_source.rs"]
mod scripted_source;

use alert_engine::{AlertConfig, AlertEngine, AlertKind, PollOutcome, ReportOutcome};
use anyhow::{Context as _, bail, ensure};
use chrono::{DateTime, TimeDelta, TimeZone as _, Utc};
use domain::{AlertState, Notification};
use in_memory_store::InMemoryStore;
use log_notifier::LogNotifier;
use scripted_source::{RandomWalkSource, ScriptedSource};
use tracing::Instrument as _;

/// Polls in the random-walk run, five virtual minutes apart.
const WALK_STEPS: u32 = 2_000;

fn config(low_balance_usd: f64, pod_stop_balance_usd: f64) -> anyhow::Result<AlertConfig> {
    AlertConfig::builder(low_balance_usd)
        .pod_stop_balance_usd(pod_stop_balance_usd)
        .initial_interval_minutes(120.0)
        .decay_factor(0.5)
        .minimum_interval_minutes(15.0)
        .hysteresis_usd(2.0)
        .build()
        .context("failed to build alert config")
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

fn start_time() -> anyhow::Result<DateTime<Utc>> {
    Utc.with_ymd_and_hms(2026, 1, 1, 9, 0, 0).single().context("invalid start time")
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

/// One engine over scripted adapters, with handles kept for inspection.
struct Harness {
    config: AlertConfig,
    source: ScriptedSource,
    notifier: LogNotifier,
    store: InMemoryStore,
    engine: AlertEngine<ScriptedSource, LogNotifier, InMemoryStore>,
    now: DateTime<Utc>,
}

impl Harness {
    async fn new(low_balance_usd: f64, pod_stop_balance_usd: f64) -> anyhow::Result<Self> {
        let config = config(low_balance_usd, pod_stop_balance_usd)?;
        let source = ScriptedSource::new(0.0, 0.0);
        let notifier = LogNotifier::new();
        let store = InMemoryStore::new();
        let engine =
            AlertEngine::new(config.clone(), source.clone(), notifier.clone(), store.clone()).await;
        Ok(Self { config, source, notifier, store, engine, now: start_time()? })
    }

    async fn poll(&self, balance: f64, spend_per_hr: f64) -> PollOutcome {
        self.source.set(balance, spend_per_hr);
        let outcome = self.engine.poll_and_alert_at(self.now).await;
        tracing::info!(balance, spend_per_hr, ?outcome, at = %self.now, "simulate.poll");
        outcome
    }

    fn advance_minutes(&mut self, minutes: i64) {
        self.now += TimeDelta::minutes(minutes);
    }

    /// Rebuild the engine over the same adapters, as a process restart would.
    async fn restart(&mut self) {
        self.engine = AlertEngine::new(
            self.config.clone(),
            self.source.clone(),
            self.notifier.clone(),
            self.store.clone(),
        )
        .await;
    }

    fn last(&self) -> anyhow::Result<Notification> {
        self.notifier.sent().pop().context("no notification was sent")
    }
}

// ---------------------------------------------------------------------------
// Fixed scenarios
// ---------------------------------------------------------------------------

async fn normal_balance() -> anyhow::Result<()> {
    let h = Harness::new(20.0, 0.0).await?;
    ensure!(h.poll(100.0, 2.5).await == PollOutcome::NoAction);
    ensure!(h.notifier.count() == 0, "healthy balance must not notify");
    Ok(())
}

async fn first_low_balance_alert() -> anyhow::Result<()> {
    let h = Harness::new(20.0, 0.0).await?;
    let outcome = h.poll(15.0, 1.2).await;
    ensure!(
        outcome == PollOutcome::AlertSent { kind: AlertKind::LowBalance, alert_count: 1 },
        "unexpected outcome {outcome:?}"
    );
    let sent = h.last()?;
    ensure!(sent.text.contains("LOW BALANCE ALERT"));
    ensure!(!sent.is_silent(), "alerts must not be silent");
    ensure!(close(h.engine.state().await.current_interval_min, 60.0));
    Ok(())
}

async fn repeated_alerts_decay() -> anyhow::Result<()> {
    let mut h = Harness::new(20.0, 0.0).await?;
    h.poll(10.0, 0.8).await;
    let first_interval = h.engine.state().await.current_interval_min;

    h.advance_minutes(30);
    ensure!(h.poll(10.0, 0.8).await == PollOutcome::NoAction, "cooldown must hold");
    ensure!(h.notifier.count() == 1);

    h.advance_minutes(120);
    let outcome = h.poll(10.0, 0.8).await;
    ensure!(matches!(outcome, PollOutcome::AlertSent { alert_count: 2, .. }), "{outcome:?}");
    let second_interval = h.engine.state().await.current_interval_min;
    ensure!(
        second_interval < first_interval,
        "interval must shrink: {first_interval} -> {second_interval}"
    );
    Ok(())
}

async fn balance_recovery() -> anyhow::Result<()> {
    let h = Harness::new(20.0, 0.0).await?;
    h.poll(15.0, 1.0).await;
    let outcome = h.poll(25.0, 1.0).await;
    ensure!(outcome == PollOutcome::Recovered { notice: Some(Ok(())) }, "{outcome:?}");
    ensure!(h.notifier.count() == 2);
    let sent = h.last()?;
    ensure!(sent.text.contains("Balance Recovered"));
    ensure!(sent.is_silent(), "recovery must be silent");
    ensure!(h.store.saved() == Some(h.config.fresh_state()), "state must be reset");
    Ok(())
}

async fn balance_depleted() -> anyhow::Result<()> {
    let h = Harness::new(20.0, 0.0).await?;
    let outcome = h.poll(-5.0, 0.0).await;
    ensure!(matches!(outcome, PollOutcome::AlertSent { kind: AlertKind::Depleted, .. }));
    let text = h.last()?.text;
    ensure!(text.contains("BALANCE DEPLETED"));
    ensure!(text.to_lowercase().contains("pods stopped"));
    Ok(())
}

async fn negative_balance_with_spend() -> anyhow::Result<()> {
    let h = Harness::new(20.0, 0.0).await?;
    let outcome = h.poll(-3.5, 2.5).await;
    ensure!(matches!(outcome, PollOutcome::AlertSent { kind: AlertKind::LowBalance, .. }));
    let text = h.last()?.text;
    ensure!(text.contains("$-3.50"), "negative balance missing: {text}");
    ensure!(text.contains("$2.50"), "spend rate missing: {text}");
    Ok(())
}

async fn recovery_from_depleted() -> anyhow::Result<()> {
    let h = Harness::new(20.0, 0.0).await?;
    h.poll(-2.0, 0.0).await;
    h.poll(30.0, 0.0).await;
    ensure!(h.notifier.count() == 2, "expected depleted + recovery");
    ensure!(h.last()?.text.contains("Balance Recovered"));
    Ok(())
}

async fn daily_report() -> anyhow::Result<()> {
    let h = Harness::new(20.0, 0.0).await?;
    h.source.set(150.0, 3.5);
    ensure!(h.engine.send_daily_report_at(h.now).await == ReportOutcome::Sent);
    let sent = h.last()?;
    ensure!(sent.text.contains("Daily Balance Report"));
    ensure!(sent.is_silent(), "daily report must be silent");
    ensure!(h.store.saved().is_none(), "daily report must not touch state");
    Ok(())
}

async fn threshold_edges() -> anyhow::Result<()> {
    let h = Harness::new(20.0, 0.0).await?;
    ensure!(h.poll(20.0, 1.0).await == PollOutcome::NoAction, "threshold itself is not low");
    ensure!(h.poll(20.1, 1.0).await == PollOutcome::NoAction);
    let outcome = h.poll(2.0, 5.0).await;
    ensure!(matches!(outcome, PollOutcome::AlertSent { kind: AlertKind::LowBalance, .. }));
    Ok(())
}

async fn hysteresis_band() -> anyhow::Result<()> {
    let mut h = Harness::new(20.0, 0.0).await?;
    h.poll(15.0, 1.0).await;
    let streak = h.engine.state().await;
    for balance in [20.0, 21.0, 21.99] {
        h.advance_minutes(600);
        ensure!(h.poll(balance, 1.0).await == PollOutcome::NoAction, "band at {balance}");
    }
    ensure!(h.engine.state().await == streak, "band must not change state");
    ensure!(matches!(h.poll(22.0, 1.0).await, PollOutcome::Recovered { .. }));
    Ok(())
}

async fn negative_threshold() -> anyhow::Result<()> {
    let h = Harness::new(-1500.0, 0.0).await?;
    ensure!(h.poll(-1000.0, 5.0).await == PollOutcome::NoAction);

    let h = Harness::new(-1500.0, 0.0).await?;
    let outcome = h.poll(-1800.0, 5.0).await;
    ensure!(matches!(outcome, PollOutcome::AlertSent { kind: AlertKind::LowBalance, .. }));
    let text = h.last()?.text;
    ensure!(text.contains("$-1,800"), "grouped negative balance missing: {text}");

    let h = Harness::new(-1500.0, 0.0).await?;
    let outcome = h.poll(-2000.0, 0.0).await;
    ensure!(matches!(outcome, PollOutcome::AlertSent { kind: AlertKind::Depleted, .. }));
    Ok(())
}

async fn negative_pod_stop_balance() -> anyhow::Result<()> {
    // Stop balance below a positive threshold.
    let h = Harness::new(20.0, -1500.0).await?;
    ensure!(matches!(h.poll(-1000.0, 5.0).await, PollOutcome::AlertSent { kind: AlertKind::LowBalance, .. }));
    ensure!(h.last()?.text.contains("$-1,500.00"), "stop balance missing");

    let h = Harness::new(20.0, -1500.0).await?;
    ensure!(matches!(h.poll(-1600.0, 0.0).await, PollOutcome::AlertSent { kind: AlertKind::Depleted, .. }));

    // Threshold between balance and stop balance: triggering ignores the stop balance.
    let h = Harness::new(-1000.0, -1500.0).await?;
    ensure!(h.poll(-800.0, 5.0).await == PollOutcome::NoAction);
    ensure!(matches!(h.poll(-1200.0, 5.0).await, PollOutcome::AlertSent { .. }));
    Ok(())
}

async fn documented_sequence() -> anyhow::Result<()> {
    let mut h = Harness::new(20.0, 0.0).await?;
    ensure!(h.poll(100.0, 1.0).await == PollOutcome::NoAction);
    ensure!(matches!(h.poll(15.0, 1.0).await, PollOutcome::AlertSent { alert_count: 1, .. }));
    ensure!(close(h.engine.state().await.current_interval_min, 60.0));
    h.advance_minutes(30);
    ensure!(h.poll(15.0, 1.0).await == PollOutcome::NoAction);
    h.advance_minutes(120);
    ensure!(matches!(h.poll(15.0, 1.0).await, PollOutcome::AlertSent { alert_count: 2, .. }));
    ensure!(close(h.engine.state().await.current_interval_min, 30.0));
    ensure!(matches!(h.poll(25.0, 1.0).await, PollOutcome::Recovered { notice: Some(Ok(())) }));
    ensure!(h.engine.state().await == h.config.fresh_state());
    ensure!(h.notifier.count() == 3);
    Ok(())
}

async fn delivery_failures() -> anyhow::Result<()> {
    let mut h = Harness::new(20.0, 0.0).await?;
    h.poll(15.0, 1.0).await;
    let before = h.engine.state().await;

    h.advance_minutes(60);
    h.notifier.set_failing(true);
    ensure!(matches!(h.poll(15.0, 1.0).await, PollOutcome::AlertFailed { .. }));
    ensure!(h.engine.state().await == before, "failed alert must not change state");

    h.notifier.set_failing(false);
    ensure!(matches!(h.poll(15.0, 1.0).await, PollOutcome::AlertSent { alert_count: 2, .. }));

    h.notifier.set_failing(true);
    let outcome = h.poll(25.0, 1.0).await;
    ensure!(matches!(outcome, PollOutcome::Recovered { notice: Some(Err(_)) }), "{outcome:?}");
    ensure!(h.engine.state().await == h.config.fresh_state(), "recovery resets regardless");
    Ok(())
}

async fn fetch_outage() -> anyhow::Result<()> {
    let h = Harness::new(20.0, 0.0).await?;
    h.poll(15.0, 1.0).await;
    let before = h.engine.state().await;
    h.source.set_outage(true);
    ensure!(matches!(h.poll(15.0, 1.0).await, PollOutcome::FetchFailed(_)));
    ensure!(matches!(h.engine.send_daily_report_at(h.now).await, ReportOutcome::FetchFailed(_)));
    ensure!(h.engine.state().await == before);
    ensure!(h.notifier.count() == 1);
    Ok(())
}

async fn restart_resumes_streak() -> anyhow::Result<()> {
    let mut h = Harness::new(20.0, 0.0).await?;
    h.poll(15.0, 1.0).await;
    h.restart().await;
    h.advance_minutes(30);
    ensure!(h.poll(15.0, 1.0).await == PollOutcome::NoAction, "restart must keep cooldown");

    // A count without a timestamp is repaired to a fresh streak on load.
    h.store.put(AlertState { last_alert_at: None, current_interval_min: 5.0, alert_count: 3 });
    h.restart().await;
    let repaired = h.engine.state().await;
    ensure!(repaired.alert_count == 0 && close(repaired.current_interval_min, 15.0), "{repaired:?}");
    h.notifier.clear();
    ensure!(matches!(h.poll(15.0, 1.0).await, PollOutcome::AlertSent { alert_count: 1, .. }));
    Ok(())
}

// ---------------------------------------------------------------------------
// Random walk
// ---------------------------------------------------------------------------

/// Drive the engine with a seeded random balance and check every transition.
async fn random_walk(seed: u64) -> anyhow::Result<()> {
    let config = config(20.0, 0.0)?;
    let notifier = LogNotifier::new();
    let engine = AlertEngine::new(
        config.clone(),
        RandomWalkSource::new(seed, 30.0, 2.0, 5.0 / 60.0, 8.0),
        notifier.clone(),
        InMemoryStore::new(),
    )
    .await;

    let mut now = start_time()?;
    let mut last_alert: Option<DateTime<Utc>> = None;
    let (mut alerts, mut recoveries) = (0u32, 0u32);

    for step in 0..WALK_STEPS {
        let before = engine.state().await;
        let outcome = engine.poll_and_alert_at(now).await;
        let after = engine.state().await;

        match outcome {
            PollOutcome::AlertSent { alert_count, .. } => {
                alerts += 1;
                ensure!(alert_count == before.alert_count + 1, "step {step}: count skipped");
                if let Some(last) = last_alert {
                    let waited = u32::try_from((now - last).num_minutes()).unwrap_or(u32::MAX);
                    ensure!(
                        f64::from(waited) >= before.current_interval_min,
                        "step {step}: alert after {waited} min, interval {}",
                        before.current_interval_min
                    );
                }
                let expected = config.next_interval(before.current_interval_min);
                ensure!(
                    close(after.current_interval_min, expected),
                    "step {step}: interval {} != {expected}",
                    after.current_interval_min
                );
                last_alert = Some(now);
            }
            PollOutcome::Recovered { .. } => {
                recoveries += 1;
                ensure!(after == config.fresh_state(), "step {step}: recovery did not reset");
                last_alert = None;
            }
            PollOutcome::NoAction => ensure!(after == before, "step {step}: hold changed state"),
            other => bail!("step {step}: unexpected outcome {other:?}"),
        }

        ensure!(
            after.current_interval_min >= config.alert_minimum_interval_minutes
                && after.current_interval_min <= config.alert_initial_interval_minutes,
            "step {step}: interval out of range: {after:?}"
        );
        ensure!(
            after.is_alerting() == after.last_alert_at.is_some(),
            "step {step}: count and timestamp disagree: {after:?}"
        );

        now += TimeDelta::minutes(5);
    }

    let sent = u32::try_from(notifier.count()).unwrap_or(u32::MAX);
    ensure!(sent == alerts + recoveries, "notification count {sent} != {alerts} + {recoveries}");
    tracing::info!(seed, steps = WALK_STEPS, alerts, recoveries, "simulate.random_walk.done");
    Ok(())
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    logging::init("info");

    let results = [
        ("normal balance", normal_balance().await),
        ("first low-balance alert", first_low_balance_alert().await),
        ("repeated alerts decay", repeated_alerts_decay().await),
        ("balance recovery", balance_recovery().await),
        ("balance depleted", balance_depleted().await),
        ("negative balance with spend", negative_balance_with_spend().await),
        ("recovery from depleted", recovery_from_depleted().await),
        ("daily report", daily_report().await),
        ("threshold edges", threshold_edges().await),
        ("hysteresis band", hysteresis_band().await),
        ("negative threshold", negative_threshold().await),
        ("negative pod-stop balance", negative_pod_stop_balance().await),
        ("documented sequence", documented_sequence().await),
        ("delivery failures", delivery_failures().await),
        ("fetch outage", fetch_outage().await),
        ("restart resumes streak", restart_resumes_streak().await),
        (
            "random walk",
            random_walk(0x5EED).instrument(tracing::info_span!("random_walk")).await,
        ),
    ];

    let mut failed = 0;
    for (name, result) in &results {
        match result {
            Ok(()) => tracing::info!(scenario = name, "simulate.scenario.passed"),
            Err(e) => {
                failed += 1;
                tracing::error!(scenario = name, error = %e, "simulate.scenario.failed");
            }
        }
    }
    if failed > 0 {
        bail!("{failed} of {} scenarios failed", results.len());
    }
    tracing::info!(scenarios = results.len(), "simulate.done: all scenarios passed");
    Ok(())
}
