// Rust guideline compliant 2026-10-19

//! Scheduler component -- drives the alert engine's two entry points on
//! independent timers: a fixed-interval balance poll and a once-a-day report
//! at a local wall-clock time.
//!
//! Entry points: [`Scheduler::run`], [`Scheduler::run_polls`],
//! [`Scheduler::run_daily`], [`next_daily_run`]. Configuration via
//! [`SchedulerConfig::builder`].

use alert_engine::{AlertEngine, PollOutcome, ReportOutcome};
use chrono::{DateTime, Days, LocalResult, NaiveTime, TimeDelta, TimeZone as _, Utc};
use chrono_tz::Tz;
use domain::{BalanceSource, Notifier, StateStore};
use std::time::Duration;

// ---------------------------------------------------------------------------
// SchedulerError
// ---------------------------------------------------------------------------

/// Errors raised while configuring the scheduler.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchedulerError {
    /// The supplied configuration is invalid.
    #[error("invalid scheduler configuration: {reason}")]
    InvalidConfig {
        /// Human-readable description of the problem.
        reason: String,
    },
}

// ---------------------------------------------------------------------------
// Jobs port
// ---------------------------------------------------------------------------

/// The two jobs the scheduler fires.
///
/// Implemented for [`AlertEngine`]; tests use counting mocks.
#[expect(
    async_fn_in_trait,
    reason = "no dyn dispatch needed; internal workspace only"
)]
pub trait AlertJobs {
    /// Periodic low-balance check.
    async fn poll(&self);

    /// Daily summary.
    async fn daily_report(&self);
}

impl<B, N, S> AlertJobs for AlertEngine<B, N, S>
where
    B: BalanceSource,
    N: Notifier,
    S: StateStore,
{
    async fn poll(&self) {
        match self.poll_and_alert().await {
            PollOutcome::NoAction => tracing::debug!("scheduler.poll.done: no action"),
            outcome => tracing::info!(?outcome, "scheduler.poll.done"),
        }
    }

    async fn daily_report(&self) {
        let outcome = self.send_daily_report().await;
        if outcome != ReportOutcome::Sent {
            tracing::warn!(?outcome, "scheduler.daily.not_sent");
        }
    }
}

// ---------------------------------------------------------------------------
// SchedulerConfig + builder
// ---------------------------------------------------------------------------

/// Runtime configuration for a [`Scheduler`].
///
/// Construct via [`SchedulerConfig::builder`].
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Delay between successive balance polls.
    pub poll_interval: Duration,
    /// Local wall-clock time of the daily report.
    pub daily_at: NaiveTime,
    /// Time zone `daily_at` is expressed in.
    pub timezone: Tz,
    /// Upper bound on a single job invocation.
    pub invocation_timeout: Duration,
    /// Optional upper bound on the number of polls. `None` means infinite.
    pub iterations: Option<u64>,
}

/// Builder for [`SchedulerConfig`].
///
/// Obtain via [`SchedulerConfig::builder`]; finalize with [`build`](Self::build).
#[derive(Debug)]
pub struct SchedulerConfigBuilder {
    poll_interval: Duration,
    daily_at: NaiveTime,
    timezone: Tz,
    invocation_timeout: Duration,
    iterations: Option<u64>,
}

impl SchedulerConfig {
    /// Create a builder. `poll_interval` is the only required parameter.
    ///
    /// Default values: `daily_at = 12:00`, `timezone = UTC`,
    /// `invocation_timeout = 30 s`, `iterations = None`.
    #[must_use]
    pub fn builder(poll_interval: Duration) -> SchedulerConfigBuilder {
        SchedulerConfigBuilder {
            poll_interval,
            daily_at: NaiveTime::MIN + TimeDelta::hours(12),
            timezone: Tz::UTC,
            // A fetch with all retries (18 s) plus one send (10 s).
            invocation_timeout: Duration::from_secs(30),
            iterations: None,
        }
    }
}

impl SchedulerConfigBuilder {
    /// Override the daily report time and zone.
    #[must_use]
    pub fn daily_at(mut self, at: NaiveTime, timezone: Tz) -> Self {
        self.daily_at = at;
        self.timezone = timezone;
        self
    }

    /// Override the per-invocation timeout.
    #[must_use]
    pub fn invocation_timeout(mut self, timeout: Duration) -> Self {
        self.invocation_timeout = timeout;
        self
    }

    /// Set a finite poll count. Without this the poll loop runs forever.
    #[must_use]
    pub fn iterations(mut self, n: u64) -> Self {
        self.iterations = Some(n);
        self
    }

    /// Validate and build the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::InvalidConfig`] when the poll interval or the
    /// invocation timeout is zero.
    #[must_use = "the Result must be checked; use ? or unwrap"]
    pub fn build(self) -> Result<SchedulerConfig, SchedulerError> {
        if self.poll_interval.is_zero() {
            return Err(SchedulerError::InvalidConfig {
                reason: "poll_interval must be > 0".to_owned(),
            });
        }
        if self.invocation_timeout.is_zero() {
            return Err(SchedulerError::InvalidConfig {
                reason: "invocation_timeout must be > 0".to_owned(),
            });
        }
        Ok(SchedulerConfig {
            poll_interval: self.poll_interval,
            daily_at: self.daily_at,
            timezone: self.timezone,
            invocation_timeout: self.invocation_timeout,
            iterations: self.iterations,
        })
    }
}

/// Parse `"HH"` or `"HH:MM"` into a time of day.
///
/// # Errors
///
/// Returns [`SchedulerError::InvalidConfig`] for anything else.
pub fn parse_daily_time(value: &str) -> Result<NaiveTime, SchedulerError> {
    let (hour, minute) = value.trim().split_once(':').unwrap_or((value.trim(), "0"));
    hour.parse::<u32>()
        .ok()
        .zip(minute.parse::<u32>().ok())
        .and_then(|(hour, minute)| NaiveTime::from_hms_opt(hour, minute, 0))
        .ok_or_else(|| SchedulerError::InvalidConfig {
            reason: format!("daily time must be HH or HH:MM, got {value:?}"),
        })
}

/// Parse an IANA time-zone name such as `"Europe/Berlin"`.
///
/// # Errors
///
/// Returns [`SchedulerError::InvalidConfig`] for an unknown zone.
pub fn parse_timezone(value: &str) -> Result<Tz, SchedulerError> {
    value.trim().parse::<Tz>().map_err(|e| SchedulerError::InvalidConfig {
        reason: format!("unknown time zone {value:?}: {e}"),
    })
}

/// First instant strictly after `now` whose local time in `tz` is `at`.
///
/// A local time skipped by a DST change fires one hour later; an ambiguous
/// local time fires at its earlier occurrence.
#[must_use]
pub fn next_daily_run(now: DateTime<Utc>, at: NaiveTime, tz: Tz) -> DateTime<Utc> {
    let mut date = now.with_timezone(&tz).date_naive();
    // At most one skip for "already passed today" plus one for a gap day.
    for _ in 0..3 {
        let naive = date.and_time(at);
        let candidate = match tz.from_local_datetime(&naive) {
            LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => Some(dt),
            LocalResult::None => tz.from_local_datetime(&(naive + TimeDelta::hours(1))).earliest(),
        };
        if let Some(dt) = candidate.map(|dt| dt.with_timezone(&Utc))
            && dt > now
        {
            return dt;
        }
        date = date.checked_add_days(Days::new(1)).unwrap_or(date);
    }
    now + TimeDelta::days(1)
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// Fires [`AlertJobs::poll`] every `poll_interval` and
/// [`AlertJobs::daily_report`] once a day at `daily_at` local time.
///
/// Every invocation is bounded by `invocation_timeout`; a job that overruns
/// is dropped and the loop moves on.
#[derive(Debug)]
pub struct Scheduler {
    config: SchedulerConfig,
}

impl Scheduler {
    /// Create a new scheduler from `config`.
    #[must_use]
    pub fn new(config: SchedulerConfig) -> Self {
        Self { config }
    }

    /// Run both timers until the poll loop stops.
    ///
    /// With `config.iterations` unset this never returns; race it against a
    /// shutdown signal.
    pub async fn run<J: AlertJobs>(&self, jobs: &J) {
        tokio::select! {
            () = self.run_polls(jobs) => {}
            () = self.run_daily(jobs) => {}
        }
    }

    /// Poll immediately, then every `poll_interval`, until `iterations` is reached.
    pub async fn run_polls<J: AlertJobs>(&self, jobs: &J) {
        let mut count = 0u64;
        loop {
            if tokio::time::timeout(self.config.invocation_timeout, jobs.poll()).await.is_err() {
                tracing::warn!(
                    timeout = ?self.config.invocation_timeout,
                    "scheduler.poll.timed_out"
                );
            }

            count += 1;
            tracing::debug!(iteration = count, "scheduler.poll.completed");

            if let Some(max) = self.config.iterations
                && count >= max
            {
                tracing::info!("scheduler.run.stopped: iteration limit reached");
                return;
            }

            tokio::time::sleep(self.config.poll_interval).await;
        }
    }

    /// Sleep until each daily trigger and fire the report. Never returns.
    pub async fn run_daily<J: AlertJobs>(&self, jobs: &J) {
        let mut after = Utc::now();
        loop {
            let next = next_daily_run(after, self.config.daily_at, self.config.timezone);
            let wait = (next - Utc::now()).to_std().unwrap_or(Duration::ZERO);
            tracing::info!(next_run = %next, "scheduler.daily.scheduled");
            tokio::time::sleep(wait).await;

            if tokio::time::timeout(self.config.invocation_timeout, jobs.daily_report())
                .await
                .is_err()
            {
                tracing::warn!("scheduler.daily.timed_out");
            }
            // The timer may wake before the wall clock reaches `next`.
            after = Utc::now().max(next);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
