// Rust guideline compliant 2026-10-19

//! Process configuration, read from the environment.
//!
//! An optional `.env` file in the working directory is loaded first with
//! `dotenvy`; real environment variables take precedence over it. Domain
//! validation is delegated to the engine and scheduler builders.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use alert_engine::{AlertConfig, EngineError};
use scheduler::{SchedulerConfig, SchedulerError};

/// Default location of the JSON state file.
const DEFAULT_STATE_PATH: &str = "data/state.json";

/// Default `SQLite` database for the `balance_alerts_sqlite` binary.
const DEFAULT_STATE_DB_URL: &str = "sqlite:data/state.db";

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required variable is not set.
    #[error("missing required environment variable {name}")]
    Missing {
        /// Variable name.
        name: &'static str,
    },
    /// A variable is set but cannot be parsed.
    #[error("invalid value for {name}: {value:?}")]
    Invalid {
        /// Variable name.
        name: &'static str,
        /// Raw value as found in the environment.
        value: String,
    },
    /// The `.env` file exists but could not be read.
    #[error("failed to load .env file: {reason}")]
    DotEnv {
        /// Human-readable description.
        reason: String,
    },
    /// Alert thresholds or intervals are inconsistent.
    #[error(transparent)]
    Alert(#[from] EngineError),
    /// Poll or daily-report settings are invalid.
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
}

/// Everything the service binaries need to start.
pub struct AppConfig {
    /// Bearer token for the RunPod GraphQL API.
    pub runpod_api_key: String,
    /// Telegram bot token.
    pub telegram_bot_token: String,
    /// Chat that receives notifications and may issue commands.
    pub telegram_chat_id: String,
    /// Alert thresholds and back-off.
    pub alert: AlertConfig,
    /// Poll cadence and daily-report time.
    pub schedule: SchedulerConfig,
    /// JSON state file path.
    pub state_path: PathBuf,
    /// `SQLite` URL for the alternative state store.
    pub state_db_url: String,
    /// Default log filter when `RUST_LOG` is unset.
    pub log_level: String,
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("runpod_api_key", &"<redacted>")
            .field("telegram_bot_token", &"<redacted>")
            .field("telegram_chat_id", &self.telegram_chat_id)
            .field("alert", &self.alert)
            .field("schedule", &self.schedule)
            .field("state_path", &self.state_path)
            .field("state_db_url", &self.state_db_url)
            .field("log_level", &self.log_level)
            .finish()
    }
}

impl AppConfig {
    /// Load `.env` (if present) and read the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for a missing required variable, an unparsable
    /// value, an unreadable `.env` file, or values the builders reject.
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Err(e) = dotenvy::dotenv()
            && !e.not_found()
        {
            return Err(ConfigError::DotEnv { reason: e.to_string() });
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable lookup.
    ///
    /// Empty values count as unset.
    ///
    /// # Errors
    ///
    /// See [`from_env`](Self::from_env).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let vars = Vars(lookup);

        let alert = AlertConfig::builder(vars.number("LOW_BALANCE_USD", 4000.0)?)
            .pod_stop_balance_usd(vars.number("POD_STOP_BALANCE_USD", 0.0)?)
            .initial_interval_minutes(vars.number("ALERT_INITIAL_INTERVAL_MINUTES", 120.0)?)
            .decay_factor(vars.number("ALERT_DECAY_FACTOR", 0.5)?)
            .minimum_interval_minutes(vars.number("ALERT_MINIMUM_INTERVAL_MINUTES", 15.0)?)
            .hysteresis_usd(vars.number("ALERT_HYSTERESIS_USD", 2.0)?)
            .build()?;

        let poll_secs = vars.number("POLL_INTERVAL_SEC", 300.0)?;
        let poll_interval = Duration::try_from_secs_f64(poll_secs).map_err(|_e| ConfigError::Invalid {
            name: "POLL_INTERVAL_SEC",
            value: poll_secs.to_string(),
        })?;
        let daily_at = scheduler::parse_daily_time(&vars.text("DAILY_NOTIFY_TIME", "12:00"))?;
        let timezone = scheduler::parse_timezone(&vars.text("DAILY_NOTIFY_TZ", "UTC"))?;
        let schedule = SchedulerConfig::builder(poll_interval).daily_at(daily_at, timezone).build()?;

        Ok(Self {
            runpod_api_key: vars.required("RUNPOD_API_KEY")?,
            telegram_bot_token: vars.required("TELEGRAM_BOT_TOKEN")?,
            telegram_chat_id: vars.required("TELEGRAM_CHAT_ID")?,
            alert,
            schedule,
            state_path: PathBuf::from(vars.text("STATE_PATH", DEFAULT_STATE_PATH)),
            state_db_url: vars.text("STATE_DB_URL", DEFAULT_STATE_DB_URL),
            log_level: vars.text("LOG_LEVEL", "info").to_lowercase(),
        })
    }
}

/// Typed accessors over a variable lookup.
struct Vars<F>(F);

impl<F: Fn(&str) -> Option<String>> Vars<F> {
    fn get(&self, name: &str) -> Option<String> {
        (self.0)(name).map(|v| v.trim().to_owned()).filter(|v| !v.is_empty())
    }

    fn required(&self, name: &'static str) -> Result<String, ConfigError> {
        self.get(name).ok_or(ConfigError::Missing { name })
    }

    fn text(&self, name: &str, default: &str) -> String {
        self.get(name).unwrap_or_else(|| default.to_owned())
    }

    fn number(&self, name: &'static str, default: f64) -> Result<f64, ConfigError> {
        match self.get(name) {
            None => Ok(default),
            Some(raw) => match raw.parse::<f64>() {
                Ok(value) if value.is_finite() => Ok(value),
                _ => Err(ConfigError::Invalid { name, value: raw }),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
