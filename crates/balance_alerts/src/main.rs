// Rust guideline compliant 2026-10-19

//! Balance-alert service entry point.
//!
//! Polls the RunPod balance, sends low-balance, depleted, and recovery
//! alerts plus a daily report to a Telegram chat, and answers `/balance` in
//! that chat. Alert state is kept in a JSON file (`STATE_PATH`, default
//! `data/state.json`).
//!
//! # Usage
//!
//! ```text
//! # Settings come from the environment or a .env file; press CTRL+C to stop
//! cargo run --bin balance_alerts
//!
//! # Also show per-poll debug output
//! RUST_LOG=debug cargo run --bin balance_alerts
//! ```

mod adapters;
mod app;
mod config;
mod logging;

// Loaded by path so it only enters this binary's module tree.
#[path = "adapters/json_file_store.rs"]
mod json_file_store;

use anyhow::Context as _;
use config::AppConfig;
use json_file_store::JsonFileStore;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("failed to load configuration")?;
    // Initialize the tracing subscriber before any async work.
    logging::init(&config.log_level);
    tracing::debug!(?config, "main.config.loaded");

    let store = JsonFileStore::new(config.state_path.clone());
    tracing::info!(path = %store.path().display(), "main.state_store.json");

    app::serve(config, store).await
}
