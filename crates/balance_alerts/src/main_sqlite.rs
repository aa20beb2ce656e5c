// Rust guideline compliant 2026-10-19

//! Balance-alert service entry point -- `SQLite` state store.
//!
//! Identical to the main `balance_alerts` binary except that alert state is
//! kept in a `SQLite` database (`STATE_DB_URL`, default
//! `sqlite:data/state.db`) instead of a JSON file. Only this entry point and
//! the store adapter differ; the engine and scheduler crates are untouched.
//!
//! # Usage
//!
//! ```text
//! cargo run --bin balance_alerts_sqlite
//! RUST_LOG=debug cargo run --bin balance_alerts_sqlite
//! ```

mod adapters;
mod app;
mod config;
mod logging;

// Loaded by path so it only enters this binary's module tree.
#[path = "adapters/sqlite_store.rs"]
mod sqlite_store;

use std::path::Path;

use anyhow::Context as _;
use config::AppConfig;
use sqlite_store::SqliteStore;

/// Directory holding the database file named by a `sqlite:` URL, if any.
fn database_dir(db_url: &str) -> Option<&Path> {
    let path = db_url.strip_prefix("sqlite:")?.trim_start_matches("//");
    let path = path.split_once('?').map_or(path, |(path, _query)| path);
    if path.is_empty() || path.starts_with(":memory:") {
        return None;
    }
    Path::new(path).parent().filter(|dir| !dir.as_os_str().is_empty())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("failed to load configuration")?;
    // Initialize the tracing subscriber before any async work.
    logging::init(&config.log_level);
    tracing::debug!(?config, "main.config.loaded");

    if let Some(dir) = database_dir(&config.state_db_url) {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("failed to create {}", dir.display()))?;
    }
    let store = SqliteStore::new(&config.state_db_url)
        .await
        .context("failed to open SQLite state store")?;
    tracing::info!(url = %config.state_db_url, "main.state_store.sqlite");

    app::serve(config, store).await
}
