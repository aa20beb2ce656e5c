// Rust guideline compliant 2026-10-19

//! `SQLite` adapter for the `StateStore` port.
//!
//! Keeps the record in a single-row `alert_state` table via `sqlx`. The row
//! is pinned to `id = 1` by a `CHECK` constraint and written with
//! `INSERT OR REPLACE`, so every save overwrites the previous record.

use domain::{AlertState, StateStore, StoreError};

/// `StateStore` adapter backed by a `SQLite` database.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: sqlx::SqlitePool,
}

impl SqliteStore {
    /// Open or create the database at `db_url` and ensure the table exists.
    ///
    /// The pool holds a single connection; `sqlite::memory:` therefore
    /// behaves as one database for the lifetime of the store.
    ///
    /// # Errors
    ///
    /// Returns `sqlx::Error` when the connection or schema creation fails.
    pub async fn new(db_url: &str) -> Result<Self, sqlx::Error> {
        // sqlx 0.8 does not create database files unless asked to.
        let opts = db_url
            .parse::<sqlx::sqlite::SqliteConnectOptions>()?
            .create_if_missing(true);
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(opts)
            .await?;
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS alert_state (
                id                   INTEGER PRIMARY KEY CHECK (id = 1),
                last_alert_at        REAL,              -- NULL outside a streak
                current_interval_min REAL    NOT NULL,
                alert_count          INTEGER NOT NULL
            )",
        )
        .execute(&pool)
        .await?;
        Ok(Self { pool })
    }
}

impl StateStore for SqliteStore {
    async fn load(&self) -> Result<Option<AlertState>, StoreError> {
        let row: Option<(Option<f64>, f64, i64)> = sqlx::query_as(
            "SELECT last_alert_at, current_interval_min, alert_count FROM alert_state WHERE id = 1",
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "sqlite_store.load_failed");
            StoreError::Unavailable { reason: e.to_string() }
        })?;

        let Some((last_alert_at, current_interval_min, alert_count)) = row else {
            return Ok(None);
        };
        let alert_count = u32::try_from(alert_count).map_err(|e| StoreError::Corrupt {
            reason: format!("alert_count {alert_count}: {e}"),
        })?;
        Ok(Some(AlertState { last_alert_at, current_interval_min, alert_count }))
    }

    async fn save(&self, state: &AlertState) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT OR REPLACE INTO alert_state
             (id, last_alert_at, current_interval_min, alert_count)
             VALUES (1, ?, ?, ?)",
        )
        .bind(state.last_alert_at)
        .bind(state.current_interval_min)
        .bind(i64::from(state.alert_count))
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "sqlite_store.save_failed");
            StoreError::Unavailable { reason: e.to_string() }
        })?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::SqliteStore;
    use domain::{AlertState, StateStore as _, StoreError};

    // Each call opens its own single-connection pool, hence its own in-memory DB.
    async fn make_store() -> SqliteStore {
        SqliteStore::new("sqlite::memory:").await.expect("in-memory SQLite should open")
    }

    #[tokio::test]
    async fn empty_table_loads_none() {
        let store = make_store().await;
        assert_eq!(store.load().await.unwrap(), None);
    }

    #[tokio::test]
    async fn save_then_load_returns_same_record() {
        let store = make_store().await;
        let state = AlertState { last_alert_at: Some(1_700_000_123.25), current_interval_min: 15.0, alert_count: 4 };
        store.save(&state).await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some(state));
    }

    #[tokio::test]
    async fn null_timestamp_round_trips() {
        let store = make_store().await;
        store.save(&AlertState::fresh(120.0)).await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some(AlertState::fresh(120.0)));
    }

    #[tokio::test]
    async fn repeated_saves_keep_one_row() {
        let store = make_store().await;
        store
            .save(&AlertState { last_alert_at: Some(1.0), current_interval_min: 60.0, alert_count: 1 })
            .await
            .unwrap();
        store.save(&AlertState::fresh(120.0)).await.unwrap();
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM alert_state")
            .fetch_one(&store.pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
        assert_eq!(store.load().await.unwrap(), Some(AlertState::fresh(120.0)));
    }

    #[tokio::test]
    async fn negative_count_is_corrupt() {
        let store = make_store().await;
        sqlx::query("INSERT INTO alert_state VALUES (1, NULL, 120.0, -3)")
            .execute(&store.pool)
            .await
            .unwrap();
        assert!(matches!(store.load().await, Err(StoreError::Corrupt { .. })));
    }

    #[tokio::test]
    async fn second_row_is_rejected_by_schema() {
        let store = make_store().await;
        let result = sqlx::query("INSERT INTO alert_state VALUES (2, NULL, 120.0, 0)")
            .execute(&store.pool)
            .await;
        assert!(result.is_err());
    }
}
