use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};
use std::str::FromStr;
use std::time::Duration;

use super::types::DatabaseError;

// ============================================================================
// Database
// ============================================================================

/// Handle to the SQLite archive.
///
/// Constructed once at startup and handed to the pipeline; cloning shares the
/// underlying pool.
#[derive(Clone)]
pub struct Database {
    pub(crate) pool: SqlitePool,
}

impl Database {
    /// Open (creating if needed) the database file and ensure the schema exists.
    ///
    /// `":memory:"` opens a private in-memory database, used by tests.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::Locked` if another process holds the file lock,
    /// `DatabaseError::Schema` if the table could not be created.
    pub async fn open(path: &str) -> Result<Self, DatabaseError> {
        let url = format!("sqlite:{}?mode=rwc", path);

        // busy_timeout=5000: a scheduled run that overlaps a manual `query`
        // waits for the writer instead of failing immediately.
        let options = SqliteConnectOptions::from_str(&url)
            .map_err(DatabaseError::from_sqlx)?
            .pragma("busy_timeout", "5000");
        // The pipeline is sequential; a single connection is all it ever uses.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(options)
            .await
            .map_err(DatabaseError::from_sqlx)?;
        let db = Self { pool };
        db.init().await?;
        tracing::debug!(path = %path, "Database ready");
        Ok(db)
    }

    /// Create the `rss_feed` table and its indexes if absent.
    ///
    /// Every statement uses `IF NOT EXISTS`, so running this against an
    /// existing database is a no-op.
    pub async fn init(&self) -> Result<(), DatabaseError> {
        self.create_schema().await.map_err(|e| match DatabaseError::from_sqlx(e) {
            DatabaseError::Other(inner) => DatabaseError::Schema(inner.to_string()),
            locked => locked,
        })
    }

    async fn create_schema(&self) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS rss_feed (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                Category TEXT NOT NULL,
                Title TEXT NOT NULL,
                Publish_Date TEXT NOT NULL,
                Feed_URL TEXT NOT NULL UNIQUE,
                Summary TEXT,
                Content TEXT,
                AI_Summary TEXT
            )
        "#,
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_rss_feed_category ON rss_feed(Category)")
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Close the pool, flushing any pending writes.
    pub async fn close(self) {
        self.pool.close().await;
    }
}
