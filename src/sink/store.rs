//! SQLite sample store

use std::path::Path;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::info;

use crate::error::Result;
use crate::protocol::ReceivedSample;

/// Schema creation, safe to run on every startup
const CREATE_TABLE_SQL: &str = "CREATE TABLE IF NOT EXISTS gps_log (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp TEXT,
    seq INTEGER,
    latitude REAL,
    longitude REAL,
    rssi REAL,
    antenna TEXT,
    sender TEXT
)";

const INSERT_SQL: &str = "INSERT INTO gps_log (timestamp, seq, latitude, longitude, rssi, antenna, sender) \
     VALUES (?, ?, ?, ?, ?, ?, ?)";

/// Durable structured store, one row per received sample
#[derive(Debug)]
pub struct SampleStore {
    pool: SqlitePool,
}

impl SampleStore {
    /// Open (creating if missing) the database file and ensure the table exists
    ///
    /// # Errors
    ///
    /// Returns `TelemetryError::Store` if the file cannot be opened or the
    /// schema cannot be created.
    pub async fn open(path: &Path) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        sqlx::query(CREATE_TABLE_SQL).execute(&pool).await?;
        info!("Opened sample store {}", path.display());

        Ok(Self { pool })
    }

    /// Insert one sample, NULLs included, returning its row id
    pub async fn insert(&self, sample: &ReceivedSample) -> Result<i64> {
        let result = sqlx::query(INSERT_SQL)
            .bind(sample.timestamp_text())
            .bind(sample.seq)
            .bind(sample.latitude)
            .bind(sample.longitude)
            .bind(sample.rssi)
            .bind(sample.antenna.clone())
            .bind(sample.sender.clone())
            .execute(&self.pool)
            .await?;

        Ok(result.last_insert_rowid())
    }

    /// Number of samples stored so far
    pub async fn count(&self) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM gps_log")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Close the connection, waiting for in-flight statements
    pub async fn close(self) {
        self.pool.close().await;
    }

    #[cfg(test)]
    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
