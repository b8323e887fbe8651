//! SQLite Store Implementation

use crate::{ensure_finite, StorageError};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use std::path::Path;
use tracing::{debug, info};

/// Default number of rows returned by the latest-readings query
pub const DEFAULT_LATEST_LIMIT: i64 = 20;
/// Default number of rows returned by the history query
pub const DEFAULT_HISTORY_LIMIT: i64 = 100;
/// Trailing window for aggregate statistics, in hours
pub const DEFAULT_STATS_WINDOW_HOURS: i64 = 24;

// Threshold values seeded on first initialization
const DEFAULT_TEMPERATURE_LIMIT: f64 = 30.0;
const DEFAULT_HUMIDITY_LIMIT: f64 = 70.0;
const DEFAULT_WATER_LEVEL_LIMIT: f64 = 80.0;

/// One immutable sensor reading
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reading {
    pub device_id: String,
    pub temperature: f64,
    pub humidity: f64,
    pub water_level: f64,
    /// Store-assigned insertion time (unix milliseconds)
    pub timestamp_ms: i64,
}

/// The singleton alert-threshold row
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ThresholdRow {
    pub temperature: f64,
    pub humidity: f64,
    pub water_level: f64,
    pub updated_at_ms: i64,
}

/// Aggregate values for one metric over a window
#[derive(Debug, Clone, Copy, Serialize)]
pub struct MetricStats {
    pub avg: f64,
    pub max: f64,
    pub min: f64,
}

/// Per-metric aggregates over a trailing window, full precision
#[derive(Debug, Clone, Copy, Serialize)]
pub struct WindowStats {
    pub temperature: MetricStats,
    pub humidity: MetricStats,
    pub water_level: MetricStats,
    pub count: i64,
}

/// SQLite-backed store for readings and thresholds
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Open (or create) a file-backed database
    pub async fn open(path: impl AsRef<Path>, max_connections: u32) -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::new()
            .filename(path.as_ref())
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;

        info!("Opened sensor database at {}", path.as_ref().display());
        Ok(Self { pool })
    }

    /// Open an in-memory database for tests.
    ///
    /// A single connection keeps every operation on the same database;
    /// separate pooled connections would each get their own memory store.
    pub async fn open_in_memory() -> Result<Self, StorageError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;

        Ok(Self { pool })
    }

    /// Close the underlying pool. Further operations fail.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Ensure both tables exist and the threshold row is seeded.
    ///
    /// Idempotent: safe to call on every process start. An already
    /// customized threshold row is never reset.
    pub async fn initialize(&self) -> Result<(), StorageError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS readings (
                id           INTEGER PRIMARY KEY AUTOINCREMENT,
                device_id    TEXT    NOT NULL,
                temperature  REAL    NOT NULL,
                humidity     REAL    NOT NULL,
                water_level  REAL    NOT NULL,
                timestamp_ms INTEGER NOT NULL
            );
            "#,
        )
        .execute(&mut *tx)
        .await
        .map_err(|e| StorageError::Unavailable(e.to_string()))?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_readings_device_id
                ON readings (device_id);
            "#,
        )
        .execute(&mut *tx)
        .await
        .map_err(|e| StorageError::Unavailable(e.to_string()))?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_readings_timestamp_ms
                ON readings (timestamp_ms);
            "#,
        )
        .execute(&mut *tx)
        .await
        .map_err(|e| StorageError::Unavailable(e.to_string()))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS thresholds (
                id            INTEGER PRIMARY KEY CHECK (id = 1),
                temperature   REAL    NOT NULL,
                humidity      REAL    NOT NULL,
                water_level   REAL    NOT NULL,
                updated_at_ms INTEGER NOT NULL
            );
            "#,
        )
        .execute(&mut *tx)
        .await
        .map_err(|e| StorageError::Unavailable(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT OR IGNORE INTO thresholds (id, temperature, humidity, water_level, updated_at_ms)
            VALUES (1, ?, ?, ?, ?);
            "#,
        )
        .bind(DEFAULT_TEMPERATURE_LIMIT)
        .bind(DEFAULT_HUMIDITY_LIMIT)
        .bind(DEFAULT_WATER_LEVEL_LIMIT)
        .bind(Utc::now().timestamp_millis())
        .execute(&mut *tx)
        .await
        .map_err(|e| StorageError::Unavailable(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;

        info!("Database schema ready");
        Ok(())
    }

    /// Insert one reading with a store-assigned timestamp
    pub async fn append_reading(
        &self,
        device_id: &str,
        temperature: f64,
        humidity: f64,
        water_level: f64,
    ) -> Result<(), StorageError> {
        if device_id.is_empty() {
            return Err(StorageError::Validation(
                "device_id must be a non-empty string".to_string(),
            ));
        }
        ensure_finite("temperature", temperature)?;
        ensure_finite("humidity", humidity)?;
        ensure_finite("water_level", water_level)?;

        let timestamp_ms = Utc::now().timestamp_millis();

        sqlx::query(
            r#"
            INSERT INTO readings (device_id, temperature, humidity, water_level, timestamp_ms)
            VALUES (?, ?, ?, ?, ?);
            "#,
        )
        .bind(device_id)
        .bind(temperature)
        .bind(humidity)
        .bind(water_level)
        .bind(timestamp_ms)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Write(e.to_string()))?;

        debug!("Stored reading from {}", device_id);
        Ok(())
    }

    /// Get the most recent readings across all devices.
    ///
    /// Absent or non-positive limits fall back to the default.
    pub async fn latest_readings(&self, limit: Option<i64>) -> Result<Vec<Reading>, StorageError> {
        self.fetch_readings(None, effective_limit(limit, DEFAULT_LATEST_LIMIT))
            .await
    }

    /// Get recent readings, optionally filtered to one device
    pub async fn history(
        &self,
        device_id: Option<&str>,
        limit: Option<i64>,
    ) -> Result<Vec<Reading>, StorageError> {
        self.fetch_readings(device_id, effective_limit(limit, DEFAULT_HISTORY_LIMIT))
            .await
    }

    async fn fetch_readings(
        &self,
        device_id: Option<&str>,
        limit: i64,
    ) -> Result<Vec<Reading>, StorageError> {
        // Ties on timestamp_ms break by insertion order, newest first.
        let rows = match device_id {
            Some(device) => {
                sqlx::query(
                    r#"
                    SELECT device_id, temperature, humidity, water_level, timestamp_ms
                    FROM readings
                    WHERE device_id = ?
                    ORDER BY timestamp_ms DESC, id DESC
                    LIMIT ?;
                    "#,
                )
                .bind(device)
                .bind(limit)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query(
                    r#"
                    SELECT device_id, temperature, humidity, water_level, timestamp_ms
                    FROM readings
                    ORDER BY timestamp_ms DESC, id DESC
                    LIMIT ?;
                    "#,
                )
                .bind(limit)
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(|e| StorageError::Read(e.to_string()))?;

        rows.iter().map(reading_from_row).collect()
    }

    /// Read the singleton threshold row
    pub async fn read_threshold_row(&self) -> Result<ThresholdRow, StorageError> {
        let row = sqlx::query(
            r#"
            SELECT temperature, humidity, water_level, updated_at_ms
            FROM thresholds
            WHERE id = 1;
            "#,
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Read(e.to_string()))?;

        let row = row.ok_or(StorageError::NotFound)?;
        Ok(ThresholdRow {
            temperature: column(&row, "temperature")?,
            humidity: column(&row, "humidity")?,
            water_level: column(&row, "water_level")?,
            updated_at_ms: column(&row, "updated_at_ms")?,
        })
    }

    /// Overwrite the singleton threshold row and stamp its update time
    pub async fn write_threshold_row(
        &self,
        temperature: f64,
        humidity: f64,
        water_level: f64,
    ) -> Result<ThresholdRow, StorageError> {
        ensure_finite("temperature", temperature)?;
        ensure_finite("humidity", humidity)?;
        ensure_finite("water_level", water_level)?;

        let updated_at_ms = Utc::now().timestamp_millis();

        let result = sqlx::query(
            r#"
            UPDATE thresholds
            SET temperature = ?, humidity = ?, water_level = ?, updated_at_ms = ?
            WHERE id = 1;
            "#,
        )
        .bind(temperature)
        .bind(humidity)
        .bind(water_level)
        .bind(updated_at_ms)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Write(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }

        info!(
            "Thresholds updated: T={} H={} W={}",
            temperature, humidity, water_level
        );
        Ok(ThresholdRow {
            temperature,
            humidity,
            water_level,
            updated_at_ms,
        })
    }

    /// Aggregate readings within a trailing window.
    ///
    /// Returns `Ok(None)` when the window holds no readings.
    pub async fn window_stats(&self, window: Duration) -> Result<Option<WindowStats>, StorageError> {
        let cutoff_ms = Utc::now().timestamp_millis() - window.num_milliseconds();

        let row = sqlx::query(
            r#"
            SELECT
                AVG(temperature) AS avg_temperature,
                MAX(temperature) AS max_temperature,
                MIN(temperature) AS min_temperature,
                AVG(humidity)    AS avg_humidity,
                MAX(humidity)    AS max_humidity,
                MIN(humidity)    AS min_humidity,
                AVG(water_level) AS avg_water_level,
                MAX(water_level) AS max_water_level,
                MIN(water_level) AS min_water_level,
                COUNT(*)         AS reading_count
            FROM readings
            WHERE timestamp_ms >= ?;
            "#,
        )
        .bind(cutoff_ms)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StorageError::Read(e.to_string()))?;

        let count: i64 = column(&row, "reading_count")?;
        if count == 0 {
            return Ok(None);
        }

        Ok(Some(WindowStats {
            temperature: MetricStats {
                avg: column(&row, "avg_temperature")?,
                max: column(&row, "max_temperature")?,
                min: column(&row, "min_temperature")?,
            },
            humidity: MetricStats {
                avg: column(&row, "avg_humidity")?,
                max: column(&row, "max_humidity")?,
                min: column(&row, "min_humidity")?,
            },
            water_level: MetricStats {
                avg: column(&row, "avg_water_level")?,
                max: column(&row, "max_water_level")?,
                min: column(&row, "min_water_level")?,
            },
            count,
        }))
    }
}

fn reading_from_row(row: &SqliteRow) -> Result<Reading, StorageError> {
    Ok(Reading {
        device_id: column(row, "device_id")?,
        temperature: column(row, "temperature")?,
        humidity: column(row, "humidity")?,
        water_level: column(row, "water_level")?,
        timestamp_ms: column(row, "timestamp_ms")?,
    })
}

fn column<'r, T>(row: &'r SqliteRow, name: &str) -> Result<T, StorageError>
where
    T: sqlx::Decode<'r, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>,
{
    row.try_get(name)
        .map_err(|e| StorageError::Read(e.to_string()))
}

fn effective_limit(limit: Option<i64>, default: i64) -> i64 {
    match limit {
        Some(n) if n > 0 => n,
        _ => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_store() -> Store {
        let store = Store::open_in_memory().await.unwrap();
        store.initialize().await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_latest_returns_reverse_insertion_order() {
        let store = test_store().await;

        for i in 0..5 {
            store
                .append_reading("esp32-01", 20.0 + i as f64, 50.0, 10.0)
                .await
                .unwrap();
        }

        let latest = store.latest_readings(Some(3)).await.unwrap();
        assert_eq!(latest.len(), 3);
        assert_eq!(latest[0].temperature, 24.0);
        assert_eq!(latest[1].temperature, 23.0);
        assert_eq!(latest[2].temperature, 22.0);
    }

    #[tokio::test]
    async fn test_append_rejects_non_finite() {
        let store = test_store().await;

        let err = store
            .append_reading("esp32-01", f64::NAN, 50.0, 10.0)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Validation(_)));

        let err = store
            .append_reading("esp32-01", 20.0, f64::INFINITY, 10.0)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Validation(_)));

        // Nothing reached the log
        assert!(store.latest_readings(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_append_rejects_empty_device_id() {
        let store = test_store().await;

        let err = store.append_reading("", 20.0, 50.0, 10.0).await.unwrap_err();
        assert!(matches!(err, StorageError::Validation(_)));
    }

    #[tokio::test]
    async fn test_latest_limit_defaulting() {
        let store = test_store().await;

        for _ in 0..25 {
            store
                .append_reading("esp32-01", 20.0, 50.0, 10.0)
                .await
                .unwrap();
        }

        assert_eq!(store.latest_readings(None).await.unwrap().len(), 20);
        assert_eq!(store.latest_readings(Some(0)).await.unwrap().len(), 20);
        assert_eq!(store.latest_readings(Some(-5)).await.unwrap().len(), 20);
        assert_eq!(store.latest_readings(Some(5)).await.unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_history_filters_by_device() {
        let store = test_store().await;

        for i in 0..3 {
            store
                .append_reading("device-a", 10.0 + i as f64, 40.0, 5.0)
                .await
                .unwrap();
            store
                .append_reading("device-b", 30.0 + i as f64, 60.0, 15.0)
                .await
                .unwrap();
        }

        let history = store.history(Some("device-a"), None).await.unwrap();
        assert_eq!(history.len(), 3);
        assert!(history.iter().all(|r| r.device_id == "device-a"));
        // Descending by timestamp, insertion order breaking ties
        assert_eq!(history[0].temperature, 12.0);
        assert_eq!(history[2].temperature, 10.0);
    }

    #[tokio::test]
    async fn test_initialize_is_idempotent() {
        let store = Store::open_in_memory().await.unwrap();
        store.initialize().await.unwrap();

        store.write_threshold_row(25.0, 55.0, 65.0).await.unwrap();
        store.initialize().await.unwrap();

        let row = store.read_threshold_row().await.unwrap();
        assert_eq!(row.temperature, 25.0);
        assert_eq!(row.humidity, 55.0);
        assert_eq!(row.water_level, 65.0);
    }

    #[tokio::test]
    async fn test_default_thresholds_seeded() {
        let store = test_store().await;

        let row = store.read_threshold_row().await.unwrap();
        assert_eq!(row.temperature, 30.0);
        assert_eq!(row.humidity, 70.0);
        assert_eq!(row.water_level, 80.0);
    }

    #[tokio::test]
    async fn test_write_threshold_rejects_non_finite() {
        let store = test_store().await;

        let err = store
            .write_threshold_row(f64::NEG_INFINITY, 55.0, 65.0)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Validation(_)));

        // Durable row untouched
        let row = store.read_threshold_row().await.unwrap();
        assert_eq!(row.temperature, 30.0);
    }

    #[tokio::test]
    async fn test_window_stats_empty_is_none() {
        let store = test_store().await;

        let stats = store
            .window_stats(Duration::hours(DEFAULT_STATS_WINDOW_HOURS))
            .await
            .unwrap();
        assert!(stats.is_none());
    }

    #[tokio::test]
    async fn test_window_stats_aggregates() {
        let store = test_store().await;

        for t in [10.0, 20.0, 30.0] {
            store
                .append_reading("esp32-01", t, 50.0, 10.0)
                .await
                .unwrap();
        }

        let stats = store
            .window_stats(Duration::hours(DEFAULT_STATS_WINDOW_HOURS))
            .await
            .unwrap()
            .expect("window holds readings");
        assert_eq!(stats.count, 3);
        assert_eq!(stats.temperature.avg, 20.0);
        assert_eq!(stats.temperature.max, 30.0);
        assert_eq!(stats.temperature.min, 10.0);
        assert_eq!(stats.humidity.avg, 50.0);
    }

    #[tokio::test]
    async fn test_write_fails_after_close() {
        let store = test_store().await;
        store.close().await;

        let err = store
            .append_reading("esp32-01", 20.0, 50.0, 10.0)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Write(_)));
    }
}
