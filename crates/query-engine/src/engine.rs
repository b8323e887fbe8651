//! Read-Side Query Evaluation

use chrono::Duration;
use serde::Serialize;
use std::sync::Arc;
use storage::{Reading, StorageError, Store, WindowStats, DEFAULT_STATS_WINDOW_HOURS};

/// Per-metric aggregate rounded for display
#[derive(Debug, Clone, Copy, Serialize)]
pub struct MetricSummary {
    pub avg: f64,
    pub max: f64,
    pub min: f64,
}

/// Shaped window statistics
#[derive(Debug, Clone, Copy, Serialize)]
pub struct StatsSummary {
    pub temperature: MetricSummary,
    pub humidity: MetricSummary,
    pub water_level: MetricSummary,
    pub total_readings: i64,
}

/// Read-side façade over the store
pub struct QueryEngine {
    store: Arc<Store>,
}

impl QueryEngine {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    /// Most recent readings across all devices (default limit 20)
    pub async fn latest(&self, limit: Option<i64>) -> Result<Vec<Reading>, StorageError> {
        self.store.latest_readings(normalize_limit(limit)).await
    }

    /// Recent readings, optionally filtered to one device (default limit 100)
    pub async fn history(
        &self,
        device_id: Option<&str>,
        limit: Option<i64>,
    ) -> Result<Vec<Reading>, StorageError> {
        // An empty filter string means "all devices"
        let device = device_id.filter(|d| !d.is_empty());
        self.store.history(device, normalize_limit(limit)).await
    }

    /// Aggregates over the default trailing window, rounded to 2 decimals.
    ///
    /// `None` means the window holds no readings.
    pub async fn stats(&self) -> Result<Option<StatsSummary>, StorageError> {
        let window = Duration::hours(DEFAULT_STATS_WINDOW_HOURS);
        let stats = self.store.window_stats(window).await?;
        Ok(stats.map(shape))
    }
}

/// Non-positive limits fall back to the store's default
fn normalize_limit(limit: Option<i64>) -> Option<i64> {
    limit.filter(|n| *n > 0)
}

fn shape(stats: WindowStats) -> StatsSummary {
    StatsSummary {
        temperature: summarize(stats.temperature.avg, stats.temperature.max, stats.temperature.min),
        humidity: summarize(stats.humidity.avg, stats.humidity.max, stats.humidity.min),
        water_level: summarize(
            stats.water_level.avg,
            stats.water_level.max,
            stats.water_level.min,
        ),
        total_readings: stats.count,
    }
}

fn summarize(avg: f64, max: f64, min: f64) -> MetricSummary {
    MetricSummary {
        avg: round2(avg),
        max: round2(max),
        min: round2(min),
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn engine_with_store() -> (Arc<Store>, QueryEngine) {
        let store = Arc::new(Store::open_in_memory().await.unwrap());
        store.initialize().await.unwrap();
        (store.clone(), QueryEngine::new(store))
    }

    #[tokio::test]
    async fn test_non_positive_limits_use_default() {
        let (store, engine) = engine_with_store().await;

        for _ in 0..25 {
            store
                .append_reading("esp32-01", 20.0, 50.0, 10.0)
                .await
                .unwrap();
        }

        assert_eq!(engine.latest(Some(-1)).await.unwrap().len(), 20);
        assert_eq!(engine.latest(Some(0)).await.unwrap().len(), 20);
        assert_eq!(engine.latest(None).await.unwrap().len(), 20);
        assert_eq!(engine.latest(Some(3)).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_empty_device_filter_means_all() {
        let (store, engine) = engine_with_store().await;

        store
            .append_reading("device-a", 20.0, 50.0, 10.0)
            .await
            .unwrap();
        store
            .append_reading("device-b", 22.0, 52.0, 11.0)
            .await
            .unwrap();

        assert_eq!(engine.history(Some(""), None).await.unwrap().len(), 2);
        assert_eq!(
            engine.history(Some("device-a"), None).await.unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn test_stats_rounds_to_two_decimals() {
        let (store, engine) = engine_with_store().await;

        for t in [10.0, 20.0, 25.0] {
            store.append_reading("esp32-01", t, 50.0, 10.0).await.unwrap();
        }

        let summary = engine.stats().await.unwrap().expect("readings in window");
        // 55/3 = 18.333... rounds to 18.33
        assert_eq!(summary.temperature.avg, 18.33);
        assert_eq!(summary.temperature.max, 25.0);
        assert_eq!(summary.temperature.min, 10.0);
        assert_eq!(summary.total_readings, 3);
    }

    #[tokio::test]
    async fn test_stats_empty_window_is_none() {
        let (_store, engine) = engine_with_store().await;
        assert!(engine.stats().await.unwrap().is_none());
    }
}
