//! Threshold Cache Implementation

use serde::{Deserialize, Serialize};
use storage::{ensure_finite, StorageError, Store, ThresholdRow};
use tokio::sync::RwLock;
use tracing::info;

/// Current alert limits
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub temperature: f64,
    pub humidity: f64,
    pub water_level: f64,
}

impl From<ThresholdRow> for Thresholds {
    fn from(row: ThresholdRow) -> Self {
        Self {
            temperature: row.temperature,
            humidity: row.humidity,
            water_level: row.water_level,
        }
    }
}

/// In-memory mirror of the durable threshold row.
///
/// Starts uninitialized; `load` transitions it to loaded once at startup.
/// Updates write through to the store and swap the whole triple only after
/// the write commits, so readers observe either the old or the new values,
/// never a mix.
pub struct ThresholdCache {
    inner: RwLock<Option<Thresholds>>,
}

impl ThresholdCache {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(None),
        }
    }

    /// Load the durable row into the cache
    pub async fn load(&self, store: &Store) -> Result<Thresholds, StorageError> {
        let values = Thresholds::from(store.read_threshold_row().await?);
        let mut guard = self.inner.write().await;
        *guard = Some(values);
        info!("Threshold cache loaded: {:?}", values);
        Ok(values)
    }

    /// Current triple. Reading before `load` is an invariant violation.
    pub async fn get(&self) -> Result<Thresholds, StorageError> {
        let guard = self.inner.read().await;
        (*guard).ok_or(StorageError::NotFound)
    }

    /// Validate, write through, then swap the cached triple.
    ///
    /// The write lock is held across the write-through so updates publish
    /// in commit order; a failed write leaves the prior values visible.
    pub async fn update(
        &self,
        store: &Store,
        temperature: f64,
        humidity: f64,
        water_level: f64,
    ) -> Result<Thresholds, StorageError> {
        ensure_finite("temperature", temperature)?;
        ensure_finite("humidity", humidity)?;
        ensure_finite("water_level", water_level)?;

        let mut guard = self.inner.write().await;
        let row = store
            .write_threshold_row(temperature, humidity, water_level)
            .await?;
        let values = Thresholds::from(row);
        *guard = Some(values);
        Ok(values)
    }
}

impl Default for ThresholdCache {
    fn default() -> Self {
        Self::new()
    }
}
