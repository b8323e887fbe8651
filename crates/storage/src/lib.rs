//! Storage Layer
//!
//! SQLite persistence for sensor readings and the singleton threshold row.

mod store;

pub use store::{
    MetricStats, Reading, Store, ThresholdRow, WindowStats, DEFAULT_HISTORY_LIMIT,
    DEFAULT_LATEST_LIMIT, DEFAULT_STATS_WINDOW_HOURS,
};

use thiserror::Error;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    /// Malformed, missing, or non-finite input
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Database could not be opened or created
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// I/O failure during a write
    #[error("Storage write failed: {0}")]
    Write(String),

    /// I/O failure during a read
    #[error("Storage read failed: {0}")]
    Read(String),

    /// Singleton threshold row missing after initialization
    #[error("Threshold row not found")]
    NotFound,
}

/// Reject NaN and infinite measurement values.
///
/// Components validate before calling the store; the store re-validates on
/// its own writes.
pub fn ensure_finite(field: &'static str, value: f64) -> Result<(), StorageError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(StorageError::Validation(format!(
            "{} must be a finite number",
            field
        )))
    }
}
