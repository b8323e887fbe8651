//! Submission Validation and Append

use serde::Deserialize;
use std::sync::Arc;
use storage::{ensure_finite, StorageError, Store};
use tracing::info;

/// One reading submission, fields optional until validated
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReadingSubmission {
    pub device_id: Option<String>,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub water_level: Option<f64>,
}

/// Validates submissions and appends them to the store
pub struct IngestHandler {
    store: Arc<Store>,
}

impl IngestHandler {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    /// Validate all four required fields, then append.
    ///
    /// Success carries no payload; it is an acknowledgement only. Every
    /// failure kind propagates unchanged for the boundary to translate.
    pub async fn submit(&self, submission: ReadingSubmission) -> Result<(), StorageError> {
        let device_id = submission
            .device_id
            .as_deref()
            .ok_or_else(|| missing("device_id"))?;
        let temperature = submission
            .temperature
            .ok_or_else(|| missing("temperature"))?;
        let humidity = submission.humidity.ok_or_else(|| missing("humidity"))?;
        let water_level = submission
            .water_level
            .ok_or_else(|| missing("water_level"))?;

        ensure_finite("temperature", temperature)?;
        ensure_finite("humidity", humidity)?;
        ensure_finite("water_level", water_level)?;

        self.store
            .append_reading(device_id, temperature, humidity, water_level)
            .await?;

        info!(
            "Data received from {}: T={} H={} W={}",
            device_id, temperature, humidity, water_level
        );
        Ok(())
    }
}

fn missing(field: &'static str) -> StorageError {
    StorageError::Validation(format!("Missing required field: {}", field))
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn handler() -> IngestHandler {
        let store = Arc::new(Store::open_in_memory().await.unwrap());
        store.initialize().await.unwrap();
        IngestHandler::new(store)
    }

    fn full_submission() -> ReadingSubmission {
        ReadingSubmission {
            device_id: Some("esp32-01".to_string()),
            temperature: Some(21.5),
            humidity: Some(48.0),
            water_level: Some(12.0),
        }
    }

    #[tokio::test]
    async fn test_valid_submission_is_appended() {
        let handler = handler().await;
        handler.submit(full_submission()).await.unwrap();

        let readings = handler.store.latest_readings(None).await.unwrap();
        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].device_id, "esp32-01");
        assert_eq!(readings[0].temperature, 21.5);
    }

    #[tokio::test]
    async fn test_each_missing_field_is_rejected() {
        let handler = handler().await;

        for strip in 0..4 {
            let mut submission = full_submission();
            match strip {
                0 => submission.device_id = None,
                1 => submission.temperature = None,
                2 => submission.humidity = None,
                _ => submission.water_level = None,
            }
            let err = handler.submit(submission).await.unwrap_err();
            assert!(matches!(err, StorageError::Validation(_)));
        }

        assert!(handler.store.latest_readings(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_non_finite_measurement_is_rejected() {
        let handler = handler().await;

        let mut submission = full_submission();
        submission.water_level = Some(f64::NAN);
        let err = handler.submit(submission).await.unwrap_err();
        assert!(matches!(err, StorageError::Validation(_)));
    }

    #[tokio::test]
    async fn test_empty_device_id_is_rejected() {
        let handler = handler().await;

        let mut submission = full_submission();
        submission.device_id = Some(String::new());
        let err = handler.submit(submission).await.unwrap_err();
        assert!(matches!(err, StorageError::Validation(_)));
    }
}
