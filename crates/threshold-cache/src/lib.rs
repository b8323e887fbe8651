//! Threshold Cache
//!
//! Process-wide in-memory mirror of the singleton threshold row, kept
//! consistent with the persistent store by write-through updates.

mod cache;

pub use cache::{ThresholdCache, Thresholds};
