//! Ingestion Handler
//!
//! Accepts reading submissions from devices, validates them, and appends
//! them to the persistent store.

mod handler;

pub use handler::{IngestHandler, ReadingSubmission};
