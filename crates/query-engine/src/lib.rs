//! Query Engine
//!
//! Translates read requests into store calls and shapes the results for
//! the boundary layer. Parameter defaulting and display rounding only;
//! ordering guarantees live in the store.

mod engine;

pub use engine::{MetricSummary, QueryEngine, StatsSummary};
