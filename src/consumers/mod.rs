//! Built-in push query consumers.

/// Row-accumulating consumer.
pub mod row_consumer;

pub use row_consumer::{AccumulatedResult, RowConsumer, StopReason};
