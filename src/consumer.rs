//! # Consumer Trait
//!
//! A [`Consumer`] sits at the end of a push query: it drains the record stream
//! a [`Producer`](crate::Producer) hands it and keeps what it needs.
//!
//! ## Overview
//!
//! - **Stream Consumption**: `consume` reads until the stream ends or the
//!   consumer decides to stop, and reports why it stopped
//! - **Configuration**: [`ConsumerConfig`] carries the name, row limit, idle
//!   timeout and error strategy
//! - **Component Information**: name and type for log fields
//!
//! ## Example
//!
//! ```rust
//! use futures::stream;
//! use streamweave_ksql::consumers::{RowConsumer, StopReason};
//! use streamweave_ksql::output::RawRecord;
//! use streamweave_ksql::Consumer;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut consumer = RowConsumer::new();
//! let records: Vec<RawRecord> = vec![Ok(r#"{"row":{"columns":[1]}}"#.to_string())];
//!
//! let stop = consumer.consume(Box::pin(stream::iter(records))).await?;
//! assert_eq!(stop, StopReason::Exhausted);
//! # Ok(())
//! # }
//! ```

use crate::error::{ComponentInfo, ErrorStrategy};
use crate::input::Input;
use async_trait::async_trait;
use std::time::Duration;

/// Configuration for a consumer component.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConsumerConfig {
  /// The name of this consumer component.
  pub name: String,
  /// Stop after this many rows. `None` or zero reads until the stream ends.
  pub limit: Option<usize>,
  /// Stop when no record arrives for this long.
  pub idle_timeout: Option<Duration>,
  /// What to do with records that cannot be parsed.
  pub error_strategy: ErrorStrategy,
}

impl ConsumerConfig {
  /// Sets the name for this consumer configuration.
  #[must_use]
  pub fn with_name(mut self, name: impl Into<String>) -> Self {
    self.name = name.into();
    self
  }

  /// Sets the row limit. Zero means unlimited.
  #[must_use]
  pub fn with_limit(mut self, limit: usize) -> Self {
    self.limit = (limit > 0).then_some(limit);
    self
  }

  /// Sets the idle timeout.
  #[must_use]
  pub fn with_idle_timeout(mut self, timeout: Option<Duration>) -> Self {
    self.idle_timeout = timeout;
    self
  }

  /// Sets the error handling strategy.
  #[must_use]
  pub fn with_error_strategy(mut self, strategy: ErrorStrategy) -> Self {
    self.error_strategy = strategy;
    self
  }

  /// Returns the current error handling strategy.
  pub fn error_strategy(&self) -> ErrorStrategy {
    self.error_strategy.clone()
  }

  /// Returns the current name.
  pub fn name(&self) -> &str {
    &self.name
  }
}

/// Trait for components that consume record streams.
#[async_trait]
pub trait Consumer: Input {
  /// What `consume` reports when it returns.
  type Outcome: Send;

  /// Consumes the stream until it ends or the consumer stops.
  async fn consume(&mut self, stream: Self::InputStream) -> Self::Outcome;

  /// Returns a reference to the consumer's configuration.
  fn config(&self) -> &ConsumerConfig {
    self.get_config_impl()
  }

  /// Returns a mutable reference to the consumer's configuration.
  fn config_mut(&mut self) -> &mut ConsumerConfig {
    self.get_config_mut_impl()
  }

  /// Replaces the consumer's configuration.
  fn set_config(&mut self, config: ConsumerConfig) {
    self.set_config_impl(config);
  }

  /// Sets the name for this consumer.
  #[must_use]
  fn with_name(mut self, name: String) -> Self
  where
    Self: Sized,
  {
    self.config_mut().name = name;
    self
  }

  /// Returns information about this consumer component.
  fn component_info(&self) -> ComponentInfo {
    let name = match self.config().name() {
      "" => "consumer",
      name => name,
    };
    ComponentInfo {
      name: name.to_string(),
      type_name: std::any::type_name::<Self>().to_string(),
    }
  }

  /// Internal implementation for setting configuration.
  fn set_config_impl(&mut self, config: ConsumerConfig);
  /// Internal implementation for getting configuration.
  fn get_config_impl(&self) -> &ConsumerConfig;
  /// Internal implementation for getting mutable configuration.
  fn get_config_mut_impl(&mut self) -> &mut ConsumerConfig;
}
