//! # Producer Trait
//!
//! A [`Producer`] is the transport side of a push query: given the query text
//! and session properties it opens a connection and yields the server's
//! records lazily, one JSON object per item.
//!
//! ## Contract
//!
//! - The stream is lazy. Nothing is sent until it is first polled.
//! - The stream ends when the server closes the response normally.
//! - An abnormal failure is yielded once as `Err(KsqlError::Transport(..))`
//!   and then the stream ends.
//! - Dropping the stream releases the connection.
//!
//! Idle timeouts and cancellation are applied by the consumer around the
//! stream, so producers never need to know about them.

use crate::error::ComponentInfo;
use crate::output::{Output, RawRecord, RecordStream};
use crate::query::PushQuery;

/// Decoder buffer capacity used when none is configured.
pub const DEFAULT_CHUNK_SIZE: usize = 128;

/// Configuration for a producer component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProducerConfig {
  /// Optional name for identifying this producer in logs.
  pub name: Option<String>,
  /// Initial capacity of the record decoder's buffer, in bytes.
  ///
  /// A sizing hint only. Reads follow the server's chunking and the buffer
  /// grows to fit the longest record.
  pub chunk_size: usize,
}

impl Default for ProducerConfig {
  fn default() -> Self {
    Self {
      name: None,
      chunk_size: DEFAULT_CHUNK_SIZE,
    }
  }
}

impl ProducerConfig {
  /// Sets the name for this producer configuration.
  #[must_use]
  pub fn with_name(mut self, name: impl Into<String>) -> Self {
    self.name = Some(name.into());
    self
  }

  /// Sets the initial decoder buffer capacity. Zero is raised to one.
  #[must_use]
  pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
    self.chunk_size = chunk_size.max(1);
    self
  }

  /// Returns the current name, if set.
  pub fn name(&self) -> Option<String> {
    self.name.clone()
  }
}

/// Trait for components that run push queries and stream back raw records.
///
/// # Example
///
/// ```rust
/// use futures::StreamExt;
/// use streamweave_ksql::producers::VecProducer;
/// use streamweave_ksql::query::PushQuery;
/// use streamweave_ksql::Producer;
///
/// # async fn example() {
/// let mut producer = VecProducer::new(vec![r#"{"row":{"columns":[1]}}"#.to_string()]);
/// let mut records = producer.produce(&PushQuery::new("SELECT * FROM S EMIT CHANGES;"));
/// while let Some(record) = records.next().await {
///   println!("{:?}", record);
/// }
/// # }
/// ```
pub trait Producer: Output<Output = RawRecord, OutputStream = RecordStream> {
  /// Starts `query` and returns its record stream.
  fn produce(&mut self, query: &PushQuery) -> Self::OutputStream;

  /// Returns a reference to the producer's configuration.
  fn config(&self) -> &ProducerConfig {
    self.get_config_impl()
  }

  /// Returns a mutable reference to the producer's configuration.
  fn config_mut(&mut self) -> &mut ProducerConfig {
    self.get_config_mut_impl()
  }

  /// Replaces the producer's configuration.
  fn set_config(&mut self, config: ProducerConfig) {
    self.set_config_impl(config);
  }

  /// Returns information about this producer component.
  fn component_info(&self) -> ComponentInfo {
    ComponentInfo {
      name: self
        .config()
        .name()
        .unwrap_or_else(|| "push_query_producer".to_string()),
      type_name: std::any::type_name::<Self>().to_string(),
    }
  }

  /// Internal implementation for setting configuration.
  fn set_config_impl(&mut self, config: ProducerConfig);
  /// Internal implementation for getting configuration.
  fn get_config_impl(&self) -> &ProducerConfig;
  /// Internal implementation for getting mutable configuration.
  fn get_config_mut_impl(&mut self) -> &mut ProducerConfig;
}
