//! In-memory producer that replays a fixed list of records.
//!
//! [`VecProducer`] answers every query with the same records, in order. It is
//! useful for replaying captured responses and for exercising consumers
//! without a server. The last query it was asked to run is kept so callers
//! can check what would have been sent.

use crate::error::KsqlError;
use crate::output::{Output, RawRecord, RecordStream};
use crate::query::PushQuery;
use crate::{Producer, ProducerConfig};
use futures::stream;
use tracing::debug;

/// A producer that yields records from a Vec.
#[derive(Debug, Clone, Default)]
pub struct VecProducer {
  /// The records to produce, in order.
  pub data: Vec<String>,
  /// Configuration for the producer.
  pub config: ProducerConfig,
  last_query: Option<PushQuery>,
}

impl VecProducer {
  /// Creates a new `VecProducer` with the given records.
  pub fn new(data: Vec<String>) -> Self {
    Self {
      data,
      config: ProducerConfig::default(),
      last_query: None,
    }
  }

  /// Sets the name for this producer.
  #[must_use]
  pub fn with_name(mut self, name: impl Into<String>) -> Self {
    self.config.name = Some(name.into());
    self
  }

  /// The query most recently passed to [`Producer::produce`].
  pub fn last_query(&self) -> Option<&PushQuery> {
    self.last_query.as_ref()
  }
}

impl Output for VecProducer {
  type Output = RawRecord;
  type OutputStream = RecordStream;
}

impl Producer for VecProducer {
  fn produce(&mut self, query: &PushQuery) -> Self::OutputStream {
    debug!(
      component = %self.component_info().name,
      records = self.data.len(),
      "replaying push query"
    );
    self.last_query = Some(query.clone());
    Box::pin(stream::iter(self.data.clone().into_iter().map(Ok::<String, KsqlError>)))
  }

  fn set_config_impl(&mut self, config: ProducerConfig) {
    self.config = config;
  }

  fn get_config_impl(&self) -> &ProducerConfig {
    &self.config
  }

  fn get_config_mut_impl(&mut self) -> &mut ProducerConfig {
    &mut self.config
  }
}
