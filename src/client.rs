//! # Push Query Client
//!
//! [`KsqlClient`] ties the pieces together: it builds the windowed query,
//! hands it to a [`Producer`], drains the stream with a [`RowConsumer`] and
//! materializes the rows into a [`Table`].
//!
//! ```rust,no_run
//! use streamweave_ksql::query::QueryWindow;
//! use streamweave_ksql::KsqlClient;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> streamweave_ksql::Result<()> {
//! let mut client = KsqlClient::http("http://localhost:8088");
//! let window = QueryWindow::new()
//!   .with_start("2020-06-01 00:00:00")
//!   .with_limit(100);
//!
//! let table = client
//!   .stream_to_table("PAGEVIEWS", &window, &CancellationToken::new())
//!   .await?;
//! println!("{table}");
//! # Ok(())
//! # }
//! ```

use crate::consumer::{Consumer, ConsumerConfig};
use crate::consumers::{AccumulatedResult, RowConsumer, StopReason};
use crate::error::{ErrorStrategy, Result};
use crate::producer::Producer;
use crate::producers::{HttpConfig, HttpProducer};
use crate::progress::LogProgress;
use crate::query::{QueryWindow, build};
use crate::table::Table;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Runs push queries and collects their results.
#[derive(Debug, Clone)]
pub struct KsqlClient<P = HttpProducer> {
  producer: P,
  progress: LogProgress,
  error_strategy: ErrorStrategy,
}

impl KsqlClient<HttpProducer> {
  /// Creates a client for the server at `url`.
  pub fn http(url: impl Into<String>) -> Self {
    Self::with_http_config(HttpConfig::new(url))
  }

  /// Creates a client from full connection settings.
  pub fn with_http_config(config: HttpConfig) -> Self {
    Self::new(HttpProducer::new(config))
  }
}

impl<P: Producer> KsqlClient<P> {
  /// Creates a client that runs queries through `producer`.
  pub fn new(producer: P) -> Self {
    Self {
      producer,
      progress: LogProgress::default(),
      error_strategy: ErrorStrategy::Stop,
    }
  }

  /// Logs progress every `interval` records.
  #[must_use]
  pub fn with_progress_interval(mut self, interval: usize) -> Self {
    self.progress = LogProgress::every(interval);
    self
  }

  /// Sets the strategy for malformed records.
  #[must_use]
  pub fn with_error_strategy(mut self, strategy: ErrorStrategy) -> Self {
    self.error_strategy = strategy;
    self
  }

  /// The producer queries run through.
  pub fn producer(&self) -> &P {
    &self.producer
  }

  /// Mutable access to the producer.
  pub fn producer_mut(&mut self) -> &mut P {
    &mut self.producer
  }

  /// Runs a push query over `source` and returns the rows read before it
  /// stopped, along with why it stopped.
  ///
  /// Idle timeouts and cancellation are graceful stops. Transport failures
  /// and malformed records fail the call and discard the partial rows.
  pub async fn stream_rows(
    &mut self,
    source: &str,
    window: &QueryWindow,
    cancel: &CancellationToken,
  ) -> Result<(AccumulatedResult, StopReason)> {
    let query = build(source, window);
    let component = self.producer.component_info().name;
    info!(
      component = %component,
      query = %query.text(),
      properties = ?query.properties(),
      "issuing push query"
    );

    let config = ConsumerConfig::default()
      .with_name(format!("{source}_rows"))
      .with_idle_timeout(window.idle_timeout)
      .with_limit(window.limit.unwrap_or(0))
      .with_error_strategy(self.error_strategy.clone());

    let mut consumer = RowConsumer::new()
      .with_cancellation(cancel.clone())
      .with_observer(self.progress);
    consumer.set_config(config);

    let stream = self.producer.produce(&query);
    let stop = consumer.consume(stream).await?;
    Ok((consumer.into_result(), stop))
  }

  /// Runs a push query over `source` and materializes the result as a table.
  pub async fn stream_to_table(
    &mut self,
    source: &str,
    window: &QueryWindow,
    cancel: &CancellationToken,
  ) -> Result<Table> {
    let (result, stop) = self.stream_rows(source, window, cancel).await?;
    let table = result.materialize()?;
    info!(
      source = %source,
      reason = %stop,
      rows = table.num_rows(),
      columns = table.num_columns(),
      "push query materialized"
    );
    Ok(table)
  }
}
