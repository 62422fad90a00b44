//! # Row Consumer
//!
//! Reads push-query records, keeps the announced schema and accumulates rows
//! in arrival order.
//!
//! ## Stopping
//!
//! The read loop waits for one record at a time. While it waits it also
//! watches the cancellation token and, when configured, the idle timeout.
//! It stops when:
//!
//! - the stream ends ([`StopReason::Exhausted`])
//! - the configured limit of rows is held ([`StopReason::LimitReached`])
//! - no record arrives within the idle timeout ([`StopReason::IdleTimeout`])
//! - the token is cancelled ([`StopReason::Cancelled`])
//!
//! None of these lose rows already accumulated. A transport error, or a
//! malformed record under [`ErrorStrategy::Stop`], fails the call instead.
//! Records the transport could not read as text count as malformed.
//! The record stream is dropped before `consume` returns on every path.

use crate::consumer::{Consumer, ConsumerConfig};
use crate::error::{ErrorAction, ErrorStrategy, Result};
use crate::input::Input;
use crate::message::StreamMessage;
use crate::output::{RawRecord, RecordStream};
use crate::progress::ProgressObserver;
use crate::schema::Schema;
use crate::table::{Table, materialize_schema};
use async_trait::async_trait;
use futures::StreamExt;
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

/// Why a read loop stopped without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
  /// The transport closed the stream.
  Exhausted,
  /// The configured row limit was reached.
  LimitReached,
  /// No record arrived within the idle timeout.
  IdleTimeout,
  /// The cancellation token fired.
  Cancelled,
}

impl fmt::Display for StopReason {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Exhausted => write!(f, "stream closed"),
      Self::LimitReached => write!(f, "limit reached"),
      Self::IdleTimeout => write!(f, "idle timeout"),
      Self::Cancelled => write!(f, "cancelled"),
    }
  }
}

/// Schema and rows collected from a push query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccumulatedResult {
  /// The last schema announced, empty if none arrived.
  pub schema: Schema,
  /// Rows in arrival order, exactly as received.
  pub rows: Vec<Vec<Value>>,
}

impl AccumulatedResult {
  /// Column names from the schema.
  pub fn header(&self) -> Vec<&str> {
    self.schema.names()
  }

  /// Number of rows held.
  pub fn len(&self) -> usize {
    self.rows.len()
  }

  /// Returns true if no rows arrived.
  pub fn is_empty(&self) -> bool {
    self.rows.is_empty()
  }

  /// Builds the typed table for these rows.
  pub fn materialize(&self) -> Result<Table> {
    materialize_schema(&self.schema, &self.rows)
  }
}

enum Next {
  Record(RawRecord),
  End,
  Idle,
}

async fn next_record(stream: &mut RecordStream, idle_timeout: Option<Duration>) -> Next {
  let next = match idle_timeout {
    Some(idle) => match tokio::time::timeout(idle, stream.next()).await {
      Ok(next) => next,
      Err(_) => return Next::Idle,
    },
    None => stream.next().await,
  };
  match next {
    Some(record) => Next::Record(record),
    None => Next::End,
  }
}

/// A consumer that accumulates push-query rows.
pub struct RowConsumer {
  /// Configuration for the consumer.
  pub config: ConsumerConfig,
  cancel: CancellationToken,
  observer: Option<Box<dyn ProgressObserver>>,
  result: AccumulatedResult,
  records_seen: usize,
}

impl Default for RowConsumer {
  fn default() -> Self {
    Self::new()
  }
}

impl fmt::Debug for RowConsumer {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("RowConsumer")
      .field("config", &self.config)
      .field("cancelled", &self.cancel.is_cancelled())
      .field("rows", &self.result.rows.len())
      .field("records_seen", &self.records_seen)
      .finish()
  }
}

impl RowConsumer {
  /// Creates a consumer with its own cancellation token.
  pub fn new() -> Self {
    Self {
      config: ConsumerConfig::default(),
      cancel: CancellationToken::new(),
      observer: None,
      result: AccumulatedResult::default(),
      records_seen: 0,
    }
  }

  /// Uses `token` as the cancellation signal.
  #[must_use]
  pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
    self.cancel = token;
    self
  }

  /// Stops once `limit` rows are held. Zero means unlimited.
  #[must_use]
  pub fn with_limit(mut self, limit: usize) -> Self {
    self.config = self.config.with_limit(limit);
    self
  }

  /// Stops when no record arrives for `timeout`.
  #[must_use]
  pub fn with_idle_timeout(mut self, timeout: Option<Duration>) -> Self {
    self.config.idle_timeout = timeout;
    self
  }

  /// Sets the strategy for malformed records.
  #[must_use]
  pub fn with_error_strategy(mut self, strategy: ErrorStrategy) -> Self {
    self.config.error_strategy = strategy;
    self
  }

  /// Reports progress to `observer` after every record.
  #[must_use]
  pub fn with_observer(mut self, observer: impl ProgressObserver + 'static) -> Self {
    self.observer = Some(Box::new(observer));
    self
  }

  /// The token that cancels this consumer.
  pub fn cancellation_token(&self) -> &CancellationToken {
    &self.cancel
  }

  /// Number of records read, of every kind.
  pub fn records_seen(&self) -> usize {
    self.records_seen
  }

  /// The rows and schema accumulated so far.
  pub fn result(&self) -> &AccumulatedResult {
    &self.result
  }

  /// Consumes the consumer and returns what it accumulated.
  pub fn into_result(self) -> AccumulatedResult {
    self.result
  }

  fn accept(&mut self, component: &str, record: RawRecord) -> Result<Option<StopReason>> {
    self.records_seen += 1;

    let stop = match record.and_then(|record| StreamMessage::parse(&record)) {
      Ok(message) => self.apply(component, message),
      Err(e) => match self.config.error_strategy.action_for(&e) {
        ErrorAction::Stop => {
          error!(component = %component, error = %e, "stopping on malformed record");
          return Err(e);
        }
        ErrorAction::Skip => {
          warn!(component = %component, error = %e, "skipping malformed record");
          None
        }
      },
    };

    if let Some(observer) = self.observer.as_mut() {
      observer.on_record(self.records_seen);
    }
    Ok(stop)
  }

  fn apply(&mut self, component: &str, message: StreamMessage) -> Option<StopReason> {
    trace!(component = %component, kind = message.kind(), "record received");
    match message {
      StreamMessage::Schema {
        query_id,
        raw_schema,
      } => {
        if !self.result.schema.is_empty() {
          warn!(component = %component, "schema announced again, replacing header");
        }
        self.result.schema = Schema::parse(&raw_schema);
        debug!(
          component = %component,
          query_id = query_id.as_deref().unwrap_or(""),
          columns = ?self.result.schema.names(),
          "schema received"
        );
      }
      StreamMessage::Row { columns } => {
        self.result.rows.push(columns);
        if matches!(self.config.limit, Some(limit) if limit > 0 && self.result.rows.len() >= limit) {
          return Some(StopReason::LimitReached);
        }
      }
      StreamMessage::Final { message } => {
        debug!(component = %component, message = %message, "server closing push query");
      }
      StreamMessage::Error { message } => {
        warn!(component = %component, message = %message, "server reported an error");
      }
      StreamMessage::Other(_) => {}
    }
    None
  }
}

impl Input for RowConsumer {
  type Input = RawRecord;
  type InputStream = RecordStream;
}

#[async_trait]
impl Consumer for RowConsumer {
  type Outcome = Result<StopReason>;

  async fn consume(&mut self, mut stream: Self::InputStream) -> Self::Outcome {
    let component = self.component_info().name;
    let idle_timeout = self.config.idle_timeout;
    let cancel = self.cancel.clone();
    info!(component = %component, "start loading stream data");

    let stop = loop {
      let next = tokio::select! {
        biased;
        _ = cancel.cancelled() => break StopReason::Cancelled,
        next = next_record(&mut stream, idle_timeout) => next,
      };

      let record = match next {
        Next::End => break StopReason::Exhausted,
        Next::Idle => break StopReason::IdleTimeout,
        Next::Record(Err(e)) if e.is_transport() => {
          error!(component = %component, error = %e, "push query stream failed");
          return Err(e);
        }
        Next::Record(record) => record,
      };

      if let Some(stop) = self.accept(&component, record)? {
        break stop;
      }
    };
    drop(stream);

    info!(
      component = %component,
      reason = %stop,
      rows = self.result.rows.len(),
      records = self.records_seen,
      "finished loading stream data"
    );
    Ok(stop)
  }

  fn set_config_impl(&mut self, config: ConsumerConfig) {
    self.config = config;
  }

  fn get_config_impl(&self) -> &ConsumerConfig {
    &self.config
  }

  fn get_config_mut_impl(&mut self) -> &mut ConsumerConfig {
    &mut self.config
  }
}
