//! # Error Handling
//!
//! Errors raised while issuing a push query, reading its records and turning
//! the accumulated rows into a table.
//!
//! ## Overview
//!
//! - **[`KsqlError`]**: every failure the caller can see from a streaming call
//! - **[`TransportError`]**: abnormal failures of the underlying connection
//! - **[`ErrorStrategy`]** / **[`ErrorAction`]**: how a consumer reacts to a
//!   record it cannot parse
//! - **[`ComponentInfo`]**: component identification for log fields
//!
//! Idle timeouts and cancellation are not errors. They end the read loop
//! normally and are reported through
//! [`StopReason`](crate::consumers::StopReason).
//!
//! ## Error Strategies
//!
//! - **Stop**: abort the read loop and fail the call (default)
//! - **Skip**: log the bad record and keep reading
//! - **Custom**: decide per error

use arrow::error::ArrowError;
use http::StatusCode;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T, E = KsqlError> = std::result::Result<T, E>;

/// Errors surfaced by a streaming query call.
#[derive(Debug, Error)]
pub enum KsqlError {
  /// The connection to the server failed abnormally.
  #[error("transport error: {0}")]
  Transport(#[from] TransportError),
  /// A record could not be parsed as a stream message.
  #[error("malformed message: {reason} (record: {record})")]
  MalformedMessage {
    /// The raw record as received from the transport.
    record: String,
    /// Why the record was rejected.
    reason: String,
  },
  /// A row's arity disagrees with the declared header.
  #[error("row {row} has {actual} values but the schema declares {expected} columns")]
  SchemaMismatch {
    /// Zero-based index of the offending row.
    row: usize,
    /// Number of columns in the header.
    expected: usize,
    /// Number of values in the row.
    actual: usize,
  },
  /// A value does not fit the typed column it belongs to.
  #[error("column {column} row {row}: expected {expected}, got {value}")]
  InvalidValue {
    /// Column name.
    column: String,
    /// Zero-based row index.
    row: usize,
    /// Human readable name of the expected type.
    expected: &'static str,
    /// The offending value.
    value: serde_json::Value,
  },
  /// Arrow rejected the assembled columns.
  #[error("failed to build table: {0}")]
  Arrow(#[from] ArrowError),
}

impl KsqlError {
  /// Creates a [`KsqlError::MalformedMessage`] for `record`.
  pub fn malformed(record: impl Into<String>, reason: impl fmt::Display) -> Self {
    Self::MalformedMessage {
      record: record.into(),
      reason: reason.to_string(),
    }
  }

  /// Returns true if this error came from the transport layer.
  pub fn is_transport(&self) -> bool {
    matches!(self, Self::Transport(_))
  }
}

/// Abnormal connection failures.
///
/// These are never retried locally and always fail the whole call.
#[derive(Debug, Error)]
pub enum TransportError {
  /// The configured server URL is not a valid URI.
  #[error("invalid server url {url}: {source}")]
  InvalidUrl {
    /// The URL that failed to parse.
    url: String,
    /// Parser error.
    source: http::uri::InvalidUri,
  },
  /// The HTTP request could not be built.
  #[error("failed to build request: {0}")]
  Request(#[from] http::Error),
  /// The request body could not be encoded.
  #[error("failed to encode request body: {0}")]
  Encode(#[from] serde_json::Error),
  /// The connection could not be established or the request failed.
  #[error("connection failed: {0}")]
  Connect(#[from] hyper_util::client::legacy::Error),
  /// The response body stream failed mid-way.
  #[error("response body failed: {0}")]
  Body(#[from] hyper::Error),
  /// The server answered with a non-success status.
  #[error("server returned {status}: {body}")]
  Status {
    /// HTTP status code.
    status: StatusCode,
    /// Response body text, if any.
    body: String,
  },
}

/// Action to take when a consumer hits a bad record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorAction {
  /// Abort consumption and surface the error.
  Stop,
  /// Drop the record and keep reading.
  Skip,
}

type CustomErrorHandler = Arc<dyn Fn(&KsqlError) -> ErrorAction + Send + Sync>;

/// Strategy for handling malformed records in a consumer.
///
/// # Example
///
/// ```rust
/// use streamweave_ksql::error::{ErrorAction, ErrorStrategy, KsqlError};
///
/// // Tolerate garbage but nothing else.
/// let strategy = ErrorStrategy::new_custom(|error| match error {
///   KsqlError::MalformedMessage { .. } => ErrorAction::Skip,
///   _ => ErrorAction::Stop,
/// });
/// assert_ne!(strategy, ErrorStrategy::Stop);
/// ```
#[derive(Clone, Default)]
pub enum ErrorStrategy {
  /// Stop on the first bad record. The partial result is discarded.
  #[default]
  Stop,
  /// Skip bad records.
  Skip,
  /// User-defined handler.
  Custom(CustomErrorHandler),
}

impl ErrorStrategy {
  /// Creates a custom strategy from a handler function.
  pub fn new_custom<F>(f: F) -> Self
  where
    F: Fn(&KsqlError) -> ErrorAction + Send + Sync + 'static,
  {
    Self::Custom(Arc::new(f))
  }

  /// Resolves the action to take for `error`.
  pub fn action_for(&self, error: &KsqlError) -> ErrorAction {
    match self {
      Self::Stop => ErrorAction::Stop,
      Self::Skip => ErrorAction::Skip,
      Self::Custom(handler) => handler(error),
    }
  }
}

impl fmt::Debug for ErrorStrategy {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Stop => write!(f, "ErrorStrategy::Stop"),
      Self::Skip => write!(f, "ErrorStrategy::Skip"),
      Self::Custom(_) => write!(f, "ErrorStrategy::Custom"),
    }
  }
}

impl PartialEq for ErrorStrategy {
  fn eq(&self, other: &Self) -> bool {
    matches!(
      (self, other),
      (Self::Stop, Self::Stop) | (Self::Skip, Self::Skip) | (Self::Custom(_), Self::Custom(_))
    )
  }
}

/// Information about a component, used in log fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentInfo {
  /// The name of the component.
  pub name: String,
  /// The type name of the component.
  pub type_name: String,
}

impl ComponentInfo {
  /// Creates a new `ComponentInfo`.
  pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      type_name: type_name.into(),
    }
  }
}

impl fmt::Display for ComponentInfo {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} ({})", self.name, self.type_name)
  }
}
