//! # Push Query Builder
//!
//! Builds the text of a time-windowed push query and the session properties
//! needed to run it.
//!
//! ```rust
//! use streamweave_ksql::query::{QueryWindow, build};
//!
//! let window = QueryWindow::new()
//!   .with_start("2020-01-01 00:00:00")
//!   .with_limit(10);
//! let query = build("PAGEVIEWS", &window);
//!
//! assert_eq!(
//!   query.text(),
//!   "SELECT * FROM PAGEVIEWS\n\
//!    WHERE ROWTIME >= STRINGTOTIMESTAMP('2020-01-01 00:00:00', 'yyyy-MM-dd HH:mm:ss')\n\
//!    EMIT CHANGES\n\
//!    LIMIT 10;"
//! );
//! assert_eq!(query.property("auto.offset.reset"), Some("earliest"));
//! ```

use chrono::NaiveDateTime;
use std::collections::BTreeMap;
use std::time::Duration;

/// Timestamp format used when none is given, in the server's pattern syntax.
pub const DEFAULT_TIMESTAMP_FORMAT: &str = "yyyy-MM-dd HH:mm:ss";

/// `chrono` equivalent of [`DEFAULT_TIMESTAMP_FORMAT`].
const DEFAULT_CHRONO_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Session property controlling where the query starts reading.
pub const OFFSET_RESET_PROPERTY: &str = "auto.offset.reset";

/// The column holding the event time, in epoch milliseconds.
pub const ROWTIME: &str = "ROWTIME";

/// Time bounds and limits for a push query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryWindow {
  /// Inclusive lower bound on `ROWTIME`, as a literal in `format`.
  pub start: Option<String>,
  /// Inclusive upper bound on `ROWTIME`, as a literal in `format`.
  pub end: Option<String>,
  /// Server-side timestamp pattern for `start` and `end`.
  pub format: String,
  /// Maximum number of rows. `None` or zero is unlimited.
  pub limit: Option<usize>,
  /// Longest wait for the next message before stopping.
  pub idle_timeout: Option<Duration>,
}

impl Default for QueryWindow {
  fn default() -> Self {
    Self {
      start: None,
      end: None,
      format: DEFAULT_TIMESTAMP_FORMAT.to_string(),
      limit: None,
      idle_timeout: None,
    }
  }
}

impl QueryWindow {
  /// Creates an unbounded window with the default timestamp format.
  pub fn new() -> Self {
    Self::default()
  }

  /// Sets the lower bound. An empty string clears it.
  #[must_use]
  pub fn with_start(mut self, start: impl Into<String>) -> Self {
    self.start = non_empty(start.into());
    self
  }

  /// Sets the upper bound. An empty string clears it.
  #[must_use]
  pub fn with_end(mut self, end: impl Into<String>) -> Self {
    self.end = non_empty(end.into());
    self
  }

  /// Sets the lower bound from a datetime, switching to the default format.
  #[must_use]
  pub fn since(mut self, start: NaiveDateTime) -> Self {
    self.start = Some(start.format(DEFAULT_CHRONO_FORMAT).to_string());
    self.format = DEFAULT_TIMESTAMP_FORMAT.to_string();
    self
  }

  /// Sets the upper bound from a datetime, switching to the default format.
  #[must_use]
  pub fn until(mut self, end: NaiveDateTime) -> Self {
    self.end = Some(end.format(DEFAULT_CHRONO_FORMAT).to_string());
    self.format = DEFAULT_TIMESTAMP_FORMAT.to_string();
    self
  }

  /// Sets the timestamp pattern used for the bounds.
  #[must_use]
  pub fn with_format(mut self, format: impl Into<String>) -> Self {
    self.format = format.into();
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
  pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
    self.idle_timeout = Some(timeout);
    self
  }

  /// Returns true if either bound is set.
  pub fn is_bounded(&self) -> bool {
    self.start.is_some() || self.end.is_some()
  }
}

fn non_empty(s: String) -> Option<String> {
  (!s.is_empty()).then_some(s)
}

/// A push query ready to hand to a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushQuery {
  text: String,
  properties: BTreeMap<String, String>,
}

impl PushQuery {
  /// Creates a query from raw text with no session properties.
  pub fn new(text: impl Into<String>) -> Self {
    Self {
      text: text.into(),
      properties: BTreeMap::new(),
    }
  }

  /// Adds a session property.
  #[must_use]
  pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
    self.properties.insert(key.into(), value.into());
    self
  }

  /// The statement text, terminated with `;`.
  pub fn text(&self) -> &str {
    &self.text
  }

  /// Session properties to send with the statement.
  pub fn properties(&self) -> &BTreeMap<String, String> {
    &self.properties
  }

  /// Looks up a single session property.
  pub fn property(&self, key: &str) -> Option<&str> {
    self.properties.get(key).map(String::as_str)
  }
}

/// Builds the push query for `source` over `window`.
///
/// Bounds are emitted as server-side `STRINGTOTIMESTAMP` calls; nothing is
/// converted locally. A bounded window also asks the server to start from the
/// earliest offset, otherwise the server default applies.
pub fn build(source: &str, window: &QueryWindow) -> PushQuery {
  let mut sql = format!("SELECT * FROM {source}");

  if window.is_bounded() {
    sql.push_str("\nWHERE ");
  }
  if let Some(start) = &window.start {
    sql.push_str(&format!(
      "ROWTIME >= {}",
      string_to_timestamp(start, &window.format)
    ));
  }
  if let Some(end) = &window.end {
    if window.start.is_some() {
      sql.push_str("\nAND ");
    }
    sql.push_str(&format!(
      "ROWTIME <= {}",
      string_to_timestamp(end, &window.format)
    ));
  }

  sql.push_str("\nEMIT CHANGES");
  if let Some(limit) = window.limit.filter(|&limit| limit > 0) {
    sql.push_str(&format!("\nLIMIT {limit}"));
  }
  sql.push(';');

  let mut query = PushQuery::new(sql);
  if window.is_bounded() {
    query = query.with_property(OFFSET_RESET_PROPERTY, "earliest");
  }
  query
}

fn string_to_timestamp(literal: &str, format: &str) -> String {
  format!(
    "STRINGTOTIMESTAMP('{}', '{}')",
    quote(literal),
    quote(format)
  )
}

// Single quotes inside a literal are doubled.
fn quote(s: &str) -> String {
  s.replace('\'', "''")
}
