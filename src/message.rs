//! # Stream Messages
//!
//! One record from a push query, parsed and classified.
//!
//! The server sends one JSON object per record:
//!
//! ```text
//! {"header":{"queryId":"transient_PAGEVIEWS_1","schema":"`ROWTIME` BIGINT, `USERID` STRING"}}
//! {"row":{"columns":[1591000000000,"User_1"]}}
//! {"finalMessage":"Limit Reached"}
//! ```
//!
//! A record that is not JSON at all, or whose `header`/`row` body has the
//! wrong shape, is malformed. Any other well-formed shape is kept as
//! [`StreamMessage::Other`] and ignored by consumers.

use crate::error::{KsqlError, Result};
use serde::Deserialize;
use serde_json::Value;

/// A classified push-query record.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamMessage {
  /// The schema announcement, normally the first record.
  Schema {
    /// Server-assigned query id, when present.
    query_id: Option<String>,
    /// The column declaration string.
    raw_schema: String,
  },
  /// One result row, in schema column order.
  Row {
    /// Column values.
    columns: Vec<Value>,
  },
  /// The server's closing notice, e.g. `Limit Reached`.
  Final {
    /// Notice text.
    message: String,
  },
  /// An error reported in-band by the server.
  Error {
    /// Error text.
    message: String,
  },
  /// Any other shape.
  Other(Value),
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct HeaderBody {
  query_id: Option<String>,
  schema: String,
}

#[derive(Deserialize)]
struct RowBody {
  columns: Vec<Value>,
}

impl StreamMessage {
  /// Parses and classifies one record.
  ///
  /// `header` takes precedence over `row` when a record carries both.
  pub fn parse(record: &str) -> Result<Self> {
    let value: Value =
      serde_json::from_str(record).map_err(|e| KsqlError::malformed(record, e))?;
    Self::from_value(value).map_err(|e| KsqlError::malformed(record, e))
  }

  fn from_value(mut value: Value) -> std::result::Result<Self, serde_json::Error> {
    let object = match value {
      Value::Object(ref mut object) => object,
      other => return Ok(Self::Other(other)),
    };

    if let Some(header) = object.remove("header") {
      let header: HeaderBody = serde_json::from_value(header)?;
      return Ok(Self::Schema {
        query_id: header.query_id,
        raw_schema: header.schema,
      });
    }
    if let Some(row) = object.remove("row") {
      let row: RowBody = serde_json::from_value(row)?;
      return Ok(Self::Row {
        columns: row.columns,
      });
    }
    if let Some(Value::String(message)) = object.get("finalMessage") {
      return Ok(Self::Final {
        message: message.clone(),
      });
    }
    if let Some(error) = object.get("errorMessage") {
      return Ok(Self::Error {
        message: error_text(error),
      });
    }

    Ok(Self::Other(value))
  }

  /// Short name of the message kind, for logging.
  pub fn kind(&self) -> &'static str {
    match self {
      Self::Schema { .. } => "schema",
      Self::Row { .. } => "row",
      Self::Final { .. } => "final",
      Self::Error { .. } => "error",
      Self::Other(_) => "other",
    }
  }
}

// Older servers send a bare string, newer ones an object with a `message` field.
fn error_text(error: &Value) -> String {
  match error {
    Value::String(s) => s.clone(),
    Value::Object(fields) => match fields.get("message") {
      Some(Value::String(s)) => s.clone(),
      _ => error.to_string(),
    },
    other => other.to_string(),
  }
}
