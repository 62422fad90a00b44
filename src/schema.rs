//! Column extraction from the schema announcement.
//!
//! The server announces the result columns once, as a declaration string such
//! as `` `ROWTIME` BIGINT, `USERID` STRING ``. Every backtick-delimited token is
//! a column name, in order of appearance. The word that follows a token, when
//! there is one, is kept as the column's declared type.

use arrow::datatypes::{DataType, TimeUnit};
use regex::Regex;
use std::sync::OnceLock;

fn column_token() -> &'static Regex {
  static TOKEN: OnceLock<Regex> = OnceLock::new();
  TOKEN.get_or_init(|| Regex::new(r"`(.*?)`(?:\s+([A-Za-z_]+))?").expect("valid column regex"))
}

/// SQL type declared for a column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnType {
  /// `BOOLEAN`
  Boolean,
  /// `INT` / `INTEGER`
  Integer,
  /// `BIGINT`
  BigInt,
  /// `DOUBLE` / `DECIMAL`
  Double,
  /// `STRING` / `VARCHAR`
  String,
  /// Anything else (`ARRAY`, `MAP`, `STRUCT`, ...). Stored as JSON text.
  Other(String),
}

impl ColumnType {
  /// Parses a type keyword, case-insensitively.
  pub fn from_keyword(keyword: &str) -> Self {
    match keyword.to_ascii_uppercase().as_str() {
      "BOOLEAN" => Self::Boolean,
      "INT" | "INTEGER" => Self::Integer,
      "BIGINT" => Self::BigInt,
      "DOUBLE" | "DECIMAL" => Self::Double,
      "STRING" | "VARCHAR" => Self::String,
      other => Self::Other(other.to_string()),
    }
  }

  /// The Arrow type used to hold values of this column.
  pub fn arrow_type(&self) -> DataType {
    match self {
      Self::Boolean => DataType::Boolean,
      Self::Integer => DataType::Int32,
      Self::BigInt => DataType::Int64,
      Self::Double => DataType::Float64,
      Self::String | Self::Other(_) => DataType::Utf8,
    }
  }
}

/// Arrow type for the event-time column.
pub fn rowtime_type() -> DataType {
  DataType::Timestamp(TimeUnit::Millisecond, None)
}

/// A named result column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
  /// Column name, without backticks.
  pub name: String,
  /// Declared type, when the declaration carried one.
  pub data_type: Option<ColumnType>,
}

impl Column {
  /// Creates an untyped column.
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      data_type: None,
    }
  }

  /// Creates a column with a declared type.
  pub fn typed(name: impl Into<String>, data_type: ColumnType) -> Self {
    Self {
      name: name.into(),
      data_type: Some(data_type),
    }
  }
}

/// Ordered result columns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
  columns: Vec<Column>,
}

impl Schema {
  /// Extracts the columns of a schema declaration.
  pub fn parse(declaration: &str) -> Self {
    let columns = column_token()
      .captures_iter(declaration)
      .map(|caps| Column {
        name: caps[1].to_string(),
        data_type: caps.get(2).map(|m| ColumnType::from_keyword(m.as_str())),
      })
      .collect();
    Self { columns }
  }

  /// Builds an untyped schema from column names.
  pub fn from_names<I, S>(names: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    Self {
      columns: names.into_iter().map(Column::new).collect(),
    }
  }

  /// The columns, in declaration order.
  pub fn columns(&self) -> &[Column] {
    &self.columns
  }

  /// Column names, in declaration order.
  pub fn names(&self) -> Vec<&str> {
    self.columns.iter().map(|c| c.name.as_str()).collect()
  }

  /// Number of columns.
  pub fn len(&self) -> usize {
    self.columns.len()
  }

  /// Returns true if no columns were declared.
  pub fn is_empty(&self) -> bool {
    self.columns.is_empty()
  }
}

/// Extracts just the column names from a schema declaration.
pub fn column_names(declaration: &str) -> Vec<String> {
  Schema::parse(declaration)
    .columns
    .into_iter()
    .map(|c| c.name)
    .collect()
}
