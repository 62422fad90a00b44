//! # Result Materialization
//!
//! Turns accumulated rows into a typed, column-oriented [`Table`] backed by an
//! Arrow [`RecordBatch`].
//!
//! Column types are chosen per column:
//!
//! - `ROWTIME` holds epoch milliseconds and becomes `Timestamp(Millisecond)`
//! - a declared type maps to Boolean, Int32, Int64, Float64 or Utf8
//! - otherwise the type is inferred from the values: all booleans → Boolean,
//!   all integers → Int64, all numbers → Float64, anything else → Utf8
//!
//! Utf8 columns keep strings as-is and store other values as JSON text.
//! JSON `null` is a null entry in every column type.
//!
//! ```rust
//! use serde_json::json;
//! use streamweave_ksql::table::materialize;
//!
//! let table = materialize(&["ROWTIME", "V"], &[vec![json!(1591000000000_i64), json!("x")]]).unwrap();
//! assert_eq!(table.num_rows(), 1);
//! assert_eq!(
//!   table.timestamps("ROWTIME").unwrap()[0].unwrap().to_string(),
//!   "2020-06-01 08:26:40"
//! );
//! ```

use crate::error::{KsqlError, Result};
use crate::query::ROWTIME;
use crate::schema::{Column, Schema, rowtime_type};
use arrow::array::{
  Array, ArrayRef, BooleanBuilder, PrimitiveBuilder, StringBuilder, TimestampMillisecondArray,
};
use arrow::datatypes::{
  ArrowPrimitiveType, DataType, Field, Float64Type, Int32Type, Int64Type, Schema as ArrowSchema,
  TimestampMillisecondType,
};
use arrow::record_batch::{RecordBatch, RecordBatchOptions};
use arrow::util::pretty::pretty_format_batches;
use chrono::NaiveDateTime;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// A materialized push-query result.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
  batch: RecordBatch,
}

impl Table {
  /// Number of rows.
  pub fn num_rows(&self) -> usize {
    self.batch.num_rows()
  }

  /// Number of columns.
  pub fn num_columns(&self) -> usize {
    self.batch.num_columns()
  }

  /// Returns true if the table has no rows.
  pub fn is_empty(&self) -> bool {
    self.num_rows() == 0
  }

  /// Column names, in order.
  pub fn column_names(&self) -> Vec<&str> {
    self
      .batch
      .schema_ref()
      .fields()
      .iter()
      .map(|field| field.name().as_str())
      .collect()
  }

  /// The first column called `name`.
  pub fn column(&self, name: &str) -> Option<&ArrayRef> {
    let index = self.batch.schema_ref().index_of(name).ok()?;
    Some(self.batch.column(index))
  }

  /// The values of a timestamp column as calendar datetimes.
  ///
  /// Returns `None` if the column does not exist or is not a millisecond
  /// timestamp column.
  pub fn timestamps(&self, name: &str) -> Option<Vec<Option<NaiveDateTime>>> {
    let array = self
      .column(name)?
      .as_any()
      .downcast_ref::<TimestampMillisecondArray>()?;
    Some(
      (0..array.len())
        .map(|i| {
          if array.is_null(i) {
            None
          } else {
            array.value_as_datetime(i)
          }
        })
        .collect(),
    )
  }

  /// The underlying record batch.
  pub fn record_batch(&self) -> &RecordBatch {
    &self.batch
  }

  /// Consumes the table, returning the record batch.
  pub fn into_record_batch(self) -> RecordBatch {
    self.batch
  }
}

impl fmt::Display for Table {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let grid = pretty_format_batches(std::slice::from_ref(&self.batch)).map_err(|_| fmt::Error)?;
    write!(f, "{grid}")
  }
}

/// Builds a table from column names and rows.
pub fn materialize<S: AsRef<str>>(header: &[S], rows: &[Vec<Value>]) -> Result<Table> {
  let schema = Schema::from_names(header.iter().map(|name| name.as_ref().to_string()));
  materialize_schema(&schema, rows)
}

/// Builds a table from a parsed schema and rows.
///
/// Every row must have exactly one value per column.
pub fn materialize_schema(schema: &Schema, rows: &[Vec<Value>]) -> Result<Table> {
  let expected = schema.len();
  if let Some((row, values)) = rows
    .iter()
    .enumerate()
    .find(|(_, values)| values.len() != expected)
  {
    return Err(KsqlError::SchemaMismatch {
      row,
      expected,
      actual: values.len(),
    });
  }

  if schema.is_empty() {
    let options = RecordBatchOptions::new().with_row_count(Some(rows.len()));
    let batch =
      RecordBatch::try_new_with_options(Arc::new(ArrowSchema::empty()), Vec::new(), &options)?;
    return Ok(Table { batch });
  }

  let mut fields = Vec::with_capacity(expected);
  let mut arrays = Vec::with_capacity(expected);
  for (index, column) in schema.columns().iter().enumerate() {
    let values: Vec<&Value> = rows.iter().map(|row| &row[index]).collect();
    let data_type = column_type(column, &values);
    arrays.push(build_array(&column.name, &data_type, &values)?);
    fields.push(Field::new(column.name.as_str(), data_type, true));
  }

  let batch = RecordBatch::try_new(Arc::new(ArrowSchema::new(fields)), arrays)?;
  Ok(Table { batch })
}

fn column_type(column: &Column, values: &[&Value]) -> DataType {
  if column.name == ROWTIME {
    return rowtime_type();
  }
  match &column.data_type {
    Some(declared) => declared.arrow_type(),
    None => infer_type(values),
  }
}

fn infer_type(values: &[&Value]) -> DataType {
  let mut inferred: Option<DataType> = None;
  for value in values {
    let current = match value {
      Value::Null => continue,
      Value::Bool(_) => DataType::Boolean,
      Value::Number(n) if n.is_i64() => DataType::Int64,
      Value::Number(_) => DataType::Float64,
      _ => return DataType::Utf8,
    };
    inferred = Some(match (inferred, current) {
      (None, current) => current,
      (Some(seen), current) if seen == current => seen,
      (Some(DataType::Int64), DataType::Float64) | (Some(DataType::Float64), DataType::Int64) => {
        DataType::Float64
      }
      _ => return DataType::Utf8,
    });
  }
  inferred.unwrap_or(DataType::Utf8)
}

fn build_array(column: &str, data_type: &DataType, values: &[&Value]) -> Result<ArrayRef> {
  match data_type {
    DataType::Boolean => {
      let mut builder = BooleanBuilder::with_capacity(values.len());
      for (row, value) in values.iter().enumerate() {
        match value {
          Value::Null => builder.append_null(),
          Value::Bool(b) => builder.append_value(*b),
          other => return Err(invalid(column, row, "boolean", other)),
        }
      }
      let array: ArrayRef = Arc::new(builder.finish());
      Ok(array)
    }
    DataType::Int32 => primitive::<Int32Type>(column, "32-bit integer", values, |v| {
      v.as_i64().and_then(|n| i32::try_from(n).ok())
    }),
    DataType::Int64 => primitive::<Int64Type>(column, "integer", values, Value::as_i64),
    DataType::Float64 => primitive::<Float64Type>(column, "number", values, Value::as_f64),
    DataType::Timestamp(_, _) => primitive::<TimestampMillisecondType>(
      column,
      "epoch milliseconds",
      values,
      Value::as_i64,
    ),
    _ => {
      let mut builder = StringBuilder::with_capacity(values.len(), values.len() * 16);
      for value in values {
        match value {
          Value::Null => builder.append_null(),
          Value::String(s) => builder.append_value(s),
          other => builder.append_value(other.to_string()),
        }
      }
      let array: ArrayRef = Arc::new(builder.finish());
      Ok(array)
    }
  }
}

fn primitive<T: ArrowPrimitiveType>(
  column: &str,
  expected: &'static str,
  values: &[&Value],
  convert: impl Fn(&Value) -> Option<T::Native>,
) -> Result<ArrayRef> {
  let mut builder = PrimitiveBuilder::<T>::with_capacity(values.len());
  for (row, value) in values.iter().enumerate() {
    if value.is_null() {
      builder.append_null();
      continue;
    }
    match convert(value) {
      Some(native) => builder.append_value(native),
      None => return Err(invalid(column, row, expected, value)),
    }
  }
  let array: ArrayRef = Arc::new(builder.finish());
  Ok(array)
}

fn invalid(column: &str, row: usize, expected: &'static str, value: &Value) -> KsqlError {
  KsqlError::InvalidValue {
    column: column.to_string(),
    row,
    expected,
    value: value.clone(),
  }
}
