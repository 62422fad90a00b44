use crate::schema::{Column, ColumnType, Schema, column_names, rowtime_type};
use arrow::datatypes::{DataType, TimeUnit};

#[test]
fn test_column_names_in_order() {
  assert_eq!(
    column_names("`COL1` INTEGER, `COL2` STRING"),
    vec!["COL1".to_string(), "COL2".to_string()]
  );
}

#[test]
fn test_parse_declared_types() {
  let schema =
    Schema::parse("`ROWTIME` BIGINT, `OK` BOOLEAN, `N` INT, `X` DOUBLE, `S` VARCHAR, `M` MAP");

  assert_eq!(
    schema.columns(),
    &[
      Column::typed("ROWTIME", ColumnType::BigInt),
      Column::typed("OK", ColumnType::Boolean),
      Column::typed("N", ColumnType::Integer),
      Column::typed("X", ColumnType::Double),
      Column::typed("S", ColumnType::String),
      Column::typed("M", ColumnType::Other("MAP".to_string())),
    ]
  );
}

#[test]
fn test_parse_untyped_tokens() {
  let schema = Schema::parse("`A`,`B`");
  assert_eq!(schema.names(), vec!["A", "B"]);
  assert!(schema.columns().iter().all(|c| c.data_type.is_none()));
}

#[test]
fn test_nested_tokens_are_columns_too() {
  let schema = Schema::parse("`ID` STRING, `ADDR` STRUCT<`CITY` STRING>");
  assert_eq!(schema.names(), vec!["ID", "ADDR", "CITY"]);
  assert_eq!(
    schema.columns()[1].data_type,
    Some(ColumnType::Other("STRUCT".to_string()))
  );
}

#[test]
fn test_parse_without_tokens() {
  let schema = Schema::parse("no columns here");
  assert!(schema.is_empty());
  assert_eq!(schema.len(), 0);
}

#[test]
fn test_keywords_are_case_insensitive() {
  assert_eq!(ColumnType::from_keyword("bigint"), ColumnType::BigInt);
  assert_eq!(ColumnType::from_keyword("Integer"), ColumnType::Integer);
  assert_eq!(ColumnType::from_keyword("decimal"), ColumnType::Double);
}

#[test]
fn test_arrow_types() {
  assert_eq!(ColumnType::Integer.arrow_type(), DataType::Int32);
  assert_eq!(ColumnType::BigInt.arrow_type(), DataType::Int64);
  assert_eq!(
    ColumnType::Other("ARRAY".to_string()).arrow_type(),
    DataType::Utf8
  );
  assert_eq!(
    rowtime_type(),
    DataType::Timestamp(TimeUnit::Millisecond, None)
  );
}

#[test]
fn test_from_names() {
  let schema = Schema::from_names(["A", "B"]);
  assert_eq!(schema.names(), vec!["A", "B"]);
  assert_eq!(schema, Schema::parse("`A`, `B`"));
}
