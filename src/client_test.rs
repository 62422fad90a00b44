use crate::client::KsqlClient;
use crate::consumers::StopReason;
use crate::error::{ErrorStrategy, KsqlError};
use crate::producers::{HttpConfig, VecProducer};
use crate::query::{OFFSET_RESET_PROPERTY, QueryWindow};
use serde_json::json;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn pageviews() -> Vec<String> {
  vec![
    json!({"header": {"queryId": "transient_PAGEVIEWS_1", "schema": "`ROWTIME` BIGINT, `USERID` STRING, `PAGEID` STRING"}})
      .to_string(),
    json!({"row": {"columns": [1591000000000_i64, "User_1", "Page_1"]}}).to_string(),
    json!({"row": {"columns": [1591000001000_i64, "User_2", "Page_7"]}}).to_string(),
    json!({"row": {"columns": [1591000002000_i64, "User_1", "Page_3"]}}).to_string(),
    json!({"finalMessage": "Limit Reached"}).to_string(),
  ]
}

#[tokio::test]
async fn test_stream_to_table() {
  let mut client = KsqlClient::new(VecProducer::new(pageviews()));
  let window = QueryWindow::new().with_start("2020-06-01 00:00:00");

  let table = client
    .stream_to_table("PAGEVIEWS", &window, &CancellationToken::new())
    .await
    .unwrap();

  assert_eq!(table.num_rows(), 3);
  assert_eq!(table.column_names(), vec!["ROWTIME", "USERID", "PAGEID"]);
  let times = table.timestamps("ROWTIME").unwrap();
  assert_eq!(times[2].unwrap().to_string(), "2020-06-01 08:26:42");
}

#[tokio::test]
async fn test_query_sent_to_producer() {
  let mut client = KsqlClient::new(VecProducer::new(Vec::new()));
  let window = QueryWindow::new()
    .with_start("2020-06-01 00:00:00")
    .with_limit(10);

  client
    .stream_rows("PAGEVIEWS", &window, &CancellationToken::new())
    .await
    .unwrap();

  let query = client.producer().last_query().unwrap();
  assert!(query.text().starts_with("SELECT * FROM PAGEVIEWS\nWHERE ROWTIME >= "));
  assert!(query.text().ends_with("LIMIT 10;"));
  assert_eq!(query.property(OFFSET_RESET_PROPERTY), Some("earliest"));
}

#[tokio::test]
async fn test_window_limit_applied_locally() {
  let mut client = KsqlClient::new(VecProducer::new(pageviews()));
  let window = QueryWindow::new().with_limit(2);

  let (result, stop) = client
    .stream_rows("PAGEVIEWS", &window, &CancellationToken::new())
    .await
    .unwrap();

  assert_eq!(stop, StopReason::LimitReached);
  assert_eq!(result.len(), 2);
  assert_eq!(result.header(), vec!["ROWTIME", "USERID", "PAGEID"]);
}

#[tokio::test]
async fn test_cancelled_before_start_gives_empty_table() {
  let cancel = CancellationToken::new();
  cancel.cancel();
  let mut client = KsqlClient::new(VecProducer::new(pageviews()));

  let table = client
    .stream_to_table("PAGEVIEWS", &QueryWindow::new(), &cancel)
    .await
    .unwrap();

  assert_eq!(table.num_rows(), 0);
  assert_eq!(table.num_columns(), 0);
}

#[tokio::test]
async fn test_malformed_record_fails_call() {
  let mut records = pageviews();
  records.insert(2, "{oops".to_string());
  let mut client = KsqlClient::new(VecProducer::new(records.clone()));

  let err = client
    .stream_to_table("PAGEVIEWS", &QueryWindow::new(), &CancellationToken::new())
    .await
    .unwrap_err();
  assert!(matches!(err, KsqlError::MalformedMessage { .. }));

  let mut client =
    KsqlClient::new(VecProducer::new(records)).with_error_strategy(ErrorStrategy::Skip);
  let table = client
    .stream_to_table("PAGEVIEWS", &QueryWindow::new(), &CancellationToken::new())
    .await
    .unwrap();
  assert_eq!(table.num_rows(), 3);
}

#[tokio::test]
async fn test_arity_mismatch_fails_call() {
  let records = vec![
    json!({"header": {"schema": "`A` INT, `B` INT"}}).to_string(),
    json!({"row": {"columns": [1]}}).to_string(),
  ];
  let mut client = KsqlClient::new(VecProducer::new(records));

  let err = client
    .stream_to_table("S", &QueryWindow::new(), &CancellationToken::new())
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    KsqlError::SchemaMismatch {
      row: 0,
      expected: 2,
      actual: 1
    }
  ));
}

#[tokio::test]
async fn test_connection_refused_is_transport_error() {
  let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
  let addr = listener.local_addr().unwrap();
  drop(listener);

  let mut client = KsqlClient::with_http_config(HttpConfig::new(format!("http://{addr}")));
  let window = QueryWindow::new().with_idle_timeout(Duration::from_secs(5));
  let err = client
    .stream_to_table("S", &window, &CancellationToken::new())
    .await
    .unwrap_err();

  assert!(err.is_transport());
}

#[test]
fn test_http_client_settings() {
  let client = KsqlClient::http("http://ksql:8088").with_progress_interval(10);
  assert_eq!(client.producer().http_config.url, "http://ksql:8088");
}

#[tokio::test]
async fn test_zero_limit_field_reads_every_row() {
  let mut client = KsqlClient::new(VecProducer::new(pageviews()));
  let window = QueryWindow {
    limit: Some(0),
    ..QueryWindow::new()
  };

  let (result, stop) = client
    .stream_rows("PAGEVIEWS", &window, &CancellationToken::new())
    .await
    .unwrap();

  assert_eq!(stop, StopReason::Exhausted);
  assert_eq!(result.len(), 3);
  assert!(!client.producer().last_query().unwrap().text().contains("LIMIT"));
}
