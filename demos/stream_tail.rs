//! Tails a ksqlDB stream into a table and prints it.
//!
//! ```text
//! KSQL_URL=http://localhost:8088 cargo run --example stream_tail -- PAGEVIEWS "2020-06-01 00:00:00" 100
//! ```
//!
//! Stops after ten idle seconds, at the row limit, or on Ctrl-C, then prints
//! whatever arrived.

use std::time::Duration;
use streamweave_ksql::{KsqlClient, QueryWindow, signal};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  tracing_subscriber::fmt::init();

  let mut args = std::env::args().skip(1);
  let source = args.next().unwrap_or_else(|| "PAGEVIEWS".to_string());
  let start = args.next().unwrap_or_default();
  let limit = match args.next() {
    Some(limit) => limit.parse()?,
    None => 0,
  };
  let url = std::env::var("KSQL_URL").unwrap_or_else(|_| "http://localhost:8088".to_string());

  let cancel = CancellationToken::new();
  let listener = signal::cancel_on_ctrl_c(cancel.clone());

  let window = QueryWindow::new()
    .with_start(start)
    .with_limit(limit)
    .with_idle_timeout(Duration::from_secs(10));
  let mut client = KsqlClient::http(url);
  let table = client.stream_to_table(&source, &window, &cancel).await?;

  cancel.cancel();
  listener.await?;

  println!("{table}");
  println!("{} rows", table.num_rows());
  Ok(())
}
