//! # StreamWeave ksqlDB
//!
//! Bounded, typed results from never-ending push queries.
//!
//! A push query keeps emitting rows for as long as its source is updated. This
//! crate issues such a query over a time window, reads the server's record
//! stream one message at a time, and stops on its own terms: when the stream
//! closes, when a row limit is reached, when the stream goes quiet for longer
//! than an idle timeout, or when the caller cancels. The rows read so far are
//! then materialized into an Arrow-backed [`Table`], with `ROWTIME` converted
//! to a calendar timestamp.
//!
//! ## Components
//!
//! - [`query`]: builds the windowed `SELECT ... EMIT CHANGES` text
//! - [`Producer`] implementations in [`producers`] supply the record stream
//! - [`RowConsumer`](consumers::RowConsumer) drains it into an
//!   [`AccumulatedResult`](consumers::AccumulatedResult)
//! - [`table`] turns the result into a typed [`Table`]
//! - [`KsqlClient`] runs all of the above for one call
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use streamweave_ksql::{KsqlClient, QueryWindow, signal};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> streamweave_ksql::Result<()> {
//! let cancel = CancellationToken::new();
//! signal::cancel_on_ctrl_c(cancel.clone());
//!
//! let mut client = KsqlClient::http("http://localhost:8088");
//! let window = QueryWindow::new()
//!   .with_start("2020-06-01 00:00:00")
//!   .with_end("2020-06-02 00:00:00")
//!   .with_idle_timeout(std::time::Duration::from_secs(10));
//!
//! let table = client.stream_to_table("PAGEVIEWS", &window, &cancel).await?;
//! println!("{table}");
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]

/// Push query client.
pub mod client;
/// Consumer trait and configuration.
pub mod consumer;
/// Built-in consumers.
pub mod consumers;
/// Error types and error handling strategies.
pub mod error;
/// Input stream typing.
pub mod input;
/// Push query message parsing.
pub mod message;
/// Output stream typing.
pub mod output;
/// Producer trait and configuration.
pub mod producer;
/// Built-in producers.
pub mod producers;
/// Progress reporting.
pub mod progress;
/// Push query construction.
pub mod query;
/// Column schema parsing.
pub mod schema;
/// Interrupt handling.
pub mod signal;
/// Typed result tables.
pub mod table;

pub use client::KsqlClient;
pub use consumer::{Consumer, ConsumerConfig};
pub use consumers::{AccumulatedResult, RowConsumer, StopReason};
pub use error::{ComponentInfo, ErrorAction, ErrorStrategy, KsqlError, Result, TransportError};
pub use input::Input;
pub use message::StreamMessage;
pub use output::{Output, RawRecord, RecordStream};
pub use producer::{Producer, ProducerConfig};
pub use query::{PushQuery, QueryWindow};
pub use schema::{Column, ColumnType, Schema};
pub use table::Table;

#[cfg(test)]
mod client_test;
#[cfg(test)]
mod schema_test;
