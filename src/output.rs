//! Output trait for components that produce record streams.
//!
//! Producers implement [`Output`] to name the items they yield and the stream
//! type that carries them. For every transport in this crate the item is a
//! [`RawRecord`]: one JSON record as text, a record that could not be read
//! as text, or the transport failure that ended the stream.
//!
//! ```rust
//! use streamweave_ksql::output::{Output, RawRecord, RecordStream};
//!
//! struct Silence;
//!
//! impl Output for Silence {
//!   type Output = RawRecord;
//!   type OutputStream = RecordStream;
//! }
//! ```

// Import for rustdoc links
#[allow(unused_imports)]
use crate::input::Input;

use crate::error::KsqlError;
use futures::Stream;
use std::pin::Pin;

/// One record as delivered by a transport.
pub type RawRecord = Result<String, KsqlError>;

/// The lazy, boxed record stream handed from producers to consumers.
///
/// Dropping the stream releases whatever connection backs it.
pub type RecordStream = Pin<Box<dyn Stream<Item = RawRecord> + Send>>;

/// Trait for components that produce output streams.
///
/// It works together with the [`Input`] trait: a consumer can read a
/// producer's stream when the producer's `OutputStream` matches the
/// consumer's `InputStream`.
pub trait Output
where
  Self::Output: Send + 'static,
{
  /// The type of items produced by this output stream.
  type Output;
  /// The output stream type that yields items of type `Self::Output`.
  type OutputStream: Stream<Item = Self::Output> + Send + 'static;
}
