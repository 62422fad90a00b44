//! Input trait for components that consume record streams.
//!
//! Consumers implement [`Input`] to declare which stream they read. It mirrors
//! [`crate::output::Output`] on the producing side.

// Import for rustdoc link
#[allow(unused_imports)]
use crate::output::Output;

use futures::Stream;

/// Trait for components that consume input streams.
pub trait Input
where
  Self::Input: Send + 'static,
{
  /// The type of items consumed from the input stream.
  type Input;
  /// The input stream type that yields items of type `Self::Input`.
  type InputStream: Stream<Item = Self::Input> + Send + 'static;
}
