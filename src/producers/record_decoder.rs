//! Framing of a chunked push-query response into records.
//!
//! The server streams a JSON array, one element per line:
//!
//! ```text
//! [{"header":{...}},
//! {"row":{...}},
//!
//! {"row":{...}}]
//! ```
//!
//! Chunks can split a line anywhere. [`RecordDecoder`] buffers bytes until a
//! newline arrives, strips the array framing and drops blank keep-alive lines.
//! A line that is not valid utf-8 comes out as a
//! [`KsqlError::MalformedMessage`] item so the consumer's error strategy
//! decides what happens to it.

use crate::error::KsqlError;
use crate::output::RawRecord;
use bytes::{Buf, BytesMut};

/// Incremental newline framer for push-query bodies.
#[derive(Debug, Default)]
pub struct RecordDecoder {
  buffer: BytesMut,
  // Prefix of `buffer` already searched for a newline.
  scanned: usize,
}

impl RecordDecoder {
  /// Creates a decoder whose buffer starts at `capacity` bytes.
  ///
  /// The capacity is only a sizing hint. The buffer grows to hold the
  /// longest line and records come out the same for any capacity.
  pub fn with_capacity(capacity: usize) -> Self {
    Self {
      buffer: BytesMut::with_capacity(capacity),
      scanned: 0,
    }
  }

  /// Appends a chunk and returns every record it completed, in order.
  pub fn push(&mut self, chunk: &[u8]) -> Vec<RawRecord> {
    self.buffer.extend_from_slice(chunk);

    let mut records = Vec::new();
    while let Some(offset) = self.buffer[self.scanned..].iter().position(|b| *b == b'\n') {
      let line = self.buffer.split_to(self.scanned + offset);
      self.buffer.advance(1);
      self.scanned = 0;
      if let Some(record) = frame(&line) {
        records.push(record);
      }
    }
    self.scanned = self.buffer.len();
    records
  }

  /// Flushes a trailing record that was not newline-terminated.
  pub fn finish(&mut self) -> Option<RawRecord> {
    let rest = self.buffer.split();
    self.scanned = 0;
    frame(&rest)
  }

  /// Number of buffered bytes not yet framed.
  pub fn pending(&self) -> usize {
    self.buffer.len()
  }
}

fn frame(line: &[u8]) -> Option<RawRecord> {
  let line = match std::str::from_utf8(line) {
    Ok(line) => line,
    Err(e) => {
      return Some(Err(KsqlError::malformed(
        String::from_utf8_lossy(line).trim(),
        format!("invalid utf-8: {e}"),
      )));
    }
  };

  let mut record = line.trim();
  record = record.strip_prefix('[').unwrap_or(record).trim_start();
  record = record
    .strip_suffix(',')
    .or_else(|| record.strip_suffix(']'))
    .unwrap_or(record)
    .trim_end();

  if record.is_empty() {
    None
  } else {
    Some(Ok(record.to_string()))
  }
}
