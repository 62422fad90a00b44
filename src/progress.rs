//! Progress reporting for long-running reads.
//!
//! A [`ProgressObserver`] is told the running record count after every record
//! a consumer reads. It never influences when the read loop stops.

use tracing::info;

/// Receives the running record count.
pub trait ProgressObserver: Send {
  /// Called once per record with the number of records seen so far.
  fn on_record(&mut self, records: usize);
}

impl<F> ProgressObserver for F
where
  F: FnMut(usize) + Send,
{
  fn on_record(&mut self, records: usize) {
    self(records)
  }
}

/// Logs a milestone every `interval` records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogProgress {
  interval: usize,
}

impl LogProgress {
  /// Logs every `interval` records. Zero is treated as one.
  pub fn every(interval: usize) -> Self {
    Self {
      interval: interval.max(1),
    }
  }

  /// The logging interval.
  pub fn interval(&self) -> usize {
    self.interval
  }

  /// Returns true if `records` is a milestone.
  pub fn is_milestone(&self, records: usize) -> bool {
    records > 0 && records % self.interval == 0
  }
}

impl Default for LogProgress {
  fn default() -> Self {
    Self::every(1000)
  }
}

impl ProgressObserver for LogProgress {
  fn on_record(&mut self, records: usize) {
    if self.is_milestone(records) {
      info!(records, "push query progress");
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_log_progress_milestones() {
    let progress = LogProgress::every(3);
    assert!(!progress.is_milestone(0));
    assert!(!progress.is_milestone(2));
    assert!(progress.is_milestone(3));
    assert!(progress.is_milestone(6));
  }

  #[test]
  fn test_log_progress_zero_interval() {
    assert_eq!(LogProgress::every(0).interval(), 1);
    assert_eq!(LogProgress::default().interval(), 1000);
  }

  #[test]
  fn test_closure_observer() {
    let mut seen = Vec::new();
    {
      let mut observer = |n: usize| seen.push(n);
      observer.on_record(1);
      observer.on_record(2);
    }
    assert_eq!(seen, vec![1, 2]);
  }
}
