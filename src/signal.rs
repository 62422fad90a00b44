//! Binds a user interrupt to a cancellation token.

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Cancels `token` when the process receives Ctrl-C.
///
/// The returned task ends as soon as either happens: the interrupt arrives,
/// or `token` is cancelled some other way.
pub fn cancel_on_ctrl_c(token: CancellationToken) -> JoinHandle<()> {
  tokio::spawn(async move {
    tokio::select! {
      _ = token.cancelled() => {}
      result = tokio::signal::ctrl_c() => match result {
        Ok(()) => {
          info!("interrupt received, stopping push query");
          token.cancel();
        }
        Err(e) => warn!(error = %e, "unable to listen for interrupt"),
      },
    }
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::time::Duration;

  #[tokio::test]
  async fn test_task_ends_when_token_cancelled_elsewhere() {
    let token = CancellationToken::new();
    let handle = cancel_on_ctrl_c(token.clone());

    token.cancel();
    tokio::time::timeout(Duration::from_secs(1), handle)
      .await
      .expect("listener should stop")
      .unwrap();
  }
}
