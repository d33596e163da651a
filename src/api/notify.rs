//! Sinks that receive failed-request notifications.

use tokio::sync::mpsc;
use tracing::{error, warn};

use crate::error::RequestFailure;

/// Receives one call per failed request, synchronously, before the
/// repository returns to its caller.
pub trait Notifier: Send + Sync {
  fn notify(&self, failure: &RequestFailure);
}

/// Notifier that writes failures to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
  fn notify(&self, failure: &RequestFailure) {
    match failure {
      RequestFailure::Network => warn!("Network error: no response from server"),
      RequestFailure::Unauthorized => warn!("Unauthorized: credentials rejected"),
      RequestFailure::Forbidden => warn!("Forbidden: access denied"),
      RequestFailure::Server { status, body } => {
        error!(status, body = %body, "Server error")
      }
      RequestFailure::Api { status, body } => warn!(status, body = %body, "API error"),
    }
  }
}

/// Notifier that forwards failures over a channel, for consumers that react
/// elsewhere (re-authentication prompts, status bars).
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
  tx: mpsc::UnboundedSender<RequestFailure>,
}

impl ChannelNotifier {
  pub fn channel() -> (Self, mpsc::UnboundedReceiver<RequestFailure>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Self { tx }, rx)
  }
}

impl Notifier for ChannelNotifier {
  fn notify(&self, failure: &RequestFailure) {
    // Receiver gone means nobody is listening any more
    let _ = self.tx.send(failure.clone());
  }
}
