//! Failure taxonomy for request classification, deserialization and the
//! orchestrator's internal result.

use thiserror::Error;

/// A request that did not succeed, as decided by the response classifier.
///
/// Each variant corresponds to exactly one notification delivered to the
/// [`Notifier`](crate::api::Notifier).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestFailure {
  /// No response was obtained (DNS, timeout, connection refused)
  #[error("network error")]
  Network,
  /// HTTP 401
  #[error("unauthorized")]
  Unauthorized,
  /// HTTP 403
  #[error("forbidden")]
  Forbidden,
  /// HTTP 5xx
  #[error("server error {status}: {body}")]
  Server { status: u16, body: String },
  /// Any other non-2xx status
  #[error("API error {status}: {body}")]
  Api { status: u16, body: String },
}

/// The payload could not be turned into the requested type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("deserialization failed: {message}")]
pub struct DeserializationError {
  pub message: String,
}

impl DeserializationError {
  pub fn new(message: impl Into<String>) -> Self {
    Self {
      message: message.into(),
    }
  }
}

/// Why a read or write produced no value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
  /// The request was classified as failed; the notifier has been told.
  #[error(transparent)]
  Request(#[from] RequestFailure),
  /// Disconnected, and no usable cache entry (or caching not allowed).
  #[error("offline and no cached response available")]
  Offline,
  #[error(transparent)]
  Deserialization(#[from] DeserializationError),
}
