//! Maps transport outcomes to success or a single failure kind.

use crate::error::RequestFailure;

use super::notify::Notifier;
use super::outcome::{HttpResponse, RequestOutcome};

/// Decide whether an outcome succeeded. Pure; reports nothing.
pub fn classify(outcome: RequestOutcome) -> Result<HttpResponse, RequestFailure> {
  let response = match outcome {
    RequestOutcome::Response(response) => response,
    RequestOutcome::TransportFailure => return Err(RequestFailure::Network),
  };

  match response.status {
    200..=299 => Ok(response),
    401 => Err(RequestFailure::Unauthorized),
    403 => Err(RequestFailure::Forbidden),
    status if status >= 500 => Err(RequestFailure::Server {
      status,
      body: response.body,
    }),
    status => Err(RequestFailure::Api {
      status,
      body: response.body,
    }),
  }
}

/// Classify an outcome and deliver exactly one notification on failure.
///
/// This is the only place request failures are reported.
pub fn classify_and_notify(
  outcome: RequestOutcome,
  notifier: &dyn Notifier,
) -> Result<HttpResponse, RequestFailure> {
  let result = classify(outcome);
  if let Err(failure) = &result {
    notifier.notify(failure);
  }
  result
}
