//! What a transport call produced.

/// Status and body of a response that made it back over the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
  pub status: u16,
  pub body: String,
}

impl HttpResponse {
  pub fn new(status: u16, body: impl Into<String>) -> Self {
    Self {
      status,
      body: body.into(),
    }
  }

  /// A 200 response, used when replaying a cached body.
  pub fn ok(body: impl Into<String>) -> Self {
    Self::new(200, body)
  }
}

/// Result of one transport call, before classification.
///
/// Error statuses still arrive as `Response`; the classifier decides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestOutcome {
  Response(HttpResponse),
  /// No response was obtained at all
  TransportFailure,
}

impl From<Option<HttpResponse>> for RequestOutcome {
  fn from(response: Option<HttpResponse>) -> Self {
    match response {
      Some(response) => Self::Response(response),
      None => Self::TransportFailure,
    }
  }
}
