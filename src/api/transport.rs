//! reqwest-backed transport producing the futures the repository awaits.

use color_eyre::{eyre::eyre, Result};
use futures::future::{BoxFuture, FutureExt};
use reqwest::{header, Client, Method, RequestBuilder};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::outcome::HttpResponse;

/// HTTP client bound to one API base URL.
///
/// Every request resolves to `Some(response)` whatever the status, or
/// `None` when no response could be obtained. Errors are logged, never
/// returned; classification happens in the repository.
#[derive(Clone)]
pub struct HttpTransport {
  client: Client,
  base_url: Url,
  token: Option<String>,
}

impl HttpTransport {
  pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> Result<Self> {
    let client = Client::builder()
      .timeout(timeout)
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self {
      client,
      base_url: normalize_base(base_url)?,
      token,
    })
  }

  /// Resolve an endpoint against the base URL.
  pub fn url(&self, endpoint: &str) -> Result<Url> {
    self
      .base_url
      .join(endpoint.trim_start_matches('/'))
      .map_err(|e| eyre!("Invalid endpoint '{}': {}", endpoint, e))
  }

  pub fn get(&self, endpoint: &str) -> BoxFuture<'static, Option<HttpResponse>> {
    self.request(Method::GET, endpoint, None)
  }

  pub fn post(&self, endpoint: &str, body: Value) -> BoxFuture<'static, Option<HttpResponse>> {
    self.request(Method::POST, endpoint, Some(body))
  }

  pub fn put(&self, endpoint: &str, body: Value) -> BoxFuture<'static, Option<HttpResponse>> {
    self.request(Method::PUT, endpoint, Some(body))
  }

  pub fn delete(&self, endpoint: &str) -> BoxFuture<'static, Option<HttpResponse>> {
    self.request(Method::DELETE, endpoint, None)
  }

  fn request(
    &self,
    method: Method,
    endpoint: &str,
    body: Option<Value>,
  ) -> BoxFuture<'static, Option<HttpResponse>> {
    let url = match self.url(endpoint) {
      Ok(url) => url,
      Err(e) => {
        debug!(error = %e, "Request not sent");
        return futures::future::ready(None).boxed();
      }
    };

    let mut builder = self
      .client
      .request(method, url)
      .header(header::ACCEPT, "application/json");
    if let Some(token) = &self.token {
      builder = builder.bearer_auth(token);
    }
    if let Some(body) = body {
      builder = builder
        .header(header::CONTENT_TYPE, "application/json")
        .body(body.to_string());
    }

    execute(builder).boxed()
  }
}

async fn execute(builder: RequestBuilder) -> Option<HttpResponse> {
  let response = match builder.send().await {
    Ok(response) => response,
    Err(e) => {
      debug!(error = %e, "Request failed without a response");
      return None;
    }
  };

  let status = response.status().as_u16();
  match response.text().await {
    Ok(body) => Some(HttpResponse { status, body }),
    Err(e) => {
      debug!(status, error = %e, "Failed to read response body");
      None
    }
  }
}

/// Parse the base URL so that relative joins append instead of replacing the
/// last path segment.
fn normalize_base(base_url: &str) -> Result<Url> {
  let mut url =
    Url::parse(base_url).map_err(|e| eyre!("Invalid base URL '{}': {}", base_url, e))?;
  if !url.path().ends_with('/') {
    let path = format!("{}/", url.path());
    url.set_path(&path);
  }
  Ok(url)
}
