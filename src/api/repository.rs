//! Read/write orchestration across network, disk cache and memory cache.

use chrono::Duration;
use serde_json::Value;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::cache::{Fetched, TieredCache};
use crate::error::{DeserializationError, FetchError};

use super::classify::classify_and_notify;
use super::connectivity::Connectivity;
use super::decode::{self, JsonMap, Unwrap};
use super::notify::Notifier;
use super::outcome::{HttpResponse, RequestOutcome};

/// TTL applied when neither the call nor the repository sets one.
pub const DEFAULT_TTL_SECS: i64 = 3600;

/// Per-call settings for reads.
#[derive(Debug, Clone)]
pub struct FetchOptions {
  /// Explicit cache key
  pub key: Option<String>,
  /// Request endpoint, used as the cache key when `key` is unset
  pub endpoint: Option<String>,
  /// Write-through on success and fall back to the disk cache when offline
  pub use_cache: bool,
  /// Consult and populate the memory tier
  pub use_memory: bool,
  /// Overrides the repository TTL for this call
  pub ttl: Option<Duration>,
}

impl Default for FetchOptions {
  fn default() -> Self {
    Self {
      key: None,
      endpoint: None,
      use_cache: true,
      use_memory: true,
      ttl: None,
    }
  }
}

impl FetchOptions {
  pub fn keyed(key: impl Into<String>) -> Self {
    Self {
      key: Some(key.into()),
      ..Self::default()
    }
  }

  pub fn for_endpoint(endpoint: impl Into<String>) -> Self {
    Self {
      endpoint: Some(endpoint.into()),
      ..Self::default()
    }
  }

  pub fn with_key(mut self, key: impl Into<String>) -> Self {
    self.key = Some(key.into());
    self
  }

  pub fn with_ttl(mut self, ttl: Duration) -> Self {
    self.ttl = Some(ttl);
    self
  }

  pub fn without_cache(mut self) -> Self {
    self.use_cache = false;
    self
  }

  pub fn without_memory(mut self) -> Self {
    self.use_memory = false;
    self
  }

  /// Explicit key, else the endpoint. Empty strings don't count.
  pub fn cache_key(&self) -> Option<&str> {
    self
      .key
      .as_deref()
      .filter(|k| !k.is_empty())
      .or_else(|| self.endpoint.as_deref().filter(|e| !e.is_empty()))
  }
}

/// Per-call settings for writes.
#[derive(Debug, Clone, Default)]
pub struct MutateOptions {
  /// Cache keys to drop from both tiers once the write succeeds
  pub invalidate: Vec<String>,
}

impl MutateOptions {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn invalidating<I, S>(keys: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    Self {
      invalidate: keys.into_iter().map(Into::into).collect(),
    }
  }
}

/// Typed access to a remote API with transparent caching.
///
/// Reads check the memory tier, then either call the network (writing the
/// body through to disk) or, when disconnected, replay the disk cache.
/// Writes always hit the network and invalidate named keys on success.
///
/// Failures surface as `None`/`false` on the plain methods; the notifier has
/// already been told why. The `*_outcome` methods expose the reason.
#[derive(Clone)]
pub struct Repository {
  cache: TieredCache,
  connectivity: Arc<dyn Connectivity>,
  notifier: Arc<dyn Notifier>,
  unwrap: Unwrap,
  default_ttl: Duration,
  disk_tier: bool,
  memory_tier: bool,
}

impl Repository {
  pub fn new(
    cache: TieredCache,
    connectivity: Arc<dyn Connectivity>,
    notifier: Arc<dyn Notifier>,
  ) -> Self {
    Self {
      cache,
      connectivity,
      notifier,
      unwrap: Unwrap::Identity,
      default_ttl: Duration::seconds(DEFAULT_TTL_SECS),
      disk_tier: true,
      memory_tier: true,
    }
  }

  /// Set the unwrap step applied to every response payload.
  pub fn with_unwrap(mut self, unwrap: Unwrap) -> Self {
    self.unwrap = unwrap;
    self
  }

  /// Set the TTL used when a call doesn't specify one.
  pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
    self.default_ttl = ttl;
    self
  }

  /// Enable or disable disk caching for every call.
  pub fn with_disk_tier(mut self, enabled: bool) -> Self {
    self.disk_tier = enabled;
    self
  }

  /// Enable or disable the memory tier for every call.
  pub fn with_memory_tier(mut self, enabled: bool) -> Self {
    self.memory_tier = enabled;
    self
  }

  pub fn cache(&self) -> &TieredCache {
    &self.cache
  }

  /// Fetch a single object. `None` on any failure.
  pub async fn fetch<T, F, Fut, C, E>(
    &self,
    options: &FetchOptions,
    call: F,
    convert: C,
  ) -> Option<T>
  where
    T: Clone + Send + Sync + 'static,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Option<HttpResponse>>,
    C: Fn(&JsonMap) -> Result<T, E>,
    E: Display,
  {
    self
      .fetch_outcome(options, call, convert)
      .await
      .ok()
      .map(Fetched::into_data)
  }

  /// Fetch a single object, reporting where it came from or why it failed.
  pub async fn fetch_outcome<T, F, Fut, C, E>(
    &self,
    options: &FetchOptions,
    call: F,
    convert: C,
  ) -> Result<Fetched<T>, FetchError>
  where
    T: Clone + Send + Sync + 'static,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Option<HttpResponse>>,
    C: Fn(&JsonMap) -> Result<T, E>,
    E: Display,
  {
    let unwrap = &self.unwrap;
    self
      .read(options, call, |payload| decode::to_one(payload, unwrap, convert))
      .await
  }

  /// Fetch an array of objects. `None` on any failure.
  pub async fn fetch_list<T, F, Fut, C, E>(
    &self,
    options: &FetchOptions,
    call: F,
    convert: C,
  ) -> Option<Vec<T>>
  where
    T: Clone + Send + Sync + 'static,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Option<HttpResponse>>,
    C: Fn(&JsonMap) -> Result<T, E>,
    E: Display,
  {
    self
      .fetch_list_outcome(options, call, convert)
      .await
      .ok()
      .map(Fetched::into_data)
  }

  pub async fn fetch_list_outcome<T, F, Fut, C, E>(
    &self,
    options: &FetchOptions,
    call: F,
    convert: C,
  ) -> Result<Fetched<Vec<T>>, FetchError>
  where
    T: Clone + Send + Sync + 'static,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Option<HttpResponse>>,
    C: Fn(&JsonMap) -> Result<T, E>,
    E: Display,
  {
    let unwrap = &self.unwrap;
    self
      .read(options, call, |payload| decode::to_many(payload, unwrap, convert))
      .await
  }

  async fn read<T, F, Fut, D>(
    &self,
    options: &FetchOptions,
    call: F,
    convert_payload: D,
  ) -> Result<Fetched<T>, FetchError>
  where
    T: Clone + Send + Sync + 'static,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Option<HttpResponse>>,
    D: FnOnce(Value) -> Result<T, DeserializationError>,
  {
    let key = options.cache_key();
    let use_memory = self.memory_tier && options.use_memory;
    let use_cache = self.disk_tier && options.use_cache;

    if let Some(key) = key.filter(|_| use_memory) {
      if let Some(value) = self.cache.get_memory::<T>(key) {
        debug!(key, "Memory cache hit");
        return Ok(Fetched::from_memory(value));
      }
    }

    let (response, online) = if self.connectivity.is_connected() {
      let outcome = RequestOutcome::from(call().await);
      let response = classify_and_notify(outcome, self.notifier.as_ref())?;

      if let Some(key) = key.filter(|_| use_cache) {
        let ttl = options.ttl.unwrap_or(self.default_ttl);
        self.cache.put(key, &response.body, ttl);
      }
      (response, true)
    } else {
      (self.replay_cached(key.filter(|_| use_cache))?, false)
    };

    let value = match decode::parse_body(&response.body).and_then(convert_payload) {
      Ok(value) => value,
      Err(e) => {
        warn!(key = key.unwrap_or("<none>"), error = %e, "Failed to decode response");
        return Err(e.into());
      }
    };

    if let Some(key) = key.filter(|_| use_memory) {
      self.cache.put_memory(key, value.clone());
    }

    Ok(if online {
      Fetched::from_network(value)
    } else {
      Fetched::offline(value)
    })
  }

  /// Serve a read from the disk cache while disconnected.
  fn replay_cached(&self, key: Option<&str>) -> Result<HttpResponse, FetchError> {
    let cached = key.and_then(|key| {
      let body = self.cache.get(key);
      debug!(key, hit = body.is_some(), "Offline, consulted disk cache");
      body
    });

    let outcome = match cached {
      Some(body) => RequestOutcome::Response(HttpResponse::ok(body)),
      None => RequestOutcome::TransportFailure,
    };

    classify_and_notify(outcome, self.notifier.as_ref()).map_err(|_| FetchError::Offline)
  }

  /// Perform a write and decode its response body. `None` on failure or
  /// when the response body is empty.
  pub async fn mutate<T, F, Fut, C, E>(
    &self,
    options: &MutateOptions,
    call: F,
    convert: C,
  ) -> Option<T>
  where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Option<HttpResponse>>,
    C: Fn(&JsonMap) -> Result<T, E>,
    E: Display,
  {
    self
      .mutate_outcome(options, call, convert)
      .await
      .ok()
      .flatten()
  }

  pub async fn mutate_outcome<T, F, Fut, C, E>(
    &self,
    options: &MutateOptions,
    call: F,
    convert: C,
  ) -> Result<Option<T>, FetchError>
  where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Option<HttpResponse>>,
    C: Fn(&JsonMap) -> Result<T, E>,
    E: Display,
  {
    let response = self.write(options, call).await?;

    if response.body.trim().is_empty() {
      return Ok(None);
    }

    decode::parse_body(&response.body)
      .and_then(|payload| decode::to_one(payload, &self.unwrap, convert))
      .map(Some)
      .map_err(|e| {
        warn!(error = %e, "Failed to decode write response");
        e.into()
      })
  }

  /// Perform a write whose response body is of no interest.
  pub async fn send<F, Fut>(&self, options: &MutateOptions, call: F) -> bool
  where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Option<HttpResponse>>,
  {
    self.write(options, call).await.is_ok()
  }

  async fn write<F, Fut>(
    &self,
    options: &MutateOptions,
    call: F,
  ) -> Result<HttpResponse, FetchError>
  where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Option<HttpResponse>>,
  {
    let outcome = RequestOutcome::from(call().await);
    let response = classify_and_notify(outcome, self.notifier.as_ref())?;

    // Before decoding, so a bad body can't leave stale entries behind
    for key in &options.invalidate {
      debug!(key = %key, "Invalidating after write");
      self.cache.invalidate(key);
    }

    Ok(response)
  }

  /// Drop one key from both tiers.
  pub fn invalidate(&self, key: &str) {
    self.cache.invalidate(key);
  }

  /// Drop every cached entry this repository's cache owns.
  pub fn invalidate_all(&self) {
    self.cache.invalidate_all();
  }
}
