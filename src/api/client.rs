//! Endpoint-oriented API client with transparent caching.

use color_eyre::Result;
use serde_json::Value;
use std::convert::Infallible;
use std::fmt::Display;
use std::sync::Arc;

use crate::cache::{KeyValueStore, MemoryCache, SqliteStore, TieredCache};
use crate::config::Config;
use crate::error::FetchError;

use super::connectivity::Connectivity;
use super::decode::JsonMap;
use super::notify::Notifier;
use super::repository::{FetchOptions, MutateOptions, Repository};
use super::transport::HttpTransport;

/// API client with transparent caching support.
///
/// This pairs an [`HttpTransport`] with a [`Repository`] so callers work in
/// terms of endpoints. Reads are cached under the endpoint unless the
/// options name another key.
#[derive(Clone)]
pub struct CachedApiClient {
  inner: HttpTransport,
  repo: Repository,
}

impl CachedApiClient {
  /// Build a client from configuration, opening the SQLite cache at the
  /// configured (or default) location.
  pub fn new(
    config: &Config,
    memory: Arc<MemoryCache>,
    connectivity: Arc<dyn Connectivity>,
    notifier: Arc<dyn Notifier>,
  ) -> Result<Self> {
    let store = match &config.cache.path {
      Some(path) => SqliteStore::open_at(path)?,
      None => SqliteStore::open()?,
    };
    Self::with_store(config, Arc::new(store), memory, connectivity, notifier)
  }

  /// Build a client from configuration over an arbitrary store.
  pub fn with_store(
    config: &Config,
    store: Arc<dyn KeyValueStore>,
    memory: Arc<MemoryCache>,
    connectivity: Arc<dyn Connectivity>,
    notifier: Arc<dyn Notifier>,
  ) -> Result<Self> {
    let inner = HttpTransport::new(
      config.base_url()?,
      Config::get_api_token(),
      std::time::Duration::from_secs(config.api.timeout_secs),
    )?;

    let repo = Repository::new(TieredCache::new(store, memory), connectivity, notifier)
      .with_unwrap(config.response_unwrap())
      .with_default_ttl(config.default_ttl()?)
      .with_disk_tier(config.cache.enabled)
      .with_memory_tier(config.cache.memory);

    Ok(Self { inner, repo })
  }

  pub fn repository(&self) -> &Repository {
    &self.repo
  }

  /// GET a single object.
  pub async fn get_one<T, C, E>(
    &self,
    endpoint: &str,
    options: FetchOptions,
    convert: C,
  ) -> Option<T>
  where
    T: Clone + Send + Sync + 'static,
    C: Fn(&JsonMap) -> Result<T, E>,
    E: Display,
  {
    let options = FetchOptions {
      endpoint: Some(endpoint.to_string()),
      ..options
    };
    self
      .repo
      .fetch(&options, || self.inner.get(endpoint), convert)
      .await
  }

  /// GET an array of objects.
  pub async fn get_list<T, C, E>(
    &self,
    endpoint: &str,
    options: FetchOptions,
    convert: C,
  ) -> Option<Vec<T>>
  where
    T: Clone + Send + Sync + 'static,
    C: Fn(&JsonMap) -> Result<T, E>,
    E: Display,
  {
    let options = FetchOptions {
      endpoint: Some(endpoint.to_string()),
      ..options
    };
    self
      .repo
      .fetch_list(&options, || self.inner.get(endpoint), convert)
      .await
  }

  /// GET a single object as untyped JSON.
  pub async fn get_json(&self, endpoint: &str, options: FetchOptions) -> Option<Value> {
    self.get_one(endpoint, options, raw_object).await
  }

  /// GET an array as untyped JSON.
  pub async fn get_json_list(&self, endpoint: &str, options: FetchOptions) -> Option<Vec<Value>> {
    self.get_list(endpoint, options, raw_object).await
  }

  /// POST a JSON body and decode the response.
  ///
  /// `Ok(None)` means the write succeeded with an empty body.
  pub async fn post<T, C, E>(
    &self,
    endpoint: &str,
    body: Value,
    options: &MutateOptions,
    convert: C,
  ) -> std::result::Result<Option<T>, FetchError>
  where
    C: Fn(&JsonMap) -> Result<T, E>,
    E: Display,
  {
    self
      .repo
      .mutate_outcome(options, || self.inner.post(endpoint, body), convert)
      .await
  }

  /// PUT a JSON body and decode the response.
  pub async fn put<T, C, E>(
    &self,
    endpoint: &str,
    body: Value,
    options: &MutateOptions,
    convert: C,
  ) -> std::result::Result<Option<T>, FetchError>
  where
    C: Fn(&JsonMap) -> Result<T, E>,
    E: Display,
  {
    self
      .repo
      .mutate_outcome(options, || self.inner.put(endpoint, body), convert)
      .await
  }

  /// DELETE a resource.
  pub async fn delete(&self, endpoint: &str, options: &MutateOptions) -> bool {
    self
      .repo
      .send(options, || self.inner.delete(endpoint))
      .await
  }

  pub fn invalidate(&self, key: &str) {
    self.repo.invalidate(key);
  }

  pub fn invalidate_all(&self) {
    self.repo.invalidate_all();
  }
}

/// Converter that keeps the object as plain JSON.
pub fn raw_object(map: &JsonMap) -> Result<Value, Infallible> {
  Ok(Value::Object(map.clone()))
}
