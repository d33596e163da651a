//! Disk tier with TTL-stamped entries, plus the in-memory overlay.

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::{debug, warn};

use super::memory::MemoryCache;
use super::storage::KeyValueStore;

const DATA_PREFIX: &str = "data:";
const EXP_PREFIX: &str = "exp:";

fn data_key(key: &str) -> String {
  format!("{}{}", DATA_PREFIX, key)
}

fn exp_key(key: &str) -> String {
  format!("{}{}", EXP_PREFIX, key)
}

fn is_reserved(store_key: &str) -> bool {
  store_key.starts_with(DATA_PREFIX) || store_key.starts_with(EXP_PREFIX)
}

/// Two-tier cache: raw response bodies persisted with an expiration stamp,
/// and deserialized values held in a shared [`MemoryCache`].
///
/// Every body is stored as a pair of entries, `data:<key>` and `exp:<key>`.
/// A pair with either half missing reads as a miss. Store failures are
/// logged and absorbed; nothing here returns an error.
#[derive(Clone)]
pub struct TieredCache {
  store: Arc<dyn KeyValueStore>,
  memory: Arc<MemoryCache>,
}

impl TieredCache {
  pub fn new(store: Arc<dyn KeyValueStore>, memory: Arc<MemoryCache>) -> Self {
    Self { store, memory }
  }

  /// The in-memory overlay shared with other caches built on it.
  pub fn memory(&self) -> &Arc<MemoryCache> {
    &self.memory
  }

  /// Store a body that expires `ttl` from now. A TTL reaching past the
  /// representable time range is not cached.
  pub fn put(&self, key: &str, body: &str, ttl: Duration) {
    match Utc::now().checked_add_signed(ttl) {
      Some(expires_at) => self.put_until(key, body, expires_at),
      None => warn!(key, ttl_secs = ttl.num_seconds(), "Cache TTL out of range, not caching"),
    }
  }

  /// Store a body with an absolute expiration.
  pub fn put_until(&self, key: &str, body: &str, expires_at: DateTime<Utc>) {
    if let Err(e) = self.store.set_string(&data_key(key), body) {
      warn!(key, error = %e, "Failed to write cache body");
      return;
    }

    if let Err(e) = self
      .store
      .set_string(&exp_key(key), &expires_at.to_rfc3339())
    {
      warn!(key, error = %e, "Failed to write cache expiration");
      // Don't leave a body behind that can never be read.
      if let Err(e) = self.store.remove(&data_key(key)) {
        warn!(key, error = %e, "Failed to roll back cache body");
      }
      return;
    }

    debug!(key, %expires_at, "Cached response body");
  }

  /// Read a body if it has not yet expired.
  pub fn get(&self, key: &str) -> Option<String> {
    self.get_at(key, Utc::now())
  }

  /// Read a body as of `now`. An entry at or past its expiration is removed.
  pub fn get_at(&self, key: &str, now: DateTime<Utc>) -> Option<String> {
    let body = self.read(&data_key(key))?;
    let expires_raw = self.read(&exp_key(key))?;

    let expires_at = match DateTime::parse_from_rfc3339(&expires_raw) {
      Ok(ts) => ts.with_timezone(&Utc),
      Err(e) => {
        warn!(key, error = %e, "Unparsable cache expiration, treating as miss");
        return None;
      }
    };

    if now < expires_at {
      debug!(key, "Disk cache hit");
      Some(body)
    } else {
      debug!(key, %expires_at, "Disk cache entry expired");
      self.invalidate(key);
      None
    }
  }

  fn read(&self, store_key: &str) -> Option<String> {
    match self.store.get_string(store_key) {
      Ok(value) => value,
      Err(e) => {
        warn!(key = store_key, error = %e, "Failed to read cache entry");
        None
      }
    }
  }

  /// Drop a key from both tiers. Missing entries are fine.
  pub fn invalidate(&self, key: &str) {
    for store_key in [data_key(key), exp_key(key)] {
      if let Err(e) = self.store.remove(&store_key) {
        warn!(key = %store_key, error = %e, "Failed to remove cache entry");
      }
    }
    self.memory.remove(key);
  }

  /// Drop every entry this cache owns, leaving other keys in the store alone.
  ///
  /// If the store can't list its keys only the memory tier is cleared.
  pub fn invalidate_all(&self) {
    self.memory.clear();

    let keys = match self.store.keys() {
      Ok(Some(keys)) => keys,
      Ok(None) => {
        warn!("Cache store cannot enumerate keys; only the memory tier was cleared");
        return;
      }
      Err(e) => {
        warn!(error = %e, "Failed to list cache keys; only the memory tier was cleared");
        return;
      }
    };

    let mut removed = 0usize;
    for key in keys.iter().filter(|k| is_reserved(k)) {
      match self.store.remove(key) {
        Ok(()) => removed += 1,
        Err(e) => warn!(key = %key, error = %e, "Failed to remove cache entry"),
      }
    }
    debug!(removed, "Cleared disk cache");
  }

  pub fn get_memory<T>(&self, key: &str) -> Option<T>
  where
    T: Clone + Send + Sync + 'static,
  {
    self.memory.get(key)
  }

  pub fn put_memory<T>(&self, key: &str, value: T)
  where
    T: Send + Sync + 'static,
  {
    self.memory.insert(key, value);
  }

  /// Forget every deserialized value without touching the disk tier.
  pub fn clear_memory(&self) {
    self.memory.clear();
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::storage::MemoryStore;
  use color_eyre::{eyre::eyre, Result};

  fn cache_with_store() -> (TieredCache, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let cache = TieredCache::new(store.clone(), MemoryCache::shared());
    (cache, store)
  }

  /// Store that fails every write and cannot list keys.
  struct BrokenStore;

  impl KeyValueStore for BrokenStore {
    fn get_string(&self, _key: &str) -> Result<Option<String>> {
      Err(eyre!("disk gone"))
    }

    fn set_string(&self, _key: &str, _value: &str) -> Result<()> {
      Err(eyre!("disk full"))
    }

    fn remove(&self, _key: &str) -> Result<()> {
      Err(eyre!("disk gone"))
    }

    fn clear(&self) -> Result<()> {
      panic!("clear must never be called by the cache");
    }
  }

  #[test]
  fn test_put_writes_pair() {
    let (cache, store) = cache_with_store();
    cache.put("users", "[1,2]", Duration::hours(1));

    assert_eq!(store.get_string("data:users").unwrap().as_deref(), Some("[1,2]"));
    let exp = store.get_string("exp:users").unwrap().unwrap();
    let exp = DateTime::parse_from_rfc3339(&exp).unwrap();
    let remaining = exp.with_timezone(&Utc) - Utc::now();
    assert!(remaining > Duration::minutes(59));
    assert!(remaining <= Duration::hours(1));
  }

  #[test]
  fn test_get_before_and_at_expiration() {
    let (cache, store) = cache_with_store();
    let expires_at = Utc::now() + Duration::minutes(10);
    cache.put_until("k", "body", expires_at);

    let just_before = expires_at - Duration::milliseconds(1);
    assert_eq!(cache.get_at("k", just_before).as_deref(), Some("body"));

    // At the expiration instant the entry is stale and gets purged
    assert_eq!(cache.get_at("k", expires_at), None);
    assert_eq!(store.get_string("data:k").unwrap(), None);
    assert_eq!(store.get_string("exp:k").unwrap(), None);
  }

  #[test]
  fn test_expired_entry_is_purged_on_read() {
    let (cache, store) = cache_with_store();
    cache.put_until("old", "stale", Utc::now() - Duration::seconds(1));

    assert_eq!(cache.get("old"), None);
    assert!(store.keys().unwrap().unwrap().is_empty());
  }

  #[test]
  fn test_partial_pair_is_a_miss() {
    let (cache, store) = cache_with_store();

    store.set_string("data:only-body", "x").unwrap();
    assert_eq!(cache.get("only-body"), None);

    let future = (Utc::now() + Duration::hours(1)).to_rfc3339();
    store.set_string("exp:only-exp", &future).unwrap();
    assert_eq!(cache.get("only-exp"), None);
  }

  #[test]
  fn test_unparsable_expiration_is_a_miss() {
    let (cache, store) = cache_with_store();
    store.set_string("data:k", "x").unwrap();
    store.set_string("exp:k", "not a timestamp").unwrap();
    assert_eq!(cache.get("k"), None);
  }

  #[test]
  fn test_invalidate_clears_both_tiers() {
    let (cache, store) = cache_with_store();
    cache.put("k", "x", Duration::hours(1));
    cache.put_memory("k", 7u8);

    cache.invalidate("k");
    cache.invalidate("k");

    assert_eq!(cache.get("k"), None);
    assert_eq!(cache.get_memory::<u8>("k"), None);
    assert!(store.keys().unwrap().unwrap().is_empty());
  }

  #[test]
  fn test_invalidate_all_spares_foreign_keys() {
    let (cache, store) = cache_with_store();
    cache.put("a", "1", Duration::hours(1));
    cache.put("b", "2", Duration::hours(1));
    cache.put_memory("a", 1i64);
    store.set_string("user_settings", "dark").unwrap();

    cache.invalidate_all();

    assert_eq!(cache.get("a"), None);
    assert_eq!(cache.get("b"), None);
    assert!(cache.memory().is_empty());
    assert_eq!(
      store.get_string("user_settings").unwrap().as_deref(),
      Some("dark")
    );
  }

  #[test]
  fn test_store_failures_are_absorbed() {
    let cache = TieredCache::new(Arc::new(BrokenStore), MemoryCache::shared());
    cache.put_memory("k", 1u8);

    cache.put("k", "x", Duration::hours(1));
    assert_eq!(cache.get("k"), None);
    cache.invalidate("k");

    cache.put_memory("k", 1u8);
    // Falls back to clearing memory only, never calls clear()
    cache.invalidate_all();
    assert!(cache.memory().is_empty());
  }

  /// Store that accepts bodies but fails to write expirations.
  struct NoExpiryStore(MemoryStore);

  impl KeyValueStore for NoExpiryStore {
    fn get_string(&self, key: &str) -> Result<Option<String>> {
      self.0.get_string(key)
    }

    fn set_string(&self, key: &str, value: &str) -> Result<()> {
      if key.starts_with(EXP_PREFIX) {
        return Err(eyre!("disk full"));
      }
      self.0.set_string(key, value)
    }

    fn remove(&self, key: &str) -> Result<()> {
      self.0.remove(key)
    }

    fn clear(&self) -> Result<()> {
      self.0.clear()
    }

    fn keys(&self) -> Result<Option<Vec<String>>> {
      self.0.keys()
    }
  }

  #[test]
  fn test_out_of_range_ttl_is_not_cached() {
    let (cache, store) = cache_with_store();

    cache.put("k", "x", Duration::MAX);
    cache.put("k", "x", Duration::MIN);

    assert_eq!(cache.get("k"), None);
    assert!(store.keys().unwrap().unwrap().is_empty());
  }

  #[test]
  fn test_failed_expiration_write_rolls_back_body() {
    let store = Arc::new(NoExpiryStore(MemoryStore::new()));
    let cache = TieredCache::new(store.clone(), MemoryCache::shared());

    cache.put("k", "x", Duration::hours(1));

    assert_eq!(store.get_string("data:k").unwrap(), None);
    assert_eq!(cache.get("k"), None);
  }

  #[test]
  fn test_clear_memory_keeps_disk() {
    let (cache, _store) = cache_with_store();
    cache.put("k", "x", Duration::hours(1));
    cache.put_memory("k", "typed".to_string());

    cache.clear_memory();

    assert_eq!(cache.get_memory::<String>("k"), None);
    assert_eq!(cache.get("k").as_deref(), Some("x"));
  }
}
