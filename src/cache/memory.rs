//! Process-scoped overlay of already-deserialized values.

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

type Slot = Arc<dyn Any + Send + Sync>;

/// Typed values keyed by cache key, shared by every repository that holds a
/// clone of the surrounding `Arc`.
///
/// Entries never expire; they live until invalidated, cleared, or the
/// process exits. The lock is only held for a single lookup or insert.
#[derive(Default)]
pub struct MemoryCache {
  entries: Mutex<HashMap<String, Slot>>,
}

impl MemoryCache {
  pub fn new() -> Self {
    Self::default()
  }

  /// Convenience for the common case of sharing one overlay.
  pub fn shared() -> Arc<Self> {
    Arc::new(Self::new())
  }

  // The map is consistent between calls, so a panic elsewhere while holding
  // the lock leaves nothing half-written.
  fn lock(&self) -> MutexGuard<'_, HashMap<String, Slot>> {
    self.entries.lock().unwrap_or_else(|e| e.into_inner())
  }

  /// Look up a value. A value stored under a different type is a miss.
  pub fn get<T>(&self, key: &str) -> Option<T>
  where
    T: Clone + Send + Sync + 'static,
  {
    let slot = self.lock().get(key).cloned()?;
    slot.downcast_ref::<T>().cloned()
  }

  pub fn insert<T>(&self, key: &str, value: T)
  where
    T: Send + Sync + 'static,
  {
    self.lock().insert(key.to_string(), Arc::new(value));
  }

  pub fn remove(&self, key: &str) {
    self.lock().remove(key);
  }

  pub fn contains(&self, key: &str) -> bool {
    self.lock().contains_key(key)
  }

  pub fn clear(&self) {
    self.lock().clear();
  }

  pub fn len(&self) -> usize {
    self.lock().len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}
