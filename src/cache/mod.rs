//! Two-tier response cache for offline support.
//!
//! This module provides an API-agnostic caching mechanism that:
//! - Persists raw response bodies with an absolute expiration timestamp
//! - Purges expired entries when they are read
//! - Keeps deserialized values in a shared in-memory overlay
//! - Only ever touches keys inside its own namespace in the backing store

mod memory;
mod storage;
mod tiered;
mod traits;

pub use memory::MemoryCache;
pub use storage::{KeyValueStore, MemoryStore, SqliteStore};
pub use tiered::TieredCache;
pub use traits::{CacheSource, Fetched};
