//! Caching repository layer for HTTP APIs.
//!
//! Reads go through a [`Repository`](api::Repository) that serves values
//! from an in-memory overlay, the network, or (when disconnected) a
//! TTL-stamped disk cache. Writes invalidate the keys they affect. Failed
//! requests are reported once through a [`Notifier`](api::Notifier) and
//! surface to callers as `None`.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;

pub use api::{CachedApiClient, FetchOptions, MutateOptions, Repository};
pub use cache::{MemoryCache, TieredCache};
pub use error::{DeserializationError, FetchError, RequestFailure};
