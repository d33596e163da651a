//! Types describing where a returned value came from.

/// A value returned by the repository, with metadata about its source.
#[derive(Debug, Clone, PartialEq)]
pub struct Fetched<T> {
  /// The actual data
  pub data: T,
  /// Where the data came from
  pub source: CacheSource,
}

impl<T> Fetched<T> {
  /// A value served from the in-memory overlay.
  pub fn from_memory(data: T) -> Self {
    Self {
      data,
      source: CacheSource::Memory,
    }
  }

  /// A value decoded from a fresh network response.
  pub fn from_network(data: T) -> Self {
    Self {
      data,
      source: CacheSource::Network,
    }
  }

  /// A value decoded from the disk cache while disconnected.
  pub fn offline(data: T) -> Self {
    Self {
      data,
      source: CacheSource::Offline,
    }
  }

  pub fn into_data(self) -> T {
    self.data
  }
}

/// Indicates where fetched data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
  /// Already-deserialized value from the memory tier
  Memory,
  /// Fresh data from network
  Network,
  /// Offline mode - network unavailable, serving the disk cache
  Offline,
}
