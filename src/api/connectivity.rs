//! Connectivity probe consulted before each read.

use std::sync::atomic::{AtomicBool, Ordering};

/// Answers "is the network reachable right now?". Queried on every read;
/// the repository never caches the answer.
pub trait Connectivity: Send + Sync {
  fn is_connected(&self) -> bool;
}

/// Connectivity state held in a flag that the host application flips when
/// its platform reports a change.
#[derive(Debug)]
pub struct ConnectivityFlag {
  connected: AtomicBool,
}

impl ConnectivityFlag {
  pub fn new(connected: bool) -> Self {
    Self {
      connected: AtomicBool::new(connected),
    }
  }

  pub fn online() -> Self {
    Self::new(true)
  }

  pub fn offline() -> Self {
    Self::new(false)
  }

  pub fn set(&self, connected: bool) {
    self.connected.store(connected, Ordering::SeqCst);
  }
}

impl Default for ConnectivityFlag {
  fn default() -> Self {
    Self::online()
  }
}

impl Connectivity for ConnectivityFlag {
  fn is_connected(&self) -> bool {
    self.connected.load(Ordering::SeqCst)
  }
}
