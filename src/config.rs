use chrono::Duration;
use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::api::{Unwrap, DEFAULT_TTL_SECS};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  /// May be left out when --base-url supplies the URL
  #[serde(default)]
  pub api: ApiConfig,
  #[serde(default)]
  pub cache: CacheConfig,
  #[serde(default)]
  pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  #[serde(default)]
  pub base_url: String,
  /// Dotted path to the field holding the actual result (e.g. "data")
  #[serde(default)]
  pub unwrap: Option<String>,
  /// Request timeout enforced by the HTTP client
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
  30
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      base_url: String::new(),
      unwrap: None,
      timeout_secs: default_timeout_secs(),
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
  /// Persist responses for offline use
  #[serde(default = "default_true")]
  pub enabled: bool,
  /// Keep deserialized values in memory
  #[serde(default = "default_true")]
  pub memory: bool,
  #[serde(default = "default_ttl_secs")]
  pub ttl_secs: i64,
  /// Database location, defaults to the user data directory
  pub path: Option<PathBuf>,
}

fn default_true() -> bool {
  true
}

fn default_ttl_secs() -> i64 {
  DEFAULT_TTL_SECS
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      enabled: true,
      memory: true,
      ttl_secs: DEFAULT_TTL_SECS,
      path: None,
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
  /// Default filter when REPOCACHE_LOG is unset
  #[serde(default = "default_log_level")]
  pub level: String,
}

fn default_log_level() -> String {
  "info".to_string()
}

impl Default for LogConfig {
  fn default() -> Self {
    Self {
      level: default_log_level(),
    }
  }
}

impl Config {
  /// Minimal configuration for an API with no config file.
  pub fn for_base_url(base_url: impl Into<String>) -> Self {
    Self {
      api: ApiConfig {
        base_url: base_url.into(),
        ..ApiConfig::default()
      },
      cache: CacheConfig::default(),
      log: LogConfig::default(),
    }
  }

  /// Replace the configured base URL, keeping everything else.
  pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
    self.api.base_url = base_url.into();
    self
  }

  /// The API base URL, which must be set by now.
  pub fn base_url(&self) -> Result<&str> {
    if self.api.base_url.trim().is_empty() {
      return Err(eyre!(
        "No API base URL configured. Set api.base_url or pass --base-url."
      ));
    }
    Ok(&self.api.base_url)
  }

  /// The configured cache lifetime as a duration.
  pub fn default_ttl(&self) -> Result<Duration> {
    Duration::try_seconds(self.cache.ttl_secs)
      .filter(|ttl| *ttl > Duration::zero())
      .ok_or_else(|| {
        eyre!(
          "Invalid cache.ttl_secs {}: must be positive and in range",
          self.cache.ttl_secs
        )
      })
  }

  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./repocache.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/repocache/config.yaml
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    Self::load_optional(explicit_path)?.ok_or_else(|| {
      eyre!(
        "No configuration file found. Create one at ~/.config/repocache/config.yaml\n\
                 or pass --base-url."
      )
    })
  }

  /// Like [`Config::load`], but finding no file at all is `Ok(None)`.
  /// An explicit path that doesn't exist is still an error.
  pub fn load_optional(explicit_path: Option<&Path>) -> Result<Option<Self>> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    path.map(|p| Self::load_from_path(&p)).transpose()
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("repocache.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("repocache").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  pub fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    let config: Config = serde_yaml::from_str(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))?;

    if let Err(e) = config.default_ttl() {
      return Err(eyre!("{} in {}", e, path.display()));
    }

    if config.api.timeout_secs == 0 {
      return Err(eyre!(
        "Invalid api.timeout_secs in {}: must be positive",
        path.display()
      ));
    }

    Ok(config)
  }

  /// The unwrap step configured for responses.
  pub fn response_unwrap(&self) -> Unwrap {
    self
      .api
      .unwrap
      .as_deref()
      .map(Unwrap::path)
      .unwrap_or_default()
  }

  /// Get the API token from environment variables.
  ///
  /// Checks REPOCACHE_API_TOKEN first, then API_TOKEN as fallback.
  /// Requests go out unauthenticated when neither is set.
  pub fn get_api_token() -> Option<String> {
    std::env::var("REPOCACHE_API_TOKEN")
      .or_else(|_| std::env::var("API_TOKEN"))
      .ok()
      .filter(|t| !t.is_empty())
  }
}
