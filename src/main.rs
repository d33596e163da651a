use clap::{Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use serde_json::Value;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use repocache::api::{
  raw_object, CachedApiClient, ConnectivityFlag, FetchOptions, LogNotifier, MutateOptions,
  Notifier,
};
use repocache::cache::{MemoryCache, MemoryStore};
use repocache::config::Config;
use repocache::error::{FetchError, RequestFailure};

#[derive(Parser, Debug)]
#[command(name = "repocache")]
#[command(about = "Query an HTTP API through an offline-tolerant cache")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/repocache/config.yaml)
  #[arg(short, long, global = true)]
  config: Option<PathBuf>,

  /// API base URL, overriding the config file
  #[arg(long, global = true)]
  base_url: Option<String>,

  /// Behave as if the network were unreachable
  #[arg(long, global = true)]
  offline: bool,

  /// Keep the disk tier in memory for this run only
  #[arg(long, global = true)]
  ephemeral: bool,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Fetch an endpoint, serving from cache when offline
  Get {
    endpoint: String,
    /// Cache key (defaults to the endpoint)
    #[arg(long)]
    key: Option<String>,
    /// Cache lifetime in seconds for this response
    #[arg(long)]
    ttl: Option<i64>,
    /// Expect an array of objects
    #[arg(long)]
    list: bool,
    /// Neither write nor read the disk cache
    #[arg(long)]
    no_cache: bool,
  },
  /// POST a JSON body
  Post {
    endpoint: String,
    #[arg(long)]
    data: String,
    /// Cache keys to invalidate on success
    #[arg(long = "invalidate")]
    invalidate: Vec<String>,
  },
  /// PUT a JSON body
  Put {
    endpoint: String,
    #[arg(long)]
    data: String,
    #[arg(long = "invalidate")]
    invalidate: Vec<String>,
  },
  /// DELETE a resource
  Delete {
    endpoint: String,
    #[arg(long = "invalidate")]
    invalidate: Vec<String>,
  },
  /// Drop one cache key
  Invalidate { key: String },
  /// Drop every cached response
  Clear,
}

/// Logs failures and tells the user on stderr, since stdout carries output.
struct CliNotifier;

impl Notifier for CliNotifier {
  fn notify(&self, failure: &RequestFailure) {
    LogNotifier.notify(failure);
    eprintln!("error: {}", failure);
  }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration, letting --base-url stand in for a missing file
  let config = match (Config::load_optional(args.config.as_deref())?, &args.base_url) {
    (Some(config), Some(url)) => config.with_base_url(url.clone()),
    (Some(config), None) => config,
    (None, Some(url)) => Config::for_base_url(url.clone()),
    (None, None) => Config::load(None)?,
  };

  let _guard = init_logging(&config)?;

  let connectivity = Arc::new(ConnectivityFlag::new(!args.offline));
  let notifier = Arc::new(CliNotifier);
  let memory = MemoryCache::shared();
  let client = if args.ephemeral {
    CachedApiClient::with_store(
      &config,
      Arc::new(MemoryStore::new()),
      memory,
      connectivity,
      notifier,
    )?
  } else {
    CachedApiClient::new(&config, memory, connectivity, notifier)?
  };

  if run(&client, args.command).await? {
    Ok(ExitCode::SUCCESS)
  } else {
    Ok(ExitCode::FAILURE)
  }
}

/// Execute a command. `Ok(false)` means the request failed and was reported.
async fn run(client: &CachedApiClient, command: Command) -> Result<bool> {
  match command {
    Command::Get {
      endpoint,
      key,
      ttl,
      list,
      no_cache,
    } => {
      let mut options = FetchOptions::default();
      if let Some(key) = key {
        options = options.with_key(key);
      }
      if let Some(secs) = ttl {
        let ttl = chrono::Duration::try_seconds(secs)
          .filter(|ttl| *ttl > chrono::Duration::zero())
          .ok_or_else(|| eyre!("--ttl must be a positive number of seconds in range"))?;
        options = options.with_ttl(ttl);
      }
      if no_cache {
        options = options.without_cache();
      }

      let value = if list {
        client
          .get_json_list(&endpoint, options)
          .await
          .map(Value::Array)
      } else {
        client.get_json(&endpoint, options).await
      };

      match value {
        Some(value) => print_json(&value).map(|_| true),
        None => Ok(false),
      }
    }
    Command::Post {
      endpoint,
      data,
      invalidate,
    } => {
      let body = parse_data(&data)?;
      let options = MutateOptions::invalidating(invalidate);
      let outcome = client.post(&endpoint, body, &options, raw_object).await;
      report_write(outcome)
    }
    Command::Put {
      endpoint,
      data,
      invalidate,
    } => {
      let body = parse_data(&data)?;
      let options = MutateOptions::invalidating(invalidate);
      let outcome = client.put(&endpoint, body, &options, raw_object).await;
      report_write(outcome)
    }
    Command::Delete {
      endpoint,
      invalidate,
    } => {
      let options = MutateOptions::invalidating(invalidate);
      Ok(client.delete(&endpoint, &options).await)
    }
    Command::Invalidate { key } => {
      client.invalidate(&key);
      Ok(true)
    }
    Command::Clear => {
      client.invalidate_all();
      Ok(true)
    }
  }
}

fn report_write(outcome: std::result::Result<Option<Value>, FetchError>) -> Result<bool> {
  match outcome {
    Ok(Some(value)) => print_json(&value).map(|_| true),
    Ok(None) => Ok(true),
    // Request failures were already reported by the notifier
    Err(FetchError::Request(_)) => Ok(false),
    Err(e) => {
      eprintln!("error: {}", e);
      Ok(false)
    }
  }
}

fn parse_data(data: &str) -> Result<Value> {
  serde_json::from_str(data).map_err(|e| eyre!("--data is not valid JSON: {}", e))
}

fn print_json(value: &Value) -> Result<()> {
  let text =
    serde_json::to_string_pretty(value).map_err(|e| eyre!("Failed to format output: {}", e))?;
  println!("{}", text);
  Ok(())
}

/// Send logs to a daily file under the data directory.
fn init_logging(config: &Config) -> Result<WorkerGuard> {
  let log_dir = dirs::data_dir()
    .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
    .ok_or_else(|| eyre!("Could not determine data directory"))?
    .join("repocache")
    .join("logs");

  std::fs::create_dir_all(&log_dir)
    .map_err(|e| eyre!("Failed to create log directory: {}", e))?;

  let appender = tracing_appender::rolling::daily(&log_dir, "repocache.log");
  let (writer, guard) = tracing_appender::non_blocking(appender);

  let filter = EnvFilter::try_from_env("REPOCACHE_LOG")
    .unwrap_or_else(|_| EnvFilter::new(&config.log.level));

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(writer)
    .with_ansi(false)
    .init();

  Ok(guard)
}
