//! Integration tests for the command-line interface
//!
//! Every run gets private XDG directories so no user config or cache leaks in.

use std::process::{Command, Output};
use tempfile::TempDir;

/// Helper to run the CLI with given args and capture output
fn run_cli(args: &[&str]) -> (Output, TempDir) {
  let home = TempDir::new().expect("Failed to create temp directory");
  let output = run_cli_in(&home, args);
  (output, home)
}

fn run_cli_in(home: &TempDir, args: &[&str]) -> Output {
  Command::new(env!("CARGO_BIN_EXE_repocache"))
    .args(args)
    .env("HOME", home.path())
    .env("XDG_DATA_HOME", home.path().join("data"))
    .env("XDG_CONFIG_HOME", home.path().join("config"))
    .env_remove("REPOCACHE_LOG")
    .output()
    .expect("Failed to execute repocache")
}

#[test]
fn test_help_lists_subcommands() {
  let (output, _home) = run_cli(&["--help"]);
  assert!(output.status.success(), "Expected --help to exit successfully");
  let stdout = String::from_utf8_lossy(&output.stdout);
  for sub in ["get", "post", "delete", "invalidate", "clear"] {
    assert!(stdout.contains(sub), "Help should mention {}", sub);
  }
}

#[test]
fn test_offline_get_without_cache_fails() {
  let (output, _home) = run_cli(&[
    "--ephemeral",
    "--offline",
    "--base-url",
    "http://127.0.0.1:9",
    "get",
    "/users",
  ]);
  assert!(!output.status.success());
  assert!(output.stdout.is_empty());
  let stderr = String::from_utf8_lossy(&output.stderr);
  assert!(
    stderr.contains("network error"),
    "Should report a network error: {}",
    stderr
  );
}

#[test]
fn test_missing_config_without_base_url_fails() {
  let (output, _home) = run_cli(&["get", "/users"]);
  assert!(!output.status.success());
  let stderr = String::from_utf8_lossy(&output.stderr);
  assert!(stderr.contains("No configuration file found"), "{}", stderr);
}

#[test]
fn test_invalid_post_body_is_rejected() {
  let (output, _home) = run_cli(&[
    "--ephemeral",
    "--base-url",
    "http://127.0.0.1:9",
    "post",
    "/users",
    "--data",
    "{not json",
  ]);
  assert!(!output.status.success());
  let stderr = String::from_utf8_lossy(&output.stderr);
  assert!(stderr.contains("not valid JSON"), "{}", stderr);
}

#[test]
fn test_invalidate_and_clear_succeed_on_empty_cache() {
  let (output, _home) = run_cli(&[
    "--ephemeral",
    "--base-url",
    "http://127.0.0.1:9",
    "invalidate",
    "users",
  ]);
  assert!(output.status.success());

  let (output, _home) = run_cli(&["--base-url", "http://127.0.0.1:9", "clear"]);
  assert!(output.status.success());
}

#[test]
fn test_out_of_range_ttl_is_rejected() {
  let (output, _home) = run_cli(&[
    "--ephemeral",
    "--base-url",
    "http://127.0.0.1:9",
    "get",
    "/users",
    "--ttl",
    "9223372036854775807",
  ]);
  assert!(!output.status.success());
  let stderr = String::from_utf8_lossy(&output.stderr);
  assert!(stderr.contains("--ttl"), "{}", stderr);
}

#[test]
fn test_cache_only_config_with_base_url_flag() {
  let home = TempDir::new().expect("Failed to create temp directory");
  let config = home.path().join("cache-only.yaml");
  std::fs::write(&config, "cache:\n  ttl_secs: 60\n").expect("Failed to write config");
  let config = config.to_string_lossy().into_owned();

  let output = run_cli_in(
    &home,
    &["--ephemeral", "--config", &config, "invalidate", "users"],
  );
  assert!(!output.status.success());
  let stderr = String::from_utf8_lossy(&output.stderr);
  assert!(stderr.contains("No API base URL configured"), "{}", stderr);

  let output = run_cli_in(
    &home,
    &[
      "--ephemeral",
      "--config",
      &config,
      "--base-url",
      "http://127.0.0.1:9",
      "invalidate",
      "users",
    ],
  );
  assert!(output.status.success());
}
