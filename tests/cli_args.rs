//! Integration tests for CLI argument handling
//!
//! Runs the royale binary without ever reaching the real API.

use std::process::Command;
use tempfile::TempDir;

/// Helper to run the CLI with given args and capture output
fn run_cli(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_royale"))
        .args(args)
        .env_remove("ROYALE_API_TOKEN")
        .env_remove("ROYALE_API_BASE_URL")
        .output()
        .expect("Failed to execute royale")
}

#[test]
fn test_help_flag_exits_successfully() {
    let output = run_cli(&["--help"]);
    assert!(output.status.success(), "Expected --help to exit successfully");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("royale"), "Help should mention royale");
    assert!(stdout.contains("player"), "Help should list the player command");
    assert!(stdout.contains("--no-cache"), "Help should mention --no-cache");
    assert!(stdout.contains("--force"), "Help should mention --force");
}

#[test]
fn test_missing_token_prints_error_and_exits() {
    let output = run_cli(&["--no-cache", "player", "#2PP"]);
    assert!(!output.status.success(), "Expected missing token to fail");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("Missing API token"),
        "Should explain the missing token: {}",
        stderr
    );
}

#[test]
fn test_invalid_tag_fails_before_any_request() {
    let output = run_cli(&[
        "--token",
        "t",
        "--no-cache",
        "--base-url",
        "http://127.0.0.1:9/v1",
        "player",
        "#bad!",
    ]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Invalid tag"), "Unexpected stderr: {}", stderr);
}

#[test]
fn test_search_without_filters_is_rejected() {
    let output = run_cli(&["--token", "t", "--no-cache", "search-clans", "--limit", "2"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("at least one"), "Unexpected stderr: {}", stderr);
}

#[test]
fn test_clear_cache_creates_and_empties_database() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let db_path = temp_dir.path().join("cache.db");
    let db_arg = db_path.to_string_lossy().to_string();

    let output = run_cli(&["--cache-path", &db_arg, "clear-cache"]);
    assert!(
        output.status.success(),
        "clear-cache should not need a token: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(db_path.exists(), "Cache database should exist");
}

#[test]
fn test_negative_ttl_is_rejected() {
    let output = run_cli(&["--token", "t", "--ttl-minutes", "-5", "clan", "#2PP"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("ttl-minutes"), "Unexpected stderr: {}", stderr);
}

#[test]
fn test_huge_ttl_is_reported_not_panicking() {
    let output = run_cli(&[
        "--token",
        "t",
        "--ttl-minutes",
        "9223372036854775807",
        "clan",
        "#2PP",
    ]);
    assert_eq!(output.status.code(), Some(1), "Expected a clean error exit");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Invalid --ttl-minutes"), "Unexpected stderr: {}", stderr);
    assert!(!stderr.contains("panicked"), "Unexpected panic: {}", stderr);
}
