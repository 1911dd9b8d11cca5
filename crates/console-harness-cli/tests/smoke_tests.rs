//! Smoke tests for the console-harness CLI
//!
//! These tests run the built binary; none of them needs a live backend.

#![allow(deprecated)] // Allow deprecated Command::cargo_bin until assert_cmd is updated
#![allow(clippy::expect_used, clippy::unwrap_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Command for the console-harness binary with a clean environment
fn console_harness() -> Command {
    let mut cmd =
        Command::cargo_bin("console-harness").expect("console-harness binary should exist");
    for key in [
        "CONSOLE_UI_URL",
        "CONSOLE_REST_URL",
        "CONSOLE_ADMIN_ORGANIZATION",
        "CONSOLE_ADMIN_USER",
        "CONSOLE_ADMIN_PASSWORD",
        "CONSOLE_WAIT_TIMEOUT_MS",
        "CONSOLE_RESULTS_DIR",
        "RUST_LOG",
    ] {
        cmd.env_remove(key);
    }
    cmd
}

// ============================================================================
// Basic CLI Tests
// ============================================================================

#[test]
fn test_version_flag() {
    console_harness()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("0.3.0"));
}

#[test]
fn test_help_lists_subcommands() {
    console_harness()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("config"))
        .stdout(predicate::str::contains("wait-backend"))
        .stdout(predicate::str::contains("list"))
        .stdout(predicate::str::contains("cleanup"));
}

#[test]
fn test_no_args_fails() {
    console_harness().assert().failure();
}

#[test]
fn test_cleanup_help_mentions_dry_run() {
    console_harness()
        .args(["cleanup", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--dry-run"));
}

// ============================================================================
// Config Command
// ============================================================================

#[test]
fn test_config_masks_password_from_env() {
    console_harness()
        .arg("config")
        .env("CONSOLE_ADMIN_PASSWORD", "hunter2")
        .assert()
        .success()
        .stdout(predicate::str::contains("***"))
        .stdout(predicate::str::contains("hunter2").not());
}

#[test]
fn test_config_json_honors_flags() {
    let dir = TempDir::new().unwrap();
    let output = console_harness()
        .args(["config", "--json", "--rest-url", "http://cp:9000"])
        .arg("--results-dir")
        .arg(dir.path())
        .env("CONSOLE_REST_URL", "http://ignored:1")
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["rest_url"], "http://cp:9000");
    assert_eq!(json["admin_password"], "***");
    assert_eq!(json["admin_user"], "admin");
    assert_eq!(json["results_dir"], dir.path().to_str().unwrap());
}

#[test]
fn test_config_rejects_malformed_timeout() {
    console_harness()
        .arg("config")
        .env("CONSOLE_WAIT_TIMEOUT_MS", "soon")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error:"))
        .stderr(predicate::str::contains("CONSOLE_WAIT_TIMEOUT_MS"));
}

// ============================================================================
// Backend Commands
// ============================================================================

#[test]
fn test_list_rejects_unknown_kind() {
    console_harness()
        .args(["list", "--kind", "tables"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}

#[test]
fn test_wait_backend_fails_on_closed_port() {
    console_harness()
        .args([
            "wait-backend",
            "--attempts",
            "0",
            "--rest-url",
            "http://127.0.0.1:9",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error:"));
}

#[test]
fn test_list_rejects_non_http_rest_url() {
    console_harness()
        .args(["list", "--rest-url", "cp:8081"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("must start with http://"));
}
