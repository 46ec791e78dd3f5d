//! Smoke tests for the pagewright CLI
//!
//! Everything here runs without a browser: catalog listing, configuration
//! resolution, and argument errors that must surface before launch.

#![allow(deprecated)] // Allow deprecated Command::cargo_bin until assert_cmd is updated
#![allow(clippy::expect_used, clippy::unwrap_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Get a command for the pagewright binary with a clean environment
fn pagewright() -> Command {
    let mut cmd = Command::cargo_bin("pagewright").expect("pagewright binary should exist");
    cmd.env_remove("BASE_URL")
        .env_remove("PAGEWRIGHT_HEADLESS")
        .env_remove("CHROMIUM_PATH")
        .env_remove("RUST_LOG");
    cmd
}

// ============================================================================
// Basic CLI Tests
// ============================================================================

#[test]
fn test_version_flag() {
    pagewright()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("0.4.0"));
}

#[test]
fn test_help_flag() {
    pagewright()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("list"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_no_args_fails() {
    pagewright().assert().failure();
}

#[test]
fn test_run_help_mentions_env_fallbacks() {
    pagewright()
        .args(["run", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("BASE_URL"))
        .stdout(predicate::str::contains("PAGEWRIGHT_HEADLESS"))
        .stdout(predicate::str::contains("--json-out"));
}

// ============================================================================
// List
// ============================================================================

#[test]
fn test_list_shows_catalog() {
    pagewright()
        .args(["--color", "never", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("TC001"))
        .stdout(predicate::str::contains("TC028"))
        .stdout(predicate::str::contains("[skip: "));
}

#[test]
fn test_list_by_id() {
    pagewright()
        .args(["--color", "never", "list", "TC013"])
        .assert()
        .success()
        .stdout(predicate::str::contains("TC013"))
        .stdout(predicate::str::contains("TC014").not())
        .stdout(predicate::str::contains("1 scenarios"));
}

#[test]
fn test_list_json() {
    let output = pagewright()
        .args(["list", "--format", "json", "TC017"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let entries: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(entries[0]["id"], "TC017");
    assert!(entries[0]["skip"].is_string());
}

#[test]
fn test_list_unknown_id_fails() {
    pagewright()
        .args(["list", "TC999"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown scenario id TC999"));
}

#[test]
fn test_list_invalid_grep_fails() {
    pagewright()
        .args(["list", "--grep", "("])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid argument"));
}

// ============================================================================
// Config
// ============================================================================

#[test]
fn test_config_defaults() {
    pagewright()
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "https://www.littmann.in/3M/en_IN/littmann-stethoscopes-in/",
        ))
        .stdout(predicate::str::contains("headless: true"));
}

#[test]
fn test_config_env_fallbacks() {
    pagewright()
        .arg("config")
        .env("BASE_URL", "https://staging.example.com/")
        .env("PAGEWRIGHT_HEADLESS", "false")
        .assert()
        .success()
        .stdout(predicate::str::contains("https://staging.example.com/"))
        .stdout(predicate::str::contains("headless: false"));
}

#[test]
fn test_config_file_and_flag_override() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("suite.yaml");
    fs::write(&path, "parallel_jobs: 3\ntimeouts:\n  test_ms: 120000\n").unwrap();
    pagewright()
        .args(["config", "--config"])
        .arg(&path)
        .args(["--jobs", "5"])
        .assert()
        .success()
        .stdout(predicate::str::contains("parallel_jobs: 5"))
        .stdout(predicate::str::contains("test_ms: 120000"));
}

#[test]
fn test_run_with_missing_config_fails_before_launch() {
    pagewright()
        .args(["run", "--config", "/nonexistent/suite.yaml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration error"));
}

#[test]
fn test_run_with_invalid_base_url_fails() {
    pagewright()
        .args(["run", "--base-url", "not a url"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration error"));
}
