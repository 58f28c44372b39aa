//! Smoke tests for the vigil CLI
//!
//! These never launch a browser: they cover argument handling, suite
//! listing and configuration layering.

#![allow(deprecated)] // Allow deprecated Command::cargo_bin until assert_cmd is updated
#![allow(clippy::expect_used, clippy::unwrap_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Get a command for the vigil binary with no inherited VIGIL_* settings
fn vigil() -> Command {
    let mut cmd = Command::cargo_bin("vigil").expect("vigil binary should exist");
    for var in [
        "VIGIL_CONFIG",
        "VIGIL_BASE_URL",
        "VIGIL_HEADED",
        "VIGIL_WINDOW_SIZE",
        "VIGIL_TIMEOUT_MS",
        "VIGIL_POLL_INTERVAL_MS",
        "VIGIL_CASE_TIMEOUT_MS",
        "VIGIL_SUITE_TIMEOUT_MS",
        "VIGIL_CHROMIUM_PATH",
        "VIGIL_LOG_FORMAT",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

// ============================================================================
// Basic CLI Tests
// ============================================================================

#[test]
fn test_version_flag() {
    vigil()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("0.3.0"));
}

#[test]
fn test_help_flag() {
    vigil()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("list"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_no_args_shows_help() {
    vigil().assert().failure();
}

#[test]
fn test_run_subcommand_help() {
    vigil()
        .args(["run", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--base-url"))
        .stdout(predicate::str::contains("--format"))
        .stdout(predicate::str::contains("--intent"));
}

// ============================================================================
// Listing
// ============================================================================

#[test]
fn test_list_shows_all_cases_in_order() {
    let output = vigil().arg("list").assert().success().get_output().stdout.clone();
    let text = String::from_utf8(output).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 15);
    assert!(lines[0].contains("1. [positive] Homepage loads successfully"));
    assert!(lines[14].contains("15. [negative] JavaScript errors detection"));
}

#[test]
fn test_list_filters_by_intent() {
    let output = vigil()
        .args(["list", "--intent", "negative"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let text = String::from_utf8(output).unwrap();
    assert_eq!(text.lines().count(), 6);
    assert!(text.lines().all(|l| l.contains("[negative]")));
}

#[test]
fn test_list_filters_by_name() {
    vigil()
        .args(["list", "--filter", "FORM"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Form elements accessibility"))
        .stdout(predicate::str::contains("Form validation"))
        .stdout(predicate::str::contains("Homepage").not());
}

// ============================================================================
// Configuration
// ============================================================================

#[test]
fn test_config_defaults() {
    let dir = TempDir::new().unwrap();
    vigil()
        .arg("config")
        .current_dir(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("base_url: http://localhost:8090"))
        .stdout(predicate::str::contains("default_timeout_ms: 10000"));
}

#[test]
fn test_config_reads_working_directory_file() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("vigil.yaml"),
        "base_url: http://gallery.internal:3000\n",
    )
    .unwrap();
    vigil()
        .arg("config")
        .current_dir(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("http://gallery.internal:3000"));
}

#[test]
fn test_env_overrides_file() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("vigil.yaml"), "base_url: http://a.test\n").unwrap();
    vigil()
        .arg("config")
        .current_dir(dir.path())
        .env("VIGIL_BASE_URL", "http://b.test")
        .assert()
        .success()
        .stdout(predicate::str::contains("http://b.test"));
}

#[test]
fn test_invalid_config_exits_with_usage_status() {
    let dir = TempDir::new().unwrap();
    vigil()
        .args(["config", "--base-url", "localhost"])
        .current_dir(dir.path())
        .assert()
        .code(2)
        .stderr(predicate::str::contains("base_url"));
}

#[test]
fn test_unknown_yaml_field_rejected() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("vigil.yaml"), "headles: true\n").unwrap();
    vigil()
        .arg("config")
        .current_dir(dir.path())
        .assert()
        .code(2)
        .stderr(predicate::str::contains("vigil.yaml"));
}

#[test]
fn test_run_rejects_bad_window_size_before_launch() {
    let dir = TempDir::new().unwrap();
    vigil()
        .args(["run", "--window-size", "huge"])
        .current_dir(dir.path())
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--window-size"));
}

#[test]
fn test_run_with_no_matching_cases() {
    let dir = TempDir::new().unwrap();
    vigil()
        .args(["run", "--filter", "no such case"])
        .current_dir(dir.path())
        .assert()
        .code(2)
        .stderr(predicate::str::contains("no cases match"));
}
