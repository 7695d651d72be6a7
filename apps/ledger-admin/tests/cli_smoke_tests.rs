#![allow(clippy::unwrap_used, clippy::expect_used)]

//! CLI smoke tests for the ledger-admin binary
//!
//! Each test runs the real binary against a throwaway `SQLite` file.

use std::path::Path;
use std::process::{Command, Output, Stdio};

use serde_json::Value;
use tempfile::TempDir;

/// Helper to run the ledger-admin binary with given arguments
fn run_ledger_admin(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_ledger-admin"))
        .args(args)
        .env_remove("RUST_LOG")
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .expect("Failed to execute ledger-admin")
}

fn dsn_in(dir: &Path) -> String {
    format!("sqlite://{}?mode=rwc", dir.join("ledger.db").display())
}

/// Run a data command against `dsn` and parse its JSON output.
fn run_json(dsn: &str, args: &[&str]) -> Value {
    let mut full = vec!["--dsn", dsn];
    full.extend_from_slice(args);
    let output = run_ledger_admin(&full);
    assert!(
        output.status.success(),
        "{args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("stdout should be JSON")
}

#[test]
fn test_cli_help_command() {
    let output = run_ledger_admin(&["--help"]);

    assert!(output.status.success(), "Help command should succeed");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Usage:"), "Should contain usage information");
    for subcommand in ["migrate", "check", "users", "links", "rewards", "settings", "admins"] {
        assert!(stdout.contains(subcommand), "Should list '{subcommand}'");
    }
    assert!(stdout.contains("--config"), "Should mention config option");
}

#[test]
fn test_cli_invalid_command() {
    let output = run_ledger_admin(&["invalid-command"]);

    assert!(!output.status.success(), "Invalid command should fail");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("error"), "Should report an error: {stderr}");
}

#[test]
fn test_cli_config_validation_missing_file() {
    let output = run_ledger_admin(&["--config", "/nonexistent/ledger.yaml", "check"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("does not exist"), "{stderr}");
}

#[test]
fn test_cli_config_rejects_invalid_module_settings() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("ledger.yaml");
    std::fs::write(&config_path, "referral_ledger:\n  max_write_retries: 0\n").unwrap();

    let output = run_ledger_admin(&["--config", config_path.to_str().unwrap(), "check"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("referral_ledger"), "{stderr}");
}

#[test]
fn test_cli_print_config_reflects_overrides() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("ledger.yaml");
    std::fs::write(
        &config_path,
        "referral_ledger:\n  code_length: 12\n  default_link_policy: exclusive\n",
    )
    .unwrap();

    let output = run_ledger_admin(&[
        "--config",
        config_path.to_str().unwrap(),
        "--dsn",
        "sqlite::memory:",
        "--print-config",
    ]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("sqlite::memory:"), "{stdout}");
    assert!(stdout.contains("code_length: 12"), "{stdout}");
    assert!(stdout.contains("exclusive"), "{stdout}");
}

#[test]
fn test_cli_migrate_is_repeatable() {
    let temp_dir = TempDir::new().unwrap();
    let dsn = dsn_in(temp_dir.path());

    for _ in 0..2 {
        let output = run_ledger_admin(&["--dsn", &dsn, "migrate"]);
        assert!(
            output.status.success(),
            "{}",
            String::from_utf8_lossy(&output.stderr)
        );
        assert!(String::from_utf8_lossy(&output.stdout).contains("Migrations applied"));
    }
}

#[test]
fn test_cli_referral_and_reward_flow() {
    let temp_dir = TempDir::new().unwrap();
    let dsn = dsn_in(temp_dir.path());

    let alice = run_json(&dsn, &["users", "create", "--telegram-id", "100", "--username", "alice"]);
    let code = alice["referral_code"].as_str().unwrap().to_owned();

    let bob = run_json(
        &dsn,
        &["users", "create", "--telegram-id", "200", "--referral-code", &code],
    );
    assert_eq!(bob["referred_by"], alice["id"]);

    let referrals = run_json(&dsn, &["users", "referrals", "--telegram-id", "100"]);
    assert_eq!(referrals.as_array().unwrap().len(), 1);

    run_json(&dsn, &["rewards", "credit", "--telegram-id", "100", "--amount", "7.25"]);
    let balance = run_json(&dsn, &["rewards", "settle", "--telegram-id", "100", "--amount", "5"]);
    assert_eq!(balance["total_paid"], "5");
    assert_eq!(balance["total_unpaid"], "2.25");

    let entries = run_json(&dsn, &["rewards", "entries", "--telegram-id", "100"]);
    assert_eq!(entries[0]["kind"], "settle");
    assert_eq!(entries[1]["kind"], "credit");
}

#[test]
fn test_cli_settle_beyond_unpaid_fails() {
    let temp_dir = TempDir::new().unwrap();
    let dsn = dsn_in(temp_dir.path());
    run_json(&dsn, &["users", "create", "--telegram-id", "100"]);

    let output = run_ledger_admin(&[
        "--dsn", &dsn, "rewards", "settle", "--telegram-id", "100", "--amount", "1",
    ]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Insufficient unpaid balance"), "{stderr}");
}

#[test]
fn test_cli_invite_links_and_settings_audit() {
    let temp_dir = TempDir::new().unwrap();
    let dsn = dsn_in(temp_dir.path());
    run_json(&dsn, &["users", "create", "--telegram-id", "100"]);

    let link = run_json(&dsn, &["links", "issue", "--telegram-id", "100"]);
    let invite = link["invite_code"].as_str().unwrap().to_owned();
    let invited = run_json(
        &dsn,
        &["users", "create", "--telegram-id", "300", "--invite-code", &invite],
    );
    assert!(invited["referred_by"].is_string());

    let root = run_json(&dsn, &["admins", "bootstrap", "--telegram-id", "1"]);
    let root_id = root["id"].as_str().unwrap().to_owned();
    assert_eq!(root["role"], "super_admin");

    run_json(
        &dsn,
        &[
            "settings", "put", "rewards", "--value", r#"{"rate":"0.1"}"#, "--admin", &root_id,
        ],
    );
    let value = run_json(&dsn, &["settings", "get", "rewards"]);
    assert_eq!(value["rate"], "0.1");

    let audit = run_json(&dsn, &["settings", "audit", "--namespace", "rewards"]);
    assert_eq!(audit[0]["admin_id"], root["id"]);
    assert!(audit[0]["old_value"].is_null());
}
