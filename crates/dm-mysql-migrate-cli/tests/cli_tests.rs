//! CLI integration tests for dm-mysql-migrate.
//!
//! These tests verify command-line argument parsing, help output,
//! and exit codes for error conditions reached before any database
//! connection is attempted.

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;

/// Get a command for the dm-mysql-migrate binary with no password env leaking in.
fn cmd() -> Command {
    let mut cmd = Command::cargo_bin("dm-mysql-migrate").unwrap();
    cmd.env_remove("DM_PASS").env_remove("MYSQL_PASS");
    cmd
}

/// Every required connection parameter, pointing at unreachable hosts.
const FULL_PARAMS: &[&str] = &[
    "--dm-user",
    "SYSDBA",
    "--dm-pass",
    "secret",
    "--dm-schema",
    "SALES",
    "--mysql-pass",
    "secret",
    "--mysql-db",
    "sales",
];

// =============================================================================
// Help and Version Tests
// =============================================================================

#[test]
fn test_help_shows_all_commands() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("health-check"));
}

#[test]
fn test_help_lists_connection_flags() {
    let output = cmd().arg("--help").output().unwrap();
    assert!(output.status.success());
    let help = String::from_utf8_lossy(&output.stdout);
    for flag in [
        "--dm-host",
        "--dm-port",
        "--dm-user",
        "--dm-pass",
        "--dm-schema",
        "--dm-extra",
        "--mysql-host",
        "--mysql-port",
        "--mysql-user",
        "--mysql-pass",
        "--mysql-db",
        "--mysql-extra",
        "--mysql-ver",
        "--workers",
        "--batch",
        "--tables-config",
    ] {
        assert!(help.contains(flag), "help is missing {flag}");
    }
}

#[test]
fn test_version_flag() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("dm-mysql-migrate"));
}

// =============================================================================
// Global Flags Tests
// =============================================================================

#[test]
fn test_log_flag_defaults() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--log-format"))
        .stdout(predicate::str::contains("[default: text]"))
        .stdout(predicate::str::contains("--verbosity"))
        .stdout(predicate::str::contains("[default: info]"));
}

#[test]
fn test_tuning_defaults_documented() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("[default: 4]"))
        .stdout(predicate::str::contains("[default: 2000]"))
        .stdout(predicate::str::contains("./config/tables.json"));
}

#[test]
fn test_password_env_vars_documented() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("DM_PASS"))
        .stdout(predicate::str::contains("MYSQL_PASS"));
}

#[test]
fn test_health_check_command_exists() {
    cmd()
        .args(["health-check", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Test database connections"));
}

// =============================================================================
// Exit Code Tests
// =============================================================================

#[test]
fn test_missing_dm_params_exits_with_code_1() {
    cmd()
        .assert()
        .code(1)
        .stderr(predicate::str::contains("DM parameters missing"))
        .stderr(predicate::str::contains("source.user"));
}

#[test]
fn test_missing_mysql_params_exits_with_code_1() {
    cmd()
        .args(["--dm-user", "SYSDBA", "--dm-pass", "secret", "--dm-schema", "SALES"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("MySQL parameters missing"))
        .stderr(predicate::str::contains("target.database"));
}

#[test]
fn test_password_from_env() {
    cmd()
        .env("DM_PASS", "secret")
        .args(["--dm-user", "SYSDBA", "--dm-schema", "SALES"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("MySQL parameters missing"));
}

#[test]
fn test_missing_table_list_exits_with_code_1() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("tables.json");
    cmd()
        .args(FULL_PARAMS)
        .args(["--tables-config", missing.to_str().unwrap(), "run"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Failed to load table list"));
}

#[test]
fn test_malformed_table_list_exits_with_code_1() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "{{\"tables\": \"not a list\"}}").unwrap();
    cmd()
        .args(FULL_PARAMS)
        .args(["--tables-config", file.path().to_str().unwrap()])
        .assert()
        .code(1);
}

#[test]
fn test_invalid_mysql_version_exits_with_code_1() {
    cmd()
        .args(FULL_PARAMS)
        .args(["--mysql-ver", "4"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("unsupported MySQL major version"));
}

#[test]
fn test_missing_config_exits_with_code_7() {
    cmd()
        .args(["--config", "nonexistent_config_file.yaml", "health-check"])
        .assert()
        .code(7);
}

#[test]
fn test_invalid_yaml_exits_with_code_1() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "source: [this is: not valid").unwrap();
    cmd()
        .args(["--config", file.path().to_str().unwrap(), "health-check"])
        .assert()
        .code(1);
}

#[test]
fn test_flags_complete_partial_yaml() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        "source:\n  user: SYSDBA\n  schema: SALES\ntarget:\n  database: sales\n"
    )
    .unwrap();
    // Passwords come from flags; the run then stops at the missing table list.
    cmd()
        .args(["--config", file.path().to_str().unwrap()])
        .args(["--dm-pass", "x", "--mysql-pass", "y"])
        .args(["--tables-config", "/nonexistent/tables.json"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Failed to load table list"));
}
