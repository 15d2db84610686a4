//! Smoke tests for the tf CLI.

mod common;

use common::TestEnv;
use predicates::prelude::*;

#[test]
fn test_version_flag() {
    TestEnv::new()
        .tf()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("tf"))
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_help_lists_commands() {
    TestEnv::new()
        .tf()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage:"))
        .stdout(predicate::str::contains("project"))
        .stdout(predicate::str::contains("task"))
        .stdout(predicate::str::contains("dashboard"));
}

#[test]
fn test_not_logged_in_json_error() {
    let env = TestEnv::new();
    env.tf()
        .args(["--api-url", "http://127.0.0.1:9", "whoami"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains(r#""error":"Not logged in"#))
        .stderr(predicate::str::contains(r#""hint":"Run 'tf login'""#));
}

#[test]
fn test_not_logged_in_human_error() {
    let env = TestEnv::new();
    env.tf()
        .args(["-H", "--api-url", "http://127.0.0.1:9", "project", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::starts_with("Error: Not logged in"));
}
