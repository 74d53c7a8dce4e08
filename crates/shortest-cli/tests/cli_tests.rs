//! CLI integration tests

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

fn shortest_cmd(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("shortest").unwrap();
    cmd.current_dir(dir)
        .env("NO_COLOR", "1")
        .env_remove("SHORTEST_HEADLESS")
        .env_remove("SHORTEST_BASE_URL")
        .env_remove("SHORTEST_TIMEOUT_MS")
        .env_remove("GITHUB_TOTP_SECRET")
        .env_remove("RUST_LOG");
    cmd
}

const PASSING: &str = r#"
[[suite]]
name = "Smoke"

[[suite.test]]
name = "echoes the target"

[[suite.test.step]]
description = "print target"
run = "echo $SHORTEST_TARGET_URL"
stdout = "http://localhost:3000"
"#;

const FAILING: &str = r#"
[[suite]]
name = "Broken"
after_all = [{ description = "cleanup", run = "true" }]

[[suite.test]]
name = "fails"

[[suite.test.step]]
description = "exit 1"
run = "exit 1"
"#;

// ============================================================================
// Running tests
// ============================================================================

#[test]
fn test_all_passing_exits_zero() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("smoke.test.toml"), PASSING).unwrap();

    shortest_cmd(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("✓ echoes the target"))
        .stdout(predicate::str::contains("1 passed (1)"));
}

#[test]
fn test_failure_exits_nonzero() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("smoke.test.toml"), PASSING).unwrap();
    fs::write(dir.path().join("broken.test.toml"), FAILING).unwrap();

    shortest_cmd(dir.path())
        .assert()
        .failure()
        .stdout(predicate::str::contains("✗ fails"))
        .stdout(predicate::str::contains("1 failed | 1 passed (2)"));
}

#[test]
fn test_single_file_argument() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("smoke.test.toml"), PASSING).unwrap();
    fs::write(dir.path().join("broken.test.toml"), FAILING).unwrap();

    shortest_cmd(dir.path())
        .arg("smoke.test.toml")
        .assert()
        .success()
        .stdout(predicate::str::contains("broken.test.toml").not());
}

#[test]
fn test_filter_argument() {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("auth")).unwrap();
    fs::write(dir.path().join("auth/smoke.test.toml"), PASSING).unwrap();
    fs::write(dir.path().join("broken.test.toml"), FAILING).unwrap();

    shortest_cmd(dir.path())
        .arg("auth/**")
        .assert()
        .success()
        .stdout(predicate::str::contains("1 passed (1)"));
}

#[test]
fn test_target_flag_overrides_config() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("shortest.toml"),
        "base_url = \"http://localhost:9999\"\n",
    )
    .unwrap();
    fs::write(
        dir.path().join("target.test.toml"),
        PASSING.replace("http://localhost:3000", "https://staging.example.com"),
    )
    .unwrap();

    shortest_cmd(dir.path())
        .args(["--target", "https://staging.example.com", "--headless"])
        .assert()
        .success()
        .stdout(predicate::str::contains("(headless)"));
}

#[test]
fn test_no_tests_found() {
    let dir = TempDir::new().unwrap();

    shortest_cmd(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("No test files found."));
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_missing_file_argument_is_fatal() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("smoke.test.toml"), PASSING).unwrap();

    shortest_cmd(dir.path())
        .arg("typo.test.toml")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Test file not found: typo.test.toml"))
        .stdout(predicate::str::contains("echoes the target").not());
}

#[test]
fn test_malformed_config_is_fatal() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("shortest.toml"), "headless = ").unwrap();
    fs::write(dir.path().join("smoke.test.toml"), PASSING).unwrap();

    shortest_cmd(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid TOML syntax"))
        .stdout(predicate::str::contains("echoes the target").not());
}

#[test]
fn test_malformed_test_file_is_fatal() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("bad.test.toml"), "[[suite]]\nname = ").unwrap();

    shortest_cmd(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("bad.test.toml"));
}

#[test]
fn test_unknown_flag_rejected() {
    let dir = TempDir::new().unwrap();

    shortest_cmd(dir.path())
        .arg("--no-such-flag")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--no-such-flag"));
}

// ============================================================================
// GitHub codes
// ============================================================================

#[test]
fn test_github_code_with_secret() {
    let dir = TempDir::new().unwrap();

    shortest_cmd(dir.path())
        .args(["--github-code", "--secret", "JBSWY3DPEHPK3PXP"])
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"GitHub 2FA code: \d{6}").unwrap())
        .stdout(predicate::str::contains("Expires in"));
}

#[test]
fn test_github_code_secret_from_env() {
    let dir = TempDir::new().unwrap();

    shortest_cmd(dir.path())
        .env("GITHUB_TOTP_SECRET", "JBSWY3DPEHPK3PXP")
        .arg("--github-code")
        .assert()
        .success();
}

#[test]
fn test_github_code_secret_from_dotenv() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join(".env"), "GITHUB_TOTP_SECRET=JBSWY3DPEHPK3PXP\n").unwrap();

    shortest_cmd(dir.path())
        .arg("--github-code")
        .assert()
        .success()
        .stdout(predicate::str::contains("GitHub 2FA code:"));
}

#[test]
fn test_github_code_ignores_malformed_config() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("shortest.toml"), "headless = ").unwrap();

    shortest_cmd(dir.path())
        .args(["--github-code", "--secret", "JBSWY3DPEHPK3PXP"])
        .assert()
        .success()
        .stdout(predicate::str::contains("GitHub 2FA code:"));
}

#[test]
fn test_dotenv_local_sets_target() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join(".env.local"),
        "SHORTEST_BASE_URL=https://local.example.com\n",
    )
    .unwrap();
    fs::write(dir.path().join(".env"), "SHORTEST_BASE_URL=https://shared.example.com\n").unwrap();
    fs::write(
        dir.path().join("smoke.test.toml"),
        PASSING.replace("http://localhost:3000", "https://local.example.com"),
    )
    .unwrap();

    shortest_cmd(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Running tests against https://local.example.com"));
}

#[test]
fn test_github_code_without_secret() {
    let dir = TempDir::new().unwrap();

    shortest_cmd(dir.path())
        .arg("--github-code")
        .assert()
        .failure()
        .stderr(predicate::str::contains("GITHUB_TOTP_SECRET"));
}
