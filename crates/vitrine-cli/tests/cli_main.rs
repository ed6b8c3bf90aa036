//! Basic CLI tests for the vitrine command-line interface.

use assert_cmd::Command;
use predicates::prelude::*;

/// A command isolated from any config file in the working directory.
fn vitrine(dir: &tempfile::TempDir) -> Command {
    let mut cmd = Command::cargo_bin("vitrine").unwrap();
    cmd.current_dir(dir.path())
        .env_remove("VITRINE_CONFIG")
        .env_remove("VITRINE_JWT_SECRET")
        .env_remove("JWT_SECRET");
    cmd
}

#[test]
fn test_cli_help() {
    let dir = tempfile::tempdir().unwrap();
    vitrine(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("check-config"))
        .stdout(predicate::str::contains("token"));
}

#[test]
fn test_cli_version() {
    let dir = tempfile::tempdir().unwrap();
    vitrine(&dir)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("vitrine"));
}

#[test]
fn test_check_config_reads_file_and_masks_secret() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("vitrine.toml"),
        "port = 4100\njwt_secret = \"hunter2\"\n\n[escalation]\nFINANCIAL = 60000\n",
    )
    .unwrap();

    vitrine(&dir)
        .arg("check-config")
        .assert()
        .success()
        .stdout(predicate::str::contains("4100"))
        .stdout(predicate::str::contains("FINANCIAL"))
        .stdout(predicate::str::contains("hunter2").not());
}

#[test]
fn test_check_config_rejects_bad_values() {
    let dir = tempfile::tempdir().unwrap();
    vitrine(&dir)
        .arg("check-config")
        .env("VITRINE_WS_MODE", "sideways")
        .assert()
        .failure()
        .stderr(predicate::str::contains("VITRINE_WS_MODE"));
}

#[test]
fn test_token_requires_secret() {
    let dir = tempfile::tempdir().unwrap();
    vitrine(&dir)
        .args(["token", "u1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("VITRINE_JWT_SECRET"));

    vitrine(&dir)
        .args(["token", "u1", "--role", "admin"])
        .env("VITRINE_JWT_SECRET", "s3cret")
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"^[\w-]+\.[\w-]+\.[\w-]+\n$").unwrap());
}
