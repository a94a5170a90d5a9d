//! CLI end-to-end tests
//!
//! Tests for the reelkeep command-line interface.

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::tempdir;

/// Get a command for the reelkeep binary
#[allow(deprecated)]
fn reelkeep_cmd() -> Command {
    Command::cargo_bin("reelkeep").unwrap()
}

/// Write a config that keeps the database and generated tree in `dir`.
fn write_config(dir: &Path) -> std::path::PathBuf {
    let config_file = dir.join("reelkeep.toml");
    fs::write(
        &config_file,
        format!(
            r#"
[database]
path = "{db}"

[paths]
generated = "{generated}"

[generate]
parallel_tasks = 2
marker_width = 320
"#,
            db = dir.join("test.db").display(),
            generated = dir.join("generated").display(),
        ),
    )
    .unwrap();
    config_file
}

#[test]
fn test_cli_no_args_shows_help() {
    reelkeep_cmd()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_cli_version_command() {
    reelkeep_cmd()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("reelkeep"));
}

#[test]
fn test_cli_check_tools_lists_ffmpeg() {
    reelkeep_cmd()
        .arg("check-tools")
        .assert()
        .success()
        .stdout(predicate::str::contains("ffmpeg"));
}

#[test]
fn test_cli_validate_config_file() {
    let temp = tempdir().unwrap();
    let config_file = write_config(temp.path());

    reelkeep_cmd()
        .arg("validate")
        .arg(&config_file)
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration is valid"))
        .stdout(predicate::str::contains("Marker width: 320"));
}

#[test]
fn test_cli_validate_reports_warnings() {
    let temp = tempdir().unwrap();
    let config_file = temp.path().join("bad.toml");
    fs::write(&config_file, "[generate]\nmarker_width = 0\n").unwrap();

    reelkeep_cmd()
        .arg("validate")
        .arg(&config_file)
        .assert()
        .success()
        .stdout(predicate::str::contains("marker_width"));
}

#[test]
fn test_cli_validate_missing_file_fails() {
    reelkeep_cmd()
        .args(["validate", "/nonexistent/reelkeep.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load config"));
}

#[test]
fn test_cli_generate_dry_run_on_empty_library() {
    let temp = tempdir().unwrap();
    let config_file = write_config(temp.path());

    reelkeep_cmd()
        .arg("--config")
        .arg(&config_file)
        .args(["generate-markers", "--dry-run", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"outstanding\": 0"))
        .stdout(predicate::str::contains("\"tasks\": 0"));

    // Counting neither generates artifacts nor creates the database.
    assert!(!temp.path().join("generated").exists());
    assert!(!temp.path().join("test.db").exists());
}

#[test]
fn test_cli_generate_dry_run_on_existing_database() {
    let temp = tempdir().unwrap();
    let config_file = write_config(temp.path());

    reelkeep_cmd()
        .arg("--config")
        .arg(&config_file)
        .args(["reset-db", "--yes"])
        .assert()
        .success();

    reelkeep_cmd()
        .arg("--config")
        .arg(&config_file)
        .args(["generate-markers", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[DRY RUN] 0 marker artifacts"));
    assert!(!temp.path().join("generated").exists());
}

#[test]
fn test_cli_generate_rejects_scene_and_marker() {
    reelkeep_cmd()
        .args([
            "generate-markers",
            "--scene",
            "6f1c1c7e-0b7e-4a57-9d55-0d3c8f1f2a10",
            "--marker",
            "0d2a4e36-2f6a-4b1c-8d5e-5e8f0e2b7c11",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}

#[test]
fn test_cli_generate_rejects_bad_id() {
    reelkeep_cmd()
        .args(["generate-markers", "--scene", "not-a-uuid"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}

#[test]
fn test_cli_reset_db_requires_confirmation() {
    let temp = tempdir().unwrap();
    let config_file = write_config(temp.path());

    reelkeep_cmd()
        .arg("--config")
        .arg(&config_file)
        .arg("reset-db")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--yes"));

    reelkeep_cmd()
        .arg("--config")
        .arg(&config_file)
        .args(["reset-db", "--yes"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Database reset"));
    assert!(temp.path().join("test.db").exists());
}
