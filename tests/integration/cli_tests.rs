//! Command line tests
//!
//! Run the `lintscan` binary against the fixture projects and check exit
//! codes and output.

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::PathBuf;

fn fixtures_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn lintscan() -> Command {
    Command::cargo_bin("lintscan").expect("binary should be built")
}

fn database() -> String {
    fixtures_path().join("api-versions.json").display().to_string()
}

#[test]
fn test_list_issues() {
    lintscan()
        .arg("--list-issues")
        .assert()
        .success()
        .stdout(predicate::str::contains("WrongConstant"))
        .stdout(predicate::str::contains("RtlHardcoded"))
        .stdout(predicate::str::contains("(disabled by default)"));
}

#[test]
fn test_clean_project_succeeds() {
    lintscan()
        .arg(fixtures_path().join("clean"))
        .args(["--api-database", &database(), "--quiet"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No issues found!"));
}

#[test]
fn test_missing_database_fails_the_run() {
    lintscan()
        .arg(fixtures_path().join("clean"))
        .arg("--quiet")
        .assert()
        .code(1)
        .stdout(predicate::str::contains(
            "analysis incomplete: API version database unavailable",
        ));
}

#[test]
fn test_errors_exit_nonzero() {
    lintscan()
        .arg(fixtures_path().join("project"))
        .args(["--api-database", &database(), "--quiet"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("WrongConstant"))
        .stdout(predicate::str::contains("Value must be ≤ 100 (was 101)"));
}

#[test]
fn test_json_output() {
    let output = lintscan()
        .arg(fixtures_path().join("project"))
        .args(["--api-database", &database(), "--format", "json", "--quiet"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["tool"], "lintscan");
    assert_eq!(value["files"], 4);
    let ids: Vec<&str> = value["findings"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|f| f["id"].as_str())
        .collect();
    assert!(ids.contains(&"NewApi"));
    assert!(ids.contains(&"GradleDynamicVersion"));
}

#[test]
fn test_output_file_and_min_sdk() {
    let dir = tempfile::tempdir().unwrap();
    let report = dir.path().join("report.txt");

    lintscan()
        .arg(fixtures_path().join("project"))
        .args(["--api-database", &database(), "--min-sdk", "26", "--quiet"])
        .arg("--output")
        .arg(&report)
        .assert()
        .code(1);

    let text = std::fs::read_to_string(&report).unwrap();
    assert!(text.contains("Widget.java"));
    assert!(!text.contains("NewApi"));
    // No escape codes in files
    assert!(!text.contains('\u{1b}'));
}

#[test]
fn test_fatal_only_passes() {
    lintscan()
        .arg(fixtures_path().join("project"))
        .args(["--api-database", &database(), "--fatal-only", "--quiet"])
        .assert()
        .success();
}

#[test]
fn test_summary_format() {
    lintscan()
        .arg(fixtures_path().join("project"))
        .args(["--api-database", &database(), "--format", "summary", "--parallel", "false"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("By Category:"))
        .stdout(predicate::str::contains("Bidirectional Text"));
}

#[test]
fn test_bad_config_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("lintscan.ini");
    std::fs::write(&config, "min_sdk = 21\n").unwrap();

    lintscan()
        .arg(fixtures_path().join("clean"))
        .arg("--config")
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("unsupported config format"));
}

#[test]
fn test_missing_path() {
    lintscan()
        .arg("/definitely/not/a/project")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Path does not exist"));
}

#[test]
fn test_completions() {
    lintscan()
        .args(["--completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("lintscan"));
}
