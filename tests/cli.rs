//! End-to-end tests for the execstream binary

mod common;

use assert_cmd::Command;
use predicates::prelude::*;

use common::{create_listing_dir, fixture};

fn execstream() -> Command {
    let mut cmd = Command::cargo_bin("execstream").expect("binary not built");
    cmd.env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_stream_copies_output() {
    let (_dir, path) = create_listing_dir(&["exec.go", "exec_test.go"]);

    execstream()
        .args(["stream", "--", "ls"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("exec.go").and(predicate::str::contains("exec_test.go")));
}

#[test]
fn test_stream_reports_missing_program() {
    execstream()
        .args(["stream", "--", "command_no_found", "abc"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("command_no_found"));
}

#[test]
fn test_stream_timeout() {
    execstream()
        .args(["stream", "--timeout", "1", "--", "bash"])
        .arg(fixture("infinite.sh"))
        .timeout(std::time::Duration::from_secs(10))
        .assert()
        .failure()
        .stdout(predicate::str::contains("tick"))
        .stderr(predicate::str::contains("deadline exceeded"));
}

#[test]
fn test_capture_text_passes_exit_code_through() {
    execstream()
        .args(["capture", "--", "/bin/bash"])
        .arg(fixture("return-err.sh"))
        .assert()
        .code(10)
        .stdout("about to fail\n")
        .stderr(predicate::str::contains("failing"));
}

#[test]
fn test_capture_json() {
    let output = execstream()
        .args(["capture", "--format", "json", "--", "sh", "-c", "echo hi; exit 3"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["stdout"], "hi\n");
    assert_eq!(json["stderr"], "");
    assert_eq!(json["exit_code"], 3);
}

#[test]
fn test_capture_json_error_report() {
    let output = execstream()
        .args(["capture", "--format", "json", "--", "ec", "hello"])
        .output()
        .unwrap();

    assert!(!output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["error"]["error_type"], "spawn_failed");
    assert!(json["error"]["message"].as_str().unwrap().contains("ec hello"));
}

#[test]
fn test_config_file_sets_default_timeout() {
    let dir = tempfile::TempDir::new().unwrap();
    let config = dir.path().join("config.toml");
    std::fs::write(&config, "[defaults]\ntimeout = 1\n").unwrap();

    execstream()
        .arg("--config")
        .arg(&config)
        .args(["capture", "--", "sleep", "10"])
        .timeout(std::time::Duration::from_secs(10))
        .assert()
        .failure()
        .stderr(predicate::str::contains("deadline exceeded"));
}
