//! End-to-end smoke test that invokes the `reel` binary.
//!
//! Uses `assert_cmd` to exercise the CLI commands that need no browser,
//! with REEL_RECORDINGS_DIR pointed at a temp directory for isolation.
//!
//! The `reel` binary must be built before running these tests:
//!   cargo build -p reel-server && cargo test --test test_smoke

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Once;

static BUILD_ONCE: Once = Once::new();

const SESSION: &str = "550e8400-e29b-41d4-a716-446655440000";

/// Ensure the reel binary is built, then return its path.
fn reel_bin() -> PathBuf {
    let workspace_root = PathBuf::from(env!("CARGO_MANIFEST_DIR"));

    BUILD_ONCE.call_once(|| {
        let status = std::process::Command::new("cargo")
            .args(["build", "-p", "reel-server"])
            .current_dir(&workspace_root)
            .status()
            .expect("failed to invoke cargo build");
        assert!(status.success(), "cargo build -p reel-server failed");
    });

    let bin = workspace_root.join("target").join("debug").join("reel");
    assert!(bin.exists(), "reel binary not found at {}", bin.display());
    bin
}

/// Get a Command for the `reel` binary isolated to a recordings dir.
fn reel_cmd(recordings_dir: &Path) -> Command {
    let mut cmd = Command::new(reel_bin());
    cmd.current_dir(recordings_dir);
    cmd.env("REEL_RECORDINGS_DIR", recordings_dir);
    cmd
}

/// Plant a well-formed recording file in `dir`.
fn write_recording(dir: &Path, session_id: &str) -> PathBuf {
    let doc = serde_json::json!({
        "session_id": session_id,
        "url": "https://example.com/",
        "start_time": "2026-08-20T10:00:00Z",
        "end_time": "2026-08-20T10:05:00Z",
        "events": [
            {
                "type": "click",
                "timestamp": "2026-08-20T10:00:01Z",
                "data": { "tagName": "BUTTON" },
            },
            {
                "type": "console_log",
                "timestamp": "2026-08-20T10:00:02Z",
                "data": { "level": "log", "args": ["hi"], "location": { "url": "", "lineNumber": 0 } },
            },
        ],
        "metadata": { "saved_at": "2026-08-20T10:05:00Z", "event_count": 2 },
    });
    let path = dir.join(format!("{session_id}_20260820_100500.json"));
    fs::write(&path, serde_json::to_vec_pretty(&doc).expect("serialize recording"))
        .expect("write recording file");
    path
}

#[test]
fn smoke_test_help_lists_subcommands() {
    let tmpdir = tempfile::tempdir().expect("temp dir");

    reel_cmd(tmpdir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("serve")
                .and(predicate::str::contains("record"))
                .and(predicate::str::contains("list"))
                .and(predicate::str::contains("delete")),
        );
}

#[test]
fn smoke_test_list_empty_directory() {
    let tmpdir = tempfile::tempdir().expect("temp dir");

    reel_cmd(tmpdir.path())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("No recordings"));
}

#[test]
fn smoke_test_list_shows_persisted_recordings() {
    let tmpdir = tempfile::tempdir().expect("temp dir");
    write_recording(tmpdir.path(), SESSION);

    reel_cmd(tmpdir.path())
        .arg("list")
        .assert()
        .success()
        .stdout(
            predicate::str::contains(SESSION)
                .and(predicate::str::contains("2 events"))
                .and(predicate::str::contains("https://example.com/")),
        );
}

#[test]
fn smoke_test_delete_removes_recording() {
    let tmpdir = tempfile::tempdir().expect("temp dir");
    let path = write_recording(tmpdir.path(), SESSION);

    reel_cmd(tmpdir.path())
        .args(["delete", SESSION])
        .assert()
        .success()
        .stdout(predicate::str::contains("Deleted recording"));
    assert!(!path.exists(), "delete should remove the recording file");

    // A second delete finds nothing.
    reel_cmd(tmpdir.path())
        .args(["delete", SESSION])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn smoke_test_delete_rejects_malformed_id() {
    let tmpdir = tempfile::tempdir().expect("temp dir");
    write_recording(tmpdir.path(), SESSION);

    reel_cmd(tmpdir.path())
        .args(["delete", "../../etc/passwd"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid session id"));

    // The traversal attempt must not have touched the real recording.
    reel_cmd(tmpdir.path())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains(SESSION));
}
