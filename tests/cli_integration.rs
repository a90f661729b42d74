//! CLI Integration Tests
//!
//! These tests drive the built `dstore` binary end-to-end, one process per
//! command, the way a shell user would.
//!
//! Run with:
//! ```bash
//! cargo test --test cli_integration
//! ```

use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::tempdir;

/// Path to the built binary
fn dstore_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_dstore"))
}

/// Run dstore and return (stdout, stderr, success)
fn run_dstore(args: &[&str], repo: &Path) -> (String, String, bool) {
    let config = repo.with_extension("config.json");
    let output = Command::new(dstore_binary())
        .arg("-r")
        .arg(repo)
        .arg("--config")
        .arg(&config)
        .args(["-f", "json"])
        .args(args)
        .output()
        .expect("Failed to execute dstore");

    (
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
        output.status.success(),
    )
}

fn run_json(args: &[&str], repo: &Path) -> serde_json::Value {
    let (stdout, stderr, success) = run_dstore(args, repo);
    assert!(success, "dstore {:?} failed: {}", args, stderr);
    serde_json::from_str(&stdout).expect("stdout should be JSON")
}

// ============================================================================
// Init
// ============================================================================

#[test]
fn test_cli_init_creates_repository() {
    let dir = tempdir().unwrap();
    let repo = dir.path().join(".dstore");

    let value = run_json(&["init"], &repo);
    assert_eq!(value["status"], "ok");
    assert!(repo.exists(), "snapshot file should be created");

    let (_, stderr, success) = run_dstore(&["init"], &repo);
    assert!(!success, "second init should fail");
    assert!(stderr.contains("already exists"));
}

#[test]
fn test_cli_default_repo_path() {
    let output = Command::new(dstore_binary())
        .args(["--help"])
        .output()
        .expect("Failed to execute dstore");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("[default: .dstore]"),
        "Default repository path should be .dstore, got: {}",
        stdout
    );
}

// ============================================================================
// Commit and retrieval
// ============================================================================

#[test]
fn test_cli_commit_and_get() {
    let dir = tempdir().unwrap();
    let repo = dir.path().join(".dstore");

    let first = run_json(&["commit", "Initial content of a large file."], &repo);
    assert_eq!(first["kind"], "full");

    let second = run_json(
        &["commit", "Initial content of a large file. Some changes here."],
        &repo,
    );
    assert_eq!(second["kind"], "delta");

    let hash = second["hash"].as_str().unwrap();
    let got = run_json(&["get", hash], &repo);
    assert_eq!(
        got["content"],
        "Initial content of a large file. Some changes here."
    );
    assert_eq!(got["binary"], false);

    let older = run_json(&["get", first["hash"].as_str().unwrap()], &repo);
    assert_eq!(older["content"], "Initial content of a large file.");
}

#[test]
fn test_cli_head_refs() {
    let dir = tempdir().unwrap();
    let repo = dir.path().join(".dstore");

    run_json(&["commit", "one"], &repo);
    run_json(&["commit", "one two"], &repo);
    run_json(&["commit", "one two three"], &repo);

    assert_eq!(run_json(&["get", "HEAD"], &repo)["content"], "one two three");
    assert_eq!(run_json(&["get", "HEAD~2"], &repo)["content"], "one");

    let (_, _, success) = run_dstore(&["get", "HEAD~3"], &repo);
    assert!(!success, "HEAD~3 is past the root");
}

#[test]
fn test_cli_file_roundtrip() {
    let dir = tempdir().unwrap();
    let repo = dir.path().join(".dstore");
    let input = dir.path().join("input.bin");
    let output = dir.path().join("output.bin");

    let data: Vec<u8> = (0..5000u32).map(|i| (i * 31 % 251) as u8).collect();
    std::fs::write(&input, &data).unwrap();

    run_json(&["commit", "placeholder"], &repo);
    let commit = run_json(&["commit", "--file", input.to_str().unwrap()], &repo);
    let hash = commit["hash"].as_str().unwrap();

    run_json(&["get", hash, "-o", output.to_str().unwrap()], &repo);
    assert_eq!(std::fs::read(&output).unwrap(), data);
}

#[test]
fn test_cli_get_unknown_hash() {
    let dir = tempdir().unwrap();
    let repo = dir.path().join(".dstore");
    run_json(&["commit", "something"], &repo);

    let missing = "ab".repeat(32);
    let (_, stderr, success) = run_dstore(&["get", &missing], &repo);
    assert!(!success);
    assert!(stderr.contains("not found"), "stderr: {}", stderr);
}

// ============================================================================
// History and inspection
// ============================================================================

#[test]
fn test_cli_log() {
    let dir = tempdir().unwrap();
    let repo = dir.path().join(".dstore");

    for content in ["alpha", "alpha beta", "alpha beta gamma"] {
        run_json(&["commit", content], &repo);
    }

    let log = run_json(&["log"], &repo);
    assert_eq!(log["count"], 3);
    assert_eq!(log["commits"][0]["kind"], "delta");
    assert_eq!(log["commits"][2]["kind"], "full");
    assert_eq!(log["commits"][0]["parent"], log["commits"][1]["hash"]);

    let limited = run_json(&["log", "--limit", "1"], &repo);
    assert_eq!(limited["count"], 1);
}

#[test]
fn test_cli_no_delta() {
    let dir = tempdir().unwrap();
    let repo = dir.path().join(".dstore");

    run_json(&["commit", "first"], &repo);
    let second = run_json(&["--no-delta", "commit", "second"], &repo);
    assert_eq!(second["kind"], "full");

    let inspect = run_json(&["inspect"], &repo);
    assert_eq!(inspect["kind"], "full");
    assert!(inspect["parent"].is_null());
}

#[test]
fn test_cli_hash_object_and_stats() {
    let dir = tempdir().unwrap();
    let repo = dir.path().join(".dstore");

    let a = run_json(&["hash-object", "loose"], &repo);
    let b = run_json(&["hash-object", "loose"], &repo);
    assert_eq!(a["hash"], b["hash"]);

    let head = run_json(&["head"], &repo);
    assert!(head["head"].is_null(), "hash-object must not move HEAD");

    let stats = run_json(&["stats"], &repo);
    assert_eq!(stats["stats"]["objects"], 1);
    assert_eq!(stats["config"]["chunk_size"], 1024 * 1024);
}

#[test]
fn test_cli_config_file() {
    let dir = tempdir().unwrap();
    let repo = dir.path().join(".dstore");
    std::fs::write(repo.with_extension("config.json"), r#"{"chunk_size": 4}"#).unwrap();

    run_json(&["commit", "aaaabbbbcccc"], &repo);
    run_json(&["commit", "ccccaaaaXXXX"], &repo);

    let inspect = run_json(&["inspect", "HEAD"], &repo);
    assert_eq!(inspect["delta"]["copy_segments"], 2);
    assert_eq!(inspect["delta"]["literal_segments"], 1);
}

#[test]
fn test_cli_without_config_flag() {
    let dir = tempdir().unwrap();
    let repo = dir.path().join(".dstore");
    let home = dir.path().join("home");
    std::fs::create_dir(&home).unwrap();

    // No --config: falls back to the platform location, which holds no file
    let output = Command::new(dstore_binary())
        .env("HOME", &home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .arg("-r")
        .arg(&repo)
        .args(["commit", "no config anywhere"])
        .output()
        .expect("Failed to execute dstore");

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["kind"], "full");
}
