//! Binary-level tests for the `medchat` CLI

mod common;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;
use wiremock::MockServer;

use common::{mount_stream, temp_config_file, TEST_KEY, TEST_MODEL, TINY_PNG};

/// Command isolated from the caller's environment, with no config file
fn medchat(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("medchat").unwrap();
    cmd.current_dir(dir.path())
        .arg("--config")
        .arg(dir.path().join("missing.yaml"))
        .env_remove("MEDCHAT_API_KEY")
        .env_remove("GEMINI_API_KEY")
        .env_remove("API_KEY")
        .env_remove("MEDCHAT_PROVIDER")
        .env_remove("MEDCHAT_GEMINI_MODEL")
        .env_remove("MEDCHAT_GEMINI_API_BASE")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_help_lists_commands() {
    let mut cmd = Command::cargo_bin("medchat").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("chat"))
        .stdout(predicate::str::contains("ask"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_ask_streams_answer_to_stdout() {
    let server = MockServer::start().await;
    mount_stream(&server, &["Fever ", "is ", "elevated body temperature."], 1).await;
    let dir = TempDir::new().unwrap();

    medchat(&dir)
        .env("MEDCHAT_GEMINI_API_BASE", server.uri())
        .env("MEDCHAT_GEMINI_MODEL", TEST_MODEL)
        .env("MEDCHAT_API_KEY", TEST_KEY)
        .args(["ask", "--prompt", "What is fever?"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Fever is elevated body temperature."))
        .stdout(predicate::str::contains("▌").not());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_ask_json_with_attachment() {
    let server = MockServer::start().await;
    mount_stream(&server, &["One pixel."], 1).await;
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("pixel.png"), TINY_PNG).unwrap();

    let output = medchat(&dir)
        .env("MEDCHAT_GEMINI_API_BASE", server.uri())
        .env("MEDCHAT_API_KEY", TEST_KEY)
        .args(["ask", "--model", TEST_MODEL, "--attach", "pixel.png", "--json"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["outcome"]["state"], "completed");
    assert_eq!(report["outcome"]["text"], "One pixel.");
    let parts = report["messages"][0]["parts"].as_array().unwrap();
    assert_eq!(parts.len(), 2);
    assert_eq!(parts[1]["mime_type"], "image/png");
}

#[test]
fn test_ask_without_key_fails_visibly() {
    let dir = TempDir::new().unwrap();

    medchat(&dir)
        .env("MEDCHAT_GEMINI_API_BASE", "http://127.0.0.1:9")
        .args(["ask", "--prompt", "hello"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("Sorry, I encountered an error."))
        .stdout(predicate::str::contains("Missing credentials"));
}

#[test]
fn test_ask_missing_attachment_is_reported() {
    let dir = TempDir::new().unwrap();

    medchat(&dir)
        .env("MEDCHAT_API_KEY", TEST_KEY)
        .args(["ask", "--prompt", "read this", "--attach", "nope.pdf"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("File read error"));
}

#[test]
fn test_invalid_config_is_rejected() {
    let (_dir, config_path) = temp_config_file("provider:\n  type: carrier-pigeon\n");

    let mut cmd = Command::cargo_bin("medchat").unwrap();
    cmd.arg("--config")
        .arg(&config_path)
        .env_remove("MEDCHAT_PROVIDER")
        .args(["ask", "--prompt", "hello"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("carrier-pigeon"));
}
