//! Integration tests for the `daqemon` CLI binary.
//!
//! Argument parsing, help output, completions and configuration commands
//! run without any server; the sync tests run against a mocked metering
//! server and a temporary local configuration.
#![allow(clippy::unwrap_used)]

use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `daqemon` binary with env isolation.
///
/// Clears all `DAQEMON_*` env vars and points config directories at
/// `home` so tests never touch the user's real configuration.
fn daqemon_cmd(home: &Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("daqemon");
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env_remove("RUST_LOG")
        .env_remove("DAQEMON_SERVER")
        .env_remove("DAQEMON_API_KEY")
        .env_remove("DAQEMON_RPC_URL")
        .env_remove("DAQEMON_CONFIG_FILE")
        .env_remove("DAQEMON_OUTPUT")
        .env_remove("DAQEMON_INSECURE")
        .env_remove("DAQEMON_TIMEOUT");
    cmd
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

/// One power channel `p1` under node `emontx`.
fn write_local_config(dir: &Path) -> std::path::PathBuf {
    let file = dir.join("daqemon.json");
    let doc = json!({
        "client": {"nodeid": "emontx", "deviceid": 3},
        "inputs": [{"name": "p1", "unit": "W", "processes": ["log"]}]
    });
    std::fs::write(&file, doc.to_string()).unwrap();
    file
}

/// An empty server: no inputs, feeds, or processes.
async fn empty_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/input/get/emontx"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/input/list.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/feed/list.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/process/list.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "process__log_to_feed": {"id_num": 1}
        })))
        .mount(&server)
        .await;
    server
}

fn sync_cmd(home: &TempDir, server: &MockServer, local: &Path) -> assert_cmd::Command {
    let mut cmd = daqemon_cmd(home.path());
    cmd.args(["--server", &server.uri(), "--api-key", "k"])
        .arg("--config-file")
        .arg(local);
    cmd
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let home = TempDir::new().unwrap();
    let output = daqemon_cmd(home.path()).output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    let home = TempDir::new().unwrap();
    daqemon_cmd(home.path()).arg("--help").assert().success().stdout(
        predicate::str::contains("Emoncms")
            .and(predicate::str::contains("sync"))
            .and(predicate::str::contains("remote"))
            .and(predicate::str::contains("daemon")),
    );
}

#[test]
fn test_version_flag() {
    let home = TempDir::new().unwrap();
    daqemon_cmd(home.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("daqemon"));
}

#[test]
fn test_unknown_subcommand_is_usage_error() {
    let home = TempDir::new().unwrap();
    daqemon_cmd(home.path())
        .arg("frobnicate")
        .assert()
        .code(2);
}

// ── Shell completions ───────────────────────────────────────────────

#[test]
fn test_completions_bash() {
    let home = TempDir::new().unwrap();
    daqemon_cmd(home.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("daqemon"));
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn test_config_path_points_at_toml() {
    let home = TempDir::new().unwrap();
    daqemon_cmd(home.path())
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::ends_with("config.toml\n"));
}

#[test]
fn test_config_show_applies_flag_overrides() {
    let home = TempDir::new().unwrap();
    daqemon_cmd(home.path())
        .args(["--server", "http://emon.local/", "config", "show", "-o", "json"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("http://emon.local/")
                .and(predicate::str::contains("rpc_url")),
        );
}

// ── Errors ──────────────────────────────────────────────────────────

#[test]
fn test_missing_local_config_reports_io_error() {
    let home = TempDir::new().unwrap();
    let output = daqemon_cmd(home.path())
        .args(["--api-key", "k", "--config-file"])
        .arg(home.path().join("absent.json"))
        .args(["sync", "plan"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_invalid_local_config_is_reported() {
    let home = TempDir::new().unwrap();
    let file = home.path().join("daqemon.json");
    std::fs::write(&file, "{not json").unwrap();
    let output = daqemon_cmd(home.path())
        .args(["--api-key", "k", "--config-file"])
        .arg(&file)
        .args(["sync", "plan"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    let text = combined_output(&output);
    assert!(
        text.contains("Cannot read local configuration"),
        "Expected local config error:\n{text}"
    );
}

// ── Sync ────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_sync_plan_against_empty_server() {
    let home = TempDir::new().unwrap();
    let local = write_local_config(home.path());
    let server = empty_server().await;

    sync_cmd(&home, &server, &local)
        .args(["-o", "plain", "sync", "plan"])
        .assert()
        .success()
        .stdout(predicate::eq("create input p1\ncreate feed p1\n"));
}

#[tokio::test]
async fn test_sync_apply_without_terminal_requires_yes() {
    let home = TempDir::new().unwrap();
    let local = write_local_config(home.path());
    let server = empty_server().await;

    let output = sync_cmd(&home, &server, &local)
        .args(["sync", "apply"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("requires confirmation"));

    // Nothing was written.
    let writes = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.url.path() == "/input/post" || r.url.path() == "/feed/create.json")
        .count();
    assert_eq!(writes, 0);
}

#[tokio::test]
async fn test_sync_apply_with_failures_exits_partial() {
    let home = TempDir::new().unwrap();
    let local = write_local_config(home.path());
    let server = empty_server().await;

    Mock::given(method("GET"))
        .and(path("/input/post"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/feed/create.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true, "feedid": 31})))
        .expect(1)
        .mount(&server)
        .await;

    let output = sync_cmd(&home, &server, &local)
        .args(["--yes", "-o", "plain", "sync", "apply"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(9));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("✗ input p1"), "stdout:\n{stdout}");
    assert!(stdout.contains("✓ feed  p1"), "stdout:\n{stdout}");
}
