//! Client tests against fake CLI executables on disk, covering the
//! single-shot output convention and the exit-code taxonomy end to end.

#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;

use bondlink::{Client, CliError, State};
use serde_json::json;
use tempfile::TempDir;

fn fake_cli(dir: &TempDir, body: &str) -> PathBuf {
    let path = dir.path().join("bondlink_cli");
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    path
}

#[tokio::test]
async fn only_the_trailing_record_is_the_result() {
    let dir = TempDir::new().unwrap();
    let cli = fake_cli(
        &dir,
        r#"printf '{"progress": 40}\n\n{"progress": 90}\n\n{"down": 95.2, "up": 18.1}\n'"#,
    );
    let value = Client::with_cli_path(cli).version().await.unwrap();
    assert_eq!(value, json!({"down": 95.2, "up": 18.1}));
}

#[tokio::test]
async fn login_state_round_trips_through_the_cli() {
    let dir = TempDir::new().unwrap();
    let cli = fake_cli(&dir, r#"printf '{"state": "LOGGED_IN"}\n'"#);
    let state = Client::with_cli_path(cli)
        .login("user@example.com", "hunter2")
        .await
        .unwrap();
    assert_eq!(state, State::LoggedIn);
}

#[tokio::test]
async fn daemon_error_body_on_stderr_becomes_api_error() {
    let dir = TempDir::new().unwrap();
    let cli = fake_cli(
        &dir,
        r#"printf '{"errorCode":7,"errorType":"rpc","errorMessage":"daemon not running"}' >&2
exit 1"#,
    );
    match Client::with_cli_path(cli).show_settings().await {
        Err(CliError::Api {
            error_code,
            error_type,
            error_message,
        }) => {
            assert_eq!(error_code, 7);
            assert_eq!(error_type, "rpc");
            assert_eq!(error_message, "daemon not running");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn argument_failures_classify_by_exit_code() {
    let dir = TempDir::new().unwrap();

    let cli = fake_cli(&dir, "echo 'bad argument'; exit 2");
    assert!(matches!(
        Client::with_cli_path(cli).show_settings().await,
        Err(CliError::InvalidParameter(message)) if message == "bad argument"
    ));

    let cli = fake_cli(&dir, "echo 'usage: bondlink_cli ...'; exit 4");
    assert!(matches!(
        Client::with_cli_path(cli).show_settings().await,
        Err(CliError::UnknownParameter)
    ));
}

#[tokio::test]
async fn empty_output_is_flagged_not_parsed() {
    let dir = TempDir::new().unwrap();
    let cli = fake_cli(&dir, "true");
    assert!(matches!(
        Client::with_cli_path(cli).disconnect().await,
        Err(CliError::NoOutput(name)) if name == "disconnect"
    ));
}

#[tokio::test]
async fn missing_cli_is_a_launch_error() {
    let client = Client::with_cli_path("/nonexistent/bondlink_cli");
    assert!(matches!(
        client.version().await,
        Err(CliError::Launch { .. })
    ));
}

#[tokio::test]
async fn stats_collects_streamed_records_in_order() {
    let dir = TempDir::new().unwrap();
    // the fake ignores its "stats <seconds>" args and emits three records
    let cli = fake_cli(
        &dir,
        r#"printf '["state", {"state": "CONNECTED"}]\n\n'
printf '["adapters", [{"adapterID": "{guid-1}"}]]\n\n'
printf '["session_stats", {"bytes": 42}]\n\n'"#,
    );
    let records = Client::with_cli_path(cli).stats(5).await.unwrap();
    assert_eq!(records.len(), 3);
    assert_eq!(
        bondlink::types::record_parts(&records[0]).unwrap().0,
        "state"
    );
    assert_eq!(records[2], json!(["session_stats", {"bytes": 42}]));
}
