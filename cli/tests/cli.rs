//! CLI integration tests.
//!
//! Exit codes: 0 success, 1 usage, 2 API rejection, 3 system/network.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::path::Path;
use std::time::Duration;
use std::time::Instant;

use anyhow::Result;
use predicates::prelude::*;
use serde_json::json;
use tempfile::TempDir;
use wiremock::Mock;
use wiremock::MockServer;
use wiremock::ResponseTemplate;
use wiremock::matchers::header;
use wiremock::matchers::method;
use wiremock::matchers::path;

/// `pincho` with an isolated settings directory and no ambient credentials.
fn pincho(home: &Path) -> Result<assert_cmd::Command> {
    let mut cmd = assert_cmd::Command::cargo_bin("pincho")?;
    cmd.env("PINCHO_HOME", home)
        .env_remove("PINCHO_TOKEN")
        .env_remove("PINCHO_API_URL")
        .env_remove("PINCHO_TIMEOUT")
        .env_remove("PINCHO_MAX_RETRIES")
        .env_remove("RUST_LOG");
    Ok(cmd)
}

/// Run a blocking command from inside an async test while the mock server
/// keeps serving.
async fn run_blocking(cmd: assert_cmd::Command) -> assert_cmd::assert::Assert {
    let mut cmd = cmd;
    tokio::task::spawn_blocking(move || cmd.assert())
        .await
        .expect("command task panicked")
}

#[test]
fn version_prints_three_lines() -> Result<()> {
    let home = TempDir::new()?;

    pincho(home.path())?
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::starts_with(format!(
            "pincho version {}\ncommit: ",
            env!("CARGO_PKG_VERSION")
        )))
        .stdout(predicate::str::contains("\nbuilt: "));
    Ok(())
}

#[test]
fn config_set_then_get_masks_token() -> Result<()> {
    let home = TempDir::new()?;

    pincho(home.path())?
        .args(["config", "set", "token", "abcd1234wxyz"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("✓ Set token in "));

    pincho(home.path())?
        .args(["config", "get", "token"])
        .assert()
        .success()
        .stdout("token: abcd...wxyz\n");

    let written = std::fs::read_to_string(home.path().join("config.toml"))?;
    assert!(written.contains("token = \"abcd1234wxyz\""));
    Ok(())
}

#[test]
fn config_list_when_empty() -> Result<()> {
    let home = TempDir::new()?;

    pincho(home.path())?
        .args(["config", "list"])
        .assert()
        .success()
        .stdout("No configuration set\n\nTo get started:\n  pincho config set token YOUR_TOKEN\n");
    Ok(())
}

#[test]
fn config_rejects_bad_key_and_value() -> Result<()> {
    let home = TempDir::new()?;

    pincho(home.path())?
        .args(["config", "set", "colour", "blue"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("invalid key 'colour'"));

    pincho(home.path())?
        .args(["config", "set", "timeout", "-3"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("must be non-negative"));
    Ok(())
}

#[test]
fn send_without_token_is_a_usage_error() -> Result<()> {
    let home = TempDir::new()?;

    pincho(home.path())?
        .args(["send", "Deploy", "done"])
        .assert()
        .code(1)
        .stderr(predicate::str::starts_with("Error: Authentication failed\n"))
        .stderr(predicate::str::contains("pincho config set token YOUR_TOKEN"));
    Ok(())
}

#[test]
fn send_without_title_is_a_usage_error() -> Result<()> {
    let home = TempDir::new()?;

    pincho(home.path())?.arg("send").assert().code(1);

    pincho(home.path())?
        .args(["send", "", "--token", "abc"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("title is required"));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn send_prints_human_summary() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/send"))
        .and(header("authorization", "Bearer env-token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({
                    "status": "success",
                    "message": "Notification sent",
                    "receivedNotification": {
                        "notificationID": "n-1",
                        "title": "Deploy",
                        "body": "done",
                        "type": "deploy",
                        "tags": ["prod", "ops"],
                        "expiresAt": {"_seconds": 1_735_776_000, "_nanoseconds": 0}
                    }
                }))
                .insert_header("RateLimit-Limit", "30")
                .insert_header("RateLimit-Remaining", "29"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let home = TempDir::new()?;
    std::fs::write(
        home.path().join("config.toml"),
        "default_type = \"deploy\"\ndefault_tags = [\"ops\"]\n",
    )?;
    let mut cmd = pincho(home.path())?;
    cmd.env("PINCHO_TOKEN", "env-token")
        .env("PINCHO_API_URL", format!("{}/send", server.uri()))
        .args(["send", "Deploy", "done", "--tag", "prod"]);

    run_blocking(cmd)
        .await
        .success()
        .stdout(predicate::str::starts_with("✓ Notification sent successfully\n"))
        .stdout(predicate::str::contains("Notification ID: n-1\n"))
        .stdout(predicate::str::contains("Rate Limit: 29/30 remaining"));

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body)?;
    assert_eq!(body["type"], "deploy");
    assert_eq!(body["tags"], json!(["prod", "ops"]));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn remote_validation_exits_with_api_code() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "status": "error",
            "error": {"type": "invalid_request_error", "code": "invalid_url", "message": "Bad image URL", "param": "imageURL"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let home = TempDir::new()?;
    let mut cmd = pincho(home.path())?;
    cmd.env("PINCHO_API_URL", format!("{}/send", server.uri()))
        .args(["send", "Photo", "--image-url", "ftp://x", "--token", "tok"]);

    run_blocking(cmd)
        .await
        .code(2)
        .stderr("Error: Invalid input\nCause: Bad image URL (parameter: imageURL) [invalid_url]\n");
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn exhausted_retries_exit_with_system_code() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("down"))
        .expect(2)
        .mount(&server)
        .await;

    let home = TempDir::new()?;
    let mut cmd = pincho(home.path())?;
    cmd.env("PINCHO_API_URL", format!("{}/send", server.uri()))
        .args(["send", "Ping", "--token", "tok", "--max-retries", "1"]);

    // Retries are logged at debug level, so nothing precedes the error.
    run_blocking(cmd)
        .await
        .code(3)
        .stderr(predicate::str::starts_with("Error: Network error\n"))
        .stderr(predicate::str::contains("request failed after 1 retries"))
        .stderr(predicate::str::contains("WARN").not())
        .stderr(predicate::str::contains("\u{1b}[").not());
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn timeout_bounds_the_whole_call() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("down"))
        .mount(&server)
        .await;

    let home = TempDir::new()?;
    let mut cmd = pincho(home.path())?;
    cmd.env("PINCHO_API_URL", format!("{}/send", server.uri()))
        .args([
            "send",
            "Ping",
            "--token",
            "tok",
            "--timeout",
            "1",
            "--max-retries",
            "3",
        ]);

    let started = Instant::now();
    run_blocking(cmd)
        .await
        .code(3)
        .stderr(predicate::str::starts_with("Error: Network error\n"))
        .stderr(predicate::str::contains("request interrupted: deadline exceeded"));

    // Backoff alone would take 1 + 2 + 4 seconds.
    assert!(started.elapsed() < Duration::from_secs(4));
    let attempts = server.received_requests().await.unwrap().len();
    assert!(attempts < 4, "made {attempts} attempts");
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn send_json_output() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "message": "Sent to team",
            "teamId": "team-9",
            "memberCount": 3
        })))
        .mount(&server)
        .await;

    let home = TempDir::new()?;
    let mut cmd = pincho(home.path())?;
    cmd.env("PINCHO_API_URL", format!("{}/send", server.uri()))
        .args(["send", "Standup", "--json", "-t", "tok"]);

    let output = run_blocking(cmd).await.success().get_output().stdout.clone();
    let value: serde_json::Value = serde_json::from_slice(&output)?;
    assert_eq!(value["response"]["teamId"], "team-9");
    assert_eq!(value["response"]["memberCount"], 3);
    Ok(())
}
