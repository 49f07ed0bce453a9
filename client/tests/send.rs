//! End-to-end tests against a mock Pincho API.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use async_trait::async_trait;
use pincho_client::CancelScope;
use pincho_client::CancellationToken;
use pincho_client::ClientConfig;
use pincho_client::ErrorKind;
use pincho_client::NotifAiOptions;
use pincho_client::Origin;
use pincho_client::PinchoClient;
use pincho_client::RetryPolicy;
use pincho_client::SendOptions;
use pincho_client::Sleeper;
use pretty_assertions::assert_eq;
use serde_json::Value;
use serde_json::json;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;
use wiremock::Mock;
use wiremock::MockServer;
use wiremock::ResponseTemplate;
use wiremock::matchers::body_partial_json;
use wiremock::matchers::header;
use wiremock::matchers::method;
use wiremock::matchers::path;

/// Records requested delays without waiting.
#[derive(Default)]
struct InstantSleeper {
    slept: Mutex<Vec<Duration>>,
}

#[async_trait]
impl Sleeper for InstantSleeper {
    async fn sleep(&self, duration: Duration) {
        self.slept.lock().unwrap().push(duration);
    }
}

fn client_for(server: &MockServer, sleeper: Arc<InstantSleeper>) -> PinchoClient {
    PinchoClient::with_config(ClientConfig {
        api_url: format!("{}/send", server.uri()),
        token: "test-token-1234".to_string(),
        timeout: Duration::from_secs(5),
        retry: RetryPolicy::default(),
        ..Default::default()
    })
    .unwrap()
    .with_sleeper(sleeper)
}

fn success_body() -> Value {
    json!({
        "status": "success",
        "message": "Notification sent",
        "receivedNotification": {
            "notificationID": "notif-1",
            "userID": "user-1",
            "title": "Deploy",
            "body": "Finished",
            "type": "deploy",
            "timestamp": "2025-01-01T00:00:00Z",
            "endpoint": "send",
            "expiresAt": {"_seconds": 1_735_776_000, "_nanoseconds": 0}
        }
    })
}

#[tokio::test]
async fn sends_notification_and_reads_rate_limit_headers() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/send"))
        .and(header("authorization", "Bearer test-token-1234"))
        .and(header("content-type", "application/json"))
        .and(body_partial_json(json!({"title": "Deploy", "message": "Finished"})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(success_body())
                .insert_header("RateLimit-Limit", "30")
                .insert_header("RateLimit-Remaining", "28")
                .insert_header("RateLimit-Reset", "1735689600"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, Arc::default());
    let result = client
        .send(SendOptions::new("Deploy", "Finished"))
        .await
        .unwrap();

    let details = result.response.received_notification.unwrap();
    assert_eq!(details.notification_id, "notif-1");
    assert_eq!(result.rate_limit.limit, Some(30));
    assert_eq!(result.rate_limit.remaining, Some(28));
    assert_eq!(result.rate_limit.reset.as_deref(), Some("1735689600"));
}

#[tokio::test]
async fn encrypted_send_carries_iv_and_no_plaintext() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/send"))
        .respond_with(ResponseTemplate::new(200).set_body_json(success_body()))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, Arc::default());
    let options = SendOptions {
        encryption_password: Some("hunter2".to_string()),
        ..SendOptions::new("Secret", "launch codes")
    };
    client.send(options).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
    let iv = body["iv"].as_str().unwrap();
    assert_eq!(iv.len(), 32);
    assert!(iv.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    let message = body["message"].as_str().unwrap();
    assert_ne!(message, "launch codes");
    assert!(message.ends_with('_'));
    let raw = String::from_utf8_lossy(&requests[0].body);
    assert!(!raw.contains("hunter2"));
    assert!(!raw.contains("launch codes"));
}

#[tokio::test]
async fn validation_envelope_is_classified_without_retry() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/send"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "status": "error",
            "error": {
                "type": "invalid_request_error",
                "code": "invalid_parameter",
                "message": "Image URL must be https",
                "param": "imageURL"
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let sleeper = Arc::new(InstantSleeper::default());
    let err = client_for(&server, sleeper.clone())
        .send(SendOptions::new("t", "m"))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(err.origin(), Some(Origin::Remote));
    assert_eq!(err.param(), Some("imageURL"));
    assert_eq!(err.code(), Some("invalid_parameter"));
    assert!(sleeper.slept.lock().unwrap().is_empty());
}

#[tokio::test]
async fn unauthorized_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid token"))
        .expect(1)
        .mount(&server)
        .await;

    let err = client_for(&server, Arc::default())
        .send(SendOptions::new("t", "m"))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Authentication);
    assert_eq!(err.status_code(), 401);
    assert_eq!(err.to_string(), "authentication error: invalid token");
}

#[tokio::test]
async fn server_error_is_retried_until_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(success_body()))
        .expect(1)
        .mount(&server)
        .await;

    let sleeper = Arc::new(InstantSleeper::default());
    let result = client_for(&server, sleeper.clone())
        .send(SendOptions::new("Deploy", "Finished"))
        .await
        .unwrap();

    assert_eq!(result.response.status, "success");
    assert_eq!(
        *sleeper.slept.lock().unwrap(),
        vec![Duration::from_secs(1), Duration::from_secs(2)]
    );
}

#[tokio::test]
async fn exhausted_retries_end_in_network_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(4)
        .mount(&server)
        .await;

    let err = client_for(&server, Arc::default())
        .send(SendOptions::new("t", "m"))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Network);
    assert_eq!(
        err.to_string(),
        "request failed after 3 retries: server error: boom"
    );
}

#[tokio::test]
async fn rate_limit_waits_for_retry_after() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("Retry-After", "12")
                .set_body_json(json!({
                    "status": "error",
                    "error": {"type": "rate_limit_error", "code": "rate_limited", "message": "Too many requests"}
                })),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(success_body()))
        .mount(&server)
        .await;

    let sleeper = Arc::new(InstantSleeper::default());
    client_for(&server, sleeper.clone())
        .send(SendOptions::new("t", "m"))
        .await
        .unwrap();

    assert_eq!(*sleeper.slept.lock().unwrap(), vec![Duration::from_secs(12)]);
}

#[tokio::test]
async fn notifai_uses_derived_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/notifai"))
        .and(body_partial_json(json!({"text": "deploy of api finished in 4m"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "message": "Notification sent",
            "summary": {"title": "API deployed", "message": "Took 4 minutes", "tags": ["deploy"]}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let result = client_for(&server, Arc::default())
        .notifai(NotifAiOptions {
            text: "deploy of api finished in 4m".to_string(),
            notification_type: None,
        })
        .await
        .unwrap();

    let summary = result.response.summary.unwrap();
    assert_eq!(summary.title, "API deployed");
    assert_eq!(summary.tags, vec!["deploy"]);
}

#[tokio::test]
async fn cancellation_interrupts_slow_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(success_body())
                .set_delay(Duration::from_secs(10)),
        )
        .mount(&server)
        .await;

    let token = CancellationToken::new();
    let scope = CancelScope::new(token.clone());
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        token.cancel();
    });
    let started = std::time::Instant::now();

    let err = client_for(&server, Arc::default())
        .send_with_cancel(SendOptions::new("t", "m"), &scope)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Network);
    assert!(started.elapsed() < Duration::from_secs(5));
}
