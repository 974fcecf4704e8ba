//! End-to-end tests of the HTTP surface against a mock provider.

mod common;

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use ai_gate::config::GateConfig;
use ai_gate::http::{build_router, AppState};
use common::{completion_body, error_body, start_mock_upstream, test_config};

fn router(config: GateConfig) -> Router {
    build_router(AppState::new(config).unwrap())
}

fn generate(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/v1/generate")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn admin(method: &str, uri: &str, key: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(key) = key {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", key));
    }
    builder.body(Body::empty()).unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Mock that counts calls and answers with `status` for the first `failures`
/// calls, then succeeds.
async fn flaky_upstream(failures: u32, status: u16) -> (std::net::SocketAddr, Arc<AtomicU32>) {
    let calls = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();
    let addr = start_mock_upstream(move |_| {
        let n = counter.fetch_add(1, Ordering::SeqCst);
        async move {
            if n < failures {
                (status, error_body("upstream trouble"))
            } else {
                (200, completion_body("answer"))
            }
        }
    })
    .await;
    (addr, calls)
}

#[tokio::test]
async fn test_health() {
    let (addr, _) = flaky_upstream(0, 200).await;
    let response = router(test_config(addr))
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["breaker"], "closed");
}

#[tokio::test]
async fn test_generate_success_carries_request_id() {
    let (addr, calls) = flaky_upstream(0, 200).await;
    let response = router(test_config(addr))
        .oneshot(generate(json!({ "prompt": "hello" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let header_id = response
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .expect("request id header");

    let body = json_body(response).await;
    assert_eq!(body["text"], "answer");
    assert_eq!(body["model"], "mock-model");
    assert_eq!(body["request_id"], header_id.as_str());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_client_request_id_is_kept() {
    let (addr, _) = flaky_upstream(0, 200).await;
    let mut request = generate(json!({ "prompt": "hello" }));
    request
        .headers_mut()
        .insert("x-request-id", "client-chosen".parse().unwrap());

    let response = router(test_config(addr)).oneshot(request).await.unwrap();
    assert_eq!(response.headers()["x-request-id"], "client-chosen");
}

#[tokio::test]
async fn test_empty_prompt_rejected() {
    let (addr, calls) = flaky_upstream(0, 200).await;
    let response = router(test_config(addr))
        .oneshot(generate(json!({ "prompt": "   " })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "validation_error");
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_malformed_json_rejected() {
    let (addr, _) = flaky_upstream(0, 200).await;
    let request = Request::builder()
        .method("POST")
        .uri("/v1/generate")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let response = router(test_config(addr)).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "validation_error");
}

#[tokio::test]
async fn test_transient_failures_are_retried() {
    let (addr, calls) = flaky_upstream(2, 503).await;
    let response = router(test_config(addr))
        .oneshot(generate(json!({ "prompt": "retry me" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_bad_request_is_not_retried() {
    let (addr, calls) = flaky_upstream(10, 400).await;
    let response = router(test_config(addr))
        .oneshot(generate(json!({ "prompt": "malformed for provider" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "bad_request");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_breaker_opens_after_failures() {
    let (addr, calls) = flaky_upstream(100, 500).await;
    let mut config = test_config(addr);
    config.queue.retry_attempts = 0;
    config.breaker.failure_threshold = 2;
    let app = router(config);

    for prompt in ["first", "second"] {
        let response = app
            .clone()
            .oneshot(generate(json!({ "prompt": prompt })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    let response = app
        .clone()
        .oneshot(generate(json!({ "prompt": "third" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "circuit_open");
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_identical_requests_share_one_call() {
    let calls = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();
    let addr = start_mock_upstream(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            (200, completion_body("shared"))
        }
    })
    .await;
    let app = router(test_config(addr));

    let body = json!({ "prompt": "same", "user_id": "u1" });
    let (a, b) = tokio::join!(
        app.clone().oneshot(generate(body.clone())),
        app.clone().oneshot(generate(body.clone())),
    );

    assert_eq!(a.unwrap().status(), StatusCode::OK);
    assert_eq!(b.unwrap().status(), StatusCode::OK);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_admin_requires_key() {
    let (addr, _) = flaky_upstream(0, 200).await;
    let app = router(test_config(addr));

    let response = app
        .clone()
        .oneshot(admin("GET", "/admin/stats", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .clone()
        .oneshot(admin("GET", "/admin/stats", Some("wrong")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .oneshot(admin("GET", "/admin/stats", Some("test-admin-key")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["queue"]["waiting"], 0);
    assert_eq!(body["breaker"]["state"], "closed");
}

#[tokio::test]
async fn test_admin_disabled_hides_routes() {
    let (addr, _) = flaky_upstream(0, 200).await;
    let mut config = test_config(addr);
    config.admin.enabled = false;

    let response = router(config)
        .oneshot(admin("GET", "/admin/status", Some("test-admin-key")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_admin_breaker_reset_and_queue_clear() {
    let (addr, _) = flaky_upstream(100, 500).await;
    let mut config = test_config(addr);
    config.queue.retry_attempts = 0;
    config.breaker.failure_threshold = 1;
    let app = router(config);

    let response = app
        .clone()
        .oneshot(generate(json!({ "prompt": "trip" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

    let response = app
        .clone()
        .oneshot(admin("GET", "/admin/status", Some("test-admin-key")))
        .await
        .unwrap();
    let body = json_body(response).await;
    assert_eq!(body["breaker"], "open");
    assert_eq!(body["status"], "degraded");

    let response = app
        .clone()
        .oneshot(admin("POST", "/admin/breaker/reset", Some("test-admin-key")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["state"], "closed");

    let response = app
        .oneshot(admin("POST", "/admin/queue/clear", Some("test-admin-key")))
        .await
        .unwrap();
    let body = json_body(response).await;
    assert_eq!(body["cleared"], 0);
}

#[tokio::test]
async fn test_slow_request_times_out_with_408() {
    let addr = start_mock_upstream(|_| async {
        tokio::time::sleep(Duration::from_secs(3)).await;
        (200, completion_body("too late"))
    })
    .await;
    let mut config = test_config(addr);
    config.server.request_timeout_secs = 1;

    let response = router(config)
        .oneshot(generate(json!({ "prompt": "slow" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
    assert!(response.headers().contains_key("x-request-id"));
}
