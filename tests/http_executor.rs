//! HTTP executor against a local mock server.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use custom_reply::credentials::CredentialPool;
use custom_reply::http::executor::NO_TOKEN_MESSAGE;
use custom_reply::http::{CallOutcome, HttpExecutor, Method};
use custom_reply::store::MemoryStore;

fn executor(pool: Arc<CredentialPool>) -> HttpExecutor {
    HttpExecutor::new(pool, Duration::from_secs(2)).unwrap()
}

fn empty_pool() -> Arc<CredentialPool> {
    Arc::new(CredentialPool::new(Arc::new(MemoryStore::new())))
}

#[tokio::test]
async fn missing_token_makes_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let outcome = executor(empty_pool())
        .call(Method::Get, &server.uri(), None, None)
        .await;
    assert_eq!(
        outcome,
        CallOutcome {
            ok: false,
            message: NO_TOKEN_MESSAGE.to_string(),
            status: None
        }
    );
}

#[tokio::test]
async fn legacy_token_is_used_when_pool_is_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/me"))
        .and(header("Authorization", "Bearer legacy-token"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(1)
        .mount(&server)
        .await;

    let pool = empty_pool();
    pool.set_legacy("legacy-token").await.unwrap();
    let outcome = executor(pool)
        .call(Method::Get, &format!("{}/me", server.uri()), None, Some(3))
        .await;
    assert!(outcome.ok);
    assert_eq!(outcome.status, Some(200));
}

#[tokio::test]
async fn post_without_payload_sends_empty_object() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .and(header("Content-Type", "application/json"))
        .and(body_json(json!({})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 7})))
        .expect(1)
        .mount(&server)
        .await;

    let pool = empty_pool();
    pool.append("t").await.unwrap();
    let outcome = executor(pool)
        .call(Method::Post, &format!("{}/hook", server.uri()), None, None)
        .await;
    assert!(outcome.ok);
    assert_eq!(outcome.status, Some(201));
    assert_eq!(outcome.message, "API response (JSON):\n{\n  \"id\": 7\n}");
}

#[tokio::test]
async fn server_error_is_a_failure_with_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let pool = empty_pool();
    pool.append("t").await.unwrap();
    let outcome = executor(pool).call(Method::Get, &server.uri(), None, None).await;
    assert!(!outcome.ok);
    assert_eq!(outcome.status, Some(503));
    assert_eq!(outcome.message, "❌ API call failed: HTTP 503");
}

#[tokio::test]
async fn unreachable_endpoint_has_no_status() {
    let pool = empty_pool();
    pool.append("t").await.unwrap();
    let outcome = executor(pool)
        .call(Method::Get, "http://127.0.0.1:1/nothing", None, None)
        .await;
    assert!(!outcome.ok);
    assert_eq!(outcome.status, None);
    assert!(outcome.message.starts_with("❌ API call failed"));
}

#[tokio::test]
async fn malformed_url_is_a_failure_not_a_panic() {
    let pool = empty_pool();
    pool.append("t").await.unwrap();
    let outcome = executor(pool)
        .call(Method::Get, "not a url", None, None)
        .await;
    assert!(!outcome.ok);
    assert_eq!(outcome.status, None);
}
