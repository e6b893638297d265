//! End-to-end tests: admin commands, dispatch, and live API calls.
//!
//! Each test stands up a wiremock server and drives the engine through
//! `on_message`, the same path a host adapter uses.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use custom_reply::actions::Action;
use custom_reply::config::ReplyConfig;
use custom_reply::dispatch::PlainMessage;
use custom_reply::engine::{Reply, ReplyEngine};
use custom_reply::store::{DocumentStore, JsonFileStore, MemoryStore};

const ADMIN: &str = "admin";

fn test_config() -> ReplyConfig {
    ReplyConfig {
        http_timeout: Duration::from_secs(1),
        admins: vec![ADMIN.to_string()],
        ..ReplyConfig::default()
    }
}

async fn engine_with(store: Arc<dyn DocumentStore>) -> ReplyEngine {
    ReplyEngine::load(test_config(), store).await.unwrap()
}

async fn engine() -> ReplyEngine {
    engine_with(Arc::new(MemoryStore::new())).await
}

/// Send a line as the admin and return the reply text.
async fn admin(engine: &ReplyEngine, line: &str) -> String {
    engine
        .on_message(&PlainMessage::new(ADMIN, line))
        .await
        .into_text()
        .unwrap_or_default()
}

async fn say(engine: &ReplyEngine, sender: &str, text: &str) -> Reply {
    engine.on_message(&PlainMessage::new(sender, text)).await
}

#[tokio::test]
async fn post_override_replaces_raw_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/ping"))
        .and(header("Authorization", "Bearer tok-A"))
        .and(header("Accept", "application/json"))
        .and(body_json(json!({"x": 1})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"raw": "ignored"})))
        .expect(2)
        .mount(&server)
        .await;

    let engine = engine().await;
    admin(&engine, "/allow off").await;
    admin(&engine, "/token add tok-A").await;

    let line = format!(
        "/api post ping {}/ping --key x --value 1 --code 200 --reply pong!",
        server.uri()
    );
    let registered = admin(&engine, &line).await;
    assert!(registered.starts_with("✅ Registered [ping]"));
    assert!(registered.ends_with("pong!"));

    assert_eq!(
        say(&engine, "user", "ping").await,
        Reply::Text("pong!".to_string())
    );
}

#[tokio::test]
async fn get_json_is_pretty_printed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"up": true})))
        .mount(&server)
        .await;

    let engine = engine().await;
    admin(&engine, "/allow off").await;
    admin(&engine, "/token add secret-token").await;
    admin(&engine, &format!("/api get status {}/status", server.uri())).await;

    assert_eq!(
        say(&engine, "user", "STATUS").await,
        Reply::Text("API response (JSON):\n{\n  \"up\": true\n}".to_string())
    );
}

#[tokio::test]
async fn plain_text_body_passes_through() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/motd"))
        .respond_with(ResponseTemplate::new(200).set_body_string("have a nice day"))
        .mount(&server)
        .await;

    let engine = engine().await;
    admin(&engine, "/allow off").await;
    admin(&engine, "/token add t").await;
    admin(&engine, &format!("/api get motd {}/motd", server.uri())).await;

    assert_eq!(
        say(&engine, "user", "motd").await,
        Reply::Text("API response (text):\nhave a nice day".to_string())
    );
}

#[tokio::test]
async fn error_status_keeps_code_for_overrides() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/items"))
        .respond_with(ResponseTemplate::new(404).set_body_string("no such item"))
        .mount(&server)
        .await;

    let engine = engine().await;
    admin(&engine, "/allow off").await;
    admin(&engine, "/token add t").await;
    admin(
        &engine,
        &format!(
            r#"/api post item {}/items --code 404 --reply "item not found""#,
            server.uri()
        ),
    )
    .await;
    admin(&engine, &format!("/api post raw {}/items", server.uri())).await;

    assert_eq!(
        say(&engine, "user", "item").await,
        Reply::Text("item not found".to_string())
    );
    assert_eq!(
        say(&engine, "user", "raw").await,
        Reply::Text("❌ API call failed: HTTP 404\nno such item".to_string())
    );
}

#[tokio::test]
async fn exact_api_match_beats_substring_text() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/abc"))
        .respond_with(ResponseTemplate::new(200).set_body_string("from api"))
        .expect(2)
        .mount(&server)
        .await;

    let engine = engine().await;
    admin(&engine, "/allow off").await;
    admin(&engine, "/token add t").await;
    admin(&engine, "/reply add a x").await;
    admin(&engine, &format!("/api get abc {}/abc", server.uri())).await;

    assert_eq!(
        say(&engine, "user", "abc").await,
        Reply::Text("API response (text):\nfrom api".to_string())
    );
    // Longer text containing "abc" only reaches the text rule.
    assert_eq!(
        say(&engine, "user", "xabcx").await,
        Reply::Text("x".to_string())
    );
}

#[tokio::test]
async fn explicit_token_index_and_fallback() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/who"))
        .and(header("Authorization", "Bearer second"))
        .respond_with(ResponseTemplate::new(200).set_body_string("second"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/who"))
        .and(header("Authorization", "Bearer first"))
        .respond_with(ResponseTemplate::new(200).set_body_string("first"))
        .mount(&server)
        .await;

    let engine = engine().await;
    admin(&engine, "/allow off").await;
    admin(&engine, "/token add first").await;
    admin(&engine, "/token add second").await;
    admin(&engine, &format!("/api get who1 {}/who --token 1", server.uri())).await;
    admin(&engine, &format!("/api get who5 {}/who --token 5", server.uri())).await;

    assert_eq!(
        say(&engine, "user", "who1").await,
        Reply::Text("API response (text):\nsecond".to_string())
    );
    assert_eq!(
        say(&engine, "user", "who5").await,
        Reply::Text("API response (text):\nfirst".to_string())
    );
}

#[tokio::test]
async fn removed_credential_falls_back_instead_of_reusing_slot() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/c"))
        .and(header("Authorization", "Bearer B"))
        .respond_with(ResponseTemplate::new(200).set_body_string("used B"))
        .mount(&server)
        .await;

    let engine = engine().await;
    admin(&engine, "/allow off").await;
    for t in ["A", "B", "C"] {
        admin(&engine, &format!("/token add {t}")).await;
    }
    engine
        .registry
        .put("c", Action::get_api(format!("{}/c", server.uri()), Some(2)))
        .await
        .unwrap();

    let removed = admin(&engine, "/token del 0").await;
    assert!(removed.contains("[c] uses token #2, now out of range"));
    assert_eq!(
        say(&engine, "user", "c").await,
        Reply::Text("API response (text):\nused B".to_string())
    );
}

#[tokio::test]
async fn gate_controls_automatic_replies() {
    let engine = engine().await;
    admin(&engine, "/reply add hi hello").await;
    admin(&engine, "/allow add 9").await;

    assert_eq!(say(&engine, "123", "hi").await, Reply::Silent);
    assert_eq!(say(&engine, "9", "hi").await, Reply::Text("hello".into()));

    admin(&engine, "/allow off").await;
    assert_eq!(say(&engine, "123", "hi").await, Reply::Text("hello".into()));
}

#[tokio::test]
async fn timeout_has_no_status_code() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;

    let engine = engine().await;
    admin(&engine, "/allow off").await;
    admin(&engine, "/token add t").await;
    engine
        .registry
        .put(
            "slow",
            Action::post_api(
                format!("{}/slow", server.uri()),
                Default::default(),
                None,
                custom_reply::actions::build_code_map(&["200".into()], &["fast".into()]).unwrap(),
            ),
        )
        .await
        .unwrap();

    assert_eq!(
        say(&engine, "user", "slow").await,
        Reply::Text("❌ API call failed: no response within 1s".to_string())
    );
}

#[tokio::test]
async fn state_survives_reload_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let store: Arc<dyn DocumentStore> = Arc::new(JsonFileStore::new(dir.path()));

    {
        let engine = engine_with(Arc::clone(&store)).await;
        admin(&engine, "/token add persisted-token").await;
        admin(&engine, "/allow add 42").await;
        admin(&engine, "/reply add hi hello").await;
        engine
            .registry
            .put(
                "item",
                Action::post_api(
                    "http://127.0.0.1:9/items",
                    Default::default(),
                    Some(0),
                    custom_reply::actions::build_code_map(&["404".into()], &["not found".into()])
                        .unwrap(),
                ),
            )
            .await
            .unwrap();
    }

    let reloaded = engine_with(store).await;
    let item = reloaded.registry.get("item").await.unwrap();
    assert_eq!(item.override_for(Some(404)), Some("not found"));
    assert_eq!(reloaded.credentials.len().await, 1);
    assert_eq!(say(&reloaded, "42", "hi").await, Reply::Text("hello".into()));
    assert_eq!(say(&reloaded, "7", "hi").await, Reply::Silent);

    let raw = std::fs::read_to_string(dir.path().join("custom_command_config.json")).unwrap();
    let doc: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(doc["item"]["code_map"], json!({"404": "not found"}));
    let keys: Vec<&String> = doc.as_object().unwrap().keys().collect();
    assert_eq!(keys, vec!["hi", "item"]);
}
