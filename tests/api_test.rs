// ============================================================================
// REST API tests
// ============================================================================
//
// Drives the full router over a real socket:
// - auth gate rejections and ordering
// - per-key rate limiting with Retry-After
// - create / get / list round trips and pagination
// - public board and descriptor endpoints
// - CORS headers for browser agents
//
// ============================================================================

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use a2a_guestbook::cache::{CredentialCache, InlineCredentials};
use a2a_guestbook::rate_limit::RateLimiter;
use a2a_guestbook::store::InMemoryMessageStore;
use a2a_guestbook::{AppState, build_router};
use chrono::{DateTime, Utc};
use serde_json::{Value, json};
use tokio::net::TcpListener;

const KEY: &str = "test-key-1";
const OTHER_KEY: &str = "test-key-2";

struct TestApp {
    address: String,
    client: reqwest::Client,
}

impl TestApp {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    async fn post_message(&self, key: &str, body: Value) -> reqwest::Response {
        self.client
            .post(self.url("/api/v1/messages"))
            .bearer_auth(key)
            .json(&body)
            .send()
            .await
            .expect("request failed")
    }

    async fn get_authed(&self, key: &str, path: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .bearer_auth(key)
            .send()
            .await
            .expect("request failed")
    }
}

async fn spawn_app_with_limit(limit: u32) -> TestApp {
    let credentials = CredentialCache::bootstrap(Arc::new(InlineCredentials::new(
        json!([KEY, OTHER_KEY]).to_string(),
    )))
    .await
    .expect("credentials load");

    let state = AppState::new(
        Arc::new(InMemoryMessageStore::new()),
        credentials,
        Arc::new(RateLimiter::new(limit, Duration::from_secs(60))),
    );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = format!("http://{}", listener.local_addr().unwrap());
    tokio::spawn(async move {
        axum::serve(listener, build_router(state)).await.unwrap();
    });

    TestApp {
        address,
        client: reqwest::Client::new(),
    }
}

async fn spawn_app() -> TestApp {
    spawn_app_with_limit(1000).await
}

fn error_code(body: &Value) -> &str {
    body["error"]["code"].as_str().unwrap_or_default()
}

#[tokio::test]
async fn test_missing_authorization() {
    let app = spawn_app().await;
    let res = app
        .client
        .post(app.url("/api/v1/messages"))
        .json(&json!({"agent_name": "bot", "message_text": "hi"}))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 401);
    let body: Value = res.json().await.unwrap();
    assert_eq!(error_code(&body), "MISSING_AUTHORIZATION");
    assert!(body["error"]["message"].is_string());
}

#[tokio::test]
async fn test_invalid_authorization_format() {
    let app = spawn_app().await;
    let res = app
        .client
        .get(app.url("/api/v1/messages"))
        .header("Authorization", format!("Token {KEY}"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 401);
    let body: Value = res.json().await.unwrap();
    assert_eq!(error_code(&body), "INVALID_AUTHORIZATION_FORMAT");
}

#[tokio::test]
async fn test_bogus_credential() {
    let app = spawn_app().await;
    let res = app
        .post_message("bogus", json!({"agent_name": "bot", "message_text": "hi"}))
        .await;

    assert_eq!(res.status(), 401);
    let body: Value = res.json().await.unwrap();
    assert_eq!(error_code(&body), "INVALID_CREDENTIAL");
}

#[tokio::test]
async fn test_create_then_get_round_trip() {
    let app = spawn_app().await;
    let metadata = json!({"model": "gpt-x", "tags": ["hello", 1, null], "nested": {"k": true}});

    let before: DateTime<Utc> = Utc::now();
    let res = app
        .post_message(
            KEY,
            json!({
                "agent_name": "Agent Smith",
                "message_text": "Hello from the other side",
                "metadata": metadata,
            }),
        )
        .await;
    let after: DateTime<Utc> = Utc::now();

    assert_eq!(res.status(), 201);
    let created: Value = res.json().await.unwrap();
    let id = created["message_id"].as_str().unwrap().to_string();
    assert_eq!(created["agent_name"], "Agent Smith");
    assert_eq!(created["message_text"], "Hello from the other side");
    assert_eq!(created["metadata"], metadata);

    let ts: DateTime<Utc> = created["timestamp"].as_str().unwrap().parse().unwrap();
    assert!(ts >= before && ts <= after);

    let res = app.get_authed(KEY, &format!("/api/v1/messages/{id}")).await;
    assert_eq!(res.status(), 200);
    let fetched: Value = res.json().await.unwrap();
    assert_eq!(fetched, created);
}

#[tokio::test]
async fn test_create_without_metadata_returns_null() {
    let app = spawn_app().await;
    let res = app
        .post_message(KEY, json!({"agent_name": "bot", "message_text": "plain"}))
        .await;
    assert_eq!(res.status(), 201);
    let created: Value = res.json().await.unwrap();
    assert!(created["metadata"].is_null());
}

#[tokio::test]
async fn test_get_unknown_message() {
    let app = spawn_app().await;
    let res = app.get_authed(KEY, "/api/v1/messages/does-not-exist").await;
    assert_eq!(res.status(), 404);
    let body: Value = res.json().await.unwrap();
    assert_eq!(error_code(&body), "NOT_FOUND");
}

#[tokio::test]
async fn test_message_length_boundary() {
    let app = spawn_app().await;

    let ok = app
        .post_message(KEY, json!({"agent_name": "bot", "message_text": "a".repeat(280)}))
        .await;
    assert_eq!(ok.status(), 201);

    let too_long = app
        .post_message(KEY, json!({"agent_name": "bot", "message_text": "a".repeat(281)}))
        .await;
    assert_eq!(too_long.status(), 400);
    let body: Value = too_long.json().await.unwrap();
    assert_eq!(error_code(&body), "VALIDATION_ERROR");
    assert_eq!(body["error"]["details"]["field"], "message_text");

    for blank in ["", "    "] {
        let res = app
            .post_message(KEY, json!({"agent_name": "bot", "message_text": blank}))
            .await;
        assert_eq!(res.status(), 400, "blank text {blank:?} accepted");
    }

    let long_name = app
        .post_message(KEY, json!({"agent_name": "n".repeat(101), "message_text": "hi"}))
        .await;
    assert_eq!(long_name.status(), 400);
}

#[tokio::test]
async fn test_malformed_body_is_unprocessable() {
    let app = spawn_app().await;
    let res = app
        .post_message(KEY, json!({"agent_name": "bot"}))
        .await;
    assert_eq!(res.status(), 422);
    let body: Value = res.json().await.unwrap();
    assert_eq!(error_code(&body), "VALIDATION_ERROR");

    let res = app
        .post_message(KEY, json!({"agent_name": "bot", "message_text": "hi", "metadata": [1, 2]}))
        .await;
    assert_eq!(res.status(), 422);
}

#[tokio::test]
async fn test_list_pagination() {
    let app = spawn_app().await;
    for i in 0..7 {
        let res = app
            .post_message(KEY, json!({"agent_name": "bot", "message_text": format!("msg {i}")}))
            .await;
        assert_eq!(res.status(), 201);
    }

    let first: Value = app
        .get_authed(KEY, "/api/v1/messages?limit=5")
        .await
        .json()
        .await
        .unwrap();
    let first_page = first["messages"].as_array().unwrap();
    assert_eq!(first_page.len(), 5);
    let token = first["next_key"].as_str().expect("continuation token");

    // Tokens are URL-safe already
    let res = app
        .get_authed(KEY, &format!("/api/v1/messages?limit=5&start_key={token}"))
        .await;
    assert_eq!(res.status(), 200);
    let second: Value = res.json().await.unwrap();
    let second_page = second["messages"].as_array().unwrap();
    assert_eq!(second_page.len(), 2);
    assert!(second["next_key"].is_null());

    let all: Vec<&Value> = first_page.iter().chain(second_page.iter()).collect();
    let ids: HashSet<&str> = all.iter().map(|m| m["message_id"].as_str().unwrap()).collect();
    assert_eq!(ids.len(), 7);

    let stamps: Vec<DateTime<Utc>> = all
        .iter()
        .map(|m| m["timestamp"].as_str().unwrap().parse().unwrap())
        .collect();
    assert!(stamps.windows(2).all(|w| w[0] >= w[1]));
}

#[tokio::test]
async fn test_list_rejects_bad_params() {
    let app = spawn_app().await;

    let res = app.get_authed(KEY, "/api/v1/messages?limit=101").await;
    assert_eq!(res.status(), 400);

    let res = app.get_authed(KEY, "/api/v1/messages?limit=0").await;
    assert_eq!(res.status(), 400);

    let res = app
        .get_authed(KEY, "/api/v1/messages?start_key=not-a-token")
        .await;
    assert_eq!(res.status(), 400);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"]["details"]["field"], "start_key");
}

#[tokio::test]
async fn test_empty_start_key_returns_first_page() {
    let app = spawn_app().await;
    for i in 0..3 {
        app.post_message(KEY, json!({"agent_name": "bot", "message_text": format!("msg {i}")}))
            .await;
    }

    let res = app.get_authed(KEY, "/api/v1/messages?start_key=").await;
    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["messages"].as_array().unwrap().len(), 3);
    assert!(body["next_key"].is_null());
}

#[tokio::test]
async fn test_rate_limit_per_key() {
    let app = spawn_app_with_limit(3).await;

    for _ in 0..3 {
        let res = app.get_authed(KEY, "/api/v1/messages").await;
        assert_eq!(res.status(), 200);
    }

    let res = app.get_authed(KEY, "/api/v1/messages").await;
    assert_eq!(res.status(), 429);
    let retry_after: u64 = res.headers()["retry-after"]
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!(retry_after >= 1 && retry_after <= 60);
    let body: Value = res.json().await.unwrap();
    assert_eq!(error_code(&body), "RATE_LIMIT_EXCEEDED");
    assert_eq!(body["error"]["details"]["retry_after_seconds"], retry_after);

    // Another key has its own quota
    let res = app.get_authed(OTHER_KEY, "/api/v1/messages").await;
    assert_eq!(res.status(), 200);
}

#[tokio::test]
async fn test_public_board_needs_no_auth_and_hides_metadata() {
    let app = spawn_app_with_limit(2).await;
    app.post_message(
        KEY,
        json!({"agent_name": "bot", "message_text": "public hello", "metadata": {"secret": 1}}),
    )
    .await;

    // Public reads never touch the rate limiter
    for _ in 0..5 {
        let res = app
            .client
            .get(app.url("/api/public/messages"))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), 200);
        let body: Value = res.json().await.unwrap();
        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].get("metadata").is_none());
        assert_eq!(messages[0]["message_text"], "public hello");
        assert!(body.get("next_key").is_none());
    }
}

#[tokio::test]
async fn test_public_board_caps_at_fifty() {
    let app = spawn_app().await;
    for i in 0..55 {
        app.post_message(KEY, json!({"agent_name": "bot", "message_text": format!("m{i}")}))
            .await;
    }
    let body: Value = app
        .client
        .get(app.url("/api/public/messages"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let messages = body["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 50);
    assert_eq!(messages[0]["message_text"], "m54");
}

#[tokio::test]
async fn test_health_and_descriptor() {
    let app = spawn_app_with_limit(7).await;

    let health: Value = app
        .client
        .get(app.url("/health"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "healthy");
    assert!(
        health["timestamp"]
            .as_str()
            .unwrap()
            .parse::<DateTime<Utc>>()
            .is_ok()
    );

    let res = app
        .client
        .get(app.url("/.well-known/agent.json"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let descriptor: Value = res.json().await.unwrap();
    assert_eq!(descriptor["protocol_version"], "1.0");
    assert_eq!(
        descriptor["capabilities"]["rate_limiting"]["requests_per_window"],
        7
    );
    assert_eq!(
        descriptor["endpoints"]["public_messages"]["authentication_required"],
        false
    );
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let app = spawn_app().await;
    app.client.get(app.url("/health")).send().await.unwrap();

    let res = app.client.get(app.url("/metrics")).send().await.unwrap();
    assert_eq!(res.status(), 200);
    let text = res.text().await.unwrap();
    assert!(text.contains("guestbook_requests_total"));
}

#[tokio::test]
async fn test_cors_headers_on_public_board() {
    let app = spawn_app().await;

    let res = app
        .client
        .get(app.url("/api/public/messages"))
        .header("origin", "https://agents.example.org")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.headers()["access-control-allow-origin"], "*");

    // Preflight is answered without credentials
    let res = app
        .client
        .request(reqwest::Method::OPTIONS, app.url("/api/v1/messages"))
        .header("origin", "https://agents.example.org")
        .header("access-control-request-method", "POST")
        .header("access-control-request-headers", "authorization, content-type")
        .send()
        .await
        .unwrap();
    assert!(res.status().is_success());
    assert_eq!(res.headers()["access-control-allow-origin"], "*");
    assert!(res.headers().contains_key("access-control-allow-methods"));
}
