use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use phishsim_core::campaign::{EventType, ImportRow};
use phishsim_core::config::{Config, SmtpConfig};
use phishsim_duckdb::DuckDbBackend;
use phishsim_server::app::build_app;
use phishsim_server::mailer::NoopMailer;
use phishsim_server::state::AppState;

/// Build a test Config with sensible defaults for integration tests.
fn test_config() -> Config {
    Config {
        port: 0,
        data_dir: "/tmp/phishsim-test".to_string(),
        public_url: "http://localhost:8080".to_string(),
        landing_url: "http://localhost:3000/landing".to_string(),
        smtp: SmtpConfig {
            host: "localhost".to_string(),
            port: 587,
            username: None,
            password: None,
            noop: true,
        },
        send_timeout_secs: 2,
        send_retries: 0,
        send_retry_backoff_ms: 0,
        send_delay_ms: 0,
        duckdb_memory_limit: "1GB".to_string(),
    }
}

/// Create a fresh in-memory backend + state + app for each test.
fn setup() -> (Arc<AppState>, axum::Router) {
    let db = DuckDbBackend::open_in_memory().expect("in-memory DuckDB");
    let state = Arc::new(AppState::new(db, test_config(), Arc::new(NoopMailer)));
    let app = build_app(Arc::clone(&state));
    (state, app)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("build request")
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("build request")
}

async fn json_body(response: axum::http::Response<Body>) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("read body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("parse JSON")
}

fn campaign_request() -> Value {
    json!({
        "name": "Q3 awareness drill",
        "email_subject": "Action required, {{Name}}",
        "email_body": "<p>Hi {{Name}}, please verify your account: {{Link}}</p>",
        "from_address": "it-support@corp.example",
    })
}

#[tokio::test]
async fn create_campaign_returns_201_draft() {
    let (_state, app) = setup();

    let response = app
        .oneshot(post_json("/api/campaigns", campaign_request()))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = json_body(response).await;
    assert_eq!(body["name"], "Q3 awareness drill");
    assert_eq!(body["status"], "draft");
    assert!(body["id"].as_str().map(|s| !s.is_empty()).unwrap_or(false));
    assert!(body["created_at"].is_string());
}

#[tokio::test]
async fn create_without_link_placeholder_is_rejected() {
    let (_state, app) = setup();

    let mut req = campaign_request();
    req["email_body"] = json!("<p>Hi {{Name}}, nothing to click here</p>");
    let response = app
        .oneshot(post_json("/api/campaigns", req))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "validation_error");
}

#[tokio::test]
async fn create_with_missing_fields_is_rejected() {
    let (_state, app) = setup();

    let mut req = campaign_request();
    req["from_address"] = json!("");
    let response = app
        .oneshot(post_json("/api/campaigns", req))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn list_returns_created_campaigns() {
    let (_state, app) = setup();

    app.clone()
        .oneshot(post_json("/api/campaigns", campaign_request()))
        .await
        .expect("create");

    let response = app.oneshot(get("/api/campaigns")).await.expect("list");
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    let campaigns = body.as_array().expect("array body");
    assert_eq!(campaigns.len(), 1);
    assert_eq!(campaigns[0]["name"], "Q3 awareness drill");
}

#[tokio::test]
async fn get_campaign_nests_targets_and_their_events() {
    let (state, app) = setup();

    let create = app
        .clone()
        .oneshot(post_json("/api/campaigns", campaign_request()))
        .await
        .expect("create");
    let campaign_id = json_body(create).await["id"]
        .as_str()
        .expect("id")
        .to_string();

    state
        .db
        .import_targets(
            &campaign_id,
            &[ImportRow {
                row: 2,
                email: "alice@example.com".to_string(),
                name: "Alice".to_string(),
                department: "Finance".to_string(),
                role: "Analyst".to_string(),
            }],
        )
        .await
        .expect("import");
    let token = state.db.list_targets(&campaign_id).await.expect("targets")[0]
        .token
        .clone();
    state
        .db
        .record_event(&token, EventType::Open, &json!({"ip": "203.0.113.9"}))
        .await
        .expect("record");

    let response = app
        .oneshot(get(&format!("/api/campaigns/{campaign_id}")))
        .await
        .expect("get");
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["id"], json!(campaign_id));
    let targets = body["targets"].as_array().expect("targets");
    assert_eq!(targets.len(), 1);
    assert_eq!(targets[0]["email"], "alice@example.com");
    let events = targets[0]["events"].as_array().expect("events");
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["event_type"], "open");
    // Stored meta string round-trips back to an object.
    assert_eq!(events[0]["meta"]["ip"], "203.0.113.9");
}

#[tokio::test]
async fn get_unknown_campaign_is_404() {
    let (_state, app) = setup();
    let response = app
        .oneshot(get("/api/campaigns/no-such-campaign"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_campaign_removes_it() {
    let (_state, app) = setup();

    let create = app
        .clone()
        .oneshot(post_json("/api/campaigns", campaign_request()))
        .await
        .expect("create");
    let campaign_id = json_body(create).await["id"]
        .as_str()
        .expect("id")
        .to_string();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/campaigns/{campaign_id}"))
                .body(Body::empty())
                .expect("build request"),
        )
        .await
        .expect("delete");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .oneshot(get(&format!("/api/campaigns/{campaign_id}")))
        .await
        .expect("get after delete");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unknown_paths_are_404() {
    let (_state, app) = setup();
    let response = app
        .oneshot(get("/api/does-not-exist"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
