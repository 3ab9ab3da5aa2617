use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use phishsim_core::campaign::{EventType, ImportRow};
use phishsim_core::config::{Config, SmtpConfig};
use phishsim_duckdb::campaign::CreateCampaignParams;
use phishsim_duckdb::DuckDbBackend;
use phishsim_server::app::build_app;
use phishsim_server::mailer::NoopMailer;
use phishsim_server::state::AppState;

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

async fn json_body(response: axum::http::Response<Body>) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("read body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("parse JSON")
}

struct Seeded {
    campaign_id: String,
    tokens: Vec<String>,
    target_ids: Vec<String>,
}

/// Seed a campaign with targets `(email, department, role)`.
async fn seed(state: &AppState, targets: &[(&str, &str, &str)]) -> Seeded {
    let campaign = state
        .db
        .create_campaign(CreateCampaignParams {
            name: "Drill".to_string(),
            email_subject: "Hello".to_string(),
            email_body: "<p>{{Link}}</p>".to_string(),
            from_address: "it@corp.example".to_string(),
        })
        .await
        .expect("create campaign");
    let rows: Vec<ImportRow> = targets
        .iter()
        .enumerate()
        .map(|(i, (email, department, role))| ImportRow {
            row: i + 2,
            email: email.to_string(),
            name: String::new(),
            department: department.to_string(),
            role: role.to_string(),
        })
        .collect();
    state
        .db
        .import_targets(&campaign.id, &rows)
        .await
        .expect("import");

    // Index stored targets back into the order of the `targets` argument
    // so tests can address them positionally.
    let stored = state.db.list_targets(&campaign.id).await.expect("targets");
    let mut tokens = Vec::with_capacity(targets.len());
    let mut target_ids = Vec::with_capacity(targets.len());
    for (email, _, _) in targets {
        let target = stored
            .iter()
            .find(|t| t.email == *email)
            .expect("stored target");
        tokens.push(target.token.clone());
        target_ids.push(target.id.clone());
    }
    Seeded {
        campaign_id: campaign.id,
        tokens,
        target_ids,
    }
}

/// The end-to-end scenario from the dashboard's chart view: 4 targets,
/// 3 sent, 2 of those open, 1 of the openers clicks, nobody submits.
#[tokio::test]
async fn funnel_counts_and_rates_over_sent_denominator() {
    let (state, app) = setup();
    let seeded = seed(
        &state,
        &[
            ("a@example.com", "Finance", ""),
            ("b@example.com", "Finance", ""),
            ("c@example.com", "Sales", ""),
            ("d@example.com", "Sales", ""),
        ],
    )
    .await;

    for target_id in &seeded.target_ids[0..3] {
        state.db.mark_target_sent(target_id).await.expect("mark sent");
    }
    state
        .db
        .record_event(&seeded.tokens[0], EventType::Open, &json!({}))
        .await
        .expect("open a");
    state
        .db
        .record_event(&seeded.tokens[1], EventType::Open, &json!({}))
        .await
        .expect("open b");
    state
        .db
        .record_event(&seeded.tokens[0], EventType::Click, &json!({}))
        .await
        .expect("click a");

    let response = app
        .oneshot(get(&format!("/api/campaigns/{}/stats", seeded.campaign_id)))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    let overall = &body["overall_stats"];
    assert_eq!(overall["total_targets"], 4);
    assert_eq!(overall["emails_sent"], 3);
    assert_eq!(overall["opened"], 2);
    assert_eq!(overall["clicked"], 1);
    assert_eq!(overall["submitted"], 0);
    assert_eq!(overall["open_rate"], 66.7);
    assert_eq!(overall["click_rate"], 33.3);
    assert_eq!(overall["submit_rate"], 0.0);
    assert_eq!(body["grouped_by"], "department");
}

#[tokio::test]
async fn click_without_prior_open_still_credits_the_open_stage() {
    let (state, app) = setup();
    let seeded = seed(&state, &[("a@example.com", "", "")]).await;
    state
        .db
        .mark_target_sent(&seeded.target_ids[0])
        .await
        .expect("mark sent");

    // Pixel was blocked; only the link got through.
    state
        .db
        .record_event(&seeded.tokens[0], EventType::Click, &json!({}))
        .await
        .expect("click");

    let body = json_body(
        app.oneshot(get(&format!("/api/campaigns/{}/stats", seeded.campaign_id)))
            .await
            .expect("response"),
    )
    .await;
    assert_eq!(body["overall_stats"]["opened"], 1);
    assert_eq!(body["overall_stats"]["clicked"], 1);
}

#[tokio::test]
async fn group_with_zero_sent_reports_zero_rates() {
    let (state, app) = setup();
    let seeded = seed(
        &state,
        &[("a@example.com", "Finance", ""), ("b@example.com", "Legal", "")],
    )
    .await;
    // Only Finance gets sent to.
    state
        .db
        .mark_target_sent(&seeded.target_ids[0])
        .await
        .expect("mark sent");

    let body = json_body(
        app.oneshot(get(&format!("/api/campaigns/{}/stats", seeded.campaign_id)))
            .await
            .expect("response"),
    )
    .await;
    let groups = body["department_stats"].as_array().expect("groups");
    let legal = groups
        .iter()
        .find(|g| g["group"] == "Legal")
        .expect("legal group");
    assert_eq!(legal["emails_sent"], 0);
    assert_eq!(legal["open_rate"], 0.0);
    assert_eq!(legal["click_rate"], 0.0);
    assert_eq!(legal["submit_rate"], 0.0);
}

#[tokio::test]
async fn group_by_role_partitions_by_role() {
    let (state, app) = setup();
    let seeded = seed(
        &state,
        &[
            ("a@example.com", "Finance", "Analyst"),
            ("b@example.com", "Finance", "Manager"),
        ],
    )
    .await;
    state
        .db
        .mark_target_sent(&seeded.target_ids[0])
        .await
        .expect("mark sent");

    let body = json_body(
        app.oneshot(get(&format!(
            "/api/campaigns/{}/stats?group_by=role",
            seeded.campaign_id
        )))
        .await
        .expect("response"),
    )
    .await;
    assert_eq!(body["grouped_by"], "role");
    let groups = body["department_stats"].as_array().expect("groups");
    let names: Vec<&str> = groups
        .iter()
        .filter_map(|g| g["group"].as_str())
        .collect();
    assert!(names.contains(&"Analyst"));
    assert!(names.contains(&"Manager"));
}

#[tokio::test]
async fn unsupported_group_by_is_rejected() {
    let (state, app) = setup();
    let seeded = seed(&state, &[("a@example.com", "", "")]).await;

    let response = app
        .oneshot(get(&format!(
            "/api/campaigns/{}/stats?group_by=manager",
            seeded.campaign_id
        )))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn stats_for_unknown_campaign_is_404() {
    let (_state, app) = setup();
    let response = app
        .oneshot(get("/api/campaigns/no-such-campaign/stats"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn cross_campaign_stats_aggregate_and_break_down_per_campaign() {
    let (state, app) = setup();
    let first = seed(&state, &[("a@example.com", "Finance", "")]).await;
    let second = seed(&state, &[("b@example.com", "Sales", "")]).await;
    state
        .db
        .mark_target_sent(&first.target_ids[0])
        .await
        .expect("mark sent");
    state
        .db
        .mark_target_sent(&second.target_ids[0])
        .await
        .expect("mark sent");
    state
        .db
        .record_event(&first.tokens[0], EventType::Open, &json!({}))
        .await
        .expect("open");

    let response = app.oneshot(get("/api/stats")).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["overall_stats"]["total_targets"], 2);
    assert_eq!(body["overall_stats"]["emails_sent"], 2);
    assert_eq!(body["overall_stats"]["opened"], 1);
    assert_eq!(body["overall_stats"]["open_rate"], 50.0);

    let campaign_stats = body["campaign_stats"].as_array().expect("campaign stats");
    assert_eq!(campaign_stats.len(), 2);
    assert!(campaign_stats
        .iter()
        .any(|c| c["campaign_id"] == json!(first.campaign_id) && c["opened"] == 1));

    let grouped = body["grouped_stats"].as_array().expect("grouped");
    assert!(grouped.iter().any(|g| g["group"] == "Finance"));
    assert!(grouped.iter().any(|g| g["group"] == "Sales"));
}
