use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use tracing::error;

use phishsim_core::campaign::EventType;

use crate::state::AppState;

/// 1×1 transparent GIF served for every pixel request.
const TRANSPARENT_GIF: &[u8] = &[
    71, 73, 70, 56, 57, 97, 1, 0, 1, 0, 128, 0, 0, 0, 0, 0, 255, 255, 255, 33, 249, 4, 1, 0, 0, 0,
    0, 44, 0, 0, 0, 0, 1, 0, 1, 0, 0, 2, 2, 68, 1, 0, 59,
];

/// These three handlers are the only externally reachable, unauthenticated
/// surface. The token is the whole credential, and every response is
/// success-shaped whether the token resolved or not: an unknown token must
/// be indistinguishable from a known one to a scanning attacker, so it is
/// swallowed silently and writes nothing. Mail-security scanners that
/// prefetch links will record events here — an accepted limitation of
/// pixel/link tracking, not something this layer tries to outguess.
///
/// A storage failure is logged but the response stays success-shaped too;
/// the tracked mail client should never see an error page because our
/// disk had a bad moment.
async fn record(state: &Arc<AppState>, token: &str, event_type: EventType, meta: Value) {
    match state.db.record_event(token, event_type, &meta).await {
        Ok(_known) => {}
        Err(e) => {
            error!(error = %e, event_type = event_type.as_str(), "Failed to persist tracking event");
        }
    }
}

fn request_meta(headers: &HeaderMap) -> Value {
    json!({
        "ip": client_ip(headers),
        "user_agent": header_str(headers, header::USER_AGENT.as_str()),
        "referer": header_str(headers, header::REFERER.as_str()),
    })
}

/// First entry of `X-Forwarded-For`, or "unknown" when absent (direct
/// connections land here when no proxy is in front).
fn client_ip(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn header_str(headers: &HeaderMap, name: &str) -> String {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string()
}

/// `GET /open/{token}` — tracking pixel. Always a 200 GIF.
#[tracing::instrument(skip(state, headers))]
pub async fn track_open(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
    headers: HeaderMap,
) -> Response {
    record(&state, &token, EventType::Open, request_meta(&headers)).await;
    pixel_response()
}

/// `GET /t/{token}` — tracked link. Records the click (and an implicit
/// open when none was seen) and forwards to the configured landing page
/// with the token attached, so the landing form can submit against it.
#[tracing::instrument(skip(state, headers))]
pub async fn track_click(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
    headers: HeaderMap,
) -> Response {
    record(&state, &token, EventType::Click, request_meta(&headers)).await;

    let location = format!("{}?token={}", state.config.landing_url, token);
    let mut response = Response::new(axum::body::Body::empty());
    *response.status_mut() = StatusCode::FOUND;
    if let Ok(value) = HeaderValue::from_str(&location) {
        response.headers_mut().insert(header::LOCATION, value);
    }
    response
}

/// `POST /submit/{token}` — the simulated credential form.
///
/// Captured secrets are never stored: any field whose name contains
/// "password" is reduced to a `{field}_length` count before the event is
/// written. Recording that a submission happened is the training signal;
/// the value itself is radioactive.
#[tracing::instrument(skip(state, headers, body))]
pub async fn track_submit(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> impl IntoResponse {
    // Lenient on purpose: a mangled body still answers success-shaped and
    // still records that a submission happened, just without fields.
    let fields: Value = serde_json::from_slice(&body).unwrap_or_else(|_| json!({}));
    let mut meta = request_meta(&headers);
    if let Value::Object(ref mut map) = meta {
        map.insert("form".to_string(), sanitize_form_fields(fields));
    }
    record(&state, &token, EventType::Submit, meta).await;

    Json(json!({
        "success": true,
        "message": "This was a security awareness test",
        "details": "You have submitted credentials to a simulated phishing page. \
                    In a real attack, your credentials would now be compromised. \
                    Please be cautious of suspicious emails and always verify the \
                    URL before entering sensitive information.",
    }))
}

fn sanitize_form_fields(fields: Value) -> Value {
    match fields {
        Value::Object(map) => {
            let mut out = serde_json::Map::new();
            for (key, value) in map {
                if key.to_lowercase().contains("password") {
                    let length = value.as_str().map(str::len).unwrap_or(0);
                    out.insert(format!("{key}_length"), Value::from(length));
                } else {
                    out.insert(key, value);
                }
            }
            Value::Object(out)
        }
        other => other,
    }
}

fn pixel_response() -> Response {
    let mut response = Response::new(axum::body::Body::from(TRANSPARENT_GIF));
    *response.status_mut() = StatusCode::OK;
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static("image/gif"));
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-store, no-cache, must-revalidate"),
    );
    response
        .headers_mut()
        .insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    response
}
