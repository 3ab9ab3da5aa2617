use std::collections::HashMap;
use std::sync::Arc;

use anyhow::anyhow;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use phishsim_core::template::has_link_placeholder;
use phishsim_duckdb::campaign::CreateCampaignParams;

use crate::{error::AppError, state::AppState};

#[derive(Debug, Deserialize)]
pub struct CreateCampaignRequest {
    pub name: String,
    pub email_subject: String,
    pub email_body: String,
    pub from_address: String,
}

/// `GET /api/campaigns` — all campaigns, newest first.
pub async fn list_campaigns(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    let campaigns = state
        .db
        .list_campaigns()
        .await
        .map_err(AppError::Internal)?;
    Ok(Json(campaigns))
}

/// `POST /api/campaigns` — create a campaign in `draft` status.
///
/// Rejects a body without the `{{Link}}` placeholder up front: such a
/// campaign could never produce a measurable click, so dispatch would be
/// pointless and the mistake should surface at creation, not send time.
pub async fn create_campaign(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateCampaignRequest>,
) -> Result<impl IntoResponse, AppError> {
    if req.name.trim().is_empty()
        || req.email_subject.trim().is_empty()
        || req.email_body.trim().is_empty()
        || req.from_address.trim().is_empty()
    {
        return Err(AppError::BadRequest(
            "name, email_subject, email_body and from_address are required".to_string(),
        ));
    }
    if !has_link_placeholder(&req.email_body) {
        return Err(AppError::BadRequest(
            "email_body must contain the {{Link}} placeholder".to_string(),
        ));
    }

    let campaign = state
        .db
        .create_campaign(CreateCampaignParams {
            name: req.name,
            email_subject: req.email_subject,
            email_body: req.email_body,
            from_address: req.from_address,
        })
        .await
        .map_err(AppError::Internal)?;

    Ok((StatusCode::CREATED, Json(campaign)))
}

/// `GET /api/campaigns/{id}` — campaign detail with targets and their
/// nested engagement events, the shape the dashboard detail page renders.
pub async fn get_campaign(
    State(state): State<Arc<AppState>>,
    Path(campaign_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let campaign = state
        .db
        .get_campaign(&campaign_id)
        .await
        .map_err(AppError::Internal)?
        .ok_or_else(|| AppError::NotFound("Campaign not found".to_string()))?;

    let targets = state
        .db
        .list_targets(&campaign_id)
        .await
        .map_err(AppError::Internal)?;
    let events = state
        .db
        .list_events_for_campaign(&campaign_id)
        .await
        .map_err(AppError::Internal)?;

    // Bucket events under their targets; meta round-trips from its stored
    // JSON string back to an object for the dashboard.
    let mut by_target: HashMap<String, Vec<Value>> = HashMap::new();
    for event in events {
        let meta = event
            .meta
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok())
            .unwrap_or(Value::Null);
        by_target.entry(event.target_id.clone()).or_default().push(json!({
            "id": event.id,
            "target_id": event.target_id,
            "event_type": event.event_type,
            "meta": meta,
            "created_at": event.created_at,
        }));
    }

    let targets_json: Vec<Value> = targets
        .into_iter()
        .map(|target| {
            let events = by_target.remove(&target.id).unwrap_or_default();
            let mut value = serde_json::to_value(&target).unwrap_or(Value::Null);
            if let Value::Object(ref mut map) = value {
                map.insert("events".to_string(), Value::Array(events));
            }
            value
        })
        .collect();

    let mut body = serde_json::to_value(&campaign)
        .map_err(|e| AppError::Internal(anyhow!("campaign serialization failed: {e}")))?;
    if let Value::Object(ref mut map) = body {
        map.insert("targets".to_string(), Value::Array(targets_json));
    }
    Ok(Json(body))
}

/// `DELETE /api/campaigns/{id}` — the only way campaign data leaves the
/// store; engagement history is never expired by time.
pub async fn delete_campaign(
    State(state): State<Arc<AppState>>,
    Path(campaign_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let deleted = state
        .db
        .delete_campaign(&campaign_id)
        .await
        .map_err(AppError::Internal)?;
    if !deleted {
        return Err(AppError::NotFound("Campaign not found".to_string()));
    }
    Ok(StatusCode::NO_CONTENT)
}
