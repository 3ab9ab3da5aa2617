use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use phishsim_core::stats::{CampaignStats, GroupBy};

use crate::{error::AppError, state::AppState};

#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    pub group_by: Option<String>,
}

/// Clicks imply opens (the click recorder backfills an implicit open), so
/// `clicked > opened` should be impossible. It is not structurally
/// enforced — if it shows up, event recording is buggy and monitoring
/// should see it, not a silent correction.
fn check_funnel(stats: &CampaignStats, scope: &str) {
    if stats.clicked > stats.opened {
        warn!(
            scope = %scope,
            clicked = stats.clicked,
            opened = stats.opened,
            "clicked exceeds opened — event recording anomaly"
        );
    }
}

/// `GET /api/campaigns/{id}/stats?group_by=` — per-campaign funnel plus
/// grouped breakdown (department by default).
pub async fn campaign_stats(
    State(state): State<Arc<AppState>>,
    Path(campaign_id): Path<String>,
    Query(query): Query<StatsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let group_by = GroupBy::parse(query.group_by.as_deref())
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let campaign = state
        .db
        .get_campaign(&campaign_id)
        .await
        .map_err(AppError::Internal)?
        .ok_or_else(|| AppError::NotFound("Campaign not found".to_string()))?;

    let overall = state
        .db
        .campaign_stats(&campaign_id, &campaign.name)
        .await
        .map_err(AppError::Internal)?;
    check_funnel(&overall, &campaign_id);

    let groups = state
        .db
        .grouped_stats(Some(&campaign_id), group_by)
        .await
        .map_err(AppError::Internal)?;

    Ok(Json(json!({
        "campaign": campaign,
        "overall_stats": overall,
        "department_stats": groups,
        "grouped_by": group_by.column(),
    })))
}

/// `GET /api/stats?group_by=` — cross-campaign view: totals over every
/// campaign, one stat row per campaign, and the grouped breakdown across
/// all targets.
pub async fn overall_stats(
    State(state): State<Arc<AppState>>,
    Query(query): Query<StatsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let group_by = GroupBy::parse(query.group_by.as_deref())
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let overall = state
        .db
        .overall_stats()
        .await
        .map_err(AppError::Internal)?;
    check_funnel(&overall, "all-campaigns");

    let campaigns = state
        .db
        .list_campaigns()
        .await
        .map_err(AppError::Internal)?;
    let mut campaign_stats = Vec::with_capacity(campaigns.len());
    for campaign in &campaigns {
        campaign_stats.push(
            state
                .db
                .campaign_stats(&campaign.id, &campaign.name)
                .await
                .map_err(AppError::Internal)?,
        );
    }

    let grouped = state
        .db
        .grouped_stats(None, group_by)
        .await
        .map_err(AppError::Internal)?;

    Ok(Json(json!({
        "overall_stats": overall,
        "campaign_stats": campaign_stats,
        "grouped_stats": grouped,
        "grouped_by": group_by.column(),
    })))
}
