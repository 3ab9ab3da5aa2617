use std::sync::Arc;

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};

use crate::{dispatch, error::AppError, state::AppState};

/// `POST /api/campaigns/{id}/send` — dispatch the campaign.
///
/// Runs the whole batch and answers with the outcome: targets newly sent,
/// target ids whose transport attempt failed (left unsent for a retry
/// send), and targets skipped because an earlier send already reached
/// them. A concurrent send for the same campaign gets 409.
#[tracing::instrument(skip(state))]
pub async fn send_campaign(
    State(state): State<Arc<AppState>>,
    Path(campaign_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let outcome = dispatch::send_campaign(&state, &campaign_id).await?;
    Ok(Json(outcome))
}
