use std::sync::Arc;

use tracing::{info, warn};

use phishsim_core::{
    campaign::{CampaignStatus, DispatchOutcome},
    template::{self, TemplateVars},
};
use phishsim_duckdb::{campaign::Campaign, target::Target};

use crate::{error::AppError, state::AppState};

/// Dispatch the campaign to every target not yet sent.
///
/// Single-flight per campaign: a competing call while a batch is running
/// gets [`AppError::SendInProgress`] (409). Already-sent targets are
/// skipped, not re-sent, so calling this again after a partial failure
/// only re-attempts the failures.
///
/// The campaign is marked `sending` for the duration of the batch and
/// ends as `sent` when every target has gone out, otherwise back to
/// `draft`. The in-memory slot is released on every exit path via the
/// guard, so an error here never wedges the campaign.
pub async fn send_campaign(
    state: &Arc<AppState>,
    campaign_id: &str,
) -> Result<DispatchOutcome, AppError> {
    let campaign = state
        .db
        .get_campaign(campaign_id)
        .await
        .map_err(AppError::Internal)?
        .ok_or_else(|| AppError::NotFound("Campaign not found".to_string()))?;

    let _guard = state
        .try_begin_send(campaign_id)
        .ok_or(AppError::SendInProgress)?;

    state
        .db
        .set_campaign_status(campaign_id, CampaignStatus::Sending)
        .await
        .map_err(AppError::Internal)?;

    let result = run_batch(state, &campaign).await;

    // Settle the persisted status on both exit paths before reporting.
    let final_status = match &result {
        Ok(outcome) if outcome.failed.is_empty() && outcome.sent + outcome.skipped > 0 => {
            CampaignStatus::Sent
        }
        _ => CampaignStatus::Draft,
    };
    state
        .db
        .set_campaign_status(campaign_id, final_status)
        .await
        .map_err(AppError::Internal)?;

    let outcome = result?;
    info!(
        campaign_id = %campaign_id,
        sent = outcome.sent,
        failed = outcome.failed.len(),
        skipped = outcome.skipped,
        "Dispatch batch finished"
    );
    Ok(outcome)
}

async fn run_batch(
    state: &Arc<AppState>,
    campaign: &Campaign,
) -> Result<DispatchOutcome, AppError> {
    let targets = state
        .db
        .list_targets(&campaign.id)
        .await
        .map_err(AppError::Internal)?;

    let skipped = targets.iter().filter(|t| t.sent).count();
    let eligible: Vec<Target> = targets.into_iter().filter(|t| !t.sent).collect();

    let mut sent = 0usize;
    let mut failed = Vec::new();

    for (i, target) in eligible.iter().enumerate() {
        // Pace the relay; the first target goes out immediately.
        if i > 0 && state.config.send_delay_ms > 0 {
            tokio::time::sleep(state.config.send_delay()).await;
        }

        match dispatch_one(state, campaign, target).await {
            Ok(()) => {
                state
                    .db
                    .mark_target_sent(&target.id)
                    .await
                    .map_err(AppError::Internal)?;
                sent += 1;
            }
            Err(err) => {
                warn!(
                    campaign_id = %campaign.id,
                    target_id = %target.id,
                    error = %err,
                    "Send failed; target stays unsent for retry"
                );
                failed.push(target.id.clone());
            }
        }
    }

    Ok(DispatchOutcome {
        sent,
        failed,
        skipped,
    })
}

/// Render and send one email. A timeout counts as failure — the target is
/// only marked sent on transport acceptance.
async fn dispatch_one(
    state: &Arc<AppState>,
    campaign: &Campaign,
    target: &Target,
) -> Result<(), String> {
    let vars = TemplateVars {
        name: &target.name,
        email: &target.email,
        department: &target.department,
        role: &target.role,
    };
    let subject = template::render(&campaign.email_subject, &vars);

    let tracking_link = format!("{}/t/{}", state.config.public_url, target.token);
    let tracking_pixel = format!(
        r#"<img src="{}/open/{}" width="1" height="1" style="display:none" />"#,
        state.config.public_url, target.token
    );
    let mut body = template::render(&campaign.email_body, &vars).replace("{{Link}}", &tracking_link);
    body.push_str(&tracking_pixel);

    let attempts = state.config.send_retries + 1;
    let mut last_err = String::new();
    for attempt in 0..attempts {
        if attempt > 0 {
            tokio::time::sleep(state.config.send_retry_backoff()).await;
        }
        let send = state
            .mailer
            .send(&campaign.from_address, &target.email, &subject, &body);
        match tokio::time::timeout(state.config.send_timeout(), send).await {
            Ok(Ok(())) => return Ok(()),
            Ok(Err(err)) => last_err = err,
            Err(_) => {
                last_err = format!(
                    "send timed out after {}s",
                    state.config.send_timeout_secs
                );
            }
        }
    }
    Err(last_err)
}
