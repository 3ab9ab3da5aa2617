use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, State},
    response::IntoResponse,
    Json,
};
use serde_json::json;

use phishsim_core::campaign::ImportRow;

use crate::{error::AppError, state::AppState};

/// `POST /api/campaigns/{id}/upload-targets` — CSV import.
///
/// Multipart form with a `file` field. Structural problems with the file
/// (no `email` column, nothing but a header) are a 400; everything at row
/// granularity — malformed row, bad email, duplicate — is a non-fatal
/// entry in `errors[]` and the rest of the batch still imports.
#[tracing::instrument(skip(state, multipart))]
pub async fn upload_targets(
    State(state): State<Arc<AppState>>,
    Path(campaign_id): Path<String>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    if !state
        .db
        .campaign_exists(&campaign_id)
        .await
        .map_err(AppError::Internal)?
    {
        return Err(AppError::NotFound("Campaign not found".to_string()));
    }

    let mut file_bytes = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("invalid multipart body: {e}")))?
    {
        if field.name() == Some("file") {
            file_bytes = Some(
                field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("failed to read file: {e}")))?,
            );
            break;
        }
    }
    let bytes = file_bytes
        .ok_or_else(|| AppError::BadRequest("no file uploaded".to_string()))?;

    let (rows, mut errors) = parse_csv(&bytes)?;

    let outcome = state
        .db
        .import_targets(&campaign_id, &rows)
        .await
        .map_err(AppError::Internal)?;
    errors.extend(outcome.errors);

    tracing::info!(
        campaign_id = %campaign_id,
        imported = outcome.imported,
        errors = errors.len(),
        "CSV import finished"
    );

    Ok(Json(json!({
        "imported": outcome.imported,
        "errors": errors,
    })))
}

/// Parse the uploaded CSV into import rows.
///
/// Header matching is case-insensitive and trimmed; columns the engine
/// doesn't know are ignored, and the optional name/department/role
/// columns default to empty when absent. Returned errors are row-level
/// (line numbers count the header as line 1).
fn parse_csv(bytes: &[u8]) -> Result<(Vec<ImportRow>, Vec<String>), AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(bytes);

    let headers = reader
        .headers()
        .map_err(|e| AppError::BadRequest(format!("failed to parse CSV: {e}")))?
        .clone();
    let mut index: HashMap<String, usize> = HashMap::new();
    for (i, column) in headers.iter().enumerate() {
        index.insert(column.trim().to_lowercase(), i);
    }

    let Some(&email_idx) = index.get("email") else {
        return Err(AppError::BadRequest(
            "CSV must contain an 'email' column".to_string(),
        ));
    };
    let name_idx = index.get("name").copied();
    let department_idx = index.get("department").copied();
    let role_idx = index.get("role").copied();

    let mut rows = Vec::new();
    let mut errors = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let line = i + 2;
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                errors.push(format!("row {line}: unreadable record: {e}"));
                continue;
            }
        };
        if record.len() != headers.len() {
            errors.push(format!(
                "row {line}: expected {} columns, got {}",
                headers.len(),
                record.len()
            ));
            continue;
        }

        let column = |idx: Option<usize>| -> String {
            idx.and_then(|i| record.get(i))
                .unwrap_or("")
                .trim()
                .to_string()
        };
        rows.push(ImportRow {
            row: line,
            email: column(Some(email_idx)),
            name: column(name_idx),
            department: column(department_idx),
            role: column(role_idx),
        });
    }

    if rows.is_empty() && errors.is_empty() {
        return Err(AppError::BadRequest(
            "CSV must contain a header and at least one data row".to_string(),
        ));
    }

    Ok((rows, errors))
}
