use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, StatusCode},
    response::Response,
};

use phishsim_duckdb::export::ExportRow;

use crate::{error::AppError, state::AppState};

/// `GET /api/campaigns/{id}/export` — download campaign results as CSV.
///
/// One row per target, sent or not; a target with no events gets empty
/// event cells, never missing columns. Response:
/// `Content-Type: text/csv` with `Content-Disposition: attachment`.
#[tracing::instrument(skip(state))]
pub async fn export_results(
    State(state): State<Arc<AppState>>,
    Path(campaign_id): Path<String>,
) -> Result<Response, AppError> {
    if !state
        .db
        .campaign_exists(&campaign_id)
        .await
        .map_err(AppError::Internal)?
    {
        return Err(AppError::NotFound("Campaign not found".to_string()));
    }

    let rows = state
        .db
        .export_rows(&campaign_id)
        .await
        .map_err(AppError::Internal)?;

    let csv_bytes = Bytes::from(build_csv(&rows).map_err(AppError::Internal)?);
    let filename = format!("campaign_{campaign_id}_results.csv");
    build_csv_response(&filename, csv_bytes)
}

/// Sanitize a CSV field value against formula injection.
///
/// Spreadsheet apps (Excel, Google Sheets, LibreOffice) interpret values
/// that begin with `=`, `+`, `-`, `@`, TAB, or CR as formula expressions.
/// Prepending a single quote (`'`) causes them to treat the value as a
/// literal string. Imported target names and departments are
/// admin-supplied CSV text, exactly the kind of value that ends up back
/// in a spreadsheet.
fn sanitize_csv_field(val: &str) -> std::borrow::Cow<'_, str> {
    if val.starts_with(['=', '+', '-', '@', '\t', '\r']) {
        std::borrow::Cow::Owned(format!("'{val}"))
    } else {
        std::borrow::Cow::Borrowed(val)
    }
}

fn bool_str(v: bool) -> &'static str {
    if v {
        "true"
    } else {
        "false"
    }
}

fn build_csv(rows: &[ExportRow]) -> anyhow::Result<Vec<u8>> {
    let mut wtr = csv::Writer::from_writer(Vec::with_capacity(rows.len().saturating_mul(128)));

    wtr.write_record([
        "name",
        "email",
        "department",
        "role",
        "sent",
        "opened",
        "clicked",
        "submitted",
        "first_opened",
        "first_clicked",
        "first_submitted",
    ])
    .map_err(|e| anyhow::anyhow!("csv write_record failed: {e}"))?;

    for row in rows {
        let name = sanitize_csv_field(&row.name);
        let email = sanitize_csv_field(&row.email);
        let department = sanitize_csv_field(&row.department);
        let role = sanitize_csv_field(&row.role);

        wtr.write_record([
            name.as_ref(),
            email.as_ref(),
            department.as_ref(),
            role.as_ref(),
            bool_str(row.sent),
            bool_str(row.opened()),
            bool_str(row.clicked()),
            bool_str(row.submitted()),
            row.first_opened.as_deref().unwrap_or(""),
            row.first_clicked.as_deref().unwrap_or(""),
            row.first_submitted.as_deref().unwrap_or(""),
        ])
        .map_err(|e| anyhow::anyhow!("csv write_record failed: {e}"))?;
    }

    wtr.into_inner()
        .map_err(|e| anyhow::anyhow!("csv flush failed: {e}"))
}

fn build_csv_response(filename: &str, csv_bytes: Bytes) -> Result<Response, AppError> {
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/csv; charset=utf-8")
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{filename}\""),
        )
        .body(axum::body::Body::from(csv_bytes))
        .map_err(|e| AppError::Internal(anyhow::anyhow!("response build failed: {e}")))
}
