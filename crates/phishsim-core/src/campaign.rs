use serde::{Deserialize, Serialize};

/// Campaign lifecycle. Stored as a VARCHAR in the `campaigns` table.
///
/// `Sending` only ever exists while a dispatch batch is running — the server
/// resets any campaign still marked `sending` back to `draft` at startup so
/// a crash mid-batch cannot wedge a campaign permanently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CampaignStatus {
    Draft,
    Sending,
    Sent,
}

impl CampaignStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CampaignStatus::Draft => "draft",
            CampaignStatus::Sending => "sending",
            CampaignStatus::Sent => "sent",
        }
    }
}

/// The three engagement stages recorded by the tracking endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Open,
    Click,
    Submit,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Open => "open",
            EventType::Click => "click",
            EventType::Submit => "submit",
        }
    }
}

/// One parsed CSV data row handed to the target store.
///
/// `row` is the 1-based line number in the uploaded file (the header is
/// line 1, so data rows start at 2) — used to index import errors back to
/// the file the admin uploaded.
#[derive(Debug, Clone)]
pub struct ImportRow {
    pub row: usize,
    pub email: String,
    pub name: String,
    pub department: String,
    pub role: String,
}

/// Result of a CSV import. `errors` is row-indexed and non-fatal: a bad or
/// duplicate row never aborts the rest of the batch.
#[derive(Debug, Clone, Serialize)]
pub struct ImportOutcome {
    pub imported: usize,
    pub errors: Vec<String>,
}

/// Result of one dispatch batch.
///
/// `failed` holds target ids whose transport attempt was rejected or timed
/// out; those targets remain unsent so a later send re-attempts them.
/// `skipped` counts targets that were already sent before the batch started.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchOutcome {
    pub sent: usize,
    pub failed: Vec<String>,
    pub skipped: usize,
}
