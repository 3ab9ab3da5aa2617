//! Aggregated engagement statistics shared by the storage layer and the
//! HTTP surface.

use serde::Serialize;

use crate::error::CoreError;

/// Overall funnel counts for one campaign (or all campaigns).
///
/// `opened`/`clicked`/`submitted` count distinct targets that reached the
/// stage at least once, never raw event counts. All rates use
/// `emails_sent` as the denominator — unsent targets never had an
/// opportunity to engage.
#[derive(Debug, Clone, Serialize)]
pub struct CampaignStats {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub campaign_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub campaign_name: Option<String>,
    pub total_targets: i64,
    pub emails_sent: i64,
    pub opened: i64,
    pub clicked: i64,
    pub submitted: i64,
    pub open_rate: f64,
    pub click_rate: f64,
    pub submit_rate: f64,
}

/// Funnel counts for one partition of targets (a department, a role).
/// Each group's rates use that group's own sent-count denominator.
#[derive(Debug, Clone, Serialize)]
pub struct GroupStats {
    pub group: String,
    pub total_targets: i64,
    pub emails_sent: i64,
    pub opened: i64,
    pub clicked: i64,
    pub submitted: i64,
    pub open_rate: f64,
    pub click_rate: f64,
    pub submit_rate: f64,
}

/// Whitelisted grouping fields for `?group_by=`.
///
/// The grouping column is spliced into SQL as an identifier, so it must
/// come from this enum, never from caller input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupBy {
    Department,
    Role,
}

impl GroupBy {
    pub fn parse(raw: Option<&str>) -> Result<Self, CoreError> {
        match raw.map(str::trim) {
            None | Some("") | Some("department") => Ok(Self::Department),
            Some("role") => Ok(Self::Role),
            Some(other) => Err(CoreError::UnknownGroupBy(other.to_string())),
        }
    }

    pub fn column(&self) -> &'static str {
        match self {
            GroupBy::Department => "department",
            GroupBy::Role => "role",
        }
    }
}

/// Percentage rate rounded to one decimal. Zero denominator is a valid
/// state (nothing sent yet) and yields 0.0, never NaN.
pub fn rate(numerator: i64, denominator: i64) -> f64 {
    if denominator == 0 {
        return 0.0;
    }
    (numerator as f64 / denominator as f64 * 1000.0).round() / 10.0
}
