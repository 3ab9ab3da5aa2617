use anyhow::Result;
use serde::Serialize;

use phishsim_core::campaign::CampaignStatus;

use crate::DuckDbBackend;

/// One row of the `campaigns` table. Timestamps are read back as
/// `CAST(... AS VARCHAR)` strings for serialization to the dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct Campaign {
    pub id: String,
    pub name: String,
    pub email_subject: String,
    pub email_body: String,
    pub from_address: String,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

pub struct CreateCampaignParams {
    pub name: String,
    pub email_subject: String,
    pub email_body: String,
    pub from_address: String,
}

const CAMPAIGN_COLUMNS: &str = "id, name, email_subject, email_body, from_address, status, \
     CAST(created_at AS VARCHAR), CAST(updated_at AS VARCHAR)";

fn row_to_campaign(row: &duckdb::Row<'_>) -> duckdb::Result<Campaign> {
    Ok(Campaign {
        id: row.get(0)?,
        name: row.get(1)?,
        email_subject: row.get(2)?,
        email_body: row.get(3)?,
        from_address: row.get(4)?,
        status: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

impl DuckDbBackend {
    /// Insert a campaign in `draft` status and read the row back so the
    /// response carries the DB-assigned timestamps.
    ///
    /// Template validation ({{Link}} presence, non-empty fields) happens
    /// in the HTTP layer before this is called.
    pub async fn create_campaign(&self, params: CreateCampaignParams) -> Result<Campaign> {
        let conn = self.conn.lock().await;
        let id = uuid::Uuid::new_v4().to_string();

        conn.execute(
            "INSERT INTO campaigns (id, name, email_subject, email_body, from_address, status, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, 'draft', CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)",
            duckdb::params![
                id,
                params.name,
                params.email_subject,
                params.email_body,
                params.from_address
            ],
        )?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {CAMPAIGN_COLUMNS} FROM campaigns WHERE id = ?1"
        ))?;
        let campaign = stmt.query_row(duckdb::params![id], |row| row_to_campaign(row))?;
        Ok(campaign)
    }

    /// All campaigns, newest first — the dashboard list view.
    pub async fn list_campaigns(&self) -> Result<Vec<Campaign>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(&format!(
            "SELECT {CAMPAIGN_COLUMNS} FROM campaigns ORDER BY created_at DESC, id"
        ))?;
        let rows = stmt.query_map([], |row| row_to_campaign(row))?;

        let mut campaigns = Vec::new();
        for row in rows {
            campaigns.push(row?);
        }
        Ok(campaigns)
    }

    pub async fn get_campaign(&self, id: &str) -> Result<Option<Campaign>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(&format!(
            "SELECT {CAMPAIGN_COLUMNS} FROM campaigns WHERE id = ?1"
        ))?;
        let result = stmt
            .query_row(duckdb::params![id], |row| row_to_campaign(row))
            .ok();
        Ok(result)
    }

    pub async fn campaign_exists(&self, id: &str) -> Result<bool> {
        let conn = self.conn.lock().await;
        let count: i64 = conn
            .prepare("SELECT COUNT(*) FROM campaigns WHERE id = ?1")?
            .query_row(duckdb::params![id], |row| row.get(0))?;
        Ok(count > 0)
    }

    pub async fn set_campaign_status(&self, id: &str, status: CampaignStatus) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "UPDATE campaigns SET status = ?1, updated_at = CURRENT_TIMESTAMP WHERE id = ?2",
            duckdb::params![status.as_str(), id],
        )?;
        Ok(())
    }

    /// Crash recovery, run once at startup: a campaign persisted as
    /// `sending` means the process died mid-batch. Reset to `draft` so the
    /// next send is not rejected as already in flight. Returns the number
    /// of campaigns reset.
    pub async fn reset_interrupted_sends(&self) -> Result<usize> {
        let conn = self.conn.lock().await;
        let reset = conn.execute(
            "UPDATE campaigns SET status = 'draft', updated_at = CURRENT_TIMESTAMP \
             WHERE status = 'sending'",
            [],
        )?;
        Ok(reset)
    }

    /// Delete a campaign and everything it owns.
    ///
    /// No FKs in the schema — cascade manually, children first:
    /// events → targets → campaign. Engagement data lives until this
    /// explicit delete; there is no time-based expiry.
    pub async fn delete_campaign(&self, id: &str) -> Result<bool> {
        let conn = self.conn.lock().await;

        let exists: i64 = conn
            .prepare("SELECT COUNT(*) FROM campaigns WHERE id = ?1")?
            .query_row(duckdb::params![id], |row| row.get(0))?;
        if exists == 0 {
            return Ok(false);
        }

        conn.execute(
            "DELETE FROM events WHERE target_id IN (SELECT id FROM targets WHERE campaign_id = ?1)",
            duckdb::params![id],
        )?;
        conn.execute(
            "DELETE FROM targets WHERE campaign_id = ?1",
            duckdb::params![id],
        )?;
        conn.execute("DELETE FROM campaigns WHERE id = ?1", duckdb::params![id])?;

        Ok(true)
    }
}
