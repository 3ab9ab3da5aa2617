use std::collections::HashSet;

use anyhow::Result;
use serde::Serialize;

use phishsim_core::{
    campaign::{ImportOutcome, ImportRow},
    email::is_valid_email,
    token::new_token,
};

use crate::DuckDbBackend;

/// One row of the `targets` table.
#[derive(Debug, Clone, Serialize)]
pub struct Target {
    pub id: String,
    pub campaign_id: String,
    pub email: String,
    pub name: String,
    pub department: String,
    pub role: String,
    pub token: String,
    pub sent: bool,
    pub sent_at: Option<String>,
    pub created_at: String,
}

const TARGET_COLUMNS: &str = "id, campaign_id, email, name, department, role, token, sent, \
     CAST(sent_at AS VARCHAR), CAST(created_at AS VARCHAR)";

fn row_to_target(row: &duckdb::Row<'_>) -> duckdb::Result<Target> {
    Ok(Target {
        id: row.get(0)?,
        campaign_id: row.get(1)?,
        email: row.get(2)?,
        name: row.get(3)?,
        department: row.get(4)?,
        role: row.get(5)?,
        token: row.get(6)?,
        sent: row.get(7)?,
        sent_at: row.get(8)?,
        created_at: row.get(9)?,
    })
}

impl DuckDbBackend {
    /// Import parsed CSV rows into a campaign's target list.
    ///
    /// Row handling is strictly per-row: a rejected row is reported with
    /// its line number and the batch continues. Rejections:
    /// - syntactically invalid email;
    /// - duplicate of an already-imported target (case-insensitive), or of
    ///   an earlier row in the same file.
    ///
    /// Every created target gets a fresh tracking token. Inserts are
    /// individual statements, not one batch transaction — a storage
    /// failure on row N leaves rows 1..N-1 committed.
    pub async fn import_targets(
        &self,
        campaign_id: &str,
        rows: &[ImportRow],
    ) -> Result<ImportOutcome> {
        let conn = self.conn.lock().await;

        // Seed the dedupe set with emails already imported for this campaign.
        let mut seen: HashSet<String> = HashSet::new();
        {
            let mut stmt =
                conn.prepare("SELECT LOWER(email) FROM targets WHERE campaign_id = ?1")?;
            let existing = stmt.query_map(duckdb::params![campaign_id], |row| {
                row.get::<_, String>(0)
            })?;
            for email in existing {
                seen.insert(email?);
            }
        }

        let mut imported = 0usize;
        let mut errors = Vec::new();

        for row in rows {
            let email = row.email.trim();
            if !is_valid_email(email) {
                errors.push(format!("row {}: invalid email address", row.row));
                continue;
            }
            let key = email.to_lowercase();
            if !seen.insert(key) {
                errors.push(format!("row {}: duplicate email {}", row.row, email));
                continue;
            }

            let id = uuid::Uuid::new_v4().to_string();
            let token = new_token();
            conn.execute(
                "INSERT INTO targets (id, campaign_id, email, name, department, role, token, sent, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, false, CURRENT_TIMESTAMP)",
                duckdb::params![
                    id,
                    campaign_id,
                    email,
                    row.name.trim(),
                    row.department.trim(),
                    row.role.trim(),
                    token
                ],
            )?;
            imported += 1;
        }

        Ok(ImportOutcome { imported, errors })
    }

    /// All targets of a campaign in import order.
    pub async fn list_targets(&self, campaign_id: &str) -> Result<Vec<Target>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(&format!(
            "SELECT {TARGET_COLUMNS} FROM targets WHERE campaign_id = ?1 ORDER BY created_at, id"
        ))?;
        let rows = stmt.query_map(duckdb::params![campaign_id], |row| row_to_target(row))?;

        let mut targets = Vec::new();
        for row in rows {
            targets.push(row?);
        }
        Ok(targets)
    }

    /// Flip a target to sent.
    ///
    /// The `AND NOT sent` guard makes the transition one-way and
    /// once-only: a target that already has a `sent_at` keeps its original
    /// timestamp no matter how often this is called. Returns whether the
    /// row actually transitioned.
    pub async fn mark_target_sent(&self, target_id: &str) -> Result<bool> {
        let conn = self.conn.lock().await;
        let updated = conn.execute(
            "UPDATE targets SET sent = true, sent_at = CURRENT_TIMESTAMP \
             WHERE id = ?1 AND NOT sent",
            duckdb::params![target_id],
        )?;
        Ok(updated > 0)
    }
}
