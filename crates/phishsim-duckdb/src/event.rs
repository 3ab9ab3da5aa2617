use anyhow::Result;
use chrono::Utc;
use serde::Serialize;

use phishsim_core::campaign::EventType;

use crate::DuckDbBackend;

/// One row of the append-only `events` table.
#[derive(Debug, Clone, Serialize)]
pub struct EventRow {
    pub id: String,
    pub target_id: String,
    pub event_type: String,
    pub meta: Option<String>,
    pub created_at: String,
}

fn insert_event(
    conn: &duckdb::Connection,
    target_id: &str,
    event_type: EventType,
    meta: &serde_json::Value,
) -> Result<()> {
    conn.execute(
        "INSERT INTO events (id, target_id, event_type, meta, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5)",
        duckdb::params![
            uuid::Uuid::new_v4().to_string(),
            target_id,
            event_type.as_str(),
            meta.to_string(),
            Utc::now().to_rfc3339(),
        ],
    )?;
    Ok(())
}

impl DuckDbBackend {
    /// Append an engagement event for the target owning `token`.
    ///
    /// Returns `Ok(false)` when the token resolves to no target — the
    /// caller answers success-shaped anyway (anti-enumeration) and nothing
    /// is written. Repeated events of the same type are appended as-is;
    /// re-engagement is measured from the raw log, stats deduplicate.
    ///
    /// A click on a target with no recorded open first appends an implicit
    /// open (clicking the link proves the mail was opened even when the
    /// pixel was blocked). This is recorder logic, deliberately not a
    /// database constraint, so the funnel rule stays in one place.
    pub async fn record_event(
        &self,
        token: &str,
        event_type: EventType,
        meta: &serde_json::Value,
    ) -> Result<bool> {
        let conn = self.conn.lock().await;

        let target_id: Option<String> = conn
            .prepare("SELECT id FROM targets WHERE token = ?1")?
            .query_row(duckdb::params![token], |row| row.get(0))
            .ok();
        let Some(target_id) = target_id else {
            return Ok(false);
        };

        if event_type == EventType::Click {
            let opens: i64 = conn
                .prepare("SELECT COUNT(*) FROM events WHERE target_id = ?1 AND event_type = 'open'")?
                .query_row(duckdb::params![target_id], |row| row.get(0))?;
            if opens == 0 {
                insert_event(
                    &conn,
                    &target_id,
                    EventType::Open,
                    &serde_json::json!({ "implicit": true }),
                )?;
            }
        }

        insert_event(&conn, &target_id, event_type, meta)?;
        Ok(true)
    }

    /// All events for a campaign's targets, oldest first — used to nest
    /// `events[]` under each target in the campaign detail response.
    pub async fn list_events_for_campaign(&self, campaign_id: &str) -> Result<Vec<EventRow>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT e.id, e.target_id, e.event_type, e.meta, CAST(e.created_at AS VARCHAR) \
             FROM events e \
             JOIN targets t ON t.id = e.target_id \
             WHERE t.campaign_id = ?1 \
             ORDER BY e.created_at, e.id",
        )?;
        let rows = stmt.query_map(duckdb::params![campaign_id], |row| {
            Ok(EventRow {
                id: row.get(0)?,
                target_id: row.get(1)?,
                event_type: row.get(2)?,
                meta: row.get(3)?,
                created_at: row.get(4)?,
            })
        })?;

        let mut events = Vec::new();
        for row in rows {
            events.push(row?);
        }
        Ok(events)
    }
}
