use anyhow::Result;

use crate::DuckDbBackend;

/// Per-target export row: sent status plus first-seen timestamp per event
/// type. `first_*` is `None` when the target never reached that stage —
/// the CSV layer renders those as empty cells, never as missing columns.
#[derive(Debug, Clone)]
pub struct ExportRow {
    pub name: String,
    pub email: String,
    pub department: String,
    pub role: String,
    pub sent: bool,
    pub first_opened: Option<String>,
    pub first_clicked: Option<String>,
    pub first_submitted: Option<String>,
}

impl ExportRow {
    pub fn opened(&self) -> bool {
        self.first_opened.is_some()
    }
    pub fn clicked(&self) -> bool {
        self.first_clicked.is_some()
    }
    pub fn submitted(&self) -> bool {
        self.first_submitted.is_some()
    }
}

impl DuckDbBackend {
    /// Every target of the campaign — sent or not — with first-seen
    /// engagement timestamps, in import order.
    pub async fn export_rows(&self, campaign_id: &str) -> Result<Vec<ExportRow>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            r#"
            SELECT
                t.name, t.email, t.department, t.role, t.sent,
                CAST(MIN(CASE WHEN e.event_type = 'open' THEN e.created_at END) AS VARCHAR) AS first_opened,
                CAST(MIN(CASE WHEN e.event_type = 'click' THEN e.created_at END) AS VARCHAR) AS first_clicked,
                CAST(MIN(CASE WHEN e.event_type = 'submit' THEN e.created_at END) AS VARCHAR) AS first_submitted
            FROM targets t
            LEFT JOIN events e ON e.target_id = t.id
            WHERE t.campaign_id = ?1
            GROUP BY t.id, t.name, t.email, t.department, t.role, t.sent, t.created_at
            ORDER BY t.created_at, t.id
            "#,
        )?;
        let rows = stmt.query_map(duckdb::params![campaign_id], |row| {
            Ok(ExportRow {
                name: row.get(0)?,
                email: row.get(1)?,
                department: row.get(2)?,
                role: row.get(3)?,
                sent: row.get(4)?,
                first_opened: row.get(5)?,
                first_clicked: row.get(6)?,
                first_submitted: row.get(7)?,
            })
        })?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }
}
