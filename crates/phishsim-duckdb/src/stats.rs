use anyhow::Result;

use phishsim_core::stats::{rate, CampaignStats, GroupBy, GroupStats};

use crate::DuckDbBackend;

struct FunnelCounts {
    total_targets: i64,
    emails_sent: i64,
    opened: i64,
    clicked: i64,
    submitted: i64,
}

fn count(conn: &duckdb::Connection, sql: &str, campaign_id: Option<&str>) -> Result<i64> {
    let mut stmt = conn.prepare(sql)?;
    let n = match campaign_id {
        Some(id) => stmt.query_row(duckdb::params![id], |row| row.get(0))?,
        None => stmt.query_row([], |row| row.get(0))?,
    };
    Ok(n)
}

fn distinct_engaged(
    conn: &duckdb::Connection,
    event_type: &str,
    campaign_id: Option<&str>,
) -> Result<i64> {
    match campaign_id {
        Some(id) => {
            let mut stmt = conn.prepare(
                "SELECT COUNT(DISTINCT e.target_id) FROM events e \
                 JOIN targets t ON t.id = e.target_id \
                 WHERE t.campaign_id = ?1 AND e.event_type = ?2",
            )?;
            Ok(stmt.query_row(duckdb::params![id, event_type], |row| row.get(0))?)
        }
        None => {
            let mut stmt = conn
                .prepare("SELECT COUNT(DISTINCT target_id) FROM events WHERE event_type = ?1")?;
            Ok(stmt.query_row(duckdb::params![event_type], |row| row.get(0))?)
        }
    }
}

/// Distinct-target funnel counts, optionally scoped to one campaign.
///
/// `opened`/`clicked`/`submitted` count targets with at least one event of
/// the type, not raw events — repeated opens by one recipient are one
/// opened target. Small separate aggregate queries under one lock hold;
/// that is snapshot enough for reporting (exact linearizability with
/// in-flight tracking inserts is not required).
fn query_funnel(conn: &duckdb::Connection, campaign_id: Option<&str>) -> Result<FunnelCounts> {
    let (total_sql, sent_sql) = match campaign_id {
        Some(_) => (
            "SELECT COUNT(*) FROM targets WHERE campaign_id = ?1",
            "SELECT COUNT(*) FROM targets WHERE campaign_id = ?1 AND sent",
        ),
        None => (
            "SELECT COUNT(*) FROM targets",
            "SELECT COUNT(*) FROM targets WHERE sent",
        ),
    };

    Ok(FunnelCounts {
        total_targets: count(conn, total_sql, campaign_id)?,
        emails_sent: count(conn, sent_sql, campaign_id)?,
        opened: distinct_engaged(conn, "open", campaign_id)?,
        clicked: distinct_engaged(conn, "click", campaign_id)?,
        submitted: distinct_engaged(conn, "submit", campaign_id)?,
    })
}

fn to_stats(counts: FunnelCounts, id: Option<String>, name: Option<String>) -> CampaignStats {
    CampaignStats {
        campaign_id: id,
        campaign_name: name,
        total_targets: counts.total_targets,
        emails_sent: counts.emails_sent,
        opened: counts.opened,
        clicked: counts.clicked,
        submitted: counts.submitted,
        open_rate: rate(counts.opened, counts.emails_sent),
        click_rate: rate(counts.clicked, counts.emails_sent),
        submit_rate: rate(counts.submitted, counts.emails_sent),
    }
}

impl DuckDbBackend {
    /// Funnel stats for one campaign. Rates are percentages over the
    /// sent-count denominator, 0.0 when nothing was sent.
    pub async fn campaign_stats(&self, campaign_id: &str, name: &str) -> Result<CampaignStats> {
        let conn = self.conn.lock().await;
        let counts = query_funnel(&conn, Some(campaign_id))?;
        Ok(to_stats(
            counts,
            Some(campaign_id.to_string()),
            Some(name.to_string()),
        ))
    }

    /// Funnel stats across every campaign.
    pub async fn overall_stats(&self) -> Result<CampaignStats> {
        let conn = self.conn.lock().await;
        let counts = query_funnel(&conn, None)?;
        Ok(to_stats(counts, None, None))
    }

    /// Funnel stats partitioned by a whitelisted target column, scoped to
    /// one campaign or (with `None`) across all campaigns.
    ///
    /// The grouping column is a `GroupBy` variant, never caller input, so
    /// splicing it into the statement as an identifier is safe. Empty
    /// values group under "Unknown". Each group's rates use that group's
    /// own sent count.
    pub async fn grouped_stats(
        &self,
        campaign_id: Option<&str>,
        group_by: GroupBy,
    ) -> Result<Vec<GroupStats>> {
        let conn = self.conn.lock().await;
        let column = group_by.column();
        let where_clause = if campaign_id.is_some() {
            "WHERE t.campaign_id = ?1"
        } else {
            ""
        };

        let sql = format!(
            r#"
            SELECT
                COALESCE(NULLIF(t.{column}, ''), 'Unknown') AS group_name,
                COUNT(DISTINCT t.id) AS total_targets,
                COUNT(DISTINCT CASE WHEN t.sent THEN t.id END) AS emails_sent,
                COUNT(DISTINCT CASE WHEN e.event_type = 'open' THEN e.target_id END) AS opened,
                COUNT(DISTINCT CASE WHEN e.event_type = 'click' THEN e.target_id END) AS clicked,
                COUNT(DISTINCT CASE WHEN e.event_type = 'submit' THEN e.target_id END) AS submitted
            FROM targets t
            LEFT JOIN events e ON e.target_id = t.id
            {where_clause}
            GROUP BY group_name
            ORDER BY emails_sent DESC, group_name
            "#
        );

        let map_row = |row: &duckdb::Row<'_>| -> duckdb::Result<GroupStats> {
            let emails_sent: i64 = row.get(2)?;
            let opened: i64 = row.get(3)?;
            let clicked: i64 = row.get(4)?;
            let submitted: i64 = row.get(5)?;
            Ok(GroupStats {
                group: row.get(0)?,
                total_targets: row.get(1)?,
                emails_sent,
                opened,
                clicked,
                submitted,
                open_rate: rate(opened, emails_sent),
                click_rate: rate(clicked, emails_sent),
                submit_rate: rate(submitted, emails_sent),
            })
        };

        let mut stmt = conn.prepare(&sql)?;
        let mut groups = Vec::new();
        match campaign_id {
            Some(id) => {
                let rows = stmt.query_map(duckdb::params![id], map_row)?;
                for row in rows {
                    groups.push(row?);
                }
            }
            None => {
                let rows = stmt.query_map([], map_row)?;
                for row in rows {
                    groups.push(row?);
                }
            }
        }
        Ok(groups)
    }
}
