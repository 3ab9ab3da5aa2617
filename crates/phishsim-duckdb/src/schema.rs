/// DuckDB initialization SQL.
///
/// Executed once at database open time via `Connection::execute_batch`.
/// All statements use `IF NOT EXISTS` so they are safe to re-run on every
/// startup (idempotent).
///
/// `memory_limit` is a DuckDB size string such as `"1GB"` or `"512MB"`,
/// read from `Config.duckdb_memory_limit` (env `PHISHSIM_DUCKDB_MEMORY`).
/// An explicit limit is always set — the DuckDB default (80% of system
/// RAM) is not acceptable for a server process. `SET threads = 2` bounds
/// the background thread pool for single-writer embedded use.
///
/// No FOREIGN KEY constraints: DuckDB enforces FKs immediately at
/// statement time, which conflicts with the manual cascade-delete order
/// used by `delete_campaign` (events → targets → campaign). Referential
/// integrity is maintained in the store methods instead.
pub fn init_sql(memory_limit: &str) -> String {
    format!(
        r#"SET memory_limit = '{memory_limit}';
SET threads = 2;

-- ===========================================
-- CAMPAIGNS
-- ===========================================
CREATE TABLE IF NOT EXISTS campaigns (
    id              VARCHAR PRIMARY KEY,           -- UUID v4
    name            VARCHAR NOT NULL,
    email_subject   VARCHAR NOT NULL,
    email_body      VARCHAR NOT NULL,              -- HTML template with {{{{Name}}}}/{{{{Link}}}}/... placeholders
    from_address    VARCHAR NOT NULL,
    status          VARCHAR NOT NULL DEFAULT 'draft',  -- 'draft' | 'sending' | 'sent'
    created_at      TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
    updated_at      TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);

-- ===========================================
-- TARGETS (one row per recipient per campaign)
-- ===========================================
CREATE TABLE IF NOT EXISTS targets (
    id              VARCHAR PRIMARY KEY,           -- UUID v4
    campaign_id     VARCHAR NOT NULL,
    email           VARCHAR NOT NULL,              -- unique per campaign, case-insensitive (enforced on import)
    name            VARCHAR NOT NULL DEFAULT '',
    department      VARCHAR NOT NULL DEFAULT '',
    role            VARCHAR NOT NULL DEFAULT '',
    token           VARCHAR NOT NULL UNIQUE,       -- 64 hex chars, minted at import, immutable
    sent            BOOLEAN NOT NULL DEFAULT false,
    sent_at         TIMESTAMP,                     -- NULL until first successful transport accept
    created_at      TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);
CREATE INDEX IF NOT EXISTS idx_targets_campaign
    ON targets(campaign_id, created_at);
-- Import-time duplicate check: campaign + lowercased email
CREATE INDEX IF NOT EXISTS idx_targets_campaign_email
    ON targets(campaign_id, email);
-- Tracking-endpoint token resolution (hot path)
CREATE INDEX IF NOT EXISTS idx_targets_token
    ON targets(token);

-- ===========================================
-- EVENTS (append-only engagement log)
-- ===========================================
CREATE TABLE IF NOT EXISTS events (
    id              VARCHAR PRIMARY KEY,           -- UUID v4
    target_id       VARCHAR NOT NULL,
    event_type      VARCHAR NOT NULL,              -- 'open' | 'click' | 'submit'
    meta            VARCHAR,                       -- JSON string: ip, user_agent, referer, sanitized form fields
    created_at      TIMESTAMP NOT NULL
);
-- Stats aggregation: distinct targets per event type
CREATE INDEX IF NOT EXISTS idx_events_target_type
    ON events(target_id, event_type);
-- Per-target timelines (campaign detail, export first-seen columns)
CREATE INDEX IF NOT EXISTS idx_events_target_time
    ON events(target_id, created_at);
"#
    )
}
