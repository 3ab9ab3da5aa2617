use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub data_dir: String,
    /// Public base URL embedded in tracking links and the pixel, e.g.
    /// "https://phishsim.example.com". No trailing slash.
    pub public_url: String,
    /// Where a recorded click redirects to. The tracking token is appended
    /// as a `token` query parameter.
    pub landing_url: String,
    pub smtp: SmtpConfig,
    /// Hard cap on one outbound SMTP send; a timed-out send counts as
    /// failed, never as sent.
    pub send_timeout_secs: u64,
    /// Extra attempts per target after the first failure. 0 = no retry.
    pub send_retries: u32,
    pub send_retry_backoff_ms: u64,
    /// Pause between targets within one batch to avoid relay throttling.
    pub send_delay_ms: u64,
    pub duckdb_memory_limit: String,
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    /// When true the mailer accepts every message without touching the
    /// network. For local runs and tests.
    pub noop: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let public_url = std::env::var("PHISHSIM_PUBLIC_URL")
            .unwrap_or_else(|_| "http://localhost:8080".to_string())
            .trim_end_matches('/')
            .to_string();
        Ok(Self {
            port: std::env::var("PHISHSIM_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .map_err(|e| format!("invalid port: {e}"))?,
            data_dir: std::env::var("PHISHSIM_DATA_DIR").unwrap_or_else(|_| "./data".to_string()),
            landing_url: std::env::var("PHISHSIM_LANDING_URL")
                .unwrap_or_else(|_| "http://localhost:3000/landing".to_string()),
            smtp: SmtpConfig {
                host: std::env::var("PHISHSIM_SMTP_HOST")
                    .unwrap_or_else(|_| "localhost".to_string()),
                port: std::env::var("PHISHSIM_SMTP_PORT")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(587),
                username: std::env::var("PHISHSIM_SMTP_USERNAME").ok(),
                password: std::env::var("PHISHSIM_SMTP_PASSWORD").ok(),
                noop: std::env::var("PHISHSIM_SMTP_NOOP")
                    .map(|v| {
                        let trimmed = v.trim();
                        trimmed.eq_ignore_ascii_case("1")
                            || trimmed.eq_ignore_ascii_case("true")
                            || trimmed.eq_ignore_ascii_case("yes")
                    })
                    .unwrap_or(false),
            },
            send_timeout_secs: std::env::var("PHISHSIM_SEND_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),
            send_retries: std::env::var("PHISHSIM_SEND_RETRIES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(0),
            send_retry_backoff_ms: std::env::var("PHISHSIM_SEND_RETRY_BACKOFF_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(1000),
            send_delay_ms: std::env::var("PHISHSIM_SEND_DELAY_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(500),
            duckdb_memory_limit: std::env::var("PHISHSIM_DUCKDB_MEMORY")
                .unwrap_or_else(|_| "1GB".to_string()),
            public_url,
        })
    }

    pub fn send_timeout(&self) -> Duration {
        Duration::from_secs(self.send_timeout_secs)
    }

    pub fn send_retry_backoff(&self) -> Duration {
        Duration::from_millis(self.send_retry_backoff_ms)
    }

    pub fn send_delay(&self) -> Duration {
        Duration::from_millis(self.send_delay_ms)
    }
}
