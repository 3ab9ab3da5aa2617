use std::collections::HashSet;
use std::sync::{Arc, Mutex as StdMutex};

use phishsim_core::config::Config;
use phishsim_duckdb::DuckDbBackend;

use crate::mailer::Mailer;

/// Shared application state injected into every Axum handler via
/// [`axum::extract::State`].
///
/// All fields are safe to clone cheaply — heavy resources are wrapped in
/// `Arc`.
pub struct AppState {
    /// The DuckDB backend. Internally uses `Arc<tokio::sync::Mutex<Connection>>`
    /// so it is already cheap to clone and async-safe.
    pub db: Arc<DuckDbBackend>,

    /// Parsed configuration, loaded once at startup from environment variables.
    pub config: Arc<Config>,

    /// Outbound transport. Public so tests can swap in a recording or
    /// failing mock before building the router.
    pub mailer: Arc<dyn Mailer>,

    /// Campaign ids with a dispatch batch currently running.
    ///
    /// This is the single-flight registry: at most one send per campaign.
    /// A plain std mutex — critical sections are a set insert/remove — so
    /// the [`SendGuard`] can release in `Drop` on every exit path,
    /// including a panicking batch. Process restart clears it implicitly;
    /// the persisted `sending` status is swept separately at startup.
    in_flight_sends: Arc<StdMutex<HashSet<String>>>,
}

impl AppState {
    pub fn new(db: DuckDbBackend, config: Config, mailer: Arc<dyn Mailer>) -> Self {
        Self {
            db: Arc::new(db),
            config: Arc::new(config),
            mailer,
            in_flight_sends: Arc::new(StdMutex::new(HashSet::new())),
        }
    }

    /// Claim the single-flight slot for `campaign_id`.
    ///
    /// Returns `None` when a batch for the campaign is already running —
    /// the caller answers 409 and never interleaves with the running
    /// batch. The returned guard releases the slot when dropped.
    pub fn try_begin_send(&self, campaign_id: &str) -> Option<SendGuard> {
        let mut in_flight = self
            .in_flight_sends
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if !in_flight.insert(campaign_id.to_string()) {
            return None;
        }
        Some(SendGuard {
            registry: Arc::clone(&self.in_flight_sends),
            campaign_id: campaign_id.to_string(),
        })
    }
}

/// RAII release for the per-campaign send slot.
pub struct SendGuard {
    registry: Arc<StdMutex<HashSet<String>>>,
    campaign_id: String,
}

impl Drop for SendGuard {
    fn drop(&mut self) {
        let mut in_flight = self
            .registry
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        in_flight.remove(&self.campaign_id);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use phishsim_core::config::{Config, SmtpConfig};
    use phishsim_duckdb::DuckDbBackend;

    use crate::mailer::NoopMailer;

    use super::*;

    fn test_state() -> AppState {
        let db = DuckDbBackend::open_in_memory().expect("in-memory DuckDB");
        let config = Config {
            port: 0,
            data_dir: "/tmp/phishsim-test".to_string(),
            public_url: "http://localhost:8080".to_string(),
            landing_url: "http://localhost:3000/landing".to_string(),
            smtp: SmtpConfig {
                host: "localhost".to_string(),
                port: 587,
                username: None,
                password: None,
                noop: true,
            },
            send_timeout_secs: 2,
            send_retries: 0,
            send_retry_backoff_ms: 0,
            send_delay_ms: 0,
            duckdb_memory_limit: "1GB".to_string(),
        };
        AppState::new(db, config, Arc::new(NoopMailer))
    }

    #[test]
    fn second_claim_for_same_campaign_is_rejected_until_guard_drops() {
        let state = test_state();

        let guard = state.try_begin_send("c1");
        assert!(guard.is_some());
        assert!(state.try_begin_send("c1").is_none());
        // A different campaign is unaffected.
        assert!(state.try_begin_send("c2").is_some());

        drop(guard);
        assert!(state.try_begin_send("c1").is_some());
    }
}
