use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use phishsim_server::mailer::{Mailer, NoopMailer, SmtpMailer};
use phishsim_server::state::AppState;

/// `phishsim health` — liveness probe for Docker HEALTHCHECK.
///
/// Calls `GET http://localhost:$PHISHSIM_PORT/health`.
/// Exits 0 if the server responds with HTTP 200, exits 1 otherwise.
fn run_health_check() -> ! {
    let port = std::env::var("PHISHSIM_PORT").unwrap_or_else(|_| "8080".to_string());
    let url = format!("http://localhost:{}/health", port);
    match ureq::get(&url).call() {
        Ok(resp) if resp.status() == 200 => std::process::exit(0),
        _ => std::process::exit(1),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Health-check subcommand — handled before tokio does any real work so
    // the binary stays fast when used as a Docker HEALTHCHECK probe.
    let args: Vec<String> = std::env::args().collect();
    if args.get(1).map(|s| s.as_str()) == Some("health") {
        run_health_check();
    }

    // Initialise structured JSON logging. Level controlled via RUST_LOG.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("phishsim_server=info".parse()?)
                .add_directive("phishsim_duckdb=info".parse()?),
        )
        .json()
        .init();

    let cfg = phishsim_core::config::Config::from_env().map_err(|e| anyhow::anyhow!(e))?;

    // Ensure data directory exists before opening DuckDB.
    std::fs::create_dir_all(&cfg.data_dir)?;
    let db_path = format!("{}/phishsim.db", cfg.data_dir);
    let db = phishsim_duckdb::DuckDbBackend::open(&db_path, &cfg.duckdb_memory_limit)?;

    // Crash recovery: a campaign persisted as 'sending' means a previous
    // process died mid-batch. Clear it so the next send isn't rejected.
    match db.reset_interrupted_sends().await {
        Ok(0) => {}
        Ok(reset) => info!(reset, "Reset campaigns stuck in 'sending' from a previous run"),
        Err(e) => tracing::error!(error = %e, "Failed to reset interrupted sends"),
    }

    let mailer: Arc<dyn Mailer> = if cfg.smtp.noop {
        info!("SMTP noop transport enabled (PHISHSIM_SMTP_NOOP) — no mail leaves this process");
        Arc::new(NoopMailer)
    } else {
        info!(host = %cfg.smtp.host, port = cfg.smtp.port, "SMTP transport configured");
        Arc::new(SmtpMailer::from_config(&cfg.smtp, cfg.send_timeout()))
    };

    let state = Arc::new(AppState::new(db, cfg.clone(), mailer));

    let addr = format!("0.0.0.0:{}", cfg.port);
    let app = phishsim_server::app::build_app(Arc::clone(&state));

    info!(port = cfg.port, public_url = %cfg.public_url, "phishsim listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            tokio::signal::ctrl_c().await.ok();
        })
        .await?;

    Ok(())
}
