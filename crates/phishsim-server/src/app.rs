use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{routes, state::AppState};

/// CSV uploads are capped at 10 MiB — far above any plausible target list,
/// low enough that a hostile upload can't balloon memory.
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Construct the Axum [`Router`] with all routes and middleware attached.
///
/// Two route families share one router:
/// - `/api/*` — the dashboard surface (authentication is terminated by the
///   reverse proxy in front of us; it is not this engine's concern).
/// - `/open`, `/t`, `/submit` — the public tracking surface, reachable by
///   anyone holding a token. These must stay cheap: one short DB write per
///   hit.
///
/// Middleware, outer-to-inner: `TraceLayer` for structured request
/// logging, permissive CORS (the dashboard runs on a different origin and
/// the tracking surface is public anyway).
pub fn build_app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(routes::health::health))
        .route(
            "/api/campaigns",
            get(routes::campaigns::list_campaigns).post(routes::campaigns::create_campaign),
        )
        .route(
            "/api/campaigns/{id}",
            get(routes::campaigns::get_campaign).delete(routes::campaigns::delete_campaign),
        )
        .route(
            "/api/campaigns/{id}/upload-targets",
            post(routes::upload::upload_targets),
        )
        .route("/api/campaigns/{id}/send", post(routes::send::send_campaign))
        .route("/api/campaigns/{id}/stats", get(routes::stats::campaign_stats))
        .route(
            "/api/campaigns/{id}/export",
            get(routes::export::export_results),
        )
        .route("/api/stats", get(routes::stats::overall_stats))
        .route("/open/{token}", get(routes::tracking::track_open))
        .route("/t/{token}", get(routes::tracking::track_click))
        .route("/submit/{token}", post(routes::tracking::track_submit))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
