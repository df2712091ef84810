//! lectern web server.
//!
//! This crate serves the lectern site behind the request authorization
//! gatekeeper from `lectern-platform-access`.

pub mod auth;
pub mod config;

use auth::AppState;
use axum::{Router, middleware, routing::get};
use std::sync::Arc;
use tower_http::{services::ServeDir, trace::TraceLayer};

/// Builds the application router.
///
/// Everything under `site_root` is served behind the gatekeeper.
/// `/healthz` stays reachable without a session so load balancers can probe
/// the process.
pub fn router(state: Arc<AppState>, site_root: &str) -> Router {
    Router::new()
        .fallback_service(ServeDir::new(site_root))
        .layer(middleware::from_fn_with_state(state, auth::gatekeeper))
        .route("/healthz", get(healthz))
        .layer(TraceLayer::new_for_http())
}

async fn healthz() -> &'static str {
    "ok"
}
