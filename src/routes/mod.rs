//! Route modules for Upload Portal

pub mod auth;
pub mod health;
pub mod upload;

use axum::{extract::DefaultBodyLimit, routing::get, Router};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the full application router
pub fn app(state: AppState) -> Router {
    let max_body = state.config().uploads.max_bytes;

    Router::new()
        .route("/health", get(health::health_check))
        .merge(auth::router())
        .merge(upload::router())
        .layer(DefaultBodyLimit::max(max_body))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
