//! Storerate API — HTTP surface of the store rating service.

pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod routes;
pub mod state;
pub mod telemetry;

use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Builds the full application router: health at the root, every bounded
/// context under `/api/v1`.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(routes::health::router())
        .nest("/api/v1/ratings", routes::ratings::router())
        .nest("/api/v1/stores", routes::stores::router())
        .nest("/api/v1/users", routes::users::router())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
