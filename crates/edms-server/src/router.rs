use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::handler::{self, AppState};

/// Build the axum router with all EDMS endpoints.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/v1/health", get(handler::health_handler))
        .route("/v1/info", get(handler::info_handler))
        .route("/v1/:partition", post(handler::write_handler))
        .route("/v1/:partition/:iid", get(handler::read_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
