pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::analysis::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let upload_limit = state.max_upload_bytes;

    Router::new()
        .route("/health", get(health::health_handler))
        .route(
            "/analyze",
            post(handlers::handle_analyze).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .with_state(state)
}
