use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::handlers::{api, shutdown, tts};
use crate::state::AppState;
use std::sync::Arc;

/// Create the API router
///
/// The server binds to loopback only; no route requires authentication.
pub fn create_api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/status", get(api::status))
        .route("/shutdown", post(shutdown::shutdown))
        .route("/generate-tts", post(tts::generate_tts))
        .layer(TraceLayer::new_for_http())
}
