use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json,
    extract::{Query, State},
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::core::lifecycle::ShutdownMode;
use crate::state::AppState;

/// Delay before a forced shutdown drops connections, so the acknowledgement
/// can still be flushed to the caller.
const FORCE_EXIT_DELAY: Duration = Duration::from_millis(100);

#[derive(Debug, Default, Deserialize)]
pub struct ShutdownParams {
    /// Drop open connections instead of draining them
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ShutdownResponse {
    pub message: String,
}

/// Initiate server shutdown.
///
/// The listener stops accepting connections right away. In-flight requests
/// drain unless `force=true`, in which case they are dropped shortly after
/// this response is sent. The response only confirms that shutdown began.
pub async fn shutdown(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ShutdownParams>,
) -> Json<ShutdownResponse> {
    let started = state.lifecycle.request_shutdown(ShutdownMode::Graceful);
    if started {
        info!("Shutdown requested via API (force={})", params.force);
    } else {
        info!("Shutdown already in progress (force={})", params.force);
    }

    if params.force {
        let lifecycle = state.lifecycle.clone();
        tokio::spawn(async move {
            tokio::time::sleep(FORCE_EXIT_DELAY).await;
            warn!("Forcing immediate shutdown");
            lifecycle.request_shutdown(ShutdownMode::Force);
        });
    }

    Json(ShutdownResponse {
        message: "Server is shutting down.".to_string(),
    })
}
