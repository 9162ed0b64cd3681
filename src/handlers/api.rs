use axum::Json;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct StatusResponse {
    pub status: String,
}

/// Liveness probe for external supervisors
pub async fn status() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "running".to_string(),
    })
}
