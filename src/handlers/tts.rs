//! Text-to-speech synthesis endpoint

use std::sync::Arc;

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use serde::{Deserialize, Serialize};
use tracing::{Instrument, error, info, info_span};
use uuid::Uuid;

use crate::core::synthesis::SynthesisRequest;
use crate::errors::app_error::{AppError, AppResult, error_chain};
use crate::state::AppState;

/// Successful synthesis response
///
/// `path` echoes the requested file name, not the resolved location.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct SynthesisResponse {
    pub status: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// Synthesize `text` and write the result to `{output_dir}/{output_filename}`
pub async fn generate_tts(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SynthesisRequest>, JsonRejection>,
) -> AppResult<Json<SynthesisResponse>> {
    let Json(request) = payload?;
    let span = info_span!("generate_tts", request_id = %Uuid::new_v4());

    async move {
        info!(
            "New TTS request - text={:?}, output_filename={}",
            request.text, request.output_filename
        );

        let outcome = state
            .synthesizer
            .synthesize(&request)
            .await
            .map_err(|e| {
                error!("TTS request failed: {}", error_chain(&e));
                AppError::from(e)
            })?;

        info!(
            "Request processing finished - mode={:?}, chunks={}, path={}",
            outcome.mode,
            outcome.chunks_written,
            outcome.output_path.display()
        );

        Ok(Json(SynthesisResponse {
            status: "success".to_string(),
            path: request.output_filename,
            warnings: outcome.warnings,
        }))
    }
    .instrument(span)
    .await
}
