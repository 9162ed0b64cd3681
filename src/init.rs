//! Initialization helpers for preparing runtime assets before starting the
//! CosyVoice server.
//!
//! This module hosts the logic that powers the `cosyvoice-server init` CLI
//! command. The command downloads the model snapshot from the configured
//! registry so that regular server startups never perform network fetches.
//!
//! Typical usage from the CLI:
//!
//! ```text
//! $ MODEL_DIR=/srv/models/CosyVoice2-0.5B cosyvoice-server init
//! ```
//!
//! To run it programmatically, call [`run`] inside an async context:
//!
//! ```rust,no_run
//! use cosyvoice_server::{ServerConfig, init};
//!
//! let runtime = tokio::runtime::Runtime::new().unwrap();
//! runtime.block_on(async {
//!     let config = ServerConfig::from_env().unwrap();
//!     init::run(&config).await.expect("failed to download model");
//! });
//! ```

use anyhow::Result;

use crate::config::ServerConfig;
use crate::core::model::assets::{self, DownloadSummary};

/// Download and prepare the model snapshot required at runtime.
///
/// Safe to re-run: files already present with the expected size are skipped.
pub async fn run(config: &ServerConfig) -> Result<DownloadSummary> {
    let model_config = config.model_config();

    tracing::info!(
        "Preparing model {} using model dir: {:?}",
        model_config.model_id,
        model_config.model_dir
    );
    let summary = assets::download_assets(&model_config).await?;

    tracing::info!(
        "Model assets ready ({} files downloaded, {} bytes)",
        summary.downloaded,
        summary.bytes
    );

    Ok(summary)
}
