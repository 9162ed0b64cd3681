//! Shared application state injected into every handler

use std::sync::Arc;

use crate::config::ServerConfig;
use crate::core::lifecycle::Lifecycle;
use crate::core::model::SpeechModel;
use crate::core::synthesis::Synthesizer;

/// Application context: configuration, the loaded model and the lifecycle
/// controller.
pub struct AppState {
    pub config: ServerConfig,
    pub synthesizer: Synthesizer,
    pub lifecycle: Lifecycle,
}

impl AppState {
    pub fn new(
        config: ServerConfig,
        model: Arc<dyn SpeechModel>,
        lifecycle: Lifecycle,
    ) -> Arc<Self> {
        let synthesizer = Synthesizer::new(model, config.synthesis_settings());
        Arc::new(Self {
            config,
            synthesizer,
            lifecycle,
        })
    }
}
