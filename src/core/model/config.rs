//! Model worker and model asset configuration

use std::path::PathBuf;

/// Default local directory holding the pretrained model snapshot
pub const DEFAULT_MODEL_DIR: &str = "pretrained_models/CosyVoice2-0.5B";
/// Default model identifier on the ModelScope registry
pub const DEFAULT_MODEL_ID: &str = "iic/CosyVoice2-0.5B";
/// Default ModelScope registry endpoint
pub const DEFAULT_REGISTRY_URL: &str = "https://www.modelscope.cn";

/// Configuration for loading and fetching the speech model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelConfig {
    /// Directory containing the pretrained model files
    pub model_dir: PathBuf,

    /// Program that hosts the model (usually a Python interpreter)
    pub worker_program: String,

    /// Arguments passed before `--model-dir <dir>`
    pub worker_args: Vec<String>,

    /// Registry model identifier, e.g. `iic/CosyVoice2-0.5B`
    pub model_id: String,

    /// Registry revision to download
    pub revision: String,

    /// Registry base URL
    pub registry_url: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from(DEFAULT_MODEL_DIR),
            worker_program: "python3".to_string(),
            worker_args: vec!["scripts/cosyvoice_worker.py".to_string()],
            model_id: DEFAULT_MODEL_ID.to_string(),
            revision: "master".to_string(),
            registry_url: DEFAULT_REGISTRY_URL.to_string(),
        }
    }
}
