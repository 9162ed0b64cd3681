use serde::Deserialize;
use std::path::PathBuf;

use crate::core::audio::OutputSampleFormat;

/// Complete YAML configuration structure
///
/// All fields are optional to allow partial configuration. Values present
/// here override environment variables.
///
/// # Example YAML structure
/// ```yaml
/// server:
///   host: "127.0.0.1"
///   port: 9881
///   shutdown_grace_seconds: 10
///
/// model:
///   dir: "pretrained_models/CosyVoice2-0.5B"
///   worker_program: "python3"
///   worker_args: ["scripts/cosyvoice_worker.py"]
///   id: "iic/CosyVoice2-0.5B"
///   revision: "master"
///   registry_url: "https://www.modelscope.cn"
///
/// synthesis:
///   default_prompt_wav: "./asset/zero_shot_prompt.wav"
///   default_prompt_text: "안녕하세요, 제 목소리 어때요?"
///   fallback_output_dir: "tts_outputs_fallback"
///   output_sample_format: "float32"
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub server: Option<ServerYaml>,
    pub model: Option<ModelYaml>,
    pub synthesis: Option<SynthesisYaml>,
}

/// Server configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ServerYaml {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub shutdown_grace_seconds: Option<u64>,
}

/// Model worker and registry configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ModelYaml {
    pub dir: Option<String>,
    pub worker_program: Option<String>,
    pub worker_args: Option<Vec<String>>,
    pub id: Option<String>,
    pub revision: Option<String>,
    pub registry_url: Option<String>,
}

/// Synthesis defaults from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SynthesisYaml {
    pub default_prompt_wav: Option<String>,
    pub default_prompt_text: Option<String>,
    pub fallback_output_dir: Option<String>,
    pub output_sample_format: Option<OutputSampleFormat>,
}

impl YamlConfig {
    /// Load configuration from a YAML file
    ///
    /// # Errors
    /// Returns an error if:
    /// - The file cannot be read
    /// - The YAML is malformed
    /// - Required fields have invalid types
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file {}: {e}", path.display()))?;

        let config: YamlConfig = serde_yaml::from_str(&contents)
            .map_err(|e| format!("Failed to parse YAML config: {e}"))?;

        Ok(config)
    }
}
