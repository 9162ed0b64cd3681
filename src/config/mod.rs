//! Configuration module for the CosyVoice server
//!
//! This module handles server configuration from various sources: .env files, YAML files,
//! and environment variables. Priority: YAML > ENV vars > .env values > defaults.
//!
//! # Modules
//! - `yaml`: YAML configuration file loading
//! - `env`: Environment variable loading
//! - `merge`: Merging YAML and environment configurations
//! - `validation`: Configuration validation logic
//!
//! # Example
//! ```rust,no_run
//! use cosyvoice_server::config::ServerConfig;
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load from environment variables only
//! let config = ServerConfig::from_env()?;
//!
//! // Load from YAML file with environment variable overrides
//! let config_path = PathBuf::from("config.yaml");
//! let config = ServerConfig::from_file(&config_path)?;
//!
//! println!("Server listening on {}", config.address());
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;
use std::time::Duration;

mod env;
mod merge;
mod validation;
mod yaml;

use crate::core::audio::OutputSampleFormat;
use crate::core::model::ModelConfig;
use crate::core::synthesis::SynthesisSettings;

/// Transcript of the bundled default prompt clip
pub const DEFAULT_PROMPT_TEXT: &str = "안녕하세요, 제 목소리 어때요?";

/// Server configuration
///
/// Contains all configuration needed to run the CosyVoice server:
/// - Listener settings (host, port, shutdown grace period)
/// - Model location, worker command and download source
/// - Synthesis defaults (prompt clip, fallback output directory, sample format)
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    // Server settings
    pub host: String,
    pub port: u16,
    /// Seconds a graceful shutdown may spend draining before connections are dropped
    pub shutdown_grace_seconds: u64,

    // Model settings
    pub model_dir: PathBuf,
    /// Program hosting the model, e.g. `python3`
    pub worker_program: String,
    /// Arguments passed to the worker program before `--model-dir`
    pub worker_args: Vec<String>,
    /// Registry identifier used by `cosyvoice-server init`
    pub model_id: String,
    pub model_revision: String,
    pub registry_url: String,

    // Synthesis settings
    pub default_prompt_wav: PathBuf,
    pub default_prompt_text: String,
    /// Output directory used when a request carries no `absolute_path`
    pub fallback_output_dir: PathBuf,
    pub output_sample_format: OutputSampleFormat,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let model = ModelConfig::default();
        Self {
            host: "127.0.0.1".to_string(),
            port: 9881,
            shutdown_grace_seconds: 10,
            model_dir: model.model_dir,
            worker_program: model.worker_program,
            worker_args: model.worker_args,
            model_id: model.model_id,
            model_revision: model.revision,
            registry_url: model.registry_url,
            default_prompt_wav: PathBuf::from("./asset/zero_shot_prompt.wav"),
            default_prompt_text: DEFAULT_PROMPT_TEXT.to_string(),
            fallback_output_dir: PathBuf::from("tts_outputs_fallback"),
            output_sample_format: OutputSampleFormat::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables (and defaults)
    ///
    /// The .env file, if any, is loaded into the process environment by `main`
    /// before this is called.
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let config = merge::merge_config(None)?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a YAML file with environment variable base
    ///
    /// Priority order (highest to lowest):
    /// 1. YAML file values
    /// 2. Environment variables (actual ENV vars override .env values)
    /// 3. .env file values
    /// 4. Default values
    ///
    /// # Errors
    /// Returns an error if:
    /// - The YAML file cannot be read or is malformed
    /// - Environment variables have invalid formats
    /// - Configuration validation fails
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let yaml_config = yaml::YamlConfig::from_file(path)?;
        let config = merge::merge_config(Some(yaml_config))?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Get the server address as a string
    ///
    /// Returns the address in the format "host:port"
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_seconds)
    }

    /// Model worker and download settings
    pub fn model_config(&self) -> ModelConfig {
        ModelConfig {
            model_dir: self.model_dir.clone(),
            worker_program: self.worker_program.clone(),
            worker_args: self.worker_args.clone(),
            model_id: self.model_id.clone(),
            revision: self.model_revision.clone(),
            registry_url: self.registry_url.clone(),
        }
    }

    /// Per-request synthesis defaults
    pub fn synthesis_settings(&self) -> SynthesisSettings {
        SynthesisSettings {
            fallback_output_dir: self.fallback_output_dir.clone(),
            default_prompt_wav: self.default_prompt_wav.clone(),
            default_prompt_text: self.default_prompt_text.clone(),
            output_sample_format: self.output_sample_format,
        }
    }
}
