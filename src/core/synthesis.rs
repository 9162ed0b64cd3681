//! Request-level synthesis pipeline
//!
//! Resolves the output directory and the prompt clip, picks the inference
//! mode, then drains the model's chunk stream to disk. Every chunk is written
//! to the same `{output_dir}/{output_filename}` path, so when the model emits
//! several chunks only the last one remains on disk.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::fs;
use tracing::{info, warn};

use super::audio::{self, AudioError, OutputSampleFormat, PROMPT_SAMPLE_RATE};
use super::model::{AudioChunk, ModelError, SpeechModel};

/// Incoming synthesis request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisRequest {
    /// Text to synthesize
    pub text: String,
    /// Bare file name of the WAV written inside the output directory
    pub output_filename: String,
    /// Output directory; the configured fallback directory when absent
    #[serde(default)]
    pub absolute_path: Option<String>,
    /// Reference clip for the speaker's voice
    #[serde(default)]
    pub prompt_speaker_path: Option<String>,
    /// Transcript of `prompt_speaker_path`
    #[serde(default)]
    pub prompt_text: Option<String>,
    /// Style instruction; selects instruction-guided synthesis when non-empty
    #[serde(default)]
    pub instruction: Option<String>,
}

/// Inference entry point chosen for a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SynthesisMode {
    ZeroShot,
    Instruct,
}

impl SynthesisMode {
    /// Instruct when the instruction has any non-whitespace content
    pub fn select(instruction: Option<&str>) -> Self {
        match instruction.map(str::trim) {
            Some(s) if !s.is_empty() => SynthesisMode::Instruct,
            _ => SynthesisMode::ZeroShot,
        }
    }
}

/// Static inputs shared by every request
#[derive(Debug, Clone)]
pub struct SynthesisSettings {
    pub fallback_output_dir: PathBuf,
    pub default_prompt_wav: PathBuf,
    /// Transcript of `default_prompt_wav`
    pub default_prompt_text: String,
    pub output_sample_format: OutputSampleFormat,
}

impl SynthesisSettings {
    /// Load the default prompt clip once, so a bad path fails at startup
    /// rather than on every request. Returns the number of 16 kHz samples.
    pub fn verify_default_prompt(&self) -> SynthesisResult<usize> {
        audio::load_wav(&self.default_prompt_wav, PROMPT_SAMPLE_RATE)
            .map(|samples| samples.len())
            .map_err(SynthesisError::PromptAudio)
    }
}

/// Result of a completed request
#[derive(Debug, Clone)]
pub struct SynthesisOutcome {
    pub output_path: PathBuf,
    pub mode: SynthesisMode,
    pub chunks_written: usize,
    /// Non-fatal problems worth reporting to the caller
    pub warnings: Vec<String>,
}

pub type SynthesisResult<T> = Result<T, SynthesisError>;

#[derive(Error, Debug)]
pub enum SynthesisError {
    #[error("Failed to create output directory {}: {source}", .path.display())]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to load prompt audio: {0}")]
    PromptAudio(#[source] AudioError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("Failed to save audio chunk {index}: {source}")]
    SaveChunk {
        index: usize,
        #[source]
        source: AudioError,
    },

    #[error("Audio I/O task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

struct Prompt {
    speech: Vec<f32>,
    transcript: String,
}

/// Runs synthesis requests against the shared model
pub struct Synthesizer {
    model: Arc<dyn SpeechModel>,
    settings: SynthesisSettings,
}

impl Synthesizer {
    pub fn new(model: Arc<dyn SpeechModel>, settings: SynthesisSettings) -> Self {
        Self { model, settings }
    }

    pub fn settings(&self) -> &SynthesisSettings {
        &self.settings
    }

    /// Directory the request writes into
    pub fn resolve_output_dir(&self, absolute_path: Option<&str>) -> PathBuf {
        match absolute_path.filter(|p| !p.trim().is_empty()) {
            Some(path) => PathBuf::from(path),
            None => self.settings.fallback_output_dir.clone(),
        }
    }

    pub async fn synthesize(&self, request: &SynthesisRequest) -> SynthesisResult<SynthesisOutcome> {
        let output_dir = self.resolve_output_dir(request.absolute_path.as_deref());
        fs::create_dir_all(&output_dir)
            .await
            .map_err(|source| SynthesisError::OutputDir {
                path: output_dir.clone(),
                source,
            })?;
        info!("Target directory: {}", output_dir.display());

        let mut warnings = Vec::new();
        let prompt = self.resolve_prompt(request, &mut warnings).await?;

        let mode = SynthesisMode::select(request.instruction.as_deref());
        info!("Starting TTS inference (mode={:?})", mode);

        let mut stream = match mode {
            SynthesisMode::Instruct => {
                let instruction = request.instruction.as_deref().unwrap_or_default().trim();
                self.model
                    .inference_instruct(&request.text, instruction, &prompt.speech)
                    .await?
            }
            SynthesisMode::ZeroShot => {
                self.model
                    .inference_zero_shot(&request.text, &prompt.transcript, &prompt.speech)
                    .await?
            }
        };

        let output_path = output_dir.join(&request.output_filename);
        let mut chunks_written = 0;

        while let Some(chunk) = stream.next_chunk().await {
            let chunk = chunk?;
            info!(
                "Chunk {}: {} samples, saving to {}",
                chunks_written,
                chunk.samples.len(),
                output_path.display()
            );
            self.save_chunk(&output_path, chunk, chunks_written).await?;
            chunks_written += 1;
        }

        if chunks_written == 0 {
            warn!("Inference completed, but no audio chunks were generated or saved.");
        } else if chunks_written > 1 {
            warn!(
                "{} chunks were written to {}; only the last one is kept",
                chunks_written,
                output_path.display()
            );
        }

        Ok(SynthesisOutcome {
            output_path,
            mode,
            chunks_written,
            warnings,
        })
    }

    /// Custom clip when it exists, otherwise the bundled default clip
    async fn resolve_prompt(
        &self,
        request: &SynthesisRequest,
        warnings: &mut Vec<String>,
    ) -> SynthesisResult<Prompt> {
        let custom = request
            .prompt_speaker_path
            .as_deref()
            .filter(|p| !p.trim().is_empty());

        let (path, transcript) = match custom {
            Some(path) if is_file(Path::new(path)).await => {
                info!("Using custom prompt audio: {}", path);
                (
                    PathBuf::from(path),
                    request.prompt_text.clone().unwrap_or_default(),
                )
            }
            Some(path) => {
                warn!(
                    "Prompt speaker file {} not found, falling back to default prompt",
                    path
                );
                warnings.push(format!(
                    "prompt_speaker_path '{path}' not found; default prompt voice was used"
                ));
                self.default_prompt()
            }
            None => self.default_prompt(),
        };

        let speech = tokio::task::spawn_blocking(move || audio::load_wav(&path, PROMPT_SAMPLE_RATE))
            .await?
            .map_err(SynthesisError::PromptAudio)?;

        Ok(Prompt { speech, transcript })
    }

    fn default_prompt(&self) -> (PathBuf, String) {
        (
            self.settings.default_prompt_wav.clone(),
            self.settings.default_prompt_text.clone(),
        )
    }

    async fn save_chunk(&self, path: &Path, chunk: AudioChunk, index: usize) -> SynthesisResult<()> {
        let path = path.to_path_buf();
        let sample_rate = self.model.sample_rate();
        let format = self.settings.output_sample_format;

        tokio::task::spawn_blocking(move || {
            audio::write_wav(&path, &chunk.samples, sample_rate, format)
        })
        .await?
        .map_err(|source| SynthesisError::SaveChunk { index, source })
    }
}

async fn is_file(path: &Path) -> bool {
    fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
}
