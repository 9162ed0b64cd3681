//! Speech synthesis model abstraction
//!
//! The pretrained model is loaded once per process and shared by every
//! request through [`SpeechModel`]. Both inference modes hand back a
//! [`ChunkStream`]: a finite, single-pass stream of audio chunks that the
//! caller drains to completion.
//!
//! # Modes
//!
//! - **Zero-shot** (voice cloning): target text, transcript of the prompt
//!   clip, prompt speech at 16 kHz.
//! - **Instruct**: target text, natural-language style instruction, prompt
//!   speech at 16 kHz.
//!
//! # Example
//!
//! ```rust,ignore
//! use cosyvoice_server::core::model::{CosyVoiceWorker, ModelConfig, SpeechModel};
//!
//! let model = CosyVoiceWorker::spawn(&ModelConfig::default()).await?;
//! let mut stream = model.inference_zero_shot("hello", "", &prompt).await?;
//! while let Some(chunk) = stream.next_chunk().await {
//!     let chunk = chunk?;
//!     println!("{} samples", chunk.samples.len());
//! }
//! ```

pub mod assets;
mod config;
mod messages;
mod worker;

use std::pin::Pin;
use std::task::{Context, Poll};

use async_trait::async_trait;
use futures::Stream;
use thiserror::Error;
use tokio::sync::mpsc;

pub use config::ModelConfig;
pub use worker::CosyVoiceWorker;

/// Result type for model operations
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors raised while loading the model or running inference
#[derive(Error, Debug)]
pub enum ModelError {
    /// The worker process could not be started
    #[error("Failed to start model worker '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The worker reported a failure while loading the model
    #[error("Model failed to load: {0}")]
    LoadFailed(String),

    /// The worker reported a failure for a single inference
    #[error("Inference failed: {0}")]
    InferenceFailed(String),

    /// The worker sent something the bridge does not understand
    #[error("Model worker protocol error: {0}")]
    Protocol(String),

    /// The worker process is gone; no further inference is possible
    #[error("Model worker exited unexpectedly")]
    WorkerExited,

    #[error("Model worker I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// One unit of synthesized waveform, mono `f32` at the model's sample rate
#[derive(Debug, Clone, PartialEq)]
pub struct AudioChunk {
    pub samples: Vec<f32>,
}

impl AudioChunk {
    pub fn new(samples: Vec<f32>) -> Self {
        Self { samples }
    }
}

/// Finite, single-pass stream of inference output.
///
/// Producers push through the paired [`ChunkSender`]; the stream ends when
/// every sender has been dropped.
pub struct ChunkStream {
    rx: mpsc::Receiver<ModelResult<AudioChunk>>,
}

/// Producer half of a [`ChunkStream`]
pub type ChunkSender = mpsc::Sender<ModelResult<AudioChunk>>;

impl ChunkStream {
    /// Create a bounded producer/consumer pair
    pub fn channel(capacity: usize) -> (ChunkSender, Self) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (tx, Self { rx })
    }

    /// Build an already-complete stream from a list of items
    pub fn from_results(items: Vec<ModelResult<AudioChunk>>) -> Self {
        let (tx, stream) = Self::channel(items.len());
        for item in items {
            // Capacity matches the item count, so this never fails.
            let _ = tx.try_send(item);
        }
        stream
    }

    /// Build an already-complete stream of successful chunks
    pub fn from_chunks(chunks: Vec<AudioChunk>) -> Self {
        Self::from_results(chunks.into_iter().map(Ok).collect())
    }

    /// Receive the next item, or `None` once the stream is exhausted
    pub async fn next_chunk(&mut self) -> Option<ModelResult<AudioChunk>> {
        self.rx.recv().await
    }
}

impl Stream for ChunkStream {
    type Item = ModelResult<AudioChunk>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

/// A loaded speech synthesis model.
///
/// Implementations must tolerate concurrent calls, either natively or by
/// serializing them internally.
#[async_trait]
pub trait SpeechModel: Send + Sync {
    /// Output sample rate of every chunk this model produces
    fn sample_rate(&self) -> u32;

    /// Voice-cloning synthesis conditioned on a prompt clip and its transcript
    async fn inference_zero_shot(
        &self,
        text: &str,
        prompt_text: &str,
        prompt_speech_16k: &[f32],
    ) -> ModelResult<ChunkStream>;

    /// Instruction-guided synthesis conditioned on a prompt clip
    async fn inference_instruct(
        &self,
        text: &str,
        instruction: &str,
        prompt_speech_16k: &[f32],
    ) -> ModelResult<ChunkStream>;
}
