//! Test Fixtures Module
//!
//! Shared helpers for integration tests:
//! - Audio fixtures (generated prompt clips, output readers)
//! - A scripted in-process speech model
//! - Application builders wired to a temporary directory
//! - Log capture for asserting on emitted warnings

// Not every test binary uses every helper
#![allow(dead_code)]

pub mod audio_fixtures;

use std::collections::VecDeque;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use parking_lot::Mutex;
use tempfile::TempDir;

use cosyvoice_server::{
    ServerConfig,
    core::{AudioChunk, ChunkStream, Lifecycle, ModelError, ModelResult, SpeechModel},
    routes,
    state::AppState,
};

pub use audio_fixtures::*;

/// One inference call as seen by the model
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCall {
    ZeroShot {
        text: String,
        prompt_text: String,
        prompt_samples: usize,
    },
    Instruct {
        text: String,
        instruction: String,
        prompt_samples: usize,
    },
}

/// What the next inference call should do
#[derive(Debug, Clone)]
pub enum Script {
    /// Emit these chunks, then end
    Chunks(Vec<Vec<f32>>),
    /// Fail before producing a stream
    Fail(String),
    /// Emit these chunks, then fail mid-stream
    FailAfter(Vec<Vec<f32>>, String),
}

/// Scripted [`SpeechModel`] that records every call.
///
/// Calls consume queued scripts in order and fall back to `default_script`
/// once the queue is empty.
pub struct MockSpeechModel {
    sample_rate: u32,
    default_script: Script,
    queued: Mutex<VecDeque<Script>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockSpeechModel {
    pub fn new(default_script: Script) -> Arc<Self> {
        Arc::new(Self {
            sample_rate: MODEL_RATE,
            default_script,
            queued: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
        })
    }

    /// Model that answers every request with one short chunk
    pub fn single_chunk() -> Arc<Self> {
        Self::new(Script::Chunks(vec![vec![0.1, 0.2, 0.3, 0.4]]))
    }

    pub fn push_script(&self, script: Script) {
        self.queued.lock().push_back(script);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    fn next_script(&self) -> Script {
        self.queued
            .lock()
            .pop_front()
            .unwrap_or_else(|| self.default_script.clone())
    }

    fn play(&self, call: RecordedCall) -> ModelResult<ChunkStream> {
        self.calls.lock().push(call);

        match self.next_script() {
            Script::Chunks(chunks) => Ok(ChunkStream::from_chunks(
                chunks.into_iter().map(AudioChunk::new).collect(),
            )),
            Script::Fail(message) => Err(ModelError::InferenceFailed(message)),
            Script::FailAfter(chunks, message) => {
                let mut items: Vec<ModelResult<AudioChunk>> =
                    chunks.into_iter().map(|c| Ok(AudioChunk::new(c))).collect();
                items.push(Err(ModelError::InferenceFailed(message)));
                Ok(ChunkStream::from_results(items))
            }
        }
    }
}

#[async_trait]
impl SpeechModel for MockSpeechModel {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    async fn inference_zero_shot(
        &self,
        text: &str,
        prompt_text: &str,
        prompt_speech_16k: &[f32],
    ) -> ModelResult<ChunkStream> {
        self.play(RecordedCall::ZeroShot {
            text: text.to_string(),
            prompt_text: prompt_text.to_string(),
            prompt_samples: prompt_speech_16k.len(),
        })
    }

    async fn inference_instruct(
        &self,
        text: &str,
        instruction: &str,
        prompt_speech_16k: &[f32],
    ) -> ModelResult<ChunkStream> {
        self.play(RecordedCall::Instruct {
            text: text.to_string(),
            instruction: instruction.to_string(),
            prompt_samples: prompt_speech_16k.len(),
        })
    }
}

/// A temporary working area with a default prompt clip and a config that
/// points into it.
pub struct TestEnv {
    pub dir: TempDir,
    pub config: ServerConfig,
}

impl TestEnv {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let prompt = dir.path().join("zero_shot_prompt.wav");
        write_default_prompt(&prompt);

        let config = ServerConfig {
            port: 0,
            shutdown_grace_seconds: 2,
            model_dir: dir.path().join("model"),
            default_prompt_wav: prompt,
            fallback_output_dir: dir.path().join("tts_outputs_fallback"),
            ..ServerConfig::default()
        };

        Self { dir, config }
    }

    pub fn fallback_dir(&self) -> PathBuf {
        self.config.fallback_output_dir.clone()
    }

    pub fn state(&self, model: Arc<MockSpeechModel>) -> Arc<AppState> {
        AppState::new(self.config.clone(), model, Lifecycle::new())
    }

    pub fn app(&self, model: Arc<MockSpeechModel>) -> Router {
        routes::create_app(self.state(model))
    }
}

/// Log lines emitted while the guard returned by [`LogCapture::install`] is
/// alive on the current thread.
#[derive(Clone, Default)]
pub struct LogCapture {
    buf: Arc<Mutex<Vec<u8>>>,
}

struct CaptureWriter(Arc<Mutex<Vec<u8>>>);

impl io::Write for CaptureWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl LogCapture {
    pub fn install() -> (Self, tracing::subscriber::DefaultGuard) {
        let capture = Self::default();
        let buf = capture.buf.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || CaptureWriter(buf.clone()))
            .finish();
        let guard = tracing::subscriber::set_default(subscriber);
        (capture, guard)
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buf.lock()).into_owned()
    }
}
