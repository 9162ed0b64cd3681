//! CosyVoice model hosted in a worker subprocess
//!
//! The pretrained model lives in a Python runtime, so it is driven through a
//! long-lived child process that loads the model once and answers inference
//! requests over stdin/stdout, one JSON object per line. Stderr is inherited
//! so model-side logging lands in the server's output.
//!
//! Exactly one inference runs at a time: the stdio pair is guarded by an
//! async mutex that the chunk forwarder holds until the worker reports the
//! end of the sequence.

use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, error, info, warn};

use super::messages::{WorkerEvent, WorkerRequest, decode_samples, encode_samples};
use super::{
    AudioChunk, ChunkSender, ChunkStream, ModelConfig, ModelError, ModelResult, SpeechModel,
};

/// Chunks buffered between the worker reader and the consumer
const CHUNK_BUFFER: usize = 8;

struct WorkerIo {
    // Held so the process is killed when the worker is dropped.
    _child: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
    exited: bool,
}

impl WorkerIo {
    /// Next protocol event, skipping stray output. `None` on EOF.
    async fn next_event(&mut self) -> ModelResult<Option<WorkerEvent>> {
        while let Some(line) = self.stdout.next_line().await? {
            match WorkerEvent::parse(&line) {
                Some(event) => return Ok(Some(event)),
                None => debug!("Skipping non-protocol worker output: {}", line),
            }
        }
        Ok(None)
    }

    async fn send(&mut self, request: &WorkerRequest<'_>) -> ModelResult<()> {
        let mut line = serde_json::to_string(request)
            .map_err(|e| ModelError::Protocol(format!("Failed to encode request: {e}")))?;
        line.push('\n');
        self.stdin.write_all(line.as_bytes()).await?;
        self.stdin.flush().await?;
        Ok(())
    }
}

/// CosyVoice2 model served by a worker subprocess
pub struct CosyVoiceWorker {
    io: Arc<Mutex<WorkerIo>>,
    sample_rate: u32,
}

impl CosyVoiceWorker {
    /// Start the worker and wait until it reports the model as loaded.
    ///
    /// # Errors
    /// - [`ModelError::Spawn`] if the worker program cannot be executed
    /// - [`ModelError::LoadFailed`] if the worker reports an error or exits
    ///   before it is ready
    pub async fn spawn(config: &ModelConfig) -> ModelResult<Self> {
        info!(
            "Starting model worker: {} {} --model-dir {}",
            config.worker_program,
            config.worker_args.join(" "),
            config.model_dir.display()
        );

        let mut child = Command::new(&config.worker_program)
            .args(&config.worker_args)
            .arg("--model-dir")
            .arg(&config.model_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ModelError::Spawn {
                program: config.worker_program.clone(),
                source,
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ModelError::Protocol("Worker stdin is not piped".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ModelError::Protocol("Worker stdout is not piped".to_string()))?;

        let mut io = WorkerIo {
            _child: child,
            stdin,
            stdout: BufReader::new(stdout).lines(),
            exited: false,
        };

        let sample_rate = match io.next_event().await? {
            Some(WorkerEvent::Ready { sample_rate }) if sample_rate > 0 => sample_rate,
            Some(WorkerEvent::Ready { .. }) => {
                return Err(ModelError::Protocol(
                    "Worker reported a sample rate of 0".to_string(),
                ));
            }
            Some(WorkerEvent::Error { message }) => return Err(ModelError::LoadFailed(message)),
            Some(other) => {
                return Err(ModelError::Protocol(format!(
                    "Expected ready event from worker, got {other:?}"
                )));
            }
            None => {
                return Err(ModelError::LoadFailed(
                    "worker exited before reporting ready".to_string(),
                ));
            }
        };

        info!("Model loaded successfully (sample_rate={} Hz)", sample_rate);

        Ok(Self {
            io: Arc::new(Mutex::new(io)),
            sample_rate,
        })
    }

    async fn run(&self, request: WorkerRequest<'_>) -> ModelResult<ChunkStream> {
        let mut io = self.io.clone().lock_owned().await;

        if io.exited {
            return Err(ModelError::WorkerExited);
        }

        if let Err(e) = io.send(&request).await {
            error!("Failed to send request to model worker: {}", e);
            io.exited = true;
            return Err(ModelError::WorkerExited);
        }

        let (tx, stream) = ChunkStream::channel(CHUNK_BUFFER);
        tokio::spawn(forward_chunks(io, tx));
        Ok(stream)
    }
}

/// Relay worker events into the chunk channel until the sequence ends.
///
/// The worker is always drained up to its terminal event, even when the
/// consumer has gone away, so the next request starts on a clean line.
async fn forward_chunks(mut io: OwnedMutexGuard<WorkerIo>, tx: ChunkSender) {
    let mut consumer_gone = false;

    loop {
        let item = match io.next_event().await {
            Ok(Some(WorkerEvent::Chunk { samples })) => decode_samples(&samples).map(AudioChunk::new),
            Ok(Some(WorkerEvent::Done)) => return,
            Ok(Some(WorkerEvent::Error { message })) => {
                let _ = tx.send(Err(ModelError::InferenceFailed(message))).await;
                return;
            }
            Ok(Some(WorkerEvent::Ready { .. })) => Err(ModelError::Protocol(
                "Unexpected ready event during inference".to_string(),
            )),
            Ok(None) => {
                error!("Model worker exited during inference");
                io.exited = true;
                let _ = tx.send(Err(ModelError::WorkerExited)).await;
                return;
            }
            Err(e) => {
                error!("Failed to read from model worker: {}", e);
                io.exited = true;
                let _ = tx.send(Err(e)).await;
                return;
            }
        };

        if !consumer_gone && tx.send(item).await.is_err() {
            warn!("Chunk consumer dropped; draining remaining worker output");
            consumer_gone = true;
        }
    }
}

#[async_trait]
impl SpeechModel for CosyVoiceWorker {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    async fn inference_zero_shot(
        &self,
        text: &str,
        prompt_text: &str,
        prompt_speech_16k: &[f32],
    ) -> ModelResult<ChunkStream> {
        self.run(WorkerRequest::ZeroShot {
            text,
            prompt_text,
            prompt_speech: encode_samples(prompt_speech_16k),
        })
        .await
    }

    async fn inference_instruct(
        &self,
        text: &str,
        instruction: &str,
        prompt_speech_16k: &[f32],
    ) -> ModelResult<ChunkStream> {
        self.run(WorkerRequest::Instruct {
            text,
            instruction,
            prompt_speech: encode_samples(prompt_speech_16k),
        })
        .await
    }
}
