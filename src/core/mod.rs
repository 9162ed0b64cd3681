pub mod audio;
pub mod lifecycle;
pub mod model;
pub mod synthesis;

// Re-export commonly used types for convenience
pub use audio::{AudioError, AudioResult, OutputSampleFormat, PROMPT_SAMPLE_RATE};
pub use lifecycle::{Lifecycle, LifecyclePhase, ShutdownMode, watch_signals};
pub use model::{
    AudioChunk, ChunkSender, ChunkStream, CosyVoiceWorker, ModelConfig, ModelError, ModelResult,
    SpeechModel,
};
pub use synthesis::{
    SynthesisError, SynthesisMode, SynthesisOutcome, SynthesisRequest, SynthesisResult,
    SynthesisSettings, Synthesizer,
};
