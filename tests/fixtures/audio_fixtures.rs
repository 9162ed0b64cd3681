//! Audio Test Fixtures
//!
//! Programmatically generated prompt clips, so tests never depend on audio
//! files checked into the repository.

use std::f32::consts::PI;
use std::path::Path;

use hound::{SampleFormat, WavSpec, WavWriter};

/// Rate the model expects for prompt speech
pub const PROMPT_RATE: u32 = 16000;

/// Output rate reported by the mock model
pub const MODEL_RATE: u32 = 24000;

/// Generate a sine tone with the given amplitude (0.0 - 1.0)
pub fn generate_sine(frequency: f32, duration_samples: usize, sample_rate: u32, amplitude: f32) -> Vec<f32> {
    (0..duration_samples)
        .map(|i| amplitude * (2.0 * PI * frequency * i as f32 / sample_rate as f32).sin())
        .collect()
}

/// Write a 16-bit PCM mono clip, the format prompt recordings usually come in
pub fn write_prompt_wav(path: &Path, sample_rate: u32, samples: &[f32]) {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(path, spec).expect("create prompt wav");
    for &sample in samples {
        writer
            .write_sample((sample * i16::MAX as f32) as i16)
            .expect("write prompt sample");
    }
    writer.finalize().expect("finalize prompt wav");
}

/// Half a second of 220 Hz tone at the prompt rate
pub fn write_default_prompt(path: &Path) {
    let samples = generate_sine(220.0, PROMPT_RATE as usize / 2, PROMPT_RATE, 0.5);
    write_prompt_wav(path, PROMPT_RATE, &samples);
}

/// Read back a synthesized file as `f32` samples
pub fn read_output_wav(path: &Path) -> (hound::WavSpec, Vec<f32>) {
    let mut reader = hound::WavReader::open(path).expect("open output wav");
    let spec = reader.spec();
    let samples = reader
        .samples::<f32>()
        .collect::<Result<Vec<_>, _>>()
        .expect("read output samples");
    (spec, samples)
}
