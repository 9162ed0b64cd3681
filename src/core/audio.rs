//! WAV input/output for prompt clips and synthesized chunks
//!
//! Prompt clips are decoded to mono `f32` at the rate the model expects
//! (16 kHz); synthesized chunks are written back as mono WAV files at the
//! model's output rate.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Sample rate the model expects for prompt speech
pub const PROMPT_SAMPLE_RATE: u32 = 16_000;

/// Result type for audio I/O
pub type AudioResult<T> = Result<T, AudioError>;

#[derive(Error, Debug)]
pub enum AudioError {
    #[error("Failed to read WAV file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: hound::Error,
    },

    #[error("Failed to write WAV file {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: hound::Error,
    },

    /// Prompt audio must be at least the target rate; it is never upsampled.
    #[error(
        "WAV file {} has sample rate {actual} Hz, must be at least {required} Hz",
        .path.display()
    )]
    SampleRateTooLow {
        path: PathBuf,
        actual: u32,
        required: u32,
    },
}

/// Sample encoding used when persisting synthesized audio
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputSampleFormat {
    /// 32-bit IEEE float, the model's native output
    #[default]
    Float32,
    /// 16-bit signed PCM
    Pcm16,
}

impl OutputSampleFormat {
    fn spec(self, sample_rate: u32) -> WavSpec {
        match self {
            OutputSampleFormat::Float32 => WavSpec {
                channels: 1,
                sample_rate,
                bits_per_sample: 32,
                sample_format: SampleFormat::Float,
            },
            OutputSampleFormat::Pcm16 => WavSpec {
                channels: 1,
                sample_rate,
                bits_per_sample: 16,
                sample_format: SampleFormat::Int,
            },
        }
    }
}

impl fmt::Display for OutputSampleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputSampleFormat::Float32 => write!(f, "float32"),
            OutputSampleFormat::Pcm16 => write!(f, "pcm16"),
        }
    }
}

impl FromStr for OutputSampleFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "float32" | "f32" | "float" => Ok(OutputSampleFormat::Float32),
            "pcm16" | "s16" | "int16" => Ok(OutputSampleFormat::Pcm16),
            other => Err(format!(
                "Invalid output sample format '{other}'. Expected 'float32' or 'pcm16'"
            )),
        }
    }
}

/// Load a WAV file as mono `f32` samples at `target_rate`.
///
/// Channels are averaged, integer samples are scaled into `[-1.0, 1.0)` and
/// audio recorded above `target_rate` is downsampled. Audio below
/// `target_rate` is rejected.
pub fn load_wav(path: &Path, target_rate: u32) -> AudioResult<Vec<f32>> {
    let read_err = |source| AudioError::Read {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = WavReader::open(path).map_err(read_err)?;
    let spec = reader.spec();

    if spec.sample_rate < target_rate {
        return Err(AudioError::SampleRateTooLow {
            path: path.to_path_buf(),
            actual: spec.sample_rate,
            required: target_rate,
        });
    }

    let interleaved: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<_, _>>()
            .map_err(read_err)?,
        SampleFormat::Int => {
            let scale = 1.0 / (1_i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|sample| sample.map(|v| v as f32 * scale))
                .collect::<Result<_, _>>()
                .map_err(read_err)?
        }
    };

    let mono = downmix(&interleaved, spec.channels as usize);
    Ok(resample_down(&mono, spec.sample_rate, target_rate))
}

/// Write mono samples to `path`, replacing any existing file.
pub fn write_wav(
    path: &Path,
    samples: &[f32],
    sample_rate: u32,
    format: OutputSampleFormat,
) -> AudioResult<()> {
    let write_err = |source| AudioError::Write {
        path: path.to_path_buf(),
        source,
    };

    let mut writer = WavWriter::create(path, format.spec(sample_rate)).map_err(write_err)?;

    match format {
        OutputSampleFormat::Float32 => {
            for &sample in samples {
                writer.write_sample(sample).map_err(write_err)?;
            }
        }
        OutputSampleFormat::Pcm16 => {
            for &sample in samples {
                let value = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
                writer.write_sample(value).map_err(write_err)?;
            }
        }
    }

    writer.finalize().map_err(write_err)
}

/// Average interleaved frames into a single channel
fn downmix(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }

    interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// Box-filter downsampling: each output sample is the mean of the input
/// samples its window covers.
fn resample_down(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let ratio = from_rate as f64 / to_rate as f64;
    let out_len = ((samples.len() as u64 * to_rate as u64).div_ceil(from_rate as u64)) as usize;

    (0..out_len)
        .map(|i| {
            let start = (i as f64 * ratio).floor() as usize;
            let end = (((i + 1) as f64 * ratio).ceil() as usize)
                .min(samples.len())
                .max(start + 1);
            let window = &samples[start..end];
            window.iter().sum::<f32>() / window.len() as f32
        })
        .collect()
}
