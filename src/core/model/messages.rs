//! Line-delimited JSON messages exchanged with the model worker
//!
//! Sample payloads are base64-encoded little-endian `f32`.

use base64::{Engine, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};

use super::{ModelError, ModelResult};

/// Request written to the worker's stdin, one per line
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum WorkerRequest<'a> {
    ZeroShot {
        text: &'a str,
        prompt_text: &'a str,
        prompt_speech: String,
    },
    Instruct {
        text: &'a str,
        instruction: &'a str,
        prompt_speech: String,
    },
}

/// Event read from the worker's stdout, one per line
#[derive(Debug, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum WorkerEvent {
    /// Model loaded; sent once at startup
    Ready { sample_rate: u32 },
    /// One synthesized chunk
    Chunk { samples: String },
    /// Inference finished successfully
    Done,
    /// Load or inference failure
    Error { message: String },
}

impl WorkerEvent {
    /// Parse one stdout line. Returns `None` for lines that are not protocol
    /// messages (stray prints from the model library).
    pub(crate) fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if !line.starts_with('{') {
            return None;
        }
        serde_json::from_str(line).ok()
    }
}

pub(crate) fn encode_samples(samples: &[f32]) -> String {
    let bytes: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
    STANDARD.encode(bytes)
}

pub(crate) fn decode_samples(encoded: &str) -> ModelResult<Vec<f32>> {
    let bytes = STANDARD
        .decode(encoded)
        .map_err(|e| ModelError::Protocol(format!("Invalid base64 sample payload: {e}")))?;

    if bytes.len() % 4 != 0 {
        return Err(ModelError::Protocol(format!(
            "Sample payload length {} is not a multiple of 4",
            bytes.len()
        )));
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization_tags() {
        let zero_shot = WorkerRequest::ZeroShot {
            text: "hello",
            prompt_text: "prompt",
            prompt_speech: String::new(),
        };
        let json = serde_json::to_value(&zero_shot).unwrap();
        assert_eq!(json["type"], "zero_shot");
        assert_eq!(json["prompt_text"], "prompt");

        let instruct = WorkerRequest::Instruct {
            text: "hello",
            instruction: "speak cheerfully",
            prompt_speech: String::new(),
        };
        let json = serde_json::to_value(&instruct).unwrap();
        assert_eq!(json["type"], "instruct");
        assert_eq!(json["instruction"], "speak cheerfully");
    }

    #[test]
    fn test_event_parsing() {
        assert_eq!(
            WorkerEvent::parse(r#"{"type":"ready","sample_rate":24000}"#),
            Some(WorkerEvent::Ready { sample_rate: 24000 })
        );
        assert_eq!(
            WorkerEvent::parse(r#"  {"type":"done"}  "#),
            Some(WorkerEvent::Done)
        );
        assert_eq!(
            WorkerEvent::parse(r#"{"type":"error","message":"CUDA out of memory"}"#),
            Some(WorkerEvent::Error {
                message: "CUDA out of memory".to_string()
            })
        );
    }

    #[test]
    fn test_event_parsing_ignores_noise() {
        assert_eq!(WorkerEvent::parse("Loading model weights..."), None);
        assert_eq!(WorkerEvent::parse(""), None);
        assert_eq!(WorkerEvent::parse(r#"{"type":"unknown"}"#), None);
    }

    #[test]
    fn test_sample_payload_decoding() {
        let encoded = encode_samples(&[0.5, -1.0]);
        assert_eq!(decode_samples(&encoded).unwrap(), vec![0.5, -1.0]);

        // 4 zero bytes
        assert_eq!(decode_samples("AAAAAA==").unwrap(), vec![0.0]);
    }

    #[test]
    fn test_sample_payload_rejects_truncated_data() {
        // 3 bytes
        let result = decode_samples("AAAA");
        assert!(matches!(result, Err(ModelError::Protocol(_))));

        let result = decode_samples("not base64!");
        assert!(matches!(result, Err(ModelError::Protocol(_))));
    }
}
