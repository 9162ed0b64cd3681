//! Environment variable loading

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use super::ServerConfig;
use crate::core::audio::OutputSampleFormat;

/// Read a variable, treating empty values as unset
fn env_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T>(key: &str) -> Result<Option<T>, Box<dyn std::error::Error>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env_var(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| format!("Invalid {key} '{raw}': {e}").into()),
        None => Ok(None),
    }
}

/// Overlay environment variables onto `config`
pub(super) fn apply_env(config: &mut ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(host) = env_var("HOST") {
        config.host = host;
    }
    if let Some(port) = parse_env::<u16>("PORT")? {
        config.port = port;
    }
    if let Some(grace) = parse_env::<u64>("SHUTDOWN_GRACE_SECONDS")? {
        config.shutdown_grace_seconds = grace;
    }

    if let Some(dir) = env_var("MODEL_DIR") {
        config.model_dir = PathBuf::from(dir);
    }
    if let Some(program) = env_var("MODEL_WORKER_PROGRAM") {
        config.worker_program = program;
    }
    if let Some(args) = env_var("MODEL_WORKER_ARGS") {
        config.worker_args = args.split_whitespace().map(str::to_string).collect();
    }
    if let Some(id) = env_var("MODEL_ID") {
        config.model_id = id;
    }
    if let Some(revision) = env_var("MODEL_REVISION") {
        config.model_revision = revision;
    }
    if let Some(url) = env_var("MODEL_REGISTRY_URL") {
        config.registry_url = url;
    }

    if let Some(path) = env_var("DEFAULT_PROMPT_WAV") {
        config.default_prompt_wav = PathBuf::from(path);
    }
    if let Some(text) = env_var("DEFAULT_PROMPT_TEXT") {
        config.default_prompt_text = text;
    }
    if let Some(dir) = env_var("FALLBACK_OUTPUT_DIR") {
        config.fallback_output_dir = PathBuf::from(dir);
    }
    if let Some(format) = parse_env::<OutputSampleFormat>("OUTPUT_SAMPLE_FORMAT")? {
        config.output_sample_format = format;
    }

    Ok(())
}
