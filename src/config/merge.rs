//! Merging environment and YAML configuration

use std::path::PathBuf;

use super::ServerConfig;
use super::env::apply_env;
use super::yaml::YamlConfig;

/// Build the final configuration: defaults, then environment, then YAML
pub(super) fn merge_config(
    yaml: Option<YamlConfig>,
) -> Result<ServerConfig, Box<dyn std::error::Error>> {
    let mut config = ServerConfig::default();
    apply_env(&mut config)?;

    if let Some(yaml) = yaml {
        apply_yaml(&mut config, yaml);
    }

    Ok(config)
}

fn apply_yaml(config: &mut ServerConfig, yaml: YamlConfig) {
    if let Some(server) = yaml.server {
        if let Some(host) = server.host {
            config.host = host;
        }
        if let Some(port) = server.port {
            config.port = port;
        }
        if let Some(grace) = server.shutdown_grace_seconds {
            config.shutdown_grace_seconds = grace;
        }
    }

    if let Some(model) = yaml.model {
        if let Some(dir) = model.dir {
            config.model_dir = PathBuf::from(dir);
        }
        if let Some(program) = model.worker_program {
            config.worker_program = program;
        }
        if let Some(args) = model.worker_args {
            config.worker_args = args;
        }
        if let Some(id) = model.id {
            config.model_id = id;
        }
        if let Some(revision) = model.revision {
            config.model_revision = revision;
        }
        if let Some(url) = model.registry_url {
            config.registry_url = url;
        }
    }

    if let Some(synthesis) = yaml.synthesis {
        if let Some(path) = synthesis.default_prompt_wav {
            config.default_prompt_wav = PathBuf::from(path);
        }
        if let Some(text) = synthesis.default_prompt_text {
            config.default_prompt_text = text;
        }
        if let Some(dir) = synthesis.fallback_output_dir {
            config.fallback_output_dir = PathBuf::from(dir);
        }
        if let Some(format) = synthesis.output_sample_format {
            config.output_sample_format = format;
        }
    }
}
