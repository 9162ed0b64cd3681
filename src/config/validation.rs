//! Configuration validation logic

use super::ServerConfig;

/// Validate a merged configuration
pub(super) fn validate(config: &ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    validate_server(config)?;
    validate_model(config)?;
    Ok(())
}

fn validate_server(config: &ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    if config.host.trim().is_empty() {
        return Err("host must not be empty".into());
    }
    if config.port == 0 {
        return Err("port must be between 1 and 65535".into());
    }
    Ok(())
}

fn validate_model(config: &ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    if config.worker_program.trim().is_empty() {
        return Err("worker_program must not be empty".into());
    }
    if config.model_id.trim().is_empty() {
        return Err("model_id must not be empty".into());
    }

    let url = config.registry_url.trim();
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(format!(
            "registry_url '{}' must start with http:// or https://",
            config.registry_url
        )
        .into());
    }

    Ok(())
}
