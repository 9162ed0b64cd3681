use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, anyhow};
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::{error, info};

use cosyvoice_server::{
    ServerConfig,
    core::{Lifecycle, SpeechModel, model::CosyVoiceWorker, model::assets, watch_signals},
    init, routes, server,
    state::AppState,
};

/// CosyVoice server - local text-to-speech over HTTP
#[derive(Parser, Debug)]
#[command(name = "cosyvoice-server")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to configuration file (YAML)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Subcommand to run
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Download the model snapshot into the configured model directory
    Init,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if it exists (must be done before config loading)
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    // Load configuration from file or environment
    let config = if let Some(config_path) = cli.config {
        info!("Loading configuration from {}", config_path.display());
        ServerConfig::from_file(&config_path).map_err(|e| anyhow!(e.to_string()))?
    } else {
        ServerConfig::from_env().map_err(|e| anyhow!(e.to_string()))?
    };

    if let Some(Commands::Init) = cli.command {
        init::run(&config).await?;
        return Ok(());
    }

    let lifecycle = Lifecycle::new();

    // Model loading failures are fatal; the server never starts without one
    let model_config = config.model_config();
    assets::ensure_model_present(&model_config)?;

    let settings = config.synthesis_settings();
    let prompt_samples = settings.verify_default_prompt().with_context(|| {
        format!(
            "Default prompt clip {:?} is unusable",
            settings.default_prompt_wav
        )
    })?;
    info!(
        "Default prompt clip loaded ({} samples at 16 kHz)",
        prompt_samples
    );

    info!("Loading CosyVoice2 model from {:?}", model_config.model_dir);
    let model: Arc<dyn SpeechModel> = match CosyVoiceWorker::spawn(&model_config).await {
        Ok(worker) => Arc::new(worker),
        Err(e) => {
            error!("Failed to load CosyVoice2 model: {}", e);
            return Err(e).context("Model initialization failed");
        }
    };
    info!("Model loaded");

    std::fs::create_dir_all(&config.fallback_output_dir).with_context(|| {
        format!(
            "Failed to create fallback output directory {:?}",
            config.fallback_output_dir
        )
    })?;

    let address = config.address();
    let grace = config.shutdown_grace();
    let app_state = AppState::new(config, model, lifecycle.clone());
    let app = routes::create_app(app_state);

    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;
    info!("Server listening on http://{}", listener.local_addr()?);

    tokio::spawn(watch_signals(lifecycle.clone()));

    server::serve(listener, app, lifecycle, grace).await?;

    info!("Server has been shut down.");
    Ok(())
}
