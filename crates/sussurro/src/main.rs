//! # sussurro
//!
//! Speech-to-text server binary: loads a whisper model and serves it over
//! HTTP (`POST /transcribe`, `GET /health`, `GET /metrics`).

#![deny(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use sussurro_server::{ServerConfig, SussurroServer};
use sussurro_transcription::Transcriber;

/// Sussurro speech-to-text server.
#[derive(Parser, Debug)]
#[command(name = "sussurro", about = "HTTP speech-to-text server")]
struct Cli {
    /// Host to bind.
    #[arg(long)]
    host: Option<String>,

    /// Port to bind (overrides the `PORT` environment variable; 0 auto-assigns).
    #[arg(long)]
    port: Option<u16>,

    /// Whisper model to serve (tiny, base, small, medium, large-v3, ...).
    #[arg(long, default_value = "base")]
    model: String,

    /// Directory holding ggml model files (defaults to `~/.sussurro/models`).
    #[arg(long)]
    model_dir: Option<PathBuf>,

    /// Force a transcription language instead of auto-detecting per request.
    #[arg(long)]
    language: Option<String>,

    /// Inference threads (defaults to whisper.cpp's own choice).
    #[arg(long)]
    threads: Option<usize>,

    /// Maximum accepted upload size in megabytes.
    #[arg(long)]
    max_upload_mb: Option<u64>,
}

/// Effective config: defaults, then `PORT` from the environment, then flags.
fn resolve_config(cli: &Cli) -> ServerConfig {
    let mut config = ServerConfig::from_env();
    apply_cli_overrides(&mut config, cli);
    config
}

fn apply_cli_overrides(config: &mut ServerConfig, cli: &Cli) {
    if let Some(host) = &cli.host {
        config.host.clone_from(host);
    }
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(mb) = cli.max_upload_mb {
        config.max_upload_bytes = mb.saturating_mul(1024 * 1024);
    }
}

/// Fetch the model if needed and load the native whisper engine.
#[cfg(feature = "whisper")]
async fn build_engine(cli: &Cli) -> Result<Arc<dyn Transcriber>> {
    use sussurro_transcription::{model, EngineConfig, WhisperEngine};

    if !model::KNOWN_MODELS.contains(&cli.model.as_str()) {
        tracing::warn!(model = %cli.model, "model not in the known list, attempting anyway");
    }

    let model_dir = cli
        .model_dir
        .clone()
        .unwrap_or_else(model::default_model_dir);
    let model_path = model::ensure_model(&model_dir, &cli.model)
        .await
        .context("Failed to fetch model weights")?;

    let engine = WhisperEngine::load(EngineConfig {
        model_path,
        language: cli.language.clone(),
        threads: cli.threads,
    })
    .context("Failed to load whisper model")?;

    Ok(Arc::new(engine))
}

/// Fallback engine for builds without native inference.
#[cfg(not(feature = "whisper"))]
mod disabled {
    use std::path::Path;

    use sussurro_transcription::{Transcriber, Transcript, TranscriptionError};

    /// Keeps `/health` and `/metrics` serving while `/transcribe` answers 503.
    #[derive(Debug)]
    pub struct DisabledEngine;

    impl Transcriber for DisabledEngine {
        fn transcribe_file(&self, _path: &Path) -> Result<Transcript, TranscriptionError> {
            Err(TranscriptionError::ModelNotAvailable(
                "server built without native inference".into(),
            ))
        }

        fn model_name(&self) -> &str {
            "disabled"
        }

        fn is_ready(&self) -> bool {
            false
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let recorder = sussurro_server::metrics::install_recorder();

    let config = resolve_config(&cli);

    #[cfg(feature = "whisper")]
    let engine = build_engine(&cli).await?;
    #[cfg(not(feature = "whisper"))]
    let engine: Arc<dyn Transcriber> = {
        if cli.model_dir.is_some() || cli.language.is_some() || cli.threads.is_some() {
            tracing::warn!("model flags are ignored without native inference");
        }
        tracing::warn!(
            "built without native inference, /transcribe will answer 503 (rebuild with --features whisper)"
        );
        Arc::new(disabled::DisabledEngine)
    };

    let server = SussurroServer::new(config, engine, recorder);
    let (addr, handle) = server.listen().await.context("Failed to bind server")?;

    tracing::info!(model = %cli.model, "Sussurro listening on http://{addr}");

    // Wait for shutdown signal
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")?;

    tracing::info!("Shutting down...");
    server.shutdown();
    let _ = handle.await;

    tracing::info!("Shutdown complete");
    Ok(())
}
