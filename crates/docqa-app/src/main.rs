//! docqa binary: composition root for the document question-answering server.

mod cli;

use std::sync::Arc;

use clap::Parser;
use docqa_api::{start_server, AppState};
use docqa_core::config::{expand_home, DocQaConfig, EmbeddingConfig};
use docqa_core::error::DocQaError;
use docqa_extract::DocumentExtractor;
use docqa_llm::OllamaClient;
use docqa_vector::{MockEmbedding, OnnxEmbeddingService, RetrievalStore, SharedEmbedder};
use tracing_subscriber::EnvFilter;

use crate::cli::CliArgs;

/// Pick the embedding backend named in config.
fn build_embedder(config: &EmbeddingConfig) -> Result<SharedEmbedder, DocQaError> {
    match config.backend.as_str() {
        "mock" => {
            tracing::warn!(
                dimensions = config.dimensions,
                "Using mock embeddings; retrieval will not be semantic"
            );
            Ok(SharedEmbedder::new(MockEmbedding::with_dimensions(
                config.dimensions,
            )))
        }
        _ => {
            let model_dir = expand_home(&config.model_dir);
            let service = OnnxEmbeddingService::from_directory(&model_dir)?;
            let actual = docqa_vector::EmbeddingService::dimensions(&service);
            if actual != config.dimensions {
                return Err(DocQaError::Config(format!(
                    "embedding.dimensions is {} but the model at {} produces {}",
                    config.dimensions,
                    model_dir.display(),
                    actual
                )));
            }
            Ok(SharedEmbedder::new(service))
        }
    }
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Ctrl-C received, shutting down"),
        Err(e) => tracing::error!(error = %e, "Failed to listen for Ctrl-C"),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config.
    let config_file = args.resolve_config_path();
    let config_exists = config_file.exists();
    let mut config = DocQaConfig::load_or_default(&config_file);
    args.apply_overrides(&mut config);

    // Tracing. RUST_LOG wins over the configured level.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new(&config.general.log_level))
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!("Starting docqa v{}", env!("CARGO_PKG_VERSION"));
    if config_exists {
        tracing::info!(path = %config_file.display(), "Configuration loaded");
    } else {
        tracing::info!(path = %config_file.display(), "No config file, using defaults");
    }
    config.validate()?;

    let upload_dir = config.upload_dir();
    if let Err(e) = std::fs::create_dir_all(&upload_dir) {
        tracing::error!(path = %upload_dir.display(), error = %e, "Failed to create upload directory");
        return Err(e.into());
    }

    // Retrieval core.
    let embedder = build_embedder(&config.embedding)?;
    let store = RetrievalStore::from_config(embedder, &config.retrieval)?;
    tracing::info!(
        backend = %config.embedding.backend,
        dimensions = store.dimensions(),
        fragment_size = store.fragment_size(),
        top_k = config.retrieval.top_k,
        "Retrieval store ready"
    );

    // Generation.
    let generator = OllamaClient::new(config.generation.clone())?;
    tracing::info!(
        url = %generator.url(),
        model = %generator.model(),
        timeout_secs = config.generation.timeout_secs,
        "Ollama client ready"
    );

    let state = AppState::new(
        config,
        store,
        Arc::new(DocumentExtractor::new()),
        Arc::new(generator),
    );

    start_server(state, shutdown_signal()).await?;

    Ok(())
}
