//! Application state shared across all route handlers.
//!
//! AppState holds the retrieval store and the services around it. It is
//! passed to handlers via axum's State extractor.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use docqa_core::config::DocQaConfig;
use docqa_extract::SharedExtractor;
use docqa_llm::GenerationService;
use docqa_vector::{RetrievalStore, SharedEmbedder};

/// Shared application state.
///
/// All fields use `Arc` for cheap cloning across handler tasks. The store
/// does its own locking.
#[derive(Clone)]
pub struct AppState {
    /// Effective configuration after CLI/env overrides.
    pub config: Arc<DocQaConfig>,
    /// Corpus + index pair fed by uploads and read by questions.
    pub store: Arc<RetrievalStore<SharedEmbedder>>,
    /// Turns uploaded bytes into text.
    pub extractor: SharedExtractor,
    /// Answers prompts built from retrieved fragments.
    pub generator: Arc<dyn GenerationService>,
    /// Where uploaded files are written.
    pub upload_dir: PathBuf,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    pub fn new(
        config: DocQaConfig,
        store: RetrievalStore<SharedEmbedder>,
        extractor: SharedExtractor,
        generator: Arc<dyn GenerationService>,
    ) -> Self {
        let upload_dir = config.upload_dir();
        Self {
            config: Arc::new(config),
            store: Arc::new(store),
            extractor,
            generator,
            upload_dir,
            start_time: Instant::now(),
        }
    }

    /// Override where uploads are saved.
    pub fn with_upload_dir(mut self, dir: PathBuf) -> Self {
        self.upload_dir = dir;
        self
    }
}
