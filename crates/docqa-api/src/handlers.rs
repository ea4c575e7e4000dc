//! Route handler functions for all API endpoints.
//!
//! Each handler extracts its inputs via axum extractors, works through the
//! services in AppState, and returns JSON.

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::response::{Html, IntoResponse};
use axum::{Form, Json};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use docqa_llm::build_prompt;

use crate::error::ApiError;
use crate::state::AppState;

/// The single-page upload + ask UI.
pub const INDEX_HTML: &str = include_str!("../assets/index.html");

/// Answer returned when retrieval finds nothing to put in the prompt.
pub const NO_CONTEXT_ANSWER: &str = "No relevant information found in the document.";

/// Name used when the client sends none, or nothing usable.
const DEFAULT_UPLOAD_NAME: &str = "upload";

// =============================================================================
// Request / response types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct UploadParams {
    pub filename: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub status: String,
    pub fragments_indexed: usize,
    pub file_name: String,
}

#[derive(Debug, Deserialize)]
pub struct AskForm {
    #[serde(default)]
    pub question: String,
    pub top_k: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AskResponse {
    pub answer: String,
    pub sources: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub fragments_indexed: usize,
    pub dimensions: usize,
}

// =============================================================================
// Handler functions
// =============================================================================

/// GET / - serve the embedded UI page.
pub async fn home() -> impl IntoResponse {
    Html(INDEX_HTML)
}

/// GET /health - liveness plus store size.
pub async fn health(State(state): State<AppState>) -> Result<Json<HealthResponse>, ApiError> {
    let stats = state.store.stats()?;
    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        fragments_indexed: stats.fragments,
        dimensions: stats.dimensions,
    }))
}

/// POST /upload?filename=<name> - save, extract and index one document.
///
/// The request body is the raw file. Fragments from earlier uploads stay in
/// the store; a rejected upload adds nothing.
pub async fn upload(
    State(state): State<AppState>,
    Query(params): Query<UploadParams>,
    body: Bytes,
) -> Result<Json<UploadResponse>, ApiError> {
    if body.is_empty() {
        return Err(ApiError::BadRequest("Request body is empty".to_string()));
    }

    let file_name = sanitize_file_name(params.filename.as_deref().unwrap_or(""));

    tokio::fs::create_dir_all(&state.upload_dir)
        .await
        .map_err(|e| ApiError::Internal(format!("Failed to create upload dir: {}", e)))?;
    let saved_path = state.upload_dir.join(&file_name);
    tokio::fs::write(&saved_path, &body)
        .await
        .map_err(|e| ApiError::Internal(format!("Failed to save upload: {}", e)))?;

    let text = state.extractor.extract_boxed(&file_name, &body).await?;
    let fragments_indexed = state.store.ingest(&text).await?;

    info!(
        file_name = %file_name,
        path = %saved_path.display(),
        bytes = body.len(),
        fragments = fragments_indexed,
        "Upload processed"
    );

    Ok(Json(UploadResponse {
        status: "indexed".to_string(),
        fragments_indexed,
        file_name,
    }))
}

/// POST /ask - retrieve context for a question and generate an answer.
///
/// Model server failures come back as the answer text with status 200.
pub async fn ask(
    State(state): State<AppState>,
    Form(form): Form<AskForm>,
) -> Result<Json<AskResponse>, ApiError> {
    let question = form.question.trim();
    if question.is_empty() {
        return Err(ApiError::BadRequest("'question' must not be empty".to_string()));
    }

    let top_k = form.top_k.unwrap_or(state.config.retrieval.top_k);
    if top_k == 0 {
        return Err(ApiError::BadRequest("'top_k' must be at least 1".to_string()));
    }

    let sources = state.store.answer_query(question, top_k).await?;
    if sources.is_empty() {
        return Ok(Json(AskResponse {
            answer: NO_CONTEXT_ANSWER.to_string(),
            sources,
        }));
    }

    let prompt = build_prompt(&sources, question);
    let answer = match state.generator.generate(&prompt).await {
        Ok(text) => text.trim().to_string(),
        Err(e) => {
            warn!(error = %e, "Generation failed");
            e.user_message()
        }
    };

    Ok(Json(AskResponse { answer, sources }))
}

/// Reduce a client-supplied name to a safe final path component.
pub fn sanitize_file_name(raw: &str) -> String {
    let last = raw
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or("")
        .trim();
    let cleaned: String = last.chars().filter(|c| !c.is_control()).collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        DEFAULT_UPLOAD_NAME.to_string()
    } else {
        cleaned.to_string()
    }
}
