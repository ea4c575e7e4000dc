//! Thin client for the Ollama `/api/generate` endpoint.
//!
//! Requests are non-streaming (`stream: false`): the whole answer arrives as
//! one JSON object with the text in `response`. Local models on CPU can take
//! minutes, so the client timeout comes from `generation.timeout_secs`.

use std::time::Duration;

use async_trait::async_trait;
use docqa_core::config::GenerationConfig;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::GenerationError;
use crate::service::GenerationService;

/// Longest slice of an error body kept for the user.
const ERROR_SNIPPET_CHARS: usize = 240;

/// Ollama generation client.
///
/// Holds one reusable `reqwest::Client`; cloning is cheap.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: reqwest::Client,
    cfg: GenerationConfig,
    url_generate: String,
}

impl OllamaClient {
    /// Build a client from the `[generation]` config section.
    ///
    /// # Errors
    /// - [`GenerationError::InvalidEndpoint`] if the endpoint is not http(s)
    /// - [`GenerationError::Transport`] if the HTTP client cannot be built
    pub fn new(cfg: GenerationConfig) -> Result<Self, GenerationError> {
        let endpoint = cfg.endpoint.trim();
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(GenerationError::InvalidEndpoint(cfg.endpoint.clone()));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .map_err(|e| GenerationError::Transport(e.to_string()))?;

        let url_generate = format!("{}/api/generate", endpoint.trim_end_matches('/'));

        Ok(Self {
            client,
            cfg,
            url_generate,
        })
    }

    pub fn model(&self) -> &str {
        &self.cfg.model
    }

    pub fn url(&self) -> &str {
        &self.url_generate
    }
}

#[async_trait]
impl GenerationService for OllamaClient {
    #[instrument(skip_all, fields(model = %self.cfg.model))]
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let body = GenerateRequest::from_cfg(&self.cfg, prompt);

        debug!(url = %self.url_generate, prompt_chars = prompt.len(), "POST generate");
        let resp = self
            .client
            .post(&self.url_generate)
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let text = resp.text().await.unwrap_or_default();
            return Err(GenerationError::HttpStatus {
                status,
                body: text.chars().take(ERROR_SNIPPET_CHARS).collect(),
            });
        }

        let out: GenerateResponse = resp
            .json()
            .await
            .map_err(|e| GenerationError::Decode(e.to_string()))?;

        match out.response {
            Some(text) if !text.trim().is_empty() => Ok(text),
            _ => Err(GenerationError::EmptyResponse),
        }
    }
}

/// Request body for `/api/generate` (non-streaming).
#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    #[serde(skip_serializing_if = "GenerateOptions::is_empty")]
    options: GenerateOptions,
}

impl<'a> GenerateRequest<'a> {
    fn from_cfg(cfg: &'a GenerationConfig, prompt: &'a str) -> Self {
        Self {
            model: &cfg.model,
            prompt,
            stream: false,
            options: GenerateOptions {
                temperature: cfg.temperature,
                top_p: cfg.top_p,
                num_predict: cfg.max_tokens,
            },
        }
    }
}

/// Subset of Ollama `options`.
#[derive(Debug, Default, Serialize)]
struct GenerateOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

impl GenerateOptions {
    fn is_empty(&self) -> bool {
        self.temperature.is_none() && self.top_p.is_none() && self.num_predict.is_none()
    }
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: Option<String>,
}
