//! Embedding service trait and implementations.
//!
//! - `OnnxEmbeddingService` loads a sentence-transformer ONNX model (e.g.
//!   all-MiniLM-L6-v2) via ort and tokenizes with the HuggingFace tokenizers
//!   crate. This is the production embedding backend.
//! - `MockEmbedding` provides deterministic hash-based vectors for testing.

use std::collections::hash_map::DefaultHasher;
use std::future::Future;
use std::hash::{Hash, Hasher};
use std::path::Path;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use ort::session::Session;
use ort::value::TensorRef;
use tokenizers::Tokenizer;
use tracing::{debug, info};

use crate::error::RetrievalError;

/// Dimension of all-MiniLM-L6-v2, the reference model.
pub const DEFAULT_DIMENSIONS: usize = 384;

/// Token window of BERT-style sentence transformers.
const MAX_SEQUENCE_TOKENS: usize = 512;

/// Service for turning text into fixed-dimension vectors.
///
/// The same text must always map to the same vector for a given model, and
/// a batch of N texts must come back as exactly N vectors in input order.
pub trait EmbeddingService: Send + Sync {
    /// Embed a batch of texts.
    fn embed(
        &self,
        texts: &[String],
    ) -> impl Future<Output = Result<Vec<Vec<f32>>, RetrievalError>> + Send;

    /// Embed a single query text.
    fn embed_one(&self, text: &str) -> impl Future<Output = Result<Vec<f32>, RetrievalError>> + Send {
        let batch = vec![text.to_string()];
        async move {
            let mut vectors = self.embed(&batch).await?;
            if vectors.len() != 1 {
                return Err(RetrievalError::BatchMismatch {
                    fragments: 1,
                    vectors: vectors.len(),
                });
            }
            vectors.pop().ok_or(RetrievalError::BatchMismatch {
                fragments: 1,
                vectors: 0,
            })
        }
    }

    /// Dimensionality of the vectors produced by this service.
    fn dimensions(&self) -> usize;
}

type BoxedEmbedFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Vec<Vec<f32>>, RetrievalError>> + Send + 'a>>;

/// Object-safe version of [`EmbeddingService`] for dynamic dispatch.
///
/// `EmbeddingService::embed` returns `impl Future`, which is not
/// object-safe. This trait boxes the future instead so the backend can be
/// picked at runtime and stored as [`SharedEmbedder`].
pub trait DynEmbeddingService: Send + Sync {
    fn embed_boxed<'a>(&'a self, texts: &'a [String]) -> BoxedEmbedFuture<'a>;

    fn dimensions(&self) -> usize;
}

impl<T: EmbeddingService> DynEmbeddingService for T {
    fn embed_boxed<'a>(&'a self, texts: &'a [String]) -> BoxedEmbedFuture<'a> {
        Box::pin(self.embed(texts))
    }

    fn dimensions(&self) -> usize {
        EmbeddingService::dimensions(self)
    }
}

/// A runtime-selected embedding backend.
///
/// Cloning shares the underlying service.
#[derive(Clone)]
pub struct SharedEmbedder(Arc<dyn DynEmbeddingService>);

impl SharedEmbedder {
    pub fn new<T: EmbeddingService + 'static>(service: T) -> Self {
        Self(Arc::new(service))
    }
}

impl<T: EmbeddingService + 'static> From<Arc<T>> for SharedEmbedder {
    fn from(service: Arc<T>) -> Self {
        Self(service)
    }
}

impl std::fmt::Debug for SharedEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedEmbedder")
            .field("dimensions", &self.0.dimensions())
            .finish()
    }
}

impl EmbeddingService for SharedEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RetrievalError> {
        self.0.embed_boxed(texts).await
    }

    fn dimensions(&self) -> usize {
        self.0.dimensions()
    }
}

// ---------------------------------------------------------------------------
// OnnxEmbeddingService - real ONNX Runtime inference
// ---------------------------------------------------------------------------

struct OnnxModel {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
    dimensions: usize,
}

/// ONNX Runtime-backed embedding service using a sentence-transformer model.
///
/// Expects a model directory containing:
/// - `model.onnx`: the sentence-transformer ONNX export
/// - `tokenizer.json`: the HuggingFace fast-tokenizer file
///
/// The model should accept `input_ids`, `attention_mask` and
/// `token_type_ids` as i64 inputs and produce token-level embeddings.
/// Masked mean pooling and L2 normalisation give one vector per input.
#[derive(Clone)]
pub struct OnnxEmbeddingService {
    model: Arc<OnnxModel>,
}

impl std::fmt::Debug for OnnxEmbeddingService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxEmbeddingService")
            .field("dimensions", &self.model.dimensions)
            .finish()
    }
}

impl OnnxEmbeddingService {
    /// Load a sentence-transformer model from the given directory.
    ///
    /// The directory must contain `model.onnx` and `tokenizer.json`.
    pub fn from_directory(model_dir: &Path) -> Result<Self, RetrievalError> {
        Self::from_files(
            &model_dir.join("model.onnx"),
            &model_dir.join("tokenizer.json"),
        )
    }

    /// Load from explicit model and tokenizer file paths.
    pub fn from_files(model_path: &Path, tokenizer_path: &Path) -> Result<Self, RetrievalError> {
        if !model_path.exists() {
            return Err(unavailable(format!(
                "ONNX model not found at {}",
                model_path.display()
            )));
        }
        if !tokenizer_path.exists() {
            return Err(unavailable(format!(
                "tokenizer not found at {}",
                tokenizer_path.display()
            )));
        }

        let session = Session::builder()
            .map_err(|e| unavailable(format!("ONNX session builder: {}", e)))?
            .with_intra_threads(1)
            .map_err(|e| unavailable(format!("ONNX set threads: {}", e)))?
            .commit_from_file(model_path)
            .map_err(|e| unavailable(format!("ONNX load model: {}", e)))?;

        // Sentence-transformer output is [batch, seq_len, hidden_dim].
        let dimensions = session
            .outputs()
            .first()
            .and_then(|out| out.dtype().tensor_shape())
            .and_then(|shape| shape.last().copied())
            .map(|d| if d > 0 { d as usize } else { DEFAULT_DIMENSIONS })
            .unwrap_or(DEFAULT_DIMENSIONS);

        let tokenizer = Tokenizer::from_file(tokenizer_path)
            .map_err(|e| unavailable(format!("failed to load tokenizer: {}", e)))?;

        info!(
            model = %model_path.display(),
            dimensions,
            "Loaded ONNX embedding model"
        );

        Ok(Self {
            model: Arc::new(OnnxModel {
                session: Mutex::new(session),
                tokenizer,
                dimensions,
            }),
        })
    }
}

impl OnnxModel {
    /// Tokenize, run inference, and mean-pool the output.
    fn embed_sync(&self, text: &str) -> Result<Vec<f32>, RetrievalError> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| unavailable(format!("tokenization failed: {}", e)))?;

        let seq_len = encoding.get_ids().len().min(MAX_SEQUENCE_TOKENS);
        let input_ids: Vec<i64> = encoding.get_ids()[..seq_len]
            .iter()
            .map(|&id| id as i64)
            .collect();
        let attention_mask: Vec<i64> = encoding.get_attention_mask()[..seq_len]
            .iter()
            .map(|&m| m as i64)
            .collect();
        let token_type_ids: Vec<i64> = encoding.get_type_ids()[..seq_len]
            .iter()
            .map(|&t| t as i64)
            .collect();

        let ids_array = ndarray::Array2::from_shape_vec((1, seq_len), input_ids)
            .map_err(|e| unavailable(format!("input_ids array: {}", e)))?;
        let mask_array = ndarray::Array2::from_shape_vec((1, seq_len), attention_mask.clone())
            .map_err(|e| unavailable(format!("attention_mask array: {}", e)))?;
        let type_array = ndarray::Array2::from_shape_vec((1, seq_len), token_type_ids)
            .map_err(|e| unavailable(format!("token_type_ids array: {}", e)))?;

        let ids_ref = TensorRef::from_array_view(&ids_array)
            .map_err(|e| unavailable(format!("TensorRef input_ids: {}", e)))?;
        let mask_ref = TensorRef::from_array_view(&mask_array)
            .map_err(|e| unavailable(format!("TensorRef attention_mask: {}", e)))?;
        let type_ref = TensorRef::from_array_view(&type_array)
            .map_err(|e| unavailable(format!("TensorRef token_type_ids: {}", e)))?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| unavailable(format!("session lock poisoned: {}", e)))?;
        let outputs = session
            .run(ort::inputs![ids_ref, mask_ref, type_ref])
            .map_err(|e| unavailable(format!("ONNX inference failed: {}", e)))?;

        let (shape, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| unavailable(format!("extract embeddings: {}", e)))?;

        let mut pooled = mean_pool(shape, data, &attention_mask)?;
        l2_normalize(&mut pooled);
        Ok(pooled)
    }
}

impl EmbeddingService for OnnxEmbeddingService {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RetrievalError> {
        // ONNX Runtime inference is CPU-bound; run on a blocking thread.
        let model = Arc::clone(&self.model);
        let texts = texts.to_vec();
        debug!(batch = texts.len(), "Embedding batch with ONNX model");

        tokio::task::spawn_blocking(move || {
            texts
                .iter()
                .map(|text| model.embed_sync(text))
                .collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(|e| unavailable(format!("embedding task panicked: {}", e)))?
    }

    fn dimensions(&self) -> usize {
        self.model.dimensions
    }
}

// ---------------------------------------------------------------------------
// MockEmbedding - deterministic hash-based vectors for testing
// ---------------------------------------------------------------------------

/// Mock embedding service that returns deterministic unit vectors.
///
/// The output is derived from a hash of the input text, so identical inputs
/// always produce identical outputs. A mock built with
/// [`MockEmbedding::unavailable`] fails every call, standing in for a dead
/// backend.
#[derive(Debug, Clone)]
pub struct MockEmbedding {
    dimensions: usize,
    available: bool,
}

impl MockEmbedding {
    pub fn new() -> Self {
        Self::with_dimensions(DEFAULT_DIMENSIONS)
    }

    pub fn with_dimensions(dimensions: usize) -> Self {
        Self {
            dimensions,
            available: true,
        }
    }

    /// A mock whose backend is always down.
    pub fn unavailable() -> Self {
        Self {
            dimensions: DEFAULT_DIMENSIONS,
            available: false,
        }
    }

    fn hash_to_vector(&self, text: &str) -> Vec<f32> {
        let mut result = Vec::with_capacity(self.dimensions);
        for i in 0..self.dimensions {
            let mut hasher = DefaultHasher::new();
            text.hash(&mut hasher);
            i.hash(&mut hasher);
            let h = hasher.finish();
            let val = ((h as f64) / (u64::MAX as f64)) * 2.0 - 1.0;
            result.push(val as f32);
        }

        // Unit length, matching OnnxEmbeddingService.
        l2_normalize(&mut result);
        result
    }
}

impl Default for MockEmbedding {
    fn default() -> Self {
        Self::new()
    }
}

impl EmbeddingService for MockEmbedding {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RetrievalError> {
        if !self.available {
            return Err(unavailable("mock embedding backend is offline"));
        }
        Ok(texts.iter().map(|t| self.hash_to_vector(t)).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

/// Attention-masked mean over the token axis of a `[1, seq_len, hidden]`
/// output. Any other shape, or a buffer shorter than the shape claims, is an
/// error.
fn mean_pool(shape: &[i64], data: &[f32], attention_mask: &[i64]) -> Result<Vec<f32>, RetrievalError> {
    let (seq_len, hidden_dim) = match shape {
        [1, seq, hidden] if *seq >= 0 && *hidden > 0 => (*seq as usize, *hidden as usize),
        other => {
            return Err(unavailable(format!(
                "unexpected output shape {:?}, want [1, seq_len, hidden]",
                other
            )));
        }
    };
    if attention_mask.len() > seq_len || data.len() < seq_len * hidden_dim {
        return Err(unavailable(format!(
            "output buffer of {} values too small for shape {:?} and {} tokens",
            data.len(),
            shape,
            attention_mask.len()
        )));
    }

    let mut pooled = vec![0.0f32; hidden_dim];
    let mut count = 0.0f32;
    for (tok_idx, &mask_val) in attention_mask.iter().enumerate() {
        if mask_val > 0 {
            let token = &data[tok_idx * hidden_dim..(tok_idx + 1) * hidden_dim];
            for (acc, value) in pooled.iter_mut().zip(token) {
                *acc += value;
            }
            count += 1.0;
        }
    }
    if count > 0.0 {
        for val in &mut pooled {
            *val /= count;
        }
    }
    Ok(pooled)
}

fn l2_normalize(vector: &mut [f32]) {
    let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for val in vector.iter_mut() {
            *val /= norm;
        }
    }
}

fn unavailable(msg: impl Into<String>) -> RetrievalError {
    RetrievalError::EmbeddingUnavailable(msg.into())
}
