//! Error types for the retrieval core.

use docqa_core::error::DocQaError;

/// Errors surfaced by fragmenting, embedding, indexing and the store.
///
/// None of these leave the store in a partially updated state.
#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    #[error("document has no readable text ({chars} characters, need at least {min_chars})")]
    EmptyOrUnreadableInput { chars: usize, min_chars: usize },
    #[error("embedding backend unavailable: {0}")]
    EmbeddingUnavailable(String),
    #[error("vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("embedder returned {vectors} vectors for {fragments} fragments")]
    BatchMismatch { fragments: usize, vectors: usize },
    #[error("fragment size must be greater than zero")]
    InvalidFragmentSize,
    #[error("vector dimension must be greater than zero")]
    InvalidDimensions,
    #[error("retrieval store lock poisoned")]
    LockPoisoned,
}

impl From<RetrievalError> for DocQaError {
    fn from(err: RetrievalError) -> Self {
        DocQaError::Retrieval(err.to_string())
    }
}
