use thiserror::Error;

/// Top-level error type for the docqa service.
///
/// Subsystem crates define their own error types and implement
/// `From<SubsystemError> for DocQaError` so that `?` works across crate
/// boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DocQaError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Extraction error: {0}")]
    Extraction(String),

    #[error("Retrieval error: {0}")]
    Retrieval(String),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<toml::de::Error> for DocQaError {
    fn from(err: toml::de::Error) -> Self {
        DocQaError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for DocQaError {
    fn from(err: toml::ser::Error) -> Self {
        DocQaError::Config(err.to_string())
    }
}

/// A specialized `Result` type for docqa operations.
pub type Result<T> = std::result::Result<T, DocQaError>;
