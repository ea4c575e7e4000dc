//! Error types for the generation client.

use docqa_core::error::DocQaError;

/// Errors produced while asking the model server for an answer.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("invalid model server endpoint: {0}")]
    InvalidEndpoint(String),
    #[error("model server unreachable: {0}")]
    Unavailable(String),
    #[error("model server timed out")]
    Timeout,
    #[error("model server returned HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },
    #[error("failed to decode model server response: {0}")]
    Decode(String),
    #[error("model server response had no text")]
    EmptyResponse,
    #[error("transport error: {0}")]
    Transport(String),
}

impl GenerationError {
    /// Sentence shown to the user in place of an answer.
    pub fn user_message(&self) -> String {
        match self {
            GenerationError::Unavailable(_) => {
                "Ollama server is not running. Please start Ollama.".to_string()
            }
            GenerationError::Timeout => {
                "Model is taking too long. Try a simpler question.".to_string()
            }
            GenerationError::HttpStatus { body, .. } => format!("Ollama error: {}", body),
            GenerationError::EmptyResponse => "No response from model".to_string(),
            other => format!("Unexpected error: {}", other),
        }
    }
}

impl From<reqwest::Error> for GenerationError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GenerationError::Timeout
        } else if err.is_connect() {
            GenerationError::Unavailable(err.to_string())
        } else if err.is_decode() {
            GenerationError::Decode(err.to_string())
        } else {
            GenerationError::Transport(err.to_string())
        }
    }
}

impl From<GenerationError> for DocQaError {
    fn from(err: GenerationError) -> Self {
        DocQaError::Generation(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_messages() {
        assert_eq!(
            GenerationError::Unavailable("refused".into()).user_message(),
            "Ollama server is not running. Please start Ollama."
        );
        assert_eq!(
            GenerationError::Timeout.user_message(),
            "Model is taking too long. Try a simpler question."
        );
        assert_eq!(
            GenerationError::HttpStatus {
                status: 404,
                body: "model 'phi' not found".into()
            }
            .user_message(),
            "Ollama error: model 'phi' not found"
        );
        assert_eq!(
            GenerationError::EmptyResponse.user_message(),
            "No response from model"
        );
        assert_eq!(
            GenerationError::Decode("eof".into()).user_message(),
            "Unexpected error: failed to decode model server response: eof"
        );
    }

    #[test]
    fn test_into_docqa_error() {
        let err: DocQaError = GenerationError::Timeout.into();
        assert!(matches!(err, DocQaError::Generation(_)));
        assert_eq!(err.to_string(), "Generation error: model server timed out");
    }
}
