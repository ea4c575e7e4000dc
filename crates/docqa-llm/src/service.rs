//! The generation boundary trait and a mock for tests.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::GenerationError;

/// Something that turns a prompt into an answer.
#[async_trait]
pub trait GenerationService: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}

/// Mock generator that returns a canned answer and records every prompt.
#[derive(Debug)]
pub struct MockGenerator {
    answer: Result<String, MockFailure>,
    prompts: Mutex<Vec<String>>,
}

#[derive(Debug, Clone, Copy)]
enum MockFailure {
    Unavailable,
    Timeout,
}

impl MockGenerator {
    pub fn with_answer(answer: &str) -> Self {
        Self {
            answer: Ok(answer.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Fails every call as if the model server were down.
    pub fn unavailable() -> Self {
        Self {
            answer: Err(MockFailure::Unavailable),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Fails every call as if the model server never answered.
    pub fn timing_out() -> Self {
        Self {
            answer: Err(MockFailure::Timeout),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Prompts received so far, oldest first.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl GenerationService for MockGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        match &self.answer {
            Ok(answer) => Ok(answer.clone()),
            Err(MockFailure::Unavailable) => {
                Err(GenerationError::Unavailable("connection refused".to_string()))
            }
            Err(MockFailure::Timeout) => Err(GenerationError::Timeout),
        }
    }
}
