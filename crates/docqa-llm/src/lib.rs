//! docqa LLM crate - prompt construction and the generation boundary.
//!
//! Retrieved fragments and the user's question are folded into a fixed
//! prompt and sent to a locally hosted Ollama server. Failures here are
//! reported to the caller as answer text; they never reach retrieval state.

pub mod error;
pub mod ollama;
pub mod prompt;
pub mod service;

pub use error::GenerationError;
pub use ollama::OllamaClient;
pub use prompt::build_prompt;
pub use service::{GenerationService, MockGenerator};
