use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{DocQaError, Result};

/// Top-level configuration for the docqa service.
///
/// Loaded from `~/.docqa/config.toml` by default. Every section falls back
/// to its defaults when missing from the file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocQaConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
}

impl DocQaConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: DocQaConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Check values that would otherwise only fail deep inside a request.
    pub fn validate(&self) -> Result<()> {
        if self.retrieval.fragment_size == 0 {
            return Err(DocQaError::Config(
                "retrieval.fragment_size must be greater than zero".to_string(),
            ));
        }
        if self.retrieval.top_k == 0 {
            return Err(DocQaError::Config(
                "retrieval.top_k must be greater than zero".to_string(),
            ));
        }
        if self.embedding.dimensions == 0 {
            return Err(DocQaError::Config(
                "embedding.dimensions must be greater than zero".to_string(),
            ));
        }
        if !EmbeddingConfig::KNOWN_BACKENDS.contains(&self.embedding.backend.as_str()) {
            return Err(DocQaError::Config(format!(
                "embedding.backend must be one of {:?}, got '{}'",
                EmbeddingConfig::KNOWN_BACKENDS,
                self.embedding.backend
            )));
        }
        let endpoint = self.generation.endpoint.trim();
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(DocQaError::Config(format!(
                "generation.endpoint must be an http(s) URL, got '{}'",
                self.generation.endpoint
            )));
        }
        if self.server.max_upload_bytes == 0 {
            return Err(DocQaError::Config(
                "server.max_upload_bytes must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Directory where uploaded documents are written.
    pub fn upload_dir(&self) -> PathBuf {
        expand_home(&self.general.data_dir).join("uploads")
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Data directory; uploads land in `<data_dir>/uploads`.
    pub data_dir: String,
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: "~/.docqa/data".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Largest accepted upload body, in bytes.
    pub max_upload_bytes: usize,
    /// Optional directory served under `/static`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frontend_dir: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            max_upload_bytes: 20 * 1024 * 1024,
            frontend_dir: None,
        }
    }
}

/// Fragmenting and retrieval settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Fragment window, in characters.
    pub fragment_size: usize,
    /// Fragments retrieved per question.
    pub top_k: usize,
    /// Minimum trimmed length for a document to count as readable.
    pub min_readable_chars: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            fragment_size: 200,
            top_k: 3,
            min_readable_chars: 50,
        }
    }
}

/// Embedding backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// "onnx" or "mock".
    pub backend: String,
    /// Directory containing `model.onnx` and `tokenizer.json`.
    pub model_dir: String,
    /// Vector dimension produced by the model.
    pub dimensions: usize,
}

impl EmbeddingConfig {
    pub const KNOWN_BACKENDS: [&'static str; 2] = ["onnx", "mock"];
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: "onnx".to_string(),
            model_dir: "~/.docqa/models/all-MiniLM-L6-v2".to_string(),
            dimensions: 384,
        }
    }
}

/// Settings for the Ollama generation server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub endpoint: String,
    pub model: String,
    /// Generation can be slow on CPU; keep this generous.
    pub timeout_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:11434".to_string(),
            model: "phi".to_string(),
            timeout_secs: 300,
            temperature: None,
            top_p: None,
            max_tokens: None,
        }
    }
}

/// Expand a leading `~/` to the user's home directory.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/").or_else(|| path.strip_prefix("~\\")) {
        #[cfg(target_os = "windows")]
        let home = std::env::var("USERPROFILE").unwrap_or_else(|_| ".".to_string());
        #[cfg(not(target_os = "windows"))]
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join(rest)
    } else {
        PathBuf::from(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_default_config() {
        let config = DocQaConfig::default();
        assert_eq!(config.general.data_dir, "~/.docqa/data");
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8000);
        assert!(config.server.frontend_dir.is_none());
        assert_eq!(config.retrieval.fragment_size, 200);
        assert_eq!(config.retrieval.top_k, 3);
        assert_eq!(config.retrieval.min_readable_chars, 50);
        assert_eq!(config.embedding.backend, "onnx");
        assert_eq!(config.embedding.dimensions, 384);
        assert_eq!(config.generation.endpoint, "http://localhost:11434");
        assert_eq!(config.generation.model, "phi");
        assert_eq!(config.generation.timeout_secs, 300);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_valid_config() {
        let content = r#"
[general]
data_dir = "/srv/docqa"
log_level = "debug"

[server]
port = 9001
frontend_dir = "./frontend"

[retrieval]
fragment_size = 500
top_k = 5

[embedding]
backend = "mock"
dimensions = 64

[generation]
model = "llama3"
temperature = 0.2
"#;
        let file = create_temp_config(content);
        let config = DocQaConfig::load(file.path()).unwrap();
        assert_eq!(config.general.data_dir, "/srv/docqa");
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.server.port, 9001);
        assert_eq!(config.server.frontend_dir.as_deref(), Some("./frontend"));
        assert_eq!(config.retrieval.fragment_size, 500);
        assert_eq!(config.retrieval.top_k, 5);
        // Unset keys in a present section keep their defaults.
        assert_eq!(config.retrieval.min_readable_chars, 50);
        assert_eq!(config.embedding.backend, "mock");
        assert_eq!(config.embedding.dimensions, 64);
        assert_eq!(config.generation.model, "llama3");
        assert_eq!(config.generation.temperature, Some(0.2));
        assert_eq!(config.generation.timeout_secs, 300);
        assert_eq!(config.upload_dir(), PathBuf::from("/srv/docqa/uploads"));
    }

    #[test]
    fn test_empty_toml_uses_all_defaults() {
        let file = create_temp_config("");
        let config = DocQaConfig::load(file.path()).unwrap();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.retrieval.fragment_size, 200);
    }

    #[test]
    fn test_load_invalid_toml() {
        let file = create_temp_config("[server\nport = ");
        let result = DocQaConfig::load(file.path());
        assert!(matches!(result, Err(DocQaError::Config(_))));
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = DocQaConfig::load_or_default(Path::new("/nonexistent/config.toml"));
        assert_eq!(config.general.data_dir, "~/.docqa/data");
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = DocQaConfig::default();
        config.server.port = 8123;
        config.generation.max_tokens = Some(256);
        config.save(&path).unwrap();

        let reloaded = DocQaConfig::load(&path).unwrap();
        assert_eq!(reloaded.server.port, 8123);
        assert_eq!(reloaded.generation.max_tokens, Some(256));
        assert!(reloaded.generation.temperature.is_none());
        assert!(reloaded.server.frontend_dir.is_none());
    }

    #[test]
    fn test_validate_rejects_zero_fragment_size() {
        let mut config = DocQaConfig::default();
        config.retrieval.fragment_size = 0;
        assert!(matches!(config.validate(), Err(DocQaError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_zero_top_k() {
        let mut config = DocQaConfig::default();
        config.retrieval.top_k = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_unknown_backend() {
        let mut config = DocQaConfig::default();
        config.embedding.backend = "faiss".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("faiss"));
    }

    #[test]
    fn test_validate_rejects_bad_endpoint() {
        let mut config = DocQaConfig::default();
        config.generation.endpoint = "localhost:11434".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_expand_home() {
        assert_eq!(expand_home("/abs/path"), PathBuf::from("/abs/path"));
        assert_eq!(expand_home("relative"), PathBuf::from("relative"));
        let expanded = expand_home("~/models");
        assert!(expanded.ends_with("models"));
        assert!(!expanded.to_string_lossy().starts_with('~'));
    }
}
