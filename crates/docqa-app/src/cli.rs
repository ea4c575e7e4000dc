//! CLI argument definitions for the docqa server.
//!
//! Uses `clap` with derive macros for ergonomic argument parsing.
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::Parser;
use docqa_core::config::DocQaConfig;
use std::path::PathBuf;

/// docqa - upload a document, then ask questions answered from its text.
#[derive(Parser, Debug)]
#[command(name = "docqa", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Address to bind the HTTP server to.
    #[arg(long = "host")]
    pub host: Option<String>,

    /// HTTP server port.
    #[arg(short = 'p', long = "port")]
    pub port: Option<u16>,

    /// Data directory; uploads are saved under `<data-dir>/uploads`.
    #[arg(short = 'd', long = "data-dir")]
    pub data_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,

    /// Embedding backend: "onnx" or "mock".
    #[arg(long = "embedding-backend")]
    pub embedding_backend: Option<String>,
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > DOCQA_CONFIG env var > ~/.docqa/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("DOCQA_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Apply CLI flags and `DOCQA_*` environment variables on top of the
    /// values loaded from the config file.
    pub fn apply_overrides(&self, config: &mut DocQaConfig) {
        self.apply_overrides_from(config, |key| std::env::var(key).ok());
    }

    fn apply_overrides_from<F>(&self, config: &mut DocQaConfig, env: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = self.host.clone().or_else(|| env("DOCQA_HOST")) {
            config.server.host = host;
        }

        // An unparsable DOCQA_PORT is ignored rather than fatal.
        if let Some(port) = self
            .port
            .or_else(|| env("DOCQA_PORT").and_then(|v| v.parse::<u16>().ok()))
        {
            config.server.port = port;
        }

        if let Some(dir) = self
            .data_dir
            .as_ref()
            .map(|p| p.to_string_lossy().to_string())
            .or_else(|| env("DOCQA_DATA_DIR"))
        {
            config.general.data_dir = dir;
        }

        if let Some(level) = self.log_level.clone().or_else(|| env("DOCQA_LOG_LEVEL")) {
            config.general.log_level = level;
        }

        if let Some(backend) = self
            .embedding_backend
            .clone()
            .or_else(|| env("DOCQA_EMBEDDING_BACKEND"))
        {
            config.embedding.backend = backend;
        }
    }
}

/// Default config file path for the current platform.
fn default_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    if let Ok(home) = std::env::var("USERPROFILE") {
        return PathBuf::from(home).join(".docqa").join("config.toml");
    }
    #[cfg(not(target_os = "windows"))]
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".docqa").join("config.toml");
    }
    PathBuf::from("config.toml")
}
