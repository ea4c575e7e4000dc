pub mod config;
pub mod error;

pub use config::DocQaConfig;
pub use error::{DocQaError, Result};
