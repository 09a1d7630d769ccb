//! Error types for the plugin system

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PluginError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Plugin execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Unsupported input format: {0}")]
    UnsupportedFormat(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}
