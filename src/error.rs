//! Error types for infrachat.

use thiserror::Error;

/// Library-level error type for infrachat operations.
#[derive(Error, Debug)]
pub enum InfraError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Environment check failed: {0}")]
    Environment(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("OpenAI API error: {0}")]
    OpenAI(String),

    #[error("External tool not found: {0}. Please install it and ensure it's in your PATH.")]
    ToolNotFound(String),

    #[error("External tool failed: {0}")]
    ToolFailed(String),

    #[error("Tool timed out after {seconds}s: {command}")]
    ToolTimeout { command: String, seconds: u64 },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Agent error: {0}")]
    Agent(String),
}

/// Result type alias for infrachat operations.
pub type Result<T> = std::result::Result<T, InfraError>;
