//! OpenAI client configuration with sensible defaults.

use crate::config::LlmSettings;
use crate::error::{InfraError, Result};
use async_openai::{config::OpenAIConfig, Client};
use std::time::Duration;

/// Create an OpenAI client from the LLM settings.
///
/// The API key is read from `OPENAI_API_KEY`; `api_base` overrides the endpoint
/// for OpenAI-compatible servers.
pub fn create_client(settings: &LlmSettings) -> Result<Client<OpenAIConfig>> {
    let http_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(settings.timeout_secs))
        .build()
        .map_err(|e| InfraError::Config(format!("Failed to create HTTP client: {}", e)))?;

    let mut config = OpenAIConfig::default();
    if let Some(base) = settings.api_base.as_deref().filter(|b| !b.is_empty()) {
        config = config.with_api_base(base);
    }

    Ok(Client::with_config(config).with_http_client(http_client))
}
