//! Chat model abstraction.

use crate::config::LlmSettings;
use crate::error::{InfraError, Result};
use crate::openai::create_client;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionResponseMessage, ChatCompletionTool,
    CreateChatCompletionRequestArgs,
};
use async_trait::async_trait;
use tracing::debug;

/// A model that produces the next assistant message for a conversation.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(
        &self,
        messages: &[ChatCompletionRequestMessage],
        tools: &[ChatCompletionTool],
    ) -> Result<ChatCompletionResponseMessage>;
}

/// OpenAI chat completions with tool calling.
pub struct OpenAiChatModel {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    temperature: f32,
}

impl OpenAiChatModel {
    pub fn new(settings: &LlmSettings) -> Result<Self> {
        Ok(Self {
            client: create_client(settings)?,
            model: settings.model.clone(),
            temperature: settings.temperature,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl ChatModel for OpenAiChatModel {
    async fn complete(
        &self,
        messages: &[ChatCompletionRequestMessage],
        tools: &[ChatCompletionTool],
    ) -> Result<ChatCompletionResponseMessage> {
        let mut builder = CreateChatCompletionRequestArgs::default();
        builder
            .model(&self.model)
            .messages(messages.to_vec())
            .temperature(self.temperature);

        // Tool calls run one at a time, in order.
        if !tools.is_empty() {
            builder.tools(tools.to_vec()).parallel_tool_calls(false);
        }

        let request = builder
            .build()
            .map_err(|e| InfraError::Agent(e.to_string()))?;

        debug!("Requesting completion with {} messages", messages.len());

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| InfraError::OpenAI(format!("Chat API error: {}", e)))?;

        response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message)
            .ok_or_else(|| InfraError::Agent("No response from model".to_string()))
    }
}
