//! Agent runner with tool calling loop.

use super::memory::ConversationStore;
use super::model::{ChatModel, OpenAiChatModel};
use crate::config::{Prompts, Settings};
use crate::error::{InfraError, Result};
use crate::tools::ToolRegistry;
use async_openai::types::{
    ChatCompletionMessageToolCall, ChatCompletionRequestAssistantMessageArgs,
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestToolMessageArgs, ChatCompletionRequestUserMessageArgs,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Agent that routes infrastructure requests to tools.
pub struct Agent {
    model: Arc<dyn ChatModel>,
    tools: Arc<ToolRegistry>,
    memory: Arc<ConversationStore>,
    max_iterations: usize,
    system_prompt: String,
}

impl Agent {
    /// Create a new agent with the default system prompt.
    pub fn new(
        model: Arc<dyn ChatModel>,
        tools: Arc<ToolRegistry>,
        memory: Arc<ConversationStore>,
    ) -> Self {
        let system_prompt = Prompts::default().system_prompt(&tools.names());
        Self {
            model,
            tools,
            memory,
            max_iterations: 15,
            system_prompt,
        }
    }

    /// Build the agent from settings: OpenAI model, enabled tools, prompts.
    pub async fn from_settings(settings: &Settings) -> Result<Self> {
        info!("Initializing agent");

        let model = OpenAiChatModel::new(&settings.llm)?;
        info!("Using chat model {}", model.model());

        let tools = Arc::new(ToolRegistry::from_settings(&settings.tools).await);
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;
        let memory = Arc::new(ConversationStore::new(settings.agent.max_history_messages));

        info!("Agent ready with {} tool(s)", tools.len());

        Ok(Self::new(Arc::new(model), tools.clone(), memory)
            .with_system_prompt(&prompts.system_prompt(&tools.names()))
            .with_max_iterations(settings.agent.max_iterations))
    }

    /// Set a custom system prompt.
    pub fn with_system_prompt(mut self, prompt: &str) -> Self {
        self.system_prompt = prompt.to_string();
        self
    }

    /// Set maximum iterations for the agent loop.
    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn memory(&self) -> &ConversationStore {
        &self.memory
    }

    /// Answer a query within a conversation thread.
    ///
    /// The thread's history is sent along with the query, and the completed
    /// turn (query, tool traffic, answer) is stored afterwards. A failed turn
    /// leaves the thread unchanged.
    #[instrument(skip(self, query), fields(thread = %thread_id))]
    pub async fn process(&self, thread_id: &str, query: &str) -> Result<AgentResponse> {
        info!("Processing query: {}", query);

        let _turn = self.memory.begin_turn(thread_id).await;
        let history = self.memory.history(thread_id).await;

        let system = ChatCompletionRequestSystemMessageArgs::default()
            .content(self.system_prompt.clone())
            .build()
            .map_err(|e| InfraError::Agent(e.to_string()))?;

        let mut turn: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestUserMessageArgs::default()
                .content(query)
                .build()
                .map_err(|e| InfraError::Agent(e.to_string()))?
                .into(),
        ];

        let definitions = self.tools.definitions();
        let mut iterations = 0;
        let mut tool_calls_made = Vec::new();

        loop {
            iterations += 1;
            if iterations > self.max_iterations {
                return Err(InfraError::Agent(format!(
                    "Agent exceeded maximum iterations ({})",
                    self.max_iterations
                )));
            }

            debug!("Agent iteration {}", iterations);

            let mut messages: Vec<ChatCompletionRequestMessage> =
                Vec::with_capacity(1 + history.len() + turn.len());
            messages.push(system.clone().into());
            messages.extend(history.iter().cloned());
            messages.extend(turn.iter().cloned());

            let reply = self.model.complete(&messages, &definitions).await?;

            match reply.tool_calls.filter(|calls| !calls.is_empty()) {
                Some(tool_calls) => {
                    let mut assistant = ChatCompletionRequestAssistantMessageArgs::default();
                    assistant.tool_calls(tool_calls.clone());
                    if let Some(content) = reply.content.filter(|c| !c.is_empty()) {
                        assistant.content(content);
                    }
                    turn.push(
                        assistant
                            .build()
                            .map_err(|e| InfraError::Agent(e.to_string()))?
                            .into(),
                    );

                    for tool_call in &tool_calls {
                        let record = self.execute_tool_call(tool_call).await;

                        let tool_msg = ChatCompletionRequestToolMessageArgs::default()
                            .tool_call_id(&tool_call.id)
                            .content(record.result.clone())
                            .build()
                            .map_err(|e| InfraError::Agent(e.to_string()))?;
                        turn.push(tool_msg.into());

                        tool_calls_made.push(record);
                    }
                }
                None => {
                    let content = reply.content.unwrap_or_default();
                    turn.push(
                        ChatCompletionRequestAssistantMessageArgs::default()
                            .content(content.clone())
                            .build()
                            .map_err(|e| InfraError::Agent(e.to_string()))?
                            .into(),
                    );
                    self.memory.commit(thread_id, turn).await;

                    return Ok(AgentResponse {
                        content,
                        tool_calls: tool_calls_made,
                        iterations,
                    });
                }
            }
        }
    }

    /// Execute a single tool call and return a record of it.
    ///
    /// Failures become the tool result so the model can react to them.
    async fn execute_tool_call(&self, tool_call: &ChatCompletionMessageToolCall) -> ToolCallRecord {
        let name = &tool_call.function.name;
        let arguments = &tool_call.function.arguments;

        info!("Agent calling tool: {} with args: {}", name, arguments);

        let result = match self.tools.execute(name, arguments).await {
            Ok(output) => output,
            Err(e) => format!("Error: {}", e),
        };

        ToolCallRecord {
            name: name.clone(),
            arguments: arguments.clone(),
            result,
        }
    }
}

/// Response from an agent run.
#[derive(Debug)]
pub struct AgentResponse {
    /// The final response content from the agent.
    pub content: String,
    /// Record of all tool calls made during execution.
    pub tool_calls: Vec<ToolCallRecord>,
    /// Number of iterations (LLM calls) used.
    pub iterations: usize,
}

/// Record of a tool call made by the agent.
#[derive(Debug, Clone, Serialize)]
pub struct ToolCallRecord {
    /// Name of the tool called.
    pub name: String,
    /// JSON arguments passed to the tool.
    pub arguments: String,
    /// Result returned by the tool.
    pub result: String,
}

impl std::fmt::Display for ToolCallRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.name, self.arguments)
    }
}
