//! Registry of initialized tools.

use super::catalog::ToolKind;
use super::cli::CliTool;
use super::rabbitmq::RabbitMqTool;
use super::Tool;
use crate::config::ToolsSettings;
use crate::error::{InfraError, Result};
use async_openai::types::{ChatCompletionTool, ChatCompletionToolType, FunctionObject};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Make a tool name acceptable as an OpenAI function name (`^[a-zA-Z0-9_-]+$`).
pub fn sanitize_name(name: &str) -> String {
    name.replace(' ', "_")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect()
}

/// Tools available to the agent, keyed by sanitized name.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    order: Vec<String>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Initialize every enabled tool.
    ///
    /// A tool whose binary is missing or whose service is unreachable is
    /// logged and skipped; the remaining tools are still usable.
    pub async fn from_settings(settings: &ToolsSettings) -> Self {
        info!("Initializing infrastructure tools");
        let mut registry = Self::new();
        let timeout = Duration::from_secs(settings.timeout_secs);

        for kind in ToolKind::ALL {
            if !kind.is_enabled(settings) {
                info!("{} tool disabled in configuration", kind.label());
                continue;
            }

            let tool: Result<Arc<dyn Tool>> = match kind.cli_spec(settings) {
                Some(spec) => CliTool::new(spec, timeout)
                    .await
                    .map(|t| Arc::new(t) as Arc<dyn Tool>),
                None => RabbitMqTool::connect(&settings.rabbitmq, timeout)
                    .await
                    .map(|t| Arc::new(t) as Arc<dyn Tool>),
            };

            match tool {
                Ok(tool) => {
                    registry.register(tool);
                    info!("Successfully initialized {} tool", kind.label());
                }
                Err(e) => warn!("{}: Error during initialization - {}", kind.label(), e),
            }
        }

        registry
    }

    /// Register a tool under its sanitized name, replacing any previous one.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = sanitize_name(tool.name());
        if self.tools.insert(name.clone(), tool).is_none() {
            self.order.push(name);
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Sanitized tool names in registration order.
    pub fn names(&self) -> Vec<String> {
        self.order.clone()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// (name, description) pairs in registration order.
    pub fn summaries(&self) -> Vec<(String, String)> {
        self.order
            .iter()
            .filter_map(|name| {
                self.tools
                    .get(name)
                    .map(|t| (name.clone(), t.description().to_string()))
            })
            .collect()
    }

    /// OpenAI function definitions for all registered tools.
    pub fn definitions(&self) -> Vec<ChatCompletionTool> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name).map(|tool| (name, tool)))
            .map(|(name, tool)| ChatCompletionTool {
                r#type: ChatCompletionToolType::Function,
                function: FunctionObject {
                    name: name.clone(),
                    description: Some(tool.description().to_string()),
                    parameters: Some(tool.parameters_schema()),
                    strict: None,
                },
            })
            .collect()
    }

    /// Execute a tool call from the model.
    pub async fn execute(&self, name: &str, arguments: &str) -> Result<String> {
        let tool = self
            .get(name)
            .ok_or_else(|| InfraError::ToolNotFound(format!("no tool named {}", name)))?;
        let command = parse_command(arguments)?;
        tool.execute(&command).await
    }
}

/// Extract the command from tool call arguments.
///
/// Accepts `{"command": "..."}`, any single-string-field object, a bare JSON
/// string, or raw text.
pub fn parse_command(arguments: &str) -> Result<String> {
    match serde_json::from_str::<Value>(arguments) {
        Ok(Value::Object(map)) => {
            if let Some(Value::String(cmd)) = map.get("command") {
                return Ok(cmd.clone());
            }
            let mut strings = map.values().filter_map(|v| v.as_str());
            match (strings.next(), strings.next()) {
                (Some(only), None) => Ok(only.to_string()),
                _ => Err(InfraError::InvalidInput(
                    "Missing 'command' argument".to_string(),
                )),
            }
        }
        Ok(Value::String(cmd)) => Ok(cmd),
        Ok(_) => Err(InfraError::InvalidInput(format!(
            "Unsupported tool arguments: {}",
            arguments
        ))),
        Err(_) => Ok(arguments.to_string()),
    }
}
