//! Infrastructure tools exposed to the agent.
//!
//! Every tool takes a single `command` string in the native syntax of the
//! system it wraps (a kubectl argument list, a SQL statement, an HTTP
//! management API call, ...) and returns text for the model to read.

mod catalog;
mod cli;
mod rabbitmq;
mod registry;

pub use catalog::{cli_specs, ToolKind};
pub use cli::{locate_binary, CliSpec, CliTool, FailureMode, Invocation, OutputFormat, Probe};
pub use rabbitmq::RabbitMqTool;
pub use registry::{sanitize_name, ToolRegistry};

use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value;

/// A tool the agent can call.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Display name, e.g. "Kubernetes Tool". The registry derives the
    /// function name sent to the model from it.
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON schema of the tool arguments.
    fn parameters_schema(&self) -> Value {
        command_schema(self.description())
    }

    /// Run a command and return its textual result.
    async fn execute(&self, command: &str) -> Result<String>;
}

/// Argument schema shared by all single-command tools.
pub fn command_schema(description: &str) -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "command": {
                "type": "string",
                "description": format!("The command to run. {}", first_sentence(description))
            }
        },
        "required": ["command"]
    })
}

/// Text up to and including the first `. `, or all of it.
pub(crate) fn first_sentence(text: &str) -> &str {
    let text = text.trim();
    match text.find(". ") {
        Some(idx) => &text[..=idx],
        None => text,
    }
}
