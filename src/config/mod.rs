//! Configuration module for infrachat.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{AgentPrompts, Prompts};
pub use settings::{
    AgentSettings, ClientSettings, CliToolSettings, GeneralSettings, LlmSettings,
    PromptSettings, RabbitMqSettings, ServerSettings, Settings, ToolsSettings,
};
