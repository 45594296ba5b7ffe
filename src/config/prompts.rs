//! Prompt templates for infrachat.
//!
//! Prompts can be customized by placing TOML files in the custom prompts directory.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Prompts {
    pub agent: AgentPrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: HashMap<String, String>,
}

/// Prompts for the infrastructure agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentPrompts {
    pub system: String,
}

impl Default for AgentPrompts {
    fn default() -> Self {
        Self {
            system: r#"You are an infrastructure management assistant that can help with various infrastructure tools.
You can manage Kubernetes clusters, AWS resources, databases, message brokers, containers, and API gateways. Be helpful and precise in your responses.

Available tools: {{tools}}

Guidelines:
- Each tool takes a single `command` string in the syntax of the underlying CLI or API
- Prefer read-only commands unless the user clearly asks for a change
- If a tool reports an error, explain it and suggest a corrected command
- Summarize long outputs, but keep names, counts, and statuses exact"#
                .to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let agent_path = custom_path.join("agent.toml");
            if agent_path.exists() {
                let content = std::fs::read_to_string(&agent_path)?;
                prompts.agent = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
        let mut result = template.to_string();
        for (key, value) in vars {
            result = result.replace(&format!("{{{{{}}}}}", key), value);
        }
        result
    }

    /// Render the agent system prompt for the given set of active tools.
    ///
    /// Custom variables are applied first; `{{tools}}` always reflects the tools
    /// that actually initialized.
    pub fn system_prompt(&self, tool_names: &[String]) -> String {
        let mut vars = self.variables.clone();
        let tools = if tool_names.is_empty() {
            "none".to_string()
        } else {
            tool_names.join(", ")
        };
        vars.insert("tools".to_string(), tools);
        Self::render(&self.agent.system, &vars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_prompts() {
        let prompts = Prompts::default();
        assert!(prompts.agent.system.contains("infrastructure management assistant"));
    }

    #[test]
    fn test_render_template() {
        let template = "Hello {{name}}, you have {{count}} clusters.";
        let mut vars = HashMap::new();
        vars.insert("name".to_string(), "ops".to_string());
        vars.insert("count".to_string(), "3".to_string());

        let result = Prompts::render(template, &vars);
        assert_eq!(result, "Hello ops, you have 3 clusters.");
    }

    #[test]
    fn test_system_prompt_lists_tools() {
        let mut prompts = Prompts::default();
        prompts.agent.system = "Team {{team}} uses {{tools}}.".to_string();
        prompts.variables.insert("team".to_string(), "platform".to_string());
        prompts.variables.insert("tools".to_string(), "ignored".to_string());

        let rendered = prompts.system_prompt(&["Redis_Tool".to_string(), "Docker_Tool".to_string()]);
        assert_eq!(rendered, "Team platform uses Redis_Tool, Docker_Tool.");
        assert_eq!(prompts.system_prompt(&[]), "Team platform uses none.");
    }

    #[test]
    fn test_load_custom_agent_prompt() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("agent.toml"), "system = \"Custom {{tools}}\"\n").unwrap();

        let prompts = Prompts::load(dir.path().to_str(), None).unwrap();
        assert_eq!(prompts.agent.system, "Custom {{tools}}");
    }
}
