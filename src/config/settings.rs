//! Configuration settings for infrachat.

use crate::error::{InfraError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub llm: LlmSettings,
    pub agent: AgentSettings,
    pub server: ServerSettings,
    pub client: ClientSettings,
    pub tools: ToolsSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
    /// Optional log file; logs are written to it in addition to stderr.
    pub log_file: Option<String>,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_file: None,
        }
    }
}

/// Language model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// Chat model used by the agent.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Alternative API base URL for OpenAI-compatible servers.
    pub api_base: Option<String>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o".to_string(),
            temperature: 0.0,
            api_base: None,
            timeout_secs: 300,
        }
    }
}

/// Agent loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    /// Maximum model calls per query.
    pub max_iterations: usize,
    /// Maximum messages kept per conversation thread.
    pub max_history_messages: usize,
    /// Thread used when a request does not name one.
    pub default_thread: String,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            max_iterations: 15,
            max_history_messages: 60,
            default_thread: "default".to_string(),
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Characters per streamed response chunk.
    pub chunk_size: usize,
    /// Pause between streamed chunks in milliseconds.
    pub chunk_delay_ms: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            chunk_size: 100,
            chunk_delay_ms: 100,
        }
    }
}

/// Chat client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    /// Base URL of the backend server.
    pub backend_url: String,
    pub connect_timeout_secs: u64,
    /// Maximum wait for the next streamed chunk.
    pub read_timeout_secs: u64,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            backend_url: "http://localhost:8000".to_string(),
            connect_timeout_secs: 60,
            read_timeout_secs: 30,
        }
    }
}

/// Settings for a tool backed by a command-line binary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CliToolSettings {
    pub enabled: bool,
    /// Binary name or path, overriding the tool's default.
    pub binary: Option<String>,
}

impl Default for CliToolSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            binary: None,
        }
    }
}

/// RabbitMQ management API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RabbitMqSettings {
    pub enabled: bool,
    pub host: String,
    pub management_port: u16,
    pub username: String,
    pub password: String,
}

impl Default for RabbitMqSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            host: "localhost".to_string(),
            management_port: 15672,
            username: "guest".to_string(),
            password: "guest".to_string(),
        }
    }
}

/// Infrastructure tool settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsSettings {
    /// Timeout for a single tool invocation in seconds.
    pub timeout_secs: u64,
    pub kubernetes: CliToolSettings,
    pub aws: CliToolSettings,
    pub redis: CliToolSettings,
    pub mongodb: CliToolSettings,
    pub mysql: CliToolSettings,
    pub mariadb: CliToolSettings,
    pub docker: CliToolSettings,
    pub kong: CliToolSettings,
    pub rabbitmq: RabbitMqSettings,
}

impl Default for ToolsSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 120,
            kubernetes: CliToolSettings::default(),
            aws: CliToolSettings::default(),
            redis: CliToolSettings::default(),
            mongodb: CliToolSettings::default(),
            mysql: CliToolSettings::default(),
            mariadb: CliToolSettings::default(),
            docker: CliToolSettings::default(),
            kong: CliToolSettings::default(),
            rabbitmq: RabbitMqSettings::default(),
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: HashMap<String, String>,
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    ///
    /// Environment overrides are applied on top of the file contents.
    pub fn load_from(path: Option<&PathBuf>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        let mut settings = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Settings::default()
        };

        settings.apply_env();
        Ok(settings)
    }

    /// Apply overrides from environment variables.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let rmq = &mut self.tools.rabbitmq;
        if let Some(host) = lookup("RMQ_HOST") {
            rmq.host = host;
        }
        if let Some(port) = lookup("RMQ_MANAGEMENT_PORT").and_then(|p| p.parse().ok()) {
            rmq.management_port = port;
        }
        if let Some(username) = lookup("RMQ_USERNAME") {
            rmq.username = username;
        }
        if let Some(password) = lookup("RMQ_PASSWORD") {
            rmq.password = password;
        }
        if let Some(base) = lookup("OPENAI_API_BASE") {
            self.llm.api_base = Some(base);
        }
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| InfraError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Set a value by dotted key path (e.g. "llm.model").
    ///
    /// The value is interpreted as a bool, integer, or float when it parses as
    /// one, and as a string otherwise. Unknown keys are rejected.
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        let mut root = toml::Value::try_from(&*self)
            .map_err(|e| InfraError::Config(e.to_string()))?;

        let parts: Vec<&str> = key.split('.').collect();
        let (last, parents) = parts
            .split_last()
            .ok_or_else(|| InfraError::Config("Empty configuration key".to_string()))?;

        let mut table = root
            .as_table_mut()
            .ok_or_else(|| InfraError::Config("Configuration is not a table".to_string()))?;
        for part in parents {
            table = table
                .get_mut(*part)
                .and_then(|v| v.as_table_mut())
                .ok_or_else(|| InfraError::Config(format!("Unknown configuration key: {}", key)))?;
        }

        // Optional keys are absent from the serialized form, so only reject
        // names that the settings structure would not accept back.
        let existing = table.get(*last).cloned();
        table.insert(last.to_string(), parse_scalar(value, existing.as_ref()));

        let updated: Settings = root
            .try_into()
            .map_err(|e: toml::de::Error| InfraError::Config(e.to_string()))?;

        let check = toml::Value::try_from(&updated).map_err(|e| InfraError::Config(e.to_string()))?;
        if lookup_path(&check, &parts).is_none() {
            return Err(InfraError::Config(format!("Unknown configuration key: {}", key)));
        }

        *self = updated;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("infrachat")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded log file path, if file logging is enabled.
    pub fn log_file(&self) -> Option<PathBuf> {
        self.general
            .log_file
            .as_deref()
            .filter(|p| !p.is_empty())
            .map(Self::expand_path)
    }
}

/// Interpret a CLI-supplied value, keeping strings as strings when the
/// current value is a string.
fn parse_scalar(value: &str, existing: Option<&toml::Value>) -> toml::Value {
    if let Some(toml::Value::String(_)) = existing {
        return toml::Value::String(value.to_string());
    }
    if let Ok(b) = value.parse::<bool>() {
        toml::Value::Boolean(b)
    } else if let Ok(i) = value.parse::<i64>() {
        toml::Value::Integer(i)
    } else if let Ok(f) = value.parse::<f64>() {
        toml::Value::Float(f)
    } else {
        toml::Value::String(value.to_string())
    }
}

fn lookup_path<'a>(value: &'a toml::Value, parts: &[&str]) -> Option<&'a toml::Value> {
    parts.iter().try_fold(value, |v, part| v.get(*part))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.llm.model, "gpt-4o");
        assert_eq!(settings.server.port, 8000);
        assert_eq!(settings.server.chunk_size, 100);
        assert_eq!(settings.tools.rabbitmq.management_port, 15672);
        assert!(settings.tools.kubernetes.enabled);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            [llm]
            model = "gpt-4o-mini"

            [tools.docker]
            enabled = false
            "#,
        )
        .unwrap();
        assert_eq!(settings.llm.model, "gpt-4o-mini");
        assert_eq!(settings.llm.timeout_secs, 300);
        assert!(!settings.tools.docker.enabled);
        assert!(settings.tools.redis.enabled);
    }

    #[test]
    fn test_env_overrides() {
        let mut settings = Settings::default();
        settings.apply_env_from(|key| match key {
            "RMQ_HOST" => Some("rabbit.internal".to_string()),
            "RMQ_MANAGEMENT_PORT" => Some("25672".to_string()),
            "RMQ_USERNAME" => Some("admin".to_string()),
            _ => None,
        });
        assert_eq!(settings.tools.rabbitmq.host, "rabbit.internal");
        assert_eq!(settings.tools.rabbitmq.management_port, 25672);
        assert_eq!(settings.tools.rabbitmq.username, "admin");
        assert_eq!(settings.tools.rabbitmq.password, "guest");
        assert!(settings.llm.api_base.is_none());
    }

    #[test]
    fn test_invalid_port_override_is_ignored() {
        let mut settings = Settings::default();
        settings.apply_env_from(|key| (key == "RMQ_MANAGEMENT_PORT").then(|| "nope".to_string()));
        assert_eq!(settings.tools.rabbitmq.management_port, 15672);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut settings = Settings::default();
        settings.server.port = 9100;
        settings.tools.kong.binary = Some("/opt/kong/bin/kong".to_string());
        settings.save_to(&path).unwrap();

        let loaded = Settings::load_from(Some(&path)).unwrap();
        assert_eq!(loaded.server.port, 9100);
        assert_eq!(loaded.tools.kong.binary.as_deref(), Some("/opt/kong/bin/kong"));
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let loaded = Settings::load_from(Some(&path)).unwrap();
        assert_eq!(loaded.agent.default_thread, "default");
    }

    #[test]
    fn test_set_value() {
        let mut settings = Settings::default();
        settings.set_value("llm.model", "gpt-4.1").unwrap();
        settings.set_value("server.port", "9000").unwrap();
        settings.set_value("tools.mysql.enabled", "false").unwrap();
        settings.set_value("llm.temperature", "0.5").unwrap();

        assert_eq!(settings.llm.model, "gpt-4.1");
        assert_eq!(settings.server.port, 9000);
        assert!(!settings.tools.mysql.enabled);
        assert!((settings.llm.temperature - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_set_value_numeric_string_stays_string() {
        let mut settings = Settings::default();
        settings.set_value("agent.default_thread", "42").unwrap();
        assert_eq!(settings.agent.default_thread, "42");
    }

    #[test]
    fn test_set_value_rejects_bad_input() {
        let mut settings = Settings::default();
        assert!(settings.set_value("nope.model", "x").is_err());
        assert!(settings.set_value("llm.unknown_field", "x").is_err());
        assert!(settings.set_value("server.port", "not-a-port").is_err());
        assert_eq!(settings.server.port, 8000);
    }
}
