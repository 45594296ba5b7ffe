//! Config command implementation.

use crate::cli::{ConfigAction, Output};
use crate::config::Settings;
use anyhow::Result;
use std::path::PathBuf;

/// Run the config command.
pub fn run_config(action: &ConfigAction, settings: Settings, path: Option<&PathBuf>) -> Result<()> {
    let config_path = path.cloned().unwrap_or_else(Settings::default_config_path);

    match action {
        ConfigAction::Show => {
            let toml_str = toml::to_string_pretty(&settings)
                .map_err(|e| anyhow::anyhow!("Failed to serialize config: {}", e))?;
            println!("{}", toml_str);
        }

        ConfigAction::Set { key, value } => {
            // Start from the file alone so env overrides are not persisted.
            let mut stored = if config_path.exists() {
                let content = std::fs::read_to_string(&config_path)?;
                toml::from_str::<Settings>(&content)?
            } else {
                Settings::default()
            };

            stored.set_value(key, value)?;
            stored.save_to(&config_path)?;
            Output::success(&format!("Set {} = {}", key, value));
            Output::kv("Config", &config_path.display().to_string());
        }

        ConfigAction::Edit => {
            if !config_path.exists() {
                settings.save_to(&config_path)?;
                Output::info(&format!("Created default config at {:?}", config_path));
            }

            let editor = std::env::var("EDITOR").unwrap_or_else(|_| "vim".to_string());

            Output::info(&format!("Opening config in {}...", editor));

            let status = std::process::Command::new(&editor)
                .arg(&config_path)
                .status();

            match status {
                Ok(s) if s.success() => {
                    Output::success("Config saved.");
                }
                Ok(_) => {
                    Output::warning("Editor exited with non-zero status.");
                }
                Err(e) => {
                    Output::error(&format!("Failed to open editor: {}", e));
                    Output::info(&format!("Config file is at: {:?}", config_path));
                }
            }
        }

        ConfigAction::Path => {
            println!("{}", config_path.display());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let action = ConfigAction::Set {
            key: "server.port".to_string(),
            value: "9100".to_string(),
        };
        run_config(&action, Settings::default(), Some(&path)).unwrap();

        let saved = Settings::load_from(Some(&path)).unwrap();
        assert_eq!(saved.server.port, 9100);
        assert_eq!(saved.llm.model, "gpt-4o");
    }

    #[test]
    fn test_set_rejects_unknown_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let action = ConfigAction::Set {
            key: "server.nope".to_string(),
            value: "1".to_string(),
        };
        assert!(run_config(&action, Settings::default(), Some(&path)).is_err());
        assert!(!path.exists());
    }
}
