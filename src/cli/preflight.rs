//! Pre-flight checks before starting the agent.
//!
//! Validates that the environment the tools depend on is in place before
//! the server binds, rather than failing on the first query.

use crate::error::{InfraError, Result};

/// Verify the process environment required to run the agent.
pub fn verify_environment() -> Result<()> {
    verify_with(|name| std::env::var(name).ok())
}

fn verify_with(lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
    match lookup("PATH") {
        Some(path) if !path.trim().is_empty() => {}
        _ => {
            return Err(InfraError::Environment(
                "PATH environment variable is not set or is empty".to_string(),
            ))
        }
    }
    check_api_key_with(&lookup)
}

/// Check if OpenAI API key is configured.
pub fn check_api_key() -> Result<()> {
    check_api_key_with(&|name: &str| std::env::var(name).ok())
}

fn check_api_key_with(lookup: &impl Fn(&str) -> Option<String>) -> Result<()> {
    match lookup("OPENAI_API_KEY") {
        Some(key) if !key.is_empty() => Ok(()),
        Some(_) => Err(InfraError::Environment(
            "OPENAI_API_KEY is empty. Set it with: export OPENAI_API_KEY='sk-...'".to_string(),
        )),
        None => Err(InfraError::Environment(
            "OPENAI_API_KEY not set. Set it with: export OPENAI_API_KEY='sk-...'".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_environment_ok() {
        let lookup = env(&[("PATH", "/usr/bin"), ("OPENAI_API_KEY", "sk-test")]);
        assert!(verify_with(lookup).is_ok());
    }

    #[test]
    fn test_missing_path() {
        let err = verify_with(env(&[("OPENAI_API_KEY", "sk-test")])).unwrap_err();
        assert!(err.to_string().contains("PATH"));

        let err = verify_with(env(&[("PATH", " "), ("OPENAI_API_KEY", "sk-test")])).unwrap_err();
        assert!(matches!(err, InfraError::Environment(_)));
    }

    #[test]
    fn test_missing_api_key() {
        let err = verify_with(env(&[("PATH", "/usr/bin")])).unwrap_err();
        assert!(err.to_string().contains("OPENAI_API_KEY not set"));

        let err = verify_with(env(&[("PATH", "/usr/bin"), ("OPENAI_API_KEY", "")])).unwrap_err();
        assert!(err.to_string().contains("OPENAI_API_KEY is empty"));
    }
}
