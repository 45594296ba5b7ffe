//! Tools command - list the tools that initialize.

use crate::cli::Output;
use crate::config::Settings;
use crate::tools::{ToolKind, ToolRegistry};
use anyhow::Result;

/// Initialize the registry and print the active tools.
pub async fn run_tools(settings: Settings) -> Result<()> {
    let spinner = Output::spinner("Initializing tools...");
    let registry = ToolRegistry::from_settings(&settings.tools).await;
    spinner.finish_and_clear();

    Output::header("Active tools");
    for (name, description) in registry.summaries() {
        Output::tool(&name, &description);
    }
    println!();

    let disabled: Vec<&str> = ToolKind::ALL
        .iter()
        .filter(|kind| !kind.is_enabled(&settings.tools))
        .map(|kind| kind.label())
        .collect();
    if !disabled.is_empty() {
        Output::kv("Disabled", &disabled.join(", "));
    }

    let enabled = ToolKind::ALL.len() - disabled.len();
    if registry.len() < enabled {
        Output::warning(&format!(
            "{} of {} enabled tool(s) failed to initialize. Run 'infrachat doctor' for details.",
            enabled - registry.len(),
            enabled
        ));
    } else {
        Output::success(&format!("{} tool(s) ready.", registry.len()));
    }

    Ok(())
}
