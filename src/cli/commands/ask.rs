//! Ask command implementation.

use crate::agent::Agent;
use crate::cli::preflight;
use crate::cli::Output;
use crate::config::Settings;
use anyhow::Result;

/// Run the agent once in-process and print the answer.
pub async fn run_ask(query: &str, thread: Option<String>, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::verify_environment() {
        Output::error(&format!("{}", e));
        Output::info("Run 'infrachat doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let spinner = Output::spinner("Initializing tools...");
    let agent = match Agent::from_settings(&settings).await {
        Ok(agent) => agent,
        Err(e) => {
            spinner.finish_and_clear();
            return Err(e.into());
        }
    };

    let thread = thread.unwrap_or_else(|| settings.agent.default_thread.clone());
    spinner.set_message("Thinking...");

    match agent.process(&thread, query).await {
        Ok(response) => {
            spinner.finish_and_clear();

            println!("\n{}\n", response.content);

            if !response.tool_calls.is_empty() {
                Output::header("Tool calls");
                for call in &response.tool_calls {
                    Output::tool_call(&call.name, &call.arguments, call.result.starts_with("Error:"));
                }
                println!();
            }
        }
        Err(e) => {
            spinner.finish_and_clear();
            Output::error(&format!("Failed to answer: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
