//! CLI module for infrachat.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// infrachat - Infrastructure chat assistant
///
/// Ask questions about your Kubernetes clusters, databases, message brokers
/// and cloud accounts in plain language. An LLM agent runs the matching
/// command-line tools and APIs for you.
#[derive(Parser, Debug)]
#[command(name = "infrachat")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP backend that runs the agent
    Serve {
        /// Host to bind to (defaults to server.host)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (defaults to server.port)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Start an interactive chat session against a running backend
    Chat {
        /// Backend URL (defaults to client.backend_url)
        #[arg(short, long, env = "INFRACHAT_BACKEND_URL")]
        backend: Option<String>,
    },

    /// Ask a single question without a running backend
    Ask {
        /// The question to ask
        query: String,

        /// Conversation thread
        #[arg(short, long)]
        thread: Option<String>,
    },

    /// List the tools that initialize with the current configuration
    Tools,

    /// Check system requirements and configuration
    Doctor,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., "server.port")
        key: String,
        /// Configuration value
        value: String,
    },

    /// Open configuration file in editor
    Edit,

    /// Show configuration file path
    Path,
}
