//! infrachat - Infrastructure chat assistant
//!
//! An LLM agent that answers questions about infrastructure by running the
//! matching command-line tools and management APIs.
//!
//! # Overview
//!
//! infrachat lets you:
//! - Query Kubernetes, AWS, Docker and Kong through their CLIs
//! - Inspect Redis, MongoDB, MySQL and MariaDB with their shells
//! - Call the RabbitMQ management API
//! - Keep multi-turn conversations per thread over an HTTP backend
//!
//! # Architecture
//!
//! - `config` - Configuration management
//! - `tools` - Tool trait, built-in tools and registry
//! - `agent` - Chat model, conversation memory, tool calling loop, streaming
//! - `cli` - Command line, HTTP backend and chat client
//!
//! # Example
//!
//! ```rust,no_run
//! use infrachat::agent::Agent;
//! use infrachat::config::Settings;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let agent = Agent::from_settings(&settings).await?;
//!
//!     let response = agent.process("default", "How many pods are running?").await?;
//!     println!("{}", response.content);
//!
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod cli;
pub mod config;
pub mod error;
pub mod openai;
pub mod tools;

pub use error::{InfraError, Result};
