//! CLI command implementations.

mod ask;
mod chat;
mod config;
mod doctor;
mod serve;
mod tools;

pub use ask::run_ask;
pub use chat::{run_chat, ChatClient};
pub use config::run_config;
pub use doctor::run_doctor;
pub use serve::{build_router, run_serve, AppState};
pub use tools::run_tools;
