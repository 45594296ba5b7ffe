//! infrachat CLI entry point.

use anyhow::Result;
use clap::Parser;
use infrachat::cli::{commands, Cli, Commands};
use infrachat::config::Settings;
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Credentials may live in a local .env file.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let config_path = cli.config.as_deref().map(Settings::expand_path);
    let settings = Settings::load_from(config_path.as_ref())?;

    init_logging(cli.verbose, &settings)?;

    match &cli.command {
        Commands::Serve { host, port } => {
            commands::run_serve(host.clone(), *port, settings).await?;
        }

        Commands::Chat { backend } => {
            commands::run_chat(backend.clone(), settings).await?;
        }

        Commands::Ask { query, thread } => {
            commands::run_ask(query, thread.clone(), settings).await?;
        }

        Commands::Tools => {
            commands::run_tools(settings).await?;
        }

        Commands::Doctor => {
            let path = config_path.clone().unwrap_or_else(Settings::default_config_path);
            commands::run_doctor(&settings, &path).await?;
        }

        Commands::Config { action } => {
            commands::run_config(action, settings, config_path.as_ref())?;
        }
    }

    Ok(())
}

fn init_logging(verbose: u8, settings: &Settings) -> Result<()> {
    let log_level = match verbose {
        0 => settings.general.log_level.as_str(),
        1 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| format!("infrachat={}", log_level)),
    );

    let file_layer = match settings.log_file() {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new().create(true).append(true).open(&path)?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(file_layer)
        .init();

    Ok(())
}
