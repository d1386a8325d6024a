// src/main.rs
// CRACE - Code Retrieval & Context Assembly Engine

mod cli;

use anyhow::Result;
use clap::Parser;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use cli::{Cli, Commands, ConfigAction};
use crace::config::Settings;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env from ~/.crace/.env only (never from CWD - a malicious repo
    // could otherwise override provider API keys).
    if let Some(home) = dirs::home_dir()
        && let Err(e) = dotenvy::from_path(home.join(".crace/.env"))
    {
        tracing::debug!("failed to load global .env file: {e}");
    }

    let cli = Cli::parse();

    let log_level = match &cli.command {
        Some(Commands::Config { .. }) => Level::WARN,
        Some(Commands::Index { .. }) => Level::INFO,
        Some(Commands::Serve) | None => parse_log_level(&std::env::var("SENORITA_LOG_LEVEL").or_else(|_| std::env::var("RUST_LOG")).unwrap_or_else(|_| "info".to_string())),
    };
    let subscriber = FmtSubscriber::builder().with_max_level(log_level).with_writer(std::io::stderr).finish();
    let _ = tracing::subscriber::set_global_default(subscriber);

    let settings = Settings::load();

    match cli.command {
        None | Some(Commands::Serve) => {
            cli::serve::run_serve(settings).await?;
        }
        Some(Commands::Index { path }) => {
            cli::index::run_index(path, settings).await?;
        }
        Some(Commands::Config { action }) => match action {
            ConfigAction::Show => cli::config::run_config_show()?,
            ConfigAction::Set { key, value } => cli::config::run_config_set(&key, &value)?,
        },
    }

    Ok(())
}

fn parse_log_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "error" => Level::ERROR,
        "warn" => Level::WARN,
        "debug" => Level::DEBUG,
        "trace" => Level::TRACE,
        _ => Level::INFO,
    }
}
