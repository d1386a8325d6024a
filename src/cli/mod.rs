// src/cli/mod.rs
// CLI subcommands: `serve` runs the HTTP/WS server, `index` runs a
// one-shot project index, `config show|set` inspects the merged
// settings. Mirrors the teacher's subcommand-module layout.

pub mod config;
pub mod index;
pub mod serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "crace")]
#[command(about = "Code Retrieval & Context Assembly Engine")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP/WebSocket server (default).
    Serve,

    /// Index a project once and exit.
    Index {
        /// Project path (default: current directory).
        #[arg(short, long)]
        path: Option<PathBuf>,
    },

    /// Inspect or update configuration.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the merged settings.
    Show,
    /// Set a configuration key in the TOML file.
    Set { key: String, value: String },
}
