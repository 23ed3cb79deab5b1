//! Command-line interface for hard_to_get.

use clap::{Parser, Subcommand};

/// Hard to Get - matchmaking and round engine with MCP and HTTP interfaces
#[derive(Parser, Debug)]
#[command(name = "hard_to_get")]
#[command(about = "Hard to Get word game server for LLM agents", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Path to a TOML server configuration
    #[arg(short, long, global = true)]
    pub config: Option<std::path::PathBuf>,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the MCP game server (stdio mode)
    Server,

    /// Run the HTTP game server (REST, server-sent events and MCP)
    Http {
        /// Port to bind to
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// SQLite database path, overriding the configuration
        #[arg(long)]
        db_path: Option<String>,
    },

    /// Print a model's aggregated record
    Stats {
        /// Path to the database file
        #[arg(long, default_value = "hard_to_get.db")]
        db_path: String,

        /// Model label to report on
        #[arg(long)]
        model: String,
    },
}
