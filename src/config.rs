//! Configuration and CLI argument handling

use std::path::PathBuf;

use clap::Parser;

use crate::services::JsonFileStore;

/// CLI argument parsing structure
#[derive(Debug, Parser)]
#[command(name = "chronoghost")]
#[command(about = "Floating multi-timer overlay core with global hotkeys")]
#[command(version)]
pub struct Config {
    /// Port for the control API
    #[arg(short, long, default_value = "20554")]
    pub port: u16,

    /// Host address to bind to
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Where to keep the state snapshot [default: <data dir>/chronoghost/state.json]
    #[arg(long)]
    pub state_file: Option<PathBuf>,

    /// Keep state in memory only
    #[arg(long, conflicts_with = "state_file")]
    pub ephemeral: bool,

    /// Initial window width in physical pixels
    #[arg(long, default_value = "600")]
    pub width: u32,

    /// Window height in physical pixels
    #[arg(long, default_value = "190")]
    pub height: u32,

    /// Display scale factor of the window's monitor
    #[arg(long, default_value = "1.0")]
    pub scale_factor: f64,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Config {
    /// Parse configuration from command line arguments
    pub fn parse() -> Self {
        Parser::parse()
    }

    /// Get the server address as a formatted string
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Get the appropriate log level based on verbose flag
    pub fn log_level(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else {
            "info"
        }
    }

    pub fn state_path(&self) -> PathBuf {
        self.state_file
            .clone()
            .unwrap_or_else(JsonFileStore::default_path)
    }
}
