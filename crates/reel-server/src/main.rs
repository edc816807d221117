mod commands;

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use reel_types::RecorderConfig;

/// Reel -- browser interaction recorder with an MCP tool surface.
#[derive(Parser, Debug)]
#[command(name = "reel", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve the recording tools over MCP on stdin/stdout
    Serve {
        /// Path to a reel.toml configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Launch Chrome without a visible window
        #[arg(long)]
        headless: bool,
    },

    /// Record one session interactively (press ENTER to stop)
    Record {
        /// URL to open when the session starts
        url: Option<String>,

        /// Path to a reel.toml configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Launch Chrome without a visible window
        #[arg(long)]
        headless: bool,

        /// CSS selector whose field values are masked (repeatable)
        #[arg(long = "mask")]
        mask: Vec<String>,
    },

    /// List persisted recordings
    List {
        /// Path to a reel.toml configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Delete a persisted recording
    Delete {
        /// Session UUID of the recording to delete
        session_id: String,

        /// Path to a reel.toml configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries the MCP transport when serving.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config, headless } => {
            let config = load_config(config.as_deref(), headless)?;
            commands::serve::run(config)
        }
        Commands::Record {
            url,
            config,
            headless,
            mask,
        } => {
            let config = load_config(config.as_deref(), headless)?;
            commands::record::run(config, url.as_deref(), &mask)
        }
        Commands::List { config } => {
            let config = load_config(config.as_deref(), false)?;
            commands::list::run(config)
        }
        Commands::Delete { session_id, config } => {
            let config = load_config(config.as_deref(), false)?;
            commands::delete::run(config, &session_id)
        }
    }
}

/// Load the configuration for a command.
///
/// An explicit `--config` path must exist and parse. Without one,
/// `reel.toml` in the working directory is used when present, otherwise
/// defaults. Environment overrides and the `--headless` flag apply last.
fn load_config(path: Option<&Path>, headless: bool) -> anyhow::Result<RecorderConfig> {
    let mut config = match path {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config {}", path.display()))?;
            RecorderConfig::from_toml(&content)?
        }
        None => match std::fs::read_to_string("reel.toml") {
            Ok(content) => RecorderConfig::from_toml(&content)?,
            Err(_) => RecorderConfig::default(),
        },
    };

    config.apply_env();
    if headless {
        config.headless = true;
    }
    Ok(config)
}
