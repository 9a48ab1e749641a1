//! ---
//! rra_section: "05-networking-external-interfaces"
//! rra_subsection: "binary"
//! rra_type: "source"
//! rra_scope: "code"
//! rra_description: "Control CLI for driving the editor bridge offline."
//! rra_version: "v0.0.0-prealpha"
//! rra_owner: "tbd"
//! ---
use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use rra_common::config::AppConfig;
use rra_common::logging;
use tracing::debug;

mod replay;
mod url;

const DEFAULT_CONFIG_CANDIDATES: &[&str] = &["rra-bridge.toml", "configs/rra-bridge.toml"];

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Editor bridge control utility",
    long_about = None
)]
struct Cli {
    /// Configuration file (falls back to RRA_CONFIG, ./rra-bridge.toml, then built-in defaults).
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Write logs to the configured rolling file as well as stderr.
    #[arg(long, global = true)]
    log_file: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Replay a recorded editor transcript against a fresh session.
    Replay(replay::ReplayCommand),
    /// Print the URL the editor frame would load for a project extent.
    Url(url::UrlCommand),
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    if cli.log_file {
        logging::init_tracing(env!("CARGO_PKG_NAME"), &config.logging)?;
    } else {
        logging::init();
    }
    match cli.command {
        Commands::Replay(cmd) => cmd.execute(&config)?,
        Commands::Url(cmd) => cmd.execute(&config)?,
    }
    Ok(())
}

/// Resolve configuration: explicit path, then `RRA_CONFIG` or the default
/// candidates, then built-in defaults.
fn load_config(explicit: Option<&Path>) -> Result<AppConfig> {
    if let Some(path) = explicit {
        return AppConfig::from_path(path);
    }
    let env_set = std::env::var(AppConfig::ENV_CONFIG_PATH)
        .map(|value| !value.trim().is_empty())
        .unwrap_or(false);
    let candidates: Vec<PathBuf> = DEFAULT_CONFIG_CANDIDATES.iter().map(PathBuf::from).collect();
    if env_set || candidates.iter().any(|candidate| candidate.exists()) {
        let loaded = AppConfig::load_with_source(&candidates)?;
        debug!(source = %loaded.source.display(), "configuration loaded");
        return Ok(loaded.config);
    }
    debug!("no configuration file found, using defaults");
    Ok(AppConfig::default())
}
