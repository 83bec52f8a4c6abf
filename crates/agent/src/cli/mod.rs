pub mod chat;
pub mod config;
pub mod history;
pub mod import;
pub mod lock;
pub mod run;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Tidings: a scheduled conversational agent that writes to you.
#[derive(Debug, Parser)]
#[command(name = "tidings", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the HTTP trigger server (default when no subcommand is given).
    Serve,
    /// Execute exactly one run and print the model's reply.
    Run {
        /// Trigger text to use instead of the configured trigger source.
        #[arg(long)]
        message: Option<String>,
        /// Model override (e.g. "gemini-2.5-pro").
        #[arg(long)]
        model: Option<String>,
    },
    /// Interactive REPL: every line you type is a trigger.
    Chat {
        /// Model override.
        #[arg(long)]
        model: Option<String>,
    },
    /// Print the most recent history records.
    History {
        /// Number of records to show.
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Append a JSON-lines export of legacy key-shaped documents to the
    /// (empty) history store.
    ImportLegacy {
        /// Path to the export file.
        file: PathBuf,
    },
    /// Configuration utilities.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Print version information.
    Version,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Parse the config file and report any errors.
    Validate,
    /// Dump the resolved configuration (with defaults) as TOML.
    Show,
    /// Store the Gemini API key in the OS keychain.
    SetSecret {
        /// Keychain service name.
        #[arg(long, default_value = "tidings")]
        service: String,
        /// Keychain account name.
        #[arg(long, default_value = "gemini-api-key")]
        account: String,
    },
}

// ── Config loading helper ─────────────────────────────────────────────

/// Load the configuration from the path specified by `TIDINGS_CONFIG` (or
/// `config.toml` by default). A missing file yields the defaults.
pub fn load_config() -> anyhow::Result<(td_domain::config::Config, String)> {
    let config_path =
        std::env::var("TIDINGS_CONFIG").unwrap_or_else(|_| "config.toml".into());

    let config = if std::path::Path::new(&config_path).exists() {
        let raw = std::fs::read_to_string(&config_path)
            .map_err(|e| anyhow::anyhow!("reading {config_path}: {e}"))?;
        toml::from_str(&raw)
            .map_err(|e| anyhow::anyhow!("parsing {config_path}: {e}"))?
    } else {
        td_domain::config::Config::default()
    };

    Ok((config, config_path))
}
