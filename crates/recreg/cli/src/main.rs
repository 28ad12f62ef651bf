//! recregctl - operate a record registry from the terminal
//!
//! Every invocation opens the configured registry (replaying its journal),
//! runs one command as the `--as` caller and prints the result as JSON.

use anyhow::{bail, Context, Result};
use clap::Parser;
use recreg_service::{Address, JournalConfig, LoggingConfig, RecordRegistry, RegistryConfig};
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod output;

use commands::Command;

/// Record registry CLI
#[derive(Parser)]
#[command(name = "recregctl")]
#[command(about = "Access-controlled record registry", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "RECREG_CONFIG")]
    config: Option<String>,

    /// Journal file, overriding the configured journal
    #[arg(short, long)]
    journal: Option<PathBuf>,

    /// Address the command runs as
    #[arg(long = "as", env = "RECREG_CALLER")]
    caller: String,

    /// Log level, overriding the configured level
    #[arg(long)]
    log_level: Option<String>,

    /// Enable JSON logging
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = RegistryConfig::load(cli.config.as_deref())
        .context("failed to load registry configuration")?;
    if let Some(path) = cli.journal {
        config.journal = JournalConfig::File { path };
    }
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    config.logging.json |= cli.json;
    require_file_journal(&config)?;

    init_tracing(&config.logging);

    let registry = RecordRegistry::open(&config).context("failed to open registry")?;
    let caller = Address::new(cli.caller);
    debug!(caller = %caller, command = ?cli.command, "Executing command");
    let value = commands::execute(cli.command, &registry, &caller)?;
    output::print_json(&value)
}

/// Each invocation is its own process, so an in-memory journal would accept
/// a mutation and lose it on exit.
fn require_file_journal(config: &RegistryConfig) -> Result<()> {
    if let JournalConfig::Memory = config.journal {
        bail!(
            "a file journal is required: pass --journal <path> or set journal.type = \"file\" in the configuration"
        );
    }
    Ok(())
}

/// Logs go to stderr so stdout stays machine-readable.
fn init_tracing(logging: &LoggingConfig) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| logging.level.clone().into());

    if logging.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_journal_is_refused() {
        let config = RegistryConfig::in_memory("admin");
        let err = require_file_journal(&config).unwrap_err();
        assert!(err.to_string().contains("a file journal is required"));
    }

    #[test]
    fn file_journal_is_accepted() {
        let config = RegistryConfig {
            journal: JournalConfig::File {
                path: PathBuf::from("registry.jsonl"),
            },
            ..RegistryConfig::in_memory("admin")
        };
        assert!(require_file_journal(&config).is_ok());
    }

    #[test]
    fn journal_flag_satisfies_the_requirement() {
        let cli = Cli::try_parse_from([
            "recregctl",
            "--as",
            "admin",
            "--journal",
            "state/registry.jsonl",
            "verify",
        ])
        .unwrap();
        let mut config = RegistryConfig::in_memory("admin");
        if let Some(path) = cli.journal {
            config.journal = JournalConfig::File { path };
        }
        assert!(require_file_journal(&config).is_ok());
    }
}
