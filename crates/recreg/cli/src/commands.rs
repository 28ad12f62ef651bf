//! Registry subcommands

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};
use recreg_service::{Address, Nonce, QueryWindow, RecordHash, RecordRegistry};
use serde_json::{json, to_value, Value};
use std::path::PathBuf;

/// Available commands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Register or re-register a provider (administrator only)
    RegisterProvider {
        address: String,

        #[arg(short, long, default_value = "")]
        metadata: String,
    },

    /// Register or re-register a subject (administrator only)
    RegisterSubject {
        address: String,

        #[arg(short, long, default_value = "")]
        metadata: String,
    },

    /// Add an auditor (administrator only)
    AddAuditor { address: String },

    /// Grant a provider access to the caller's records
    Grant { provider: String },

    /// Revoke a provider's access to the caller's records
    Revoke { provider: String },

    /// Append a record hash to a subject's history
    Upload(UploadArgs),

    /// Read a subject's history
    View {
        subject: String,

        /// Show full entries instead of hashes
        #[arg(long)]
        entries: bool,

        #[command(flatten)]
        window: WindowArgs,
    },

    /// Show the nonce a provider must submit next
    NextNonce {
        /// Defaults to the caller
        provider: Option<String>,
    },

    /// List journal records
    Events {
        #[command(flatten)]
        window: WindowArgs,
    },

    /// Re-read and verify the journal hash chain
    Verify,
}

#[derive(Debug, Args)]
pub struct UploadArgs {
    pub subject: String,

    /// Hex-encoded 32-byte content hash
    #[arg(long, conflicts_with = "file", required_unless_present = "file")]
    pub hash: Option<String>,

    /// Digest this file's contents instead of passing a hash
    #[arg(long)]
    pub file: Option<PathBuf>,

    /// Defaults to the provider's next expected nonce
    #[arg(short, long)]
    pub nonce: Option<Nonce>,
}

#[derive(Debug, Args)]
pub struct WindowArgs {
    #[arg(long, default_value_t = 0)]
    pub offset: usize,

    /// Zero means no limit
    #[arg(long, default_value_t = 0)]
    pub limit: usize,
}

impl WindowArgs {
    fn window(&self) -> QueryWindow {
        QueryWindow::new(self.offset, self.limit)
    }
}

/// Execute a command as `caller` and return its JSON result.
pub fn execute(command: Command, registry: &RecordRegistry, caller: &Address) -> Result<Value> {
    let value = match command {
        Command::RegisterProvider { address, metadata } => {
            to_value(registry.register_provider(caller, &Address::new(address), metadata)?)?
        }
        Command::RegisterSubject { address, metadata } => {
            to_value(registry.register_subject(caller, &Address::new(address), metadata)?)?
        }
        Command::AddAuditor { address } => {
            to_value(registry.add_auditor(caller, &Address::new(address))?)?
        }
        Command::Grant { provider } => {
            to_value(registry.grant(caller, &Address::new(provider))?)?
        }
        Command::Revoke { provider } => {
            to_value(registry.revoke(caller, &Address::new(provider))?)?
        }
        Command::Upload(args) => {
            let data_hash = resolve_hash(&args)?;
            let nonce = match args.nonce {
                Some(nonce) => nonce,
                None => registry.next_expected_nonce(caller)?,
            };
            let subject = Address::new(args.subject);
            to_value(registry.upload_record(caller, &subject, data_hash, nonce)?)?
        }
        Command::View {
            subject,
            entries,
            window,
        } => {
            let subject = Address::new(subject);
            if entries {
                to_value(window.window().apply(registry.view_entries(caller, &subject)?))?
            } else {
                to_value(registry.view_records_page(caller, &subject, window.window())?)?
            }
        }
        Command::NextNonce { provider } => {
            let provider = provider.map(Address::new).unwrap_or_else(|| caller.clone());
            json!({
                "provider": provider,
                "next_nonce": registry.next_expected_nonce(&provider)?,
            })
        }
        Command::Events { window } => to_value(registry.events(window.window())?)?,
        Command::Verify => json!({ "verified_records": registry.verify_journal()? }),
    };
    Ok(value)
}

fn resolve_hash(args: &UploadArgs) -> Result<RecordHash> {
    match (&args.hash, &args.file) {
        (Some(hex), None) => hex
            .parse::<RecordHash>()
            .with_context(|| format!("invalid record hash {hex:?}")),
        (None, Some(path)) => {
            let contents = std::fs::read(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            Ok(RecordHash::digest(&contents))
        }
        _ => bail!("exactly one of --hash or --file is required"),
    }
}
