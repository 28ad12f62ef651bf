//! Configuration for the record registry

use recreg_types::Address;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Main registry configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// The single administrative principal
    #[serde(default)]
    pub admin: Address,

    /// Where the event journal lives
    #[serde(default)]
    pub journal: JournalConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Journal backend selection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum JournalConfig {
    /// In-memory journal (for development/testing)
    #[default]
    Memory,

    /// JSON Lines file on local disk
    File {
        /// Path to the journal file
        path: PathBuf,
    },
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level or filter directive
    #[serde(default = "default_log_level")]
    pub level: String,

    /// JSON format
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),

    #[error("administrator address must not be empty")]
    MissingAdmin,

    #[error("file journal path must not be empty")]
    MissingJournalPath,
}

impl RegistryConfig {
    /// Load configuration: defaults, then the optional file, then `RECREG_*`
    /// environment variables.
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = ::config::Config::builder();

        builder = builder.add_source(::config::Config::try_from(&RegistryConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(::config::File::with_name(path).required(false));
        }

        builder = builder.add_source(
            ::config::Environment::with_prefix("RECREG")
                .separator("_")
                .try_parsing(true),
        );

        let config: RegistryConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Configuration for an in-memory registry owned by `admin`.
    pub fn in_memory(admin: impl Into<String>) -> Self {
        Self {
            admin: Address::new(admin),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.admin.is_empty() {
            return Err(ConfigError::MissingAdmin);
        }
        if let JournalConfig::File { path } = &self.journal {
            if path.as_os_str().is_empty() {
                return Err(ConfigError::MissingJournalPath);
            }
        }
        Ok(())
    }
}
