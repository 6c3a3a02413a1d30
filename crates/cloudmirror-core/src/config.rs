//! Configuration module for cloudmirror.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, validation, defaults, and a builder pattern for programmatic use.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::ROOT_ALIAS;

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for cloudmirror.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub source: SourceConfig,
    pub destination: DestinationConfig,
    pub transfer: TransferConfig,
    pub logging: LoggingConfig,
}

/// OneDrive (Microsoft Graph) source settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Azure AD application (client) ID.
    pub client_id: String,
    /// Client secret, only for confidential app registrations.
    pub client_secret: Option<String>,
    /// Azure AD tenant: `common`, `consumers`, `organizations` or a tenant id.
    pub tenant: String,
    /// Microsoft Graph base URL.
    pub api_base_url: String,
    /// Folder the mirror starts from.
    pub root_id: String,
    /// Where the OneDrive tokens are persisted.
    pub token_file: PathBuf,
}

/// Google Drive destination settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DestinationConfig {
    /// Google OAuth client ID.
    pub client_id: String,
    pub client_secret: Option<String>,
    /// Drive API v3 base URL.
    pub api_base_url: String,
    /// Drive upload endpoint base URL.
    pub upload_base_url: String,
    /// Folder the mirror writes into.
    pub root_id: String,
    /// Where the Google tokens are persisted.
    pub token_file: PathBuf,
}

/// How the walker checks which names already exist in a destination folder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LookupStrategy {
    /// One paginated listing per destination folder.
    #[default]
    Snapshot,
    /// One query per child.
    PerItem,
}

/// File transfer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    /// Number of concurrent transfer workers.
    pub workers: usize,
    /// Maximum transfers queued or running at once. Unbounded when unset.
    pub max_outstanding: Option<usize>,
    pub lookup: LookupStrategy,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
    /// Optional log file, appended to in addition to stderr.
    pub file: Option<PathBuf>,
}

/// Errors raised while reading or writing the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("failed to write config file {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize config")]
    Serialize(#[from] serde_yaml::Error),
}

// ---------------------------------------------------------------------------
// Loading and saving
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    ///
    /// Missing sections and fields take their default values.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Write the configuration as YAML to `path`, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let yaml = serde_yaml::to_string(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                path: path.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(path, yaml).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/cloudmirror/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("cloudmirror")
            .join("config.yaml")
    }

    /// Directory holding token files by default.
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("~/.local/share"))
            .join("cloudmirror")
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: None,
            tenant: "common".to_string(),
            api_base_url: "https://graph.microsoft.com/v1.0".to_string(),
            root_id: ROOT_ALIAS.to_string(),
            token_file: Config::default_data_dir().join("onedrive_token.json"),
        }
    }
}

impl Default for DestinationConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: None,
            api_base_url: "https://www.googleapis.com/drive/v3".to_string(),
            upload_base_url: "https://www.googleapis.com/upload/drive/v3".to_string(),
            root_id: ROOT_ALIAS.to_string(),
            token_file: Config::default_data_dir().join("google_token.json"),
        }
    }
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            workers: 5,
            max_outstanding: None,
            lookup: LookupStrategy::Snapshot,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// A single validation problem found in a [`Config`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"transfer.workers"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Upper bound for `transfer.workers`.
const MAX_WORKERS: usize = 64;

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- source ---
        require_non_empty(&mut errors, "source.client_id", &self.source.client_id);
        require_non_empty(&mut errors, "source.tenant", &self.source.tenant);
        require_non_empty(&mut errors, "source.root_id", &self.source.root_id);
        require_url(&mut errors, "source.api_base_url", &self.source.api_base_url);

        // --- destination ---
        require_non_empty(
            &mut errors,
            "destination.client_id",
            &self.destination.client_id,
        );
        require_non_empty(&mut errors, "destination.root_id", &self.destination.root_id);
        require_url(
            &mut errors,
            "destination.api_base_url",
            &self.destination.api_base_url,
        );
        require_url(
            &mut errors,
            "destination.upload_base_url",
            &self.destination.upload_base_url,
        );

        // --- transfer ---
        if self.transfer.workers == 0 || self.transfer.workers > MAX_WORKERS {
            errors.push(ValidationError {
                field: "transfer.workers".into(),
                message: format!("must be in range 1..={MAX_WORKERS}"),
            });
        }
        if self.transfer.max_outstanding == Some(0) {
            errors.push(ValidationError {
                field: "transfer.max_outstanding".into(),
                message: "must be greater than 0 when set".into(),
            });
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!(
                    "invalid level '{}'; valid options: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }

        errors
    }
}

fn require_non_empty(errors: &mut Vec<ValidationError>, field: &str, value: &str) {
    if value.trim().is_empty() {
        errors.push(ValidationError {
            field: field.into(),
            message: "must not be empty".into(),
        });
    }
}

fn require_url(errors: &mut Vec<ValidationError>, field: &str, value: &str) {
    if let Err(e) = url::Url::parse(value) {
        errors.push(ValidationError {
            field: field.into(),
            message: format!("invalid URL '{value}': {e}"),
        });
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Builder for constructing a [`Config`] programmatically.
///
/// Starts from [`Config::default`] and allows selective overrides.
///
/// # Example
///
/// ```rust,no_run
/// use cloudmirror_core::config::ConfigBuilder;
///
/// let config = ConfigBuilder::new()
///     .source_client_id("azure-app-id")
///     .destination_client_id("google-client-id")
///     .transfer_workers(8)
///     .logging_level("debug")
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder initialised with [`Config::default`] values.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    /// Start from an already loaded configuration.
    pub fn from_config(config: Config) -> Self {
        Self { config }
    }

    // --- source ---

    pub fn source_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.config.source.client_id = client_id.into();
        self
    }

    pub fn source_client_secret(mut self, secret: impl Into<String>) -> Self {
        self.config.source.client_secret = Some(secret.into());
        self
    }

    pub fn source_tenant(mut self, tenant: impl Into<String>) -> Self {
        self.config.source.tenant = tenant.into();
        self
    }

    pub fn source_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.source.api_base_url = url.into();
        self
    }

    pub fn source_root_id(mut self, root_id: impl Into<String>) -> Self {
        self.config.source.root_id = root_id.into();
        self
    }

    pub fn source_token_file(mut self, path: PathBuf) -> Self {
        self.config.source.token_file = path;
        self
    }

    // --- destination ---

    pub fn destination_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.config.destination.client_id = client_id.into();
        self
    }

    pub fn destination_client_secret(mut self, secret: impl Into<String>) -> Self {
        self.config.destination.client_secret = Some(secret.into());
        self
    }

    pub fn destination_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.destination.api_base_url = url.into();
        self
    }

    pub fn destination_upload_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.destination.upload_base_url = url.into();
        self
    }

    pub fn destination_root_id(mut self, root_id: impl Into<String>) -> Self {
        self.config.destination.root_id = root_id.into();
        self
    }

    pub fn destination_token_file(mut self, path: PathBuf) -> Self {
        self.config.destination.token_file = path;
        self
    }

    // --- transfer ---

    pub fn transfer_workers(mut self, workers: usize) -> Self {
        self.config.transfer.workers = workers;
        self
    }

    pub fn transfer_max_outstanding(mut self, max: usize) -> Self {
        self.config.transfer.max_outstanding = Some(max);
        self
    }

    pub fn transfer_lookup(mut self, lookup: LookupStrategy) -> Self {
        self.config.transfer.lookup = lookup;
        self
    }

    // --- logging ---

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    pub fn logging_file(mut self, file: PathBuf) -> Self {
        self.config.logging.file = Some(file);
        self
    }

    // --- build ---

    /// Consume the builder and return the finished [`Config`].
    pub fn build(self) -> Config {
        self.config
    }

    /// Build and validate in one step. Returns `Err` with the list of
    /// validation errors if the configuration is invalid.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let config = self.build();
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
