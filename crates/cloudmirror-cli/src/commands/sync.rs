//! Sync command - mirror the OneDrive tree into Google Drive
//!
//! 1. Loads and validates the configuration, applying command-line overrides
//! 2. Obtains both credentials, refreshing them when close to expiry
//! 3. Builds the OneDrive lister and the Google Drive connector
//! 4. Runs one `sync_tree` pass and prints the run summary

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Args;
use tracing::{error, info};

use cloudmirror_auth::FileCredentialProvider;
use cloudmirror_core::config::{Config, ConfigBuilder, LookupStrategy};
use cloudmirror_core::ports::{CredentialProvider, DestinationConnector, SourceLister};
use cloudmirror_gdrive::DriveConnector;
use cloudmirror_graph::GraphSourceLister;
use cloudmirror_sync::{SyncOptions, SyncStats, TreeSync};

use super::{load_config, Side};
use crate::output::{get_formatter, OutputFormat, OutputFormatter};

#[derive(Debug, Args)]
pub struct SyncCommand {
    /// Number of concurrent transfer workers
    #[arg(long)]
    pub workers: Option<usize>,

    /// OneDrive folder id to mirror from (default: configured root)
    #[arg(long)]
    pub source_root: Option<String>,

    /// Google Drive folder id to mirror into (default: configured root)
    #[arg(long)]
    pub destination_root: Option<String>,

    /// Query the destination once per item instead of listing each folder
    #[arg(long)]
    pub per_item_lookup: bool,
}

impl SyncCommand {
    /// Applies command-line overrides on top of the loaded configuration
    pub fn apply_overrides(&self, config: Config) -> Config {
        let mut builder = ConfigBuilder::from_config(config);
        if let Some(workers) = self.workers {
            builder = builder.transfer_workers(workers);
        }
        if let Some(root) = &self.source_root {
            builder = builder.source_root_id(root.clone());
        }
        if let Some(root) = &self.destination_root {
            builder = builder.destination_root_id(root.clone());
        }
        if self.per_item_lookup {
            builder = builder.transfer_lookup(LookupStrategy::PerItem);
        }
        builder.build()
    }

    pub async fn execute(&self, config_path: &Path, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format);

        let config = self.apply_overrides(load_config(config_path)?);
        let errors = config.validate();
        if !errors.is_empty() {
            for e in &errors {
                formatter.error(&e.to_string());
            }
            bail!("Configuration at {} is invalid", config_path.display());
        }
        info!(config_path = %config_path.display(), "Loaded configuration");

        let source_auth = FileCredentialProvider::new(
            Side::Source.oauth_config(&config),
            Side::Source.token_file(&config),
        );
        let destination_auth = FileCredentialProvider::new(
            Side::Destination.oauth_config(&config),
            Side::Destination.token_file(&config),
        );

        // Both credentials are required before anything is traversed.
        let source_credential = source_auth.credential().await.map_err(|e| {
            error!(provider = source_auth.provider(), error = %e, "Cannot obtain credentials");
            e
        })?;
        let destination_credential = destination_auth.credential().await.map_err(|e| {
            error!(provider = destination_auth.provider(), error = %e, "Cannot obtain credentials");
            e
        })?;

        let source: Arc<dyn SourceLister> = Arc::new(GraphSourceLister::from_credential(
            &source_credential,
            config.source.api_base_url.as_str(),
        ));
        let connector: Arc<dyn DestinationConnector> = Arc::new(DriveConnector::new(
            Arc::new(destination_credential),
            config.destination.api_base_url.as_str(),
            config.destination.upload_base_url.as_str(),
        ));

        let mut engine = TreeSync::new(source, connector, SyncOptions::from(&config.transfer));
        if format == OutputFormat::Human {
            formatter.info(&format!(
                "Mirroring OneDrive '{}' into Google Drive '{}' with {} workers",
                config.source.root_id, config.destination.root_id, config.transfer.workers
            ));
        }
        engine
            .sync_tree(&config.source.root_id, &config.destination.root_id)
            .await;

        print_summary(engine.stats(), &*formatter, format)
            .context("Failed to print run summary")
    }
}

fn print_summary(stats: &SyncStats, fmt: &dyn OutputFormatter, format: OutputFormat) -> Result<()> {
    if format == OutputFormat::Json {
        let json = serde_json::to_value(stats)?;
        fmt.print_json(&json);
        return Ok(());
    }

    if stats.is_complete() {
        fmt.success("Mirror complete");
    } else {
        fmt.warn("Mirror finished with skipped items or failed transfers; see the log");
    }

    let walk = &stats.walk;
    let transfers = &stats.transfers;
    fmt.field("Folders visited", &walk.folders_visited.to_string());
    fmt.field("Folders created", &walk.folders_created.to_string());
    fmt.field("Folders reused", &walk.folders_reused.to_string());
    fmt.field("Branches skipped", &walk.branches_skipped.to_string());
    fmt.field("Files submitted", &transfers.submitted.to_string());
    fmt.field("Files renamed", &walk.files_renamed.to_string());
    fmt.field("Files skipped", &walk.files_skipped.to_string());
    fmt.field("Files uploaded", &transfers.uploaded.to_string());
    fmt.field("Files failed", &transfers.failed.to_string());
    fmt.field("Bytes uploaded", &transfers.bytes_uploaded.to_string());
    fmt.field(
        "Duration",
        &format!("{:.1}s", stats.duration_ms as f64 / 1000.0),
    );
    Ok(())
}
