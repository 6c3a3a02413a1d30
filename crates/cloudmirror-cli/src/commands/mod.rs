//! Subcommand implementations

pub mod auth;
pub mod config;
pub mod sync;

use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::ValueEnum;

use cloudmirror_auth::{OAuth2Config, TokenFile};
use cloudmirror_core::config::Config;

/// Which end of the mirror a command applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Side {
    /// The OneDrive source
    Source,
    /// The Google Drive destination
    Destination,
}

impl Side {
    pub fn oauth_config(self, config: &Config) -> OAuth2Config {
        match self {
            Side::Source => OAuth2Config::for_source(&config.source),
            Side::Destination => OAuth2Config::for_destination(&config.destination),
        }
    }

    pub fn token_file(self, config: &Config) -> TokenFile {
        match self {
            Side::Source => TokenFile::new(&config.source.token_file),
            Side::Destination => TokenFile::new(&config.destination.token_file),
        }
    }
}

/// Loads the config file, failing with a hint when it does not exist yet
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        bail!(
            "No configuration at {}. Run 'cloudmirror config init' to create one.",
            path.display()
        );
    }
    Config::load(path).with_context(|| format!("Failed to load {}", path.display()))
}
