//! Error taxonomy for a mirror run
//!
//! Each error type is scoped to the smallest unit it can abort:
//! - [`ListError`] and [`FolderError`] abort one folder subtree
//! - [`TransferError`] fails one file transfer
//! - [`FatalAuthError`] aborts the run before any traversal

use std::path::PathBuf;

use thiserror::Error;

/// A listing call failed; only the folder subtree being processed is skipped
#[derive(Debug, Error)]
pub enum ListError {
    /// The destination folder could not be snapshotted
    #[error("failed to snapshot destination folder {folder_id} for '{path}'")]
    DestinationSnapshot {
        folder_id: String,
        path: String,
        #[source]
        source: anyhow::Error,
    },

    /// The source folder could not be enumerated
    #[error("failed to list source folder {folder_id} at '{path}'")]
    SourceListing {
        folder_id: String,
        path: String,
        #[source]
        source: anyhow::Error,
    },
}

impl ListError {
    /// Path of the folder whose subtree was skipped
    pub fn path(&self) -> &str {
        match self {
            ListError::DestinationSnapshot { path, .. } | ListError::SourceListing { path, .. } => {
                path
            }
        }
    }
}

/// A destination folder could not be looked up or created
#[derive(Debug, Error)]
#[error("failed to prepare destination folder '{name}' under {parent_id} for '{path}'")]
pub struct FolderError {
    pub name: String,
    pub parent_id: String,
    pub path: String,
    #[source]
    pub source: anyhow::Error,
}

/// Stage at which a file transfer failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferStage {
    /// The worker could not build its destination client
    Connect,
    /// The source content stream could not be opened
    Open,
    /// The streaming upload failed
    Upload,
    /// The worker pool went away before reporting a result
    Aborted,
}

impl std::fmt::Display for TransferStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransferStage::Connect => write!(f, "connect"),
            TransferStage::Open => write!(f, "open"),
            TransferStage::Upload => write!(f, "upload"),
            TransferStage::Aborted => write!(f, "aborted"),
        }
    }
}

/// One file transfer failed; sibling transfers are unaffected
#[derive(Debug, Error)]
#[error("transfer of '{path}' as '{target_name}' failed at {stage}")]
pub struct TransferError {
    /// Source path of the file
    pub path: String,
    /// Name the file was going to be created under
    pub target_name: String,
    pub stage: TransferStage,
    #[source]
    pub source: anyhow::Error,
}

/// Credentials could not be obtained; the whole run is aborted
#[derive(Debug, Error)]
pub enum FatalAuthError {
    /// No token file exists for the provider
    #[error("not logged in to {provider}: no token file at {}", path.display())]
    NotLoggedIn { provider: String, path: PathBuf },

    /// The access token expired and there is no refresh token
    #[error("{provider} access token expired and no refresh token is available")]
    Expired { provider: String },

    /// The refresh request was rejected
    #[error("failed to refresh {provider} access token")]
    Refresh {
        provider: String,
        #[source]
        source: anyhow::Error,
    },

    /// The token file could not be read or written
    #[error("token storage error for {provider}")]
    TokenStore {
        provider: String,
        #[source]
        source: anyhow::Error,
    },
}
