//! cloudmirror Google Drive - destination store over the Drive API v3
//!
//! Provides:
//! - An authenticated Drive HTTP client with separate metadata and upload endpoints
//! - Query builders with Drive's string escaping rules
//! - Folder lookup, folder creation and paginated folder listings
//! - Resumable streaming uploads that never buffer a whole file
//! - [`DestinationStore`](cloudmirror_core::ports::DestinationStore) and
//!   [`DestinationConnector`](cloudmirror_core::ports::DestinationConnector) implementations
//!
//! ## Modules
//!
//! - [`client`] - Drive API HTTP client
//! - [`query`] - `q` parameter builders
//! - [`files`] - metadata operations on `/files`
//! - [`upload`] - resumable upload protocol
//! - [`store`] - the destination port implementations

pub mod client;
pub mod files;
pub mod query;
pub mod store;
pub mod upload;

use reqwest::{Response, StatusCode};
use serde::Deserialize;
use thiserror::Error;

pub use client::DriveClient;
pub use store::{DriveConnector, DriveStore};

/// MIME type Drive uses to mark folders
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// Wait reported when a rate-limited response has no `Retry-After`
const DEFAULT_RETRY_AFTER_SECONDS: u64 = 60;

/// Errors that can occur when communicating with the Google Drive API
#[derive(Debug, Error)]
pub enum DriveError {
    /// Authentication failed (401)
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The token lacks permission, or a quota other than rate was hit (403)
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// The file or folder does not exist (404)
    #[error("File not found: {0}")]
    FileNotFound(String),

    /// Rate limit exceeded (429); the request is not retried
    #[error("Rate limit exceeded, retry after {retry_after_seconds} seconds")]
    RateLimitExceeded { retry_after_seconds: u64 },

    /// Any other non-success status
    #[error("Google Drive API error (status {status_code}): {message}")]
    ApiError { status_code: u16, message: String },

    /// The resumable session response carried no usable `Location` header
    #[error("Upload session was not created: {0}")]
    UploadSession(String),

    /// The payload length could not be discovered from the stream
    #[error("Failed to probe upload stream length")]
    StreamProbe(#[source] std::io::Error),

    /// The response body could not be parsed
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Network error
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),
}

#[derive(Debug, Deserialize)]
struct DriveErrorBody {
    error: DriveErrorDetail,
}

#[derive(Debug, Deserialize)]
struct DriveErrorDetail {
    message: Option<String>,
}

impl DriveError {
    /// Maps a status code and message to the matching variant
    pub fn from_status(status: StatusCode, message: String, retry_after: Option<u64>) -> Self {
        match status.as_u16() {
            401 => DriveError::AuthenticationFailed(message),
            403 => DriveError::PermissionDenied(message),
            404 => DriveError::FileNotFound(message),
            429 => DriveError::RateLimitExceeded {
                retry_after_seconds: retry_after.unwrap_or(DEFAULT_RETRY_AFTER_SECONDS),
            },
            other => DriveError::ApiError {
                status_code: other,
                message,
            },
        }
    }

    /// Builds an error from a failed response, reading its body
    pub async fn from_response(response: Response) -> Self {
        let status = response.status();
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());
        let body = response.text().await.unwrap_or_default();
        Self::from_status(status, error_message(&body), retry_after)
    }

    pub fn is_auth_error(&self) -> bool {
        matches!(self, DriveError::AuthenticationFailed(_))
    }
}

/// Pulls `error.message` out of a Drive error body, or returns the raw body
fn error_message(body: &str) -> String {
    serde_json::from_str::<DriveErrorBody>(body)
        .ok()
        .and_then(|parsed| parsed.error.message)
        .unwrap_or_else(|| body.to_string())
}

/// Passes successful responses through and turns the rest into [`DriveError`]
pub(crate) async fn check_status(response: Response) -> Result<Response, DriveError> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(DriveError::from_response(response).await)
    }
}
