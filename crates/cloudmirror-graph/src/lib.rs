//! cloudmirror Graph - OneDrive source over Microsoft Graph
//!
//! Provides:
//! - An authenticated Graph HTTP client
//! - Paginated folder listings following `@odata.nextLink`
//! - Streaming content downloads
//! - A [`SourceLister`](cloudmirror_core::ports::SourceLister) implementation
//!
//! ## Modules
//!
//! - [`client`] - Microsoft Graph API HTTP client
//! - [`children`] - folder listings and DriveItem mapping
//! - [`content`] - streaming file downloads
//! - [`lister`] - the source port implementation

pub mod children;
pub mod client;
pub mod content;
pub mod lister;

use std::time::Duration;

use reqwest::{Response, StatusCode};
use serde::Deserialize;
use thiserror::Error;

pub use client::GraphClient;
pub use lister::GraphSourceLister;

/// Wait suggested when a 429 response carries no usable `Retry-After`
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(30);

/// Errors that can occur when communicating with the Microsoft Graph API
#[derive(Debug, Error)]
pub enum GraphError {
    /// Authentication credentials are invalid or expired
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Insufficient permissions for the requested operation
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The requested resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// A conflict was detected (e.g., concurrent modification)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Rate limit exceeded; the request is not retried
    #[error("Too many requests, retry after {retry_after:?}")]
    TooManyRequests {
        /// Duration the server asked callers to wait
        retry_after: Duration,
    },

    /// A server-side error occurred (5xx)
    #[error("Server error: {0}")]
    ServerError(String),

    /// Any other non-success status
    #[error("Unexpected status {status}: {message}")]
    UnexpectedStatus { status: u16, message: String },

    /// A network-level error occurred
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// The API response could not be parsed or was malformed
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Error body Graph returns with failed requests
#[derive(Debug, Deserialize)]
struct GraphErrorBody {
    error: GraphErrorDetail,
}

#[derive(Debug, Deserialize)]
struct GraphErrorDetail {
    code: Option<String>,
    message: Option<String>,
}

impl GraphError {
    /// Maps a status code and message to the matching variant
    pub fn from_status(status: StatusCode, message: String, retry_after: Option<Duration>) -> Self {
        match status.as_u16() {
            401 => GraphError::Unauthorized(message),
            403 => GraphError::Forbidden(message),
            404 => GraphError::NotFound(message),
            409 => GraphError::Conflict(message),
            429 => GraphError::TooManyRequests {
                retry_after: retry_after.unwrap_or(DEFAULT_RETRY_AFTER),
            },
            500..=599 => GraphError::ServerError(format!("{status}: {message}")),
            other => GraphError::UnexpectedStatus {
                status: other,
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
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs);
        let body = response.text().await.unwrap_or_default();
        Self::from_status(status, error_message(&body), retry_after)
    }

    /// True when a fresh login would be needed to continue
    pub fn is_auth_error(&self) -> bool {
        matches!(self, GraphError::Unauthorized(_) | GraphError::Forbidden(_))
    }
}

/// Extracts `code: message` from a Graph error body, or returns the raw body
fn error_message(body: &str) -> String {
    match serde_json::from_str::<GraphErrorBody>(body) {
        Ok(parsed) => match (parsed.error.code, parsed.error.message) {
            (Some(code), Some(message)) => format!("{code}: {message}"),
            (Some(text), None) | (None, Some(text)) => text,
            (None, None) => body.to_string(),
        },
        Err(_) => body.to_string(),
    }
}

/// Passes successful responses through and turns the rest into [`GraphError`]
pub(crate) async fn check_status(response: Response) -> Result<Response, GraphError> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(GraphError::from_response(response).await)
    }
}
