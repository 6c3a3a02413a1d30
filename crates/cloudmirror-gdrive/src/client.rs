//! Google Drive API client
//!
//! Drive serves metadata and uploads from different roots
//! (`/drive/v3` and `/upload/drive/v3`), so the client carries both.

use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder};
use tracing::{debug, warn};

use cloudmirror_core::ports::Credential;

/// Metadata endpoint of the Drive API v3
pub const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";

/// Upload endpoint of the Drive API v3
pub const DRIVE_UPLOAD_BASE: &str = "https://www.googleapis.com/upload/drive/v3";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client for Drive API calls
#[derive(Clone)]
pub struct DriveClient {
    client: Client,
    api_base: String,
    upload_base: String,
    access_token: String,
}

impl DriveClient {
    /// Creates a client against the public Drive endpoints
    pub fn new(access_token: impl Into<String>) -> Self {
        Self::with_base_urls(access_token, DRIVE_API_BASE, DRIVE_UPLOAD_BASE)
    }

    /// Creates a client with custom endpoints (useful for testing)
    pub fn with_base_urls(
        access_token: impl Into<String>,
        api_base: impl Into<String>,
        upload_base: impl Into<String>,
    ) -> Self {
        Self {
            client: build_http_client(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            upload_base: upload_base.into().trim_end_matches('/').to_string(),
            access_token: access_token.into(),
        }
    }

    pub fn from_credential(
        credential: &Credential,
        api_base: impl Into<String>,
        upload_base: impl Into<String>,
    ) -> Self {
        Self::with_base_urls(credential.access_token(), api_base, upload_base)
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    pub fn upload_base(&self) -> &str {
        &self.upload_base
    }

    /// Authenticated request against the metadata endpoint
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.api_base, path);
        self.request_url(method, &url)
    }

    /// Authenticated request against the upload endpoint
    pub fn upload_request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.upload_base, path);
        self.request_url(method, &url)
    }

    /// Authenticated request against an absolute URL, such as an upload session
    pub fn request_url(&self, method: Method, url: &str) -> RequestBuilder {
        debug!(%method, url, "Drive request");
        self.client
            .request(method, url)
            .bearer_auth(&self.access_token)
    }
}

impl std::fmt::Debug for DriveClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriveClient")
            .field("api_base", &self.api_base)
            .field("upload_base", &self.upload_base)
            .finish_non_exhaustive()
    }
}

fn build_http_client() -> Client {
    Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .build()
        .unwrap_or_else(|e| {
            warn!(error = %e, "Failed to configure HTTP client; using defaults");
            Client::new()
        })
}
