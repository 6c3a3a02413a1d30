//! Microsoft Graph API client
//!
//! Provides an authenticated HTTP client for the Microsoft Graph API.
//! Handles the bearer header and endpoint construction; the listing and
//! download modules build on [`GraphClient::request`] and
//! [`GraphClient::request_url`].
//!
//! ## Usage
//!
//! ```rust,no_run
//! use cloudmirror_graph::client::GraphClient;
//! use cloudmirror_graph::children;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let client = GraphClient::new("access-token-here");
//! let page = children::list_children_page(&client, "root", None).await?;
//! println!("{} items on the first page", page.items.len());
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder};
use tracing::{debug, warn};

use cloudmirror_core::ports::Credential;

/// Base URL for Microsoft Graph API v1.0
pub const GRAPH_BASE_URL: &str = "https://graph.microsoft.com/v1.0";

/// Bound on establishing a connection; bodies themselves are not time-limited
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// GraphClient
// ============================================================================

/// HTTP client for Microsoft Graph API calls
///
/// Wraps `reqwest::Client` with authentication headers and base URL
/// construction for the Microsoft Graph API. Cloning is cheap and shares
/// the connection pool.
#[derive(Clone)]
pub struct GraphClient {
    /// The underlying HTTP client
    client: Client,
    /// Base URL for API requests
    base_url: String,
    /// OAuth2 access token
    access_token: String,
}

impl GraphClient {
    /// Creates a new GraphClient with the given access token
    ///
    /// # Arguments
    /// * `access_token` - A valid OAuth2 access token for Microsoft Graph
    pub fn new(access_token: impl Into<String>) -> Self {
        Self::with_base_url(access_token, GRAPH_BASE_URL)
    }

    /// Creates a new GraphClient with a custom base URL (useful for testing)
    ///
    /// # Arguments
    /// * `access_token` - A valid OAuth2 access token
    /// * `base_url` - Custom base URL for API requests
    pub fn with_base_url(access_token: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: build_http_client(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token: access_token.into(),
        }
    }

    /// Creates a client from a shared credential
    pub fn from_credential(credential: &Credential, base_url: impl Into<String>) -> Self {
        Self::with_base_url(credential.access_token(), base_url)
    }

    /// Returns a reference to the current access token
    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    /// Returns the base URL for API requests
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Creates an authenticated request builder for the given method and path
    ///
    /// Automatically prepends the base URL and adds the Authorization header.
    ///
    /// # Arguments
    /// * `method` - HTTP method (GET, POST, PUT, DELETE, etc.)
    /// * `path` - API path relative to base URL (e.g., "/me/drive/items/root/children")
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        self.request_url(method, &url)
    }

    /// Creates an authenticated request builder for an absolute URL
    ///
    /// Used for pagination links, which Graph returns as full URLs.
    pub fn request_url(&self, method: Method, url: &str) -> RequestBuilder {
        debug!(%method, url, "Graph request");
        self.client
            .request(method, url)
            .bearer_auth(&self.access_token)
    }
}

impl std::fmt::Debug for GraphClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphClient")
            .field("base_url", &self.base_url)
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
