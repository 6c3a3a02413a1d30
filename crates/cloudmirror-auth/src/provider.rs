//! OAuth2 endpoint presets for the two providers
//!
//! OneDrive only needs read access since it is never written to. Google
//! Drive needs full drive scope, and `access_type=offline` with
//! `prompt=consent` so a refresh token is issued on every login.

use cloudmirror_core::config::{DestinationConfig, SourceConfig};

/// Default redirect URI for the local callback server
pub const REDIRECT_URI: &str = "http://127.0.0.1:8400/callback";

/// Microsoft identity platform authority
const MICROSOFT_AUTHORITY: &str = "https://login.microsoftonline.com";

/// Read-only OneDrive access plus a refresh token
pub const MICROSOFT_SCOPES: &[&str] = &["Files.Read", "offline_access"];

pub const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/auth";
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const GOOGLE_SCOPES: &[&str] = &["https://www.googleapis.com/auth/drive"];

/// Provider names used in logs, errors and CLI arguments
pub const ONEDRIVE: &str = "onedrive";
pub const GOOGLE_DRIVE: &str = "google-drive";

/// Configuration for one provider's OAuth2 flow
#[derive(Debug, Clone)]
pub struct OAuth2Config {
    /// Provider name
    pub provider: String,
    /// Application (client) ID
    pub client_id: String,
    /// Client secret, for app registrations that require one
    pub client_secret: Option<String>,
    pub auth_url: String,
    pub token_url: String,
    /// Redirect URI the callback server listens on
    pub redirect_uri: String,
    /// OAuth scopes to request
    pub scopes: Vec<String>,
    /// Additional authorization URL parameters
    pub extra_params: Vec<(String, String)>,
}

impl OAuth2Config {
    /// Microsoft identity platform settings for `tenant`
    pub fn microsoft(client_id: impl Into<String>, tenant: &str) -> Self {
        Self {
            provider: ONEDRIVE.to_string(),
            client_id: client_id.into(),
            client_secret: None,
            auth_url: format!("{MICROSOFT_AUTHORITY}/{tenant}/oauth2/v2.0/authorize"),
            token_url: format!("{MICROSOFT_AUTHORITY}/{tenant}/oauth2/v2.0/token"),
            redirect_uri: REDIRECT_URI.to_string(),
            scopes: MICROSOFT_SCOPES.iter().map(|s| s.to_string()).collect(),
            extra_params: Vec::new(),
        }
    }

    /// Google OAuth settings for installed applications
    pub fn google(client_id: impl Into<String>) -> Self {
        Self {
            provider: GOOGLE_DRIVE.to_string(),
            client_id: client_id.into(),
            client_secret: None,
            auth_url: GOOGLE_AUTH_URL.to_string(),
            token_url: GOOGLE_TOKEN_URL.to_string(),
            redirect_uri: REDIRECT_URI.to_string(),
            scopes: GOOGLE_SCOPES.iter().map(|s| s.to_string()).collect(),
            extra_params: vec![
                ("access_type".to_string(), "offline".to_string()),
                ("prompt".to_string(), "consent".to_string()),
            ],
        }
    }

    /// Settings for the OneDrive source section of the config
    pub fn for_source(config: &SourceConfig) -> Self {
        let mut oauth = Self::microsoft(config.client_id.clone(), &config.tenant);
        oauth.client_secret = config.client_secret.clone();
        oauth
    }

    /// Settings for the Google Drive destination section of the config
    pub fn for_destination(config: &DestinationConfig) -> Self {
        let mut oauth = Self::google(config.client_id.clone());
        oauth.client_secret = config.client_secret.clone();
        oauth
    }

    pub fn with_client_secret(mut self, secret: impl Into<String>) -> Self {
        self.client_secret = Some(secret.into());
        self
    }

    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    pub fn with_redirect_uri(mut self, uri: impl Into<String>) -> Self {
        self.redirect_uri = uri.into();
        self
    }

    /// Overrides the token endpoint (useful for testing)
    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }
}
