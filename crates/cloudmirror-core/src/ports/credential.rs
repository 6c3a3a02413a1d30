//! Credential port
//!
//! The engine never acquires or refreshes credentials itself. The driver asks a
//! [`CredentialProvider`] once per provider before the walk starts and hands the
//! resulting [`Credential`] to the adapters, which share it read-only.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::FatalAuthError;

/// OAuth tokens as persisted by the credential manager
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tokens {
    /// Bearer token for authenticating API requests
    pub access_token: String,
    /// Token for obtaining new access tokens without user interaction
    pub refresh_token: Option<String>,
    /// When the access token expires
    pub expires_at: DateTime<Utc>,
}

impl Tokens {
    /// Returns true if the access token has expired
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    /// Returns true if the access token will expire within the given duration
    pub fn expires_within(&self, duration: chrono::Duration) -> bool {
        Utc::now() + duration >= self.expires_at
    }
}

/// Opaque bearer credential, shared read-only by every task of a run
#[derive(Clone)]
pub struct Credential {
    access_token: String,
}

impl Credential {
    pub fn bearer(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
        }
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }
}

impl From<&Tokens> for Credential {
    fn from(tokens: &Tokens) -> Self {
        Self::bearer(tokens.access_token.clone())
    }
}

// Never print the token itself.
impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"<redacted>")
            .finish()
    }
}

/// Produces a valid bearer credential on demand
#[async_trait::async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Provider name used in log lines and errors (e.g. "onedrive")
    fn provider(&self) -> &str;

    /// Returns a credential that is valid right now
    async fn credential(&self) -> Result<Credential, FatalAuthError>;
}
