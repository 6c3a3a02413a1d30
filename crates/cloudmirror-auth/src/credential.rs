//! Token-file backed credential provider

use async_trait::async_trait;
use chrono::Duration;
use tracing::{info, instrument, warn};

use cloudmirror_core::domain::FatalAuthError;
use cloudmirror_core::ports::{Credential, CredentialProvider, Tokens};

use crate::pkce::PKCEFlow;
use crate::provider::OAuth2Config;
use crate::token_store::TokenFile;

/// Tokens expiring sooner than this are refreshed before use
pub const REFRESH_MARGIN_MINUTES: i64 = 5;

/// Serves credentials from a token file, refreshing them when close to expiry
pub struct FileCredentialProvider {
    oauth: OAuth2Config,
    store: TokenFile,
}

impl FileCredentialProvider {
    pub fn new(oauth: OAuth2Config, store: TokenFile) -> Self {
        Self { oauth, store }
    }

    pub fn store(&self) -> &TokenFile {
        &self.store
    }

    fn store_error(&self, source: impl Into<anyhow::Error>) -> FatalAuthError {
        FatalAuthError::TokenStore {
            provider: self.oauth.provider.clone(),
            source: source.into(),
        }
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Tokens, FatalAuthError> {
        let refresh_err = |source: anyhow::Error| FatalAuthError::Refresh {
            provider: self.oauth.provider.clone(),
            source,
        };
        let flow = PKCEFlow::new(&self.oauth).map_err(refresh_err)?;
        let tokens = flow
            .refresh_token(refresh_token)
            .await
            .map_err(refresh_err)?;

        self.store.save(&tokens).map_err(|e| self.store_error(e))?;
        info!(provider = %self.oauth.provider, expires_at = %tokens.expires_at, "Refreshed access token");
        Ok(tokens)
    }
}

#[async_trait]
impl CredentialProvider for FileCredentialProvider {
    fn provider(&self) -> &str {
        &self.oauth.provider
    }

    #[instrument(skip(self), fields(provider = %self.oauth.provider))]
    async fn credential(&self) -> Result<Credential, FatalAuthError> {
        let tokens = self
            .store
            .load()
            .map_err(|e| self.store_error(e))?
            .ok_or_else(|| FatalAuthError::NotLoggedIn {
                provider: self.oauth.provider.clone(),
                path: self.store.path().to_path_buf(),
            })?;

        if !tokens.expires_within(Duration::minutes(REFRESH_MARGIN_MINUTES)) {
            return Ok(Credential::from(&tokens));
        }

        match tokens.refresh_token.as_deref() {
            Some(refresh_token) => {
                let refreshed = self.refresh(refresh_token).await?;
                Ok(Credential::from(&refreshed))
            }
            None if tokens.is_expired() => Err(FatalAuthError::Expired {
                provider: self.oauth.provider.clone(),
            }),
            None => {
                warn!(expires_at = %tokens.expires_at, "Access token is about to expire and cannot be refreshed");
                Ok(Credential::from(&tokens))
            }
        }
    }
}
