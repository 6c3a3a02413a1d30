//! Interactive browser login
//!
//! 1. Generate a PKCE authorization URL
//! 2. Open the user's browser on it
//! 3. Wait for the redirect on the local callback server
//! 4. Exchange the code and write the token file

use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, warn};

use cloudmirror_core::ports::Tokens;

use crate::callback::LocalCallbackServer;
use crate::pkce::PKCEFlow;
use crate::provider::OAuth2Config;
use crate::token_store::TokenFile;

/// How long to wait for the user to finish in the browser
const LOGIN_TIMEOUT: Duration = Duration::from_secs(300);

/// Runs the full login flow for one provider
pub struct InteractiveLogin {
    config: OAuth2Config,
}

impl InteractiveLogin {
    pub fn new(config: OAuth2Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &OAuth2Config {
        &self.config
    }

    /// Performs the login and persists the tokens to `store`
    pub async fn login(&self, store: &TokenFile) -> Result<Tokens> {
        info!(provider = %self.config.provider, "Starting OAuth2 PKCE login flow");

        let flow = PKCEFlow::new(&self.config)?;
        let request = flow.generate_auth_url();

        // Bind before opening the browser so the redirect cannot race us.
        let server = LocalCallbackServer::bind(&self.config.redirect_uri).await?;

        if let Err(e) = webbrowser::open(&request.url) {
            warn!(error = %e, "Failed to open browser");
        }
        eprintln!(
            "Open this URL to sign in to {}:\n\n  {}\n",
            self.config.provider, request.url
        );

        let code = tokio::time::timeout(
            LOGIN_TIMEOUT,
            server.wait_for_code(request.csrf_token.secret()),
        )
        .await
        .context("Timed out waiting for the browser login")??;

        let tokens = flow.exchange_code(code, request.pkce_verifier).await?;
        store
            .save(&tokens)
            .with_context(|| format!("Failed to save tokens to {}", store.path().display()))?;

        if tokens.refresh_token.is_none() {
            warn!(provider = %self.config.provider, "No refresh token issued; login will be needed again when the token expires");
        }
        info!(provider = %self.config.provider, "OAuth2 PKCE login completed successfully");
        Ok(tokens)
    }
}
