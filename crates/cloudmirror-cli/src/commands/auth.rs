//! Auth commands - login, status and logout for both providers
//!
//! Tokens are kept in one JSON file per provider, at the paths configured
//! in `source.token_file` and `destination.token_file`.

use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::Subcommand;
use tracing::info;

use cloudmirror_auth::InteractiveLogin;
use cloudmirror_core::ports::Tokens;

use super::{load_config, Side};
use crate::output::{get_formatter, OutputFormat, OutputFormatter};

#[derive(Debug, Subcommand)]
pub enum AuthCommand {
    /// Sign in through the browser and store the tokens
    Login {
        #[arg(value_enum)]
        side: Side,
    },
    /// Show which providers have stored credentials
    Status,
    /// Remove stored credentials
    Logout {
        #[arg(value_enum)]
        side: Side,
    },
}

impl AuthCommand {
    pub async fn execute(&self, config_path: &Path, format: OutputFormat) -> Result<()> {
        let fmt = get_formatter(format);
        match self {
            AuthCommand::Login { side } => execute_login(*side, config_path, &*fmt, format).await,
            AuthCommand::Status => execute_status(config_path, &*fmt, format),
            AuthCommand::Logout { side } => execute_logout(*side, config_path, &*fmt, format),
        }
    }
}

async fn execute_login(
    side: Side,
    config_path: &Path,
    fmt: &dyn OutputFormatter,
    format: OutputFormat,
) -> Result<()> {
    let config = load_config(config_path)?;
    let oauth = side.oauth_config(&config);
    if oauth.client_id.trim().is_empty() {
        bail!(
            "No client_id configured for {}. Set it in {}",
            oauth.provider,
            config_path.display()
        );
    }

    let store = side.token_file(&config);
    info!(provider = %oauth.provider, token_file = %store.path().display(), "Starting login");

    fmt.info(&format!("Opening browser for {} login...", oauth.provider));
    let provider = oauth.provider.clone();
    let tokens = InteractiveLogin::new(oauth)
        .login(&store)
        .await
        .context("OAuth2 login failed")?;

    if format == OutputFormat::Json {
        fmt.print_json(&serde_json::json!({
            "success": true,
            "provider": provider,
            "token_file": store.path().display().to_string(),
            "expires_at": tokens.expires_at.to_rfc3339(),
        }));
    } else {
        fmt.success(&format!("Logged in to {provider}"));
        fmt.field("Token file", &store.path().display().to_string());
        fmt.field("Expires at", &tokens.expires_at.to_rfc3339());
    }
    Ok(())
}

/// One-word state of a stored token
fn token_state(tokens: Option<&Tokens>) -> &'static str {
    match tokens {
        None => "not_logged_in",
        Some(t) if !t.is_expired() => "valid",
        Some(t) if t.refresh_token.is_some() => "refreshable",
        Some(_) => "expired",
    }
}

fn execute_status(config_path: &Path, fmt: &dyn OutputFormatter, format: OutputFormat) -> Result<()> {
    let config = load_config(config_path)?;
    let mut report = Vec::new();

    for side in [Side::Source, Side::Destination] {
        let provider = side.oauth_config(&config).provider;
        let store = side.token_file(&config);
        let tokens = store
            .load()
            .with_context(|| format!("Failed to read {}", store.path().display()))?;
        let state = token_state(tokens.as_ref());

        if format == OutputFormat::Human {
            match (&tokens, state) {
                (None, _) => fmt.warn(&format!("{provider}: not logged in")),
                (Some(t), "valid") => fmt.success(&format!(
                    "{provider}: logged in, token valid for {} more minutes",
                    (t.expires_at - Utc::now()).num_minutes()
                )),
                (Some(_), "refreshable") => {
                    fmt.success(&format!("{provider}: logged in, token will be refreshed on next use"))
                }
                (Some(_), _) => fmt.warn(&format!(
                    "{provider}: token expired; run 'cloudmirror auth login {}'",
                    if side == Side::Source { "source" } else { "destination" }
                )),
            }
            fmt.field("Token file", &store.path().display().to_string());
        }

        report.push(serde_json::json!({
            "provider": provider,
            "state": state,
            "token_file": store.path().display().to_string(),
            "expires_at": tokens.as_ref().map(|t| t.expires_at.to_rfc3339()),
        }));
    }

    fmt.print_json(&serde_json::json!({ "providers": report }));
    Ok(())
}

fn execute_logout(
    side: Side,
    config_path: &Path,
    fmt: &dyn OutputFormatter,
    format: OutputFormat,
) -> Result<()> {
    let config = load_config(config_path)?;
    let provider = side.oauth_config(&config).provider;
    let store = side.token_file(&config);

    store
        .clear()
        .with_context(|| format!("Failed to remove {}", store.path().display()))?;

    if format == OutputFormat::Json {
        fmt.print_json(&serde_json::json!({ "success": true, "provider": provider }));
    } else {
        fmt.success(&format!("Logged out of {provider}"));
    }
    Ok(())
}
