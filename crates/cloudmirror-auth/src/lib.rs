//! cloudmirror auth - OAuth2 credentials for both providers
//!
//! ## Components
//!
//! - [`OAuth2Config`] - endpoint, scope and client settings per provider
//! - [`PKCEFlow`] - authorization URL, code exchange and refresh
//! - [`LocalCallbackServer`] - one-shot HTTP server for the OAuth redirect
//! - [`TokenFile`] - owner-only JSON token files
//! - [`FileCredentialProvider`] - the credential port, refreshing near expiry
//! - [`InteractiveLogin`] - browser login orchestration

pub mod callback;
pub mod credential;
pub mod login;
pub mod pkce;
pub mod provider;
pub mod token_store;

pub use callback::{CallbackParams, LocalCallbackServer};
pub use credential::FileCredentialProvider;
pub use login::InteractiveLogin;
pub use pkce::PKCEFlow;
pub use provider::OAuth2Config;
pub use token_store::{TokenFile, TokenStoreError};
