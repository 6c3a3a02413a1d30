//! Credential provider against a mocked OAuth2 token endpoint

use chrono::{Duration, Utc};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use cloudmirror_auth::{FileCredentialProvider, OAuth2Config, TokenFile};
use cloudmirror_core::domain::FatalAuthError;
use cloudmirror_core::ports::{CredentialProvider, Tokens};

fn provider_for(server_uri: &str, store: TokenFile) -> FileCredentialProvider {
    let oauth = OAuth2Config::google("client-1").with_token_url(format!("{server_uri}/token"));
    FileCredentialProvider::new(oauth, store)
}

fn tokens(expires_in: Duration, refresh: Option<&str>) -> Tokens {
    Tokens {
        access_token: "stored-access".to_string(),
        refresh_token: refresh.map(str::to_string),
        expires_at: Utc::now() + expires_in,
    }
}

#[tokio::test]
async fn test_missing_token_file_is_not_logged_in() {
    let dir = tempfile::tempdir().unwrap();
    let store = TokenFile::new(dir.path().join("token.json"));
    let provider = provider_for("http://127.0.0.1:9", store);

    let err = provider.credential().await.unwrap_err();
    assert!(matches!(err, FatalAuthError::NotLoggedIn { .. }));
}

#[tokio::test]
async fn test_valid_token_is_used_without_refresh() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let store = TokenFile::new(dir.path().join("token.json"));
    store.save(&tokens(Duration::hours(1), Some("r-1"))).unwrap();

    let provider = provider_for(&server.uri(), store);
    let credential = provider.credential().await.unwrap();
    assert_eq!(credential.access_token(), "stored-access");
}

#[tokio::test]
async fn test_token_near_expiry_is_refreshed_and_saved() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=r-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "fresh-access",
            "token_type": "Bearer",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let store = TokenFile::new(dir.path().join("token.json"));
    store.save(&tokens(Duration::minutes(2), Some("r-1"))).unwrap();

    let provider = provider_for(&server.uri(), store.clone());
    let credential = provider.credential().await.unwrap();
    assert_eq!(credential.access_token(), "fresh-access");

    let saved = store.load().unwrap().unwrap();
    assert_eq!(saved.access_token, "fresh-access");
    // Google does not rotate refresh tokens
    assert_eq!(saved.refresh_token.as_deref(), Some("r-1"));
    assert!(!saved.expires_within(Duration::minutes(30)));
}

#[tokio::test]
async fn test_rejected_refresh_is_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error": "invalid_grant",
            "error_description": "Token has been expired or revoked."
        })))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let store = TokenFile::new(dir.path().join("token.json"));
    store.save(&tokens(-Duration::minutes(1), Some("revoked"))).unwrap();

    let provider = provider_for(&server.uri(), store);
    let err = provider.credential().await.unwrap_err();
    assert!(matches!(err, FatalAuthError::Refresh { .. }));
}

#[tokio::test]
async fn test_expired_without_refresh_token_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let store = TokenFile::new(dir.path().join("token.json"));
    store.save(&tokens(-Duration::minutes(1), None)).unwrap();

    let provider = provider_for("http://127.0.0.1:9", store);
    let err = provider.credential().await.unwrap_err();
    assert!(matches!(err, FatalAuthError::Expired { .. }));
}

#[tokio::test]
async fn test_corrupt_token_file_is_token_store_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("token.json");
    std::fs::write(&path, "{").unwrap();

    let provider = provider_for("http://127.0.0.1:9", TokenFile::new(path));
    let err = provider.credential().await.unwrap_err();
    assert!(matches!(err, FatalAuthError::TokenStore { .. }));
    assert_eq!(provider.provider(), "google-drive");
}
