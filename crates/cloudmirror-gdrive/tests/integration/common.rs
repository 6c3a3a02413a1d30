//! Shared test helpers for Drive API integration tests

use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use cloudmirror_gdrive::{DriveClient, DriveStore, FOLDER_MIME_TYPE};

/// Access token every mocked endpoint expects
pub const TEST_TOKEN: &str = "drive-test-token";

/// Starts a mock server serving both the metadata and upload endpoints
///
/// Metadata lives at the server root and uploads under `/upload`.
pub async fn setup_drive_mock() -> (MockServer, DriveStore) {
    let server = MockServer::start().await;
    let client = DriveClient::with_base_urls(
        TEST_TOKEN,
        server.uri(),
        format!("{}/upload", server.uri()),
    );
    (server, DriveStore::new(client))
}

/// Mounts a `files.list` answer for the exact query `q`
pub async fn mount_files_query(server: &MockServer, q: &str, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/files"))
        .and(query_param("q", q))
        .and(header("authorization", format!("Bearer {TEST_TOKEN}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

pub fn folder(id: &str, name: &str) -> serde_json::Value {
    serde_json::json!({ "id": id, "name": name, "mimeType": FOLDER_MIME_TYPE })
}

pub fn file(id: &str, name: &str) -> serde_json::Value {
    serde_json::json!({ "id": id, "name": name, "mimeType": "text/plain" })
}
