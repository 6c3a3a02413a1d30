//! Streaming file downloads
//!
//! `GET /me/drive/items/{id}/content` answers with a redirect to a
//! pre-authenticated download URL, which reqwest follows. The body is
//! exposed as an [`AsyncRead`](tokio::io::AsyncRead) and read chunk by
//! chunk, so no file is ever held in memory as a whole. Only connection
//! setup is time-bounded; a large body may take as long as it needs.

use futures_util::TryStreamExt;
use reqwest::Method;
use tokio_util::io::StreamReader;
use tracing::debug;

use cloudmirror_core::ports::ByteStream;

use crate::client::GraphClient;
use crate::{check_status, GraphError};

/// Relative path of an item's content
pub fn content_path(file_id: &str) -> String {
    format!("/me/drive/items/{file_id}/content")
}

/// Opens the content of `file_id` as a forward-only byte stream
pub async fn open_content(client: &GraphClient, file_id: &str) -> Result<ByteStream, GraphError> {
    let response = client
        .request(Method::GET, &content_path(file_id))
        .send()
        .await?;
    let response = check_status(response).await?;

    debug!(
        file_id,
        content_length = ?response.content_length(),
        "Opened content stream"
    );

    let body = response.bytes_stream().map_err(std::io::Error::other);
    Ok(Box::pin(StreamReader::new(body)))
}
