//! Resumable streaming uploads
//!
//! The protocol has two requests. A `POST` to the upload endpoint with
//! `uploadType=resumable` carries the metadata and announces the content
//! type and length; Drive answers with the session URL in `Location`. A
//! single `PUT` to that URL then streams the body.
//!
//! The payload length is discovered by seeking the reader to its end and
//! back, so any `AsyncRead + AsyncSeek` works. For network sources that
//! cannot seek, wrap them in [`SizedStream`](cloudmirror_core::stream::SizedStream),
//! which answers exactly this probe.

use std::io::SeekFrom;

use reqwest::header::{HeaderValue, CONTENT_LENGTH, CONTENT_TYPE, LOCATION};
use reqwest::{Body, Method};
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncSeek, AsyncSeekExt};
use tokio_util::io::ReaderStream;
use tracing::{debug, info, warn};

use cloudmirror_core::domain::DEFAULT_CONTENT_TYPE;
use cloudmirror_core::ports::UploadRequest;

use crate::client::DriveClient;
use crate::files::CreatedFile;
use crate::{check_status, DriveError};

const UPLOAD_CONTENT_TYPE: &str = "X-Upload-Content-Type";
const UPLOAD_CONTENT_LENGTH: &str = "X-Upload-Content-Length";

#[derive(Debug, Serialize)]
struct FileMetadata<'a> {
    name: &'a str,
    parents: [&'a str; 1],
}

/// Discovers the payload length with the `End(0)` / `Start(0)` probe
pub async fn probe_length<S>(content: &mut S) -> Result<u64, DriveError>
where
    S: AsyncSeek + Unpin,
{
    let size = content
        .seek(SeekFrom::End(0))
        .await
        .map_err(DriveError::StreamProbe)?;
    content
        .seek(SeekFrom::Start(0))
        .await
        .map_err(DriveError::StreamProbe)?;
    Ok(size)
}

/// Opens a resumable session and returns its URL
pub async fn start_session(
    client: &DriveClient,
    request: &UploadRequest,
    content_type: &str,
    size: u64,
) -> Result<url::Url, DriveError> {
    let metadata = FileMetadata {
        name: &request.name,
        parents: [&request.parent_id],
    };
    let response = client
        .upload_request(Method::POST, "/files")
        .query(&[("uploadType", "resumable"), ("fields", "id")])
        .header(UPLOAD_CONTENT_TYPE, content_type)
        .header(UPLOAD_CONTENT_LENGTH, size)
        .json(&metadata)
        .send()
        .await?;
    let response = check_status(response).await?;

    let location = response
        .headers()
        .get(LOCATION)
        .ok_or_else(|| DriveError::UploadSession("missing Location header".to_string()))?
        .to_str()
        .map_err(|e| DriveError::UploadSession(e.to_string()))?;

    url::Url::parse(location).map_err(|e| DriveError::UploadSession(format!("{location}: {e}")))
}

/// Uploads `content` as a new file and returns the created file id
///
/// The body is read forward once, chunk by chunk, while it is sent.
pub async fn upload_resumable<S>(
    client: &DriveClient,
    request: &UploadRequest,
    mut content: S,
) -> Result<String, DriveError>
where
    S: AsyncRead + AsyncSeek + Unpin + Send + 'static,
{
    let size = probe_length(&mut content).await?;
    if size != request.size {
        warn!(
            name = %request.name,
            declared = request.size,
            probed = size,
            "Upload length differs from declared size"
        );
    }

    let content_type = if request.content_type.is_empty() {
        DEFAULT_CONTENT_TYPE
    } else {
        request.content_type.as_str()
    };
    let content_type_header = HeaderValue::from_str(content_type)
        .unwrap_or(HeaderValue::from_static(DEFAULT_CONTENT_TYPE));

    let session = start_session(client, request, content_type, size).await?;
    debug!(name = %request.name, size, "Opened upload session");

    let response = client
        .request_url(Method::PUT, session.as_str())
        .header(CONTENT_TYPE, content_type_header)
        .header(CONTENT_LENGTH, size)
        .body(Body::wrap_stream(ReaderStream::new(content)))
        .send()
        .await?;
    let created: CreatedFile = check_status(response)
        .await?
        .json()
        .await
        .map_err(|e| DriveError::ParseError(e.to_string()))?;

    info!(
        name = %request.name,
        parent_id = %request.parent_id,
        file_id = %created.id,
        size,
        "Uploaded file"
    );
    Ok(created.id)
}
