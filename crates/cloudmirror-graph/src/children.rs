//! Folder listings over the Graph children endpoint
//!
//! `GET /me/drive/items/{id}/children` returns up to 1000 items per page
//! and an absolute `@odata.nextLink` URL while more pages remain. The link
//! is passed back verbatim as the page cursor.
//!
//! An item carrying a `folder` facet is a folder; everything else,
//! including OneNote packages and other facet-less items, is treated as a
//! file.

use std::time::Duration;

use reqwest::Method;
use serde::Deserialize;
use tracing::debug;

use cloudmirror_core::domain::{ListPage, RemoteEntry, DEFAULT_CONTENT_TYPE};

use crate::client::GraphClient;
use crate::{check_status, GraphError};

/// Largest page size the children endpoint accepts
pub const PAGE_SIZE: u32 = 1000;

/// Bound on one listing request, connection through body
pub const LIST_TIMEOUT: Duration = Duration::from_secs(60);

// ============================================================================
// Microsoft Graph API response types (JSON deserialization)
// ============================================================================

/// One page of `GET /me/drive/items/{id}/children`
#[derive(Debug, Deserialize)]
struct GraphChildrenResponse {
    #[serde(default)]
    value: Vec<GraphDriveItem>,

    /// URL for the next page of results (present when more pages exist)
    #[serde(rename = "@odata.nextLink")]
    next_link: Option<String>,
}

/// The DriveItem fields the mirror needs
#[derive(Debug, Deserialize)]
struct GraphDriveItem {
    id: String,
    #[serde(default)]
    name: String,
    size: Option<u64>,
    file: Option<GraphFileFacet>,
    folder: Option<GraphFolderFacet>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphFileFacet {
    mime_type: Option<String>,
}

/// Presence alone marks a folder
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphFolderFacet {
    #[allow(dead_code)]
    child_count: Option<u64>,
}

impl From<GraphDriveItem> for RemoteEntry {
    fn from(item: GraphDriveItem) -> Self {
        if item.folder.is_some() {
            return RemoteEntry::folder(item.name, item.id);
        }

        let content_type = item
            .file
            .and_then(|f| f.mime_type)
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());

        RemoteEntry::file(item.name, item.id, item.size.unwrap_or(0), content_type)
    }
}

/// Relative path of the first children page of `folder_id`
pub fn children_path(folder_id: &str) -> String {
    format!("/me/drive/items/{folder_id}/children?$top={PAGE_SIZE}")
}

/// Fetches one page of children
///
/// # Arguments
///
/// * `client` - A reference to the authenticated [`GraphClient`]
/// * `folder_id` - Item id of the folder, or `root`
/// * `cursor` - `None` for the first page, otherwise the previous page's
///   `@odata.nextLink`
///
/// # Errors
///
/// Returns an error if the request fails, times out, the API returns a
/// non-success status, or the body is not a children collection.
pub async fn list_children_page(
    client: &GraphClient,
    folder_id: &str,
    cursor: Option<&str>,
) -> Result<ListPage<RemoteEntry>, GraphError> {
    let request = match cursor {
        Some(next_link) => client.request_url(Method::GET, next_link),
        None => client.request(Method::GET, &children_path(folder_id)),
    };

    let response = request.timeout(LIST_TIMEOUT).send().await?;
    let response = check_status(response).await?;
    let body = response.text().await?;
    let page: GraphChildrenResponse = serde_json::from_str(&body)
        .map_err(|e| GraphError::InvalidResponse(format!("children of {folder_id}: {e}")))?;

    let items: Vec<RemoteEntry> = page.value.into_iter().map(RemoteEntry::from).collect();
    debug!(
        folder_id,
        items = items.len(),
        has_next = page.next_link.is_some(),
        "Received children page"
    );

    Ok(ListPage {
        items,
        next_cursor: page.next_link,
    })
}
