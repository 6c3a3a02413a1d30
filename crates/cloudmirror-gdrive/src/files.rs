//! Metadata operations on the Drive `/files` collection

use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use cloudmirror_core::domain::{DestinationEntry, EntryKind, ListPage};

use crate::client::DriveClient;
use crate::{check_status, query, DriveError, FOLDER_MIME_TYPE};

/// Largest page size Drive accepts for `files.list`
pub const MAX_PAGE_SIZE: u32 = 1000;

const LOOKUP_FIELDS: &str = "files(id,name)";
const LIST_FIELDS: &str = "nextPageToken,files(id,name,mimeType)";

// ============================================================================
// Drive API types
// ============================================================================

/// A file resource, limited to the fields requested
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub mime_type: Option<String>,
}

impl DriveFile {
    pub fn is_folder(&self) -> bool {
        self.mime_type.as_deref() == Some(FOLDER_MIME_TYPE)
    }
}

impl From<DriveFile> for DestinationEntry {
    fn from(file: DriveFile) -> Self {
        let kind = if file.is_folder() {
            EntryKind::Folder
        } else {
            EntryKind::File
        };
        DestinationEntry::new(file.name, file.id, kind)
    }
}

/// Response of `files.list`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileList {
    #[serde(default)]
    pub files: Vec<DriveFile>,
    pub next_page_token: Option<String>,
}

/// Body of a folder creation request
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NewFolder<'a> {
    name: &'a str,
    mime_type: &'a str,
    parents: [&'a str; 1],
}

/// Response of any call made with `fields=id`
#[derive(Debug, Deserialize)]
pub(crate) struct CreatedFile {
    pub id: String,
}

// ============================================================================
// Operations
// ============================================================================

async fn first_match(client: &DriveClient, q: &str) -> Result<Option<String>, DriveError> {
    let response = client
        .request(Method::GET, "/files")
        .query(&[("q", q), ("spaces", "drive"), ("fields", LOOKUP_FIELDS)])
        .send()
        .await?;
    let list: FileList = check_status(response)
        .await?
        .json()
        .await
        .map_err(|e| DriveError::ParseError(e.to_string()))?;

    Ok(list.files.into_iter().next().map(|f| f.id))
}

/// Id of the first non-trashed folder named `name` under `parent_id`
pub async fn find_folder(
    client: &DriveClient,
    name: &str,
    parent_id: &str,
) -> Result<Option<String>, DriveError> {
    first_match(client, &query::folder_query(name, parent_id)).await
}

/// Id of the first non-trashed, non-folder file named `name` under `parent_id`
pub async fn find_file(
    client: &DriveClient,
    name: &str,
    parent_id: &str,
) -> Result<Option<String>, DriveError> {
    first_match(client, &query::file_query(name, parent_id)).await
}

/// Creates a folder and returns its id
pub async fn create_folder(
    client: &DriveClient,
    name: &str,
    parent_id: &str,
) -> Result<String, DriveError> {
    let body = NewFolder {
        name,
        mime_type: FOLDER_MIME_TYPE,
        parents: [parent_id],
    };
    let response = client
        .request(Method::POST, "/files")
        .query(&[("fields", "id")])
        .json(&body)
        .send()
        .await?;
    let created: CreatedFile = check_status(response)
        .await?
        .json()
        .await
        .map_err(|e| DriveError::ParseError(e.to_string()))?;

    info!(name, parent_id, folder_id = %created.id, "Created folder");
    Ok(created.id)
}

/// Fetches one page of the direct children of `parent_id`
pub async fn list_children_page(
    client: &DriveClient,
    parent_id: &str,
    page_token: Option<&str>,
) -> Result<ListPage<DestinationEntry>, DriveError> {
    let q = query::children_query(parent_id);
    let page_size = MAX_PAGE_SIZE.to_string();
    let mut params = vec![
        ("q", q.as_str()),
        ("spaces", "drive"),
        ("fields", LIST_FIELDS),
        ("pageSize", page_size.as_str()),
    ];
    if let Some(token) = page_token {
        params.push(("pageToken", token));
    }

    let response = client
        .request(Method::GET, "/files")
        .query(&params)
        .send()
        .await?;
    let list: FileList = check_status(response)
        .await?
        .json()
        .await
        .map_err(|e| DriveError::ParseError(e.to_string()))?;

    let items: Vec<DestinationEntry> = list.files.into_iter().map(Into::into).collect();
    debug!(
        parent_id,
        count = items.len(),
        has_more = list.next_page_token.is_some(),
        "Listed destination page"
    );

    Ok(ListPage {
        items,
        next_cursor: list.next_page_token,
    })
}
