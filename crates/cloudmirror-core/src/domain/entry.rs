//! Listing entries and pagination
//!
//! [`RemoteEntry`] is what the source lister reports for each child of a
//! source folder. [`DestinationEntry`] is the slimmer shape the destination
//! reports when its folders are snapshotted. Both sides page their results
//! through [`ListPage`].

use serde::{Deserialize, Serialize};

/// Well-known alias both providers accept for the root folder of a drive
pub const ROOT_ALIAS: &str = "root";

/// Content type used when the source does not report one
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Whether an entry is a folder or a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Folder,
    File,
}

impl std::fmt::Display for EntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntryKind::Folder => write!(f, "folder"),
            EntryKind::File => write!(f, "file"),
        }
    }
}

/// A child of a source folder, as reported by the source lister
///
/// `size` and `content_type` are only meaningful for files; folders carry
/// `0` and an empty string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteEntry {
    /// Name of the item inside its parent folder
    pub name: String,
    /// Provider-specific opaque identifier
    pub id: String,
    /// Folder or file
    pub kind: EntryKind,
    /// File size in bytes
    pub size: u64,
    /// MIME type of the file content
    pub content_type: String,
}

impl RemoteEntry {
    /// Creates a folder entry
    pub fn folder(name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
            kind: EntryKind::Folder,
            size: 0,
            content_type: String::new(),
        }
    }

    /// Creates a file entry
    pub fn file(
        name: impl Into<String>,
        id: impl Into<String>,
        size: u64,
        content_type: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
            kind: EntryKind::File,
            size,
            content_type: content_type.into(),
        }
    }

    pub fn is_folder(&self) -> bool {
        self.kind == EntryKind::Folder
    }
}

/// A child of a destination folder, as reported by the destination store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestinationEntry {
    pub name: String,
    pub id: String,
    pub kind: EntryKind,
}

impl DestinationEntry {
    pub fn new(name: impl Into<String>, id: impl Into<String>, kind: EntryKind) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
            kind,
        }
    }
}

/// One page of a cursor-paginated listing
///
/// `next_cursor` is `None` on the last page. The cursor is opaque to callers:
/// for OneDrive it is an absolute `@odata.nextLink` URL, for Google Drive a
/// `nextPageToken`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListPage<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<String>,
}

impl<T> ListPage<T> {
    /// A final page holding `items`
    pub fn last(items: Vec<T>) -> Self {
        Self {
            items,
            next_cursor: None,
        }
    }

    /// A page followed by more results at `cursor`
    pub fn with_next(items: Vec<T>, cursor: impl Into<String>) -> Self {
        Self {
            items,
            next_cursor: Some(cursor.into()),
        }
    }

    pub fn is_last(&self) -> bool {
        self.next_cursor.is_none()
    }
}
