//! Destination store port
//!
//! The destination is queried and written through [`DestinationStore`].
//! Clients are not assumed to be safe for concurrent use, so every task
//! that talks to the destination gets its own store from a
//! [`DestinationConnector`].

use anyhow::Result;

use crate::domain::{DestinationEntry, ListPage};
use crate::ports::source::ByteStream;
use crate::stream::SizedStream;

/// Metadata of a file to create in the destination
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    /// Name to create the file under (already conflict-resolved)
    pub name: String,
    /// Destination parent folder id
    pub parent_id: String,
    /// MIME type of the content
    pub content_type: String,
    /// Declared size of the content in bytes
    pub size: u64,
}

/// Folder and file operations on the destination tree
#[async_trait::async_trait]
pub trait DestinationStore: Send + Sync {
    /// Finds a non-trashed folder named `name` directly under `parent_id`
    async fn find_folder(&self, name: &str, parent_id: &str) -> Result<Option<String>>;

    /// Creates a folder named `name` under `parent_id` and returns its id
    async fn create_folder(&self, name: &str, parent_id: &str) -> Result<String>;

    /// Finds a non-trashed, non-folder file named `name` directly under `parent_id`
    async fn find_file(&self, name: &str, parent_id: &str) -> Result<Option<String>>;

    /// Fetches one page of direct children of `parent_id`
    async fn list_children_page(
        &self,
        parent_id: &str,
        page_token: Option<&str>,
    ) -> Result<ListPage<DestinationEntry>>;

    /// Creates a file from a streamed body and returns its id
    async fn create_file_streaming(
        &self,
        request: UploadRequest,
        content: SizedStream<ByteStream>,
    ) -> Result<String>;
}

/// Builds destination store clients from the shared credential
pub trait DestinationConnector: Send + Sync {
    /// Returns a fresh client owned by the caller
    fn connect(&self) -> Result<Box<dyn DestinationStore>>;
}
