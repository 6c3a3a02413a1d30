//! Source lister port
//!
//! Enumerates the children of a source folder page by page and opens file
//! content as a forward-only byte stream.

use std::pin::Pin;

use anyhow::Result;
use tokio::io::AsyncRead;

use crate::domain::{ListPage, RemoteEntry};

/// Forward-only byte stream of a file's content
pub type ByteStream = Pin<Box<dyn AsyncRead + Send>>;

/// Paginated, read-only access to the source tree
#[async_trait::async_trait]
pub trait SourceLister: Send + Sync {
    /// Fetches one page of children of `folder_id`
    ///
    /// `cursor` is `None` for the first page and the previous page's
    /// `next_cursor` afterwards.
    async fn list_children_page(
        &self,
        folder_id: &str,
        cursor: Option<&str>,
    ) -> Result<ListPage<RemoteEntry>>;

    /// Fetches every child of `folder_id`, following cursors until exhausted
    async fn list_children(&self, folder_id: &str) -> Result<Vec<RemoteEntry>> {
        let mut entries = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let page = self
                .list_children_page(folder_id, cursor.as_deref())
                .await?;
            entries.extend(page.items);

            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        Ok(entries)
    }

    /// Opens the content of `file_id` for streaming
    ///
    /// Called by transfer workers at transfer time, never during the walk.
    async fn open_content(&self, file_id: &str) -> Result<ByteStream>;
}
