//! OneDrive implementation of the source lister port

use anyhow::{Context, Result};

use cloudmirror_core::domain::{ListPage, RemoteEntry};
use cloudmirror_core::ports::{ByteStream, Credential, SourceLister};

use crate::client::GraphClient;
use crate::{children, content};

/// Reads the source tree from OneDrive
#[derive(Debug, Clone)]
pub struct GraphSourceLister {
    client: GraphClient,
}

impl GraphSourceLister {
    pub fn new(client: GraphClient) -> Self {
        Self { client }
    }

    /// Lister authenticated with `credential` against `base_url`
    pub fn from_credential(credential: &Credential, base_url: impl Into<String>) -> Self {
        Self::new(GraphClient::from_credential(credential, base_url))
    }

    pub fn client(&self) -> &GraphClient {
        &self.client
    }
}

#[async_trait::async_trait]
impl SourceLister for GraphSourceLister {
    async fn list_children_page(
        &self,
        folder_id: &str,
        cursor: Option<&str>,
    ) -> Result<ListPage<RemoteEntry>> {
        children::list_children_page(&self.client, folder_id, cursor)
            .await
            .with_context(|| format!("Failed to list OneDrive folder {folder_id}"))
    }

    async fn open_content(&self, file_id: &str) -> Result<ByteStream> {
        content::open_content(&self.client, file_id)
            .await
            .with_context(|| format!("Failed to open OneDrive item {file_id}"))
    }
}
