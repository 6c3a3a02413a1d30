//! Google Drive implementation of the destination ports

use std::sync::Arc;

use anyhow::{Context, Result};

use cloudmirror_core::domain::{DestinationEntry, ListPage};
use cloudmirror_core::ports::{
    ByteStream, Credential, DestinationConnector, DestinationStore, UploadRequest,
};
use cloudmirror_core::stream::SizedStream;

use crate::client::DriveClient;
use crate::{files, upload};

/// Destination store backed by one [`DriveClient`]
#[derive(Debug, Clone)]
pub struct DriveStore {
    client: DriveClient,
}

impl DriveStore {
    pub fn new(client: DriveClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &DriveClient {
        &self.client
    }
}

#[async_trait::async_trait]
impl DestinationStore for DriveStore {
    async fn find_folder(&self, name: &str, parent_id: &str) -> Result<Option<String>> {
        files::find_folder(&self.client, name, parent_id)
            .await
            .with_context(|| format!("Failed to look up folder '{name}' in {parent_id}"))
    }

    async fn create_folder(&self, name: &str, parent_id: &str) -> Result<String> {
        files::create_folder(&self.client, name, parent_id)
            .await
            .with_context(|| format!("Failed to create folder '{name}' in {parent_id}"))
    }

    async fn find_file(&self, name: &str, parent_id: &str) -> Result<Option<String>> {
        files::find_file(&self.client, name, parent_id)
            .await
            .with_context(|| format!("Failed to look up file '{name}' in {parent_id}"))
    }

    async fn list_children_page(
        &self,
        parent_id: &str,
        page_token: Option<&str>,
    ) -> Result<ListPage<DestinationEntry>> {
        files::list_children_page(&self.client, parent_id, page_token)
            .await
            .with_context(|| format!("Failed to list Google Drive folder {parent_id}"))
    }

    async fn create_file_streaming(
        &self,
        request: UploadRequest,
        content: SizedStream<ByteStream>,
    ) -> Result<String> {
        upload::upload_resumable(&self.client, &request, content)
            .await
            .with_context(|| {
                format!(
                    "Failed to upload '{}' into {}",
                    request.name, request.parent_id
                )
            })
    }
}

/// Hands out a fresh [`DriveStore`] per caller, all sharing one credential
#[derive(Debug, Clone)]
pub struct DriveConnector {
    credential: Arc<Credential>,
    api_base: String,
    upload_base: String,
}

impl DriveConnector {
    pub fn new(
        credential: Arc<Credential>,
        api_base: impl Into<String>,
        upload_base: impl Into<String>,
    ) -> Self {
        Self {
            credential,
            api_base: api_base.into(),
            upload_base: upload_base.into(),
        }
    }
}

impl DestinationConnector for DriveConnector {
    fn connect(&self) -> Result<Box<dyn DestinationStore>> {
        let client = DriveClient::from_credential(
            &self.credential,
            self.api_base.as_str(),
            self.upload_base.as_str(),
        );
        Ok(Box::new(DriveStore::new(client)))
    }
}
