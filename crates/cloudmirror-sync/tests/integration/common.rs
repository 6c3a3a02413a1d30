//! Shared in-memory fakes for the engine tests

use std::collections::{HashMap, HashSet};
use std::io::SeekFrom;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use chrono::NaiveDate;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

use cloudmirror_core::domain::{DestinationEntry, EntryKind, ListPage, RemoteEntry};
use cloudmirror_core::ports::{
    ByteStream, DestinationConnector, DestinationStore, SourceLister, UploadRequest,
};
use cloudmirror_core::stream::SizedStream;
use cloudmirror_sync::ConflictResolver;

/// Timestamp every renamed file gets in these tests
pub const STAMP: &str = "20240305_140709";

pub fn fixed_resolver() -> ConflictResolver {
    ConflictResolver::with_clock(Arc::new(|| {
        NaiveDate::from_ymd_opt(2024, 3, 5)
            .unwrap()
            .and_hms_opt(14, 7, 9)
            .unwrap()
    }))
}

// ============================================================================
// Source
// ============================================================================

/// In-memory source tree
#[derive(Default)]
pub struct FakeSource {
    children: HashMap<String, Vec<RemoteEntry>>,
    contents: HashMap<String, Vec<u8>>,
    failing_folders: HashSet<String>,
    failing_opens: HashSet<String>,
    page_size: usize,
    pub list_calls: AtomicUsize,
    pub opens: AtomicUsize,
}

impl FakeSource {
    pub fn new() -> Self {
        Self {
            page_size: 1000,
            ..Self::default()
        }
    }

    pub fn folder(mut self, parent_id: &str, name: &str, id: &str) -> Self {
        self.children
            .entry(parent_id.to_string())
            .or_default()
            .push(RemoteEntry::folder(name, id));
        self
    }

    pub fn file(mut self, parent_id: &str, name: &str, id: &str, content: &[u8]) -> Self {
        self.children
            .entry(parent_id.to_string())
            .or_default()
            .push(RemoteEntry::file(
                name,
                id,
                content.len() as u64,
                "text/plain",
            ));
        self.contents.insert(id.to_string(), content.to_vec());
        self
    }

    /// Listing `folder_id` fails
    pub fn failing_folder(mut self, folder_id: &str) -> Self {
        self.failing_folders.insert(folder_id.to_string());
        self
    }

    /// Opening `file_id` fails
    pub fn failing_open(mut self, file_id: &str) -> Self {
        self.failing_opens.insert(file_id.to_string());
        self
    }
}

#[async_trait::async_trait]
impl SourceLister for FakeSource {
    async fn list_children_page(
        &self,
        folder_id: &str,
        cursor: Option<&str>,
    ) -> Result<ListPage<RemoteEntry>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_folders.contains(folder_id) {
            anyhow::bail!("HTTP 500 listing {folder_id}");
        }

        let all = self.children.get(folder_id).cloned().unwrap_or_default();
        let start: usize = cursor.map(str::parse).transpose()?.unwrap_or(0);
        let end = (start + self.page_size).min(all.len());
        let items = all[start..end].to_vec();
        if end < all.len() {
            Ok(ListPage::with_next(items, end.to_string()))
        } else {
            Ok(ListPage::last(items))
        }
    }

    async fn open_content(&self, file_id: &str) -> Result<ByteStream> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        if self.failing_opens.contains(file_id) {
            anyhow::bail!("HTTP 404 opening {file_id}");
        }
        let content = self.contents.get(file_id).cloned().unwrap_or_default();
        Ok(Box::pin(std::io::Cursor::new(content)))
    }
}

// ============================================================================
// Destination
// ============================================================================

#[derive(Debug, Clone)]
pub struct DriveNode {
    pub id: String,
    pub name: String,
    pub parent: String,
    pub kind: EntryKind,
    pub content: Vec<u8>,
    pub content_type: String,
}

#[derive(Default)]
struct DriveState {
    nodes: Vec<DriveNode>,
    next_id: u64,
    list_calls: HashMap<String, usize>,
    find_calls: usize,
    folder_creates: usize,
    connects: usize,
    failing_lists: HashSet<String>,
    failing_creates: HashSet<String>,
    failing_uploads: HashSet<String>,
    panicking_uploads: HashSet<String>,
    upload_delay: Option<Duration>,
    in_flight: usize,
    max_in_flight: usize,
    probed_sizes: Vec<u64>,
}

impl DriveState {
    fn insert(&mut self, parent: &str, name: &str, kind: EntryKind, content: Vec<u8>, ct: &str) -> String {
        self.next_id += 1;
        let id = format!("d-{}", self.next_id);
        self.nodes.push(DriveNode {
            id: id.clone(),
            name: name.to_string(),
            parent: parent.to_string(),
            kind,
            content,
            content_type: ct.to_string(),
        });
        id
    }

    fn find(&self, parent: &str, name: &str, kind: EntryKind) -> Option<String> {
        self.nodes
            .iter()
            .find(|n| n.parent == parent && n.name == name && n.kind == kind)
            .map(|n| n.id.clone())
    }
}

/// In-memory destination; clones share state and act as the connector
#[derive(Clone, Default)]
pub struct FakeDrive {
    state: Arc<Mutex<DriveState>>,
}

impl FakeDrive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_folder(&self, parent: &str, name: &str) -> String {
        self.state
            .lock()
            .unwrap()
            .insert(parent, name, EntryKind::Folder, Vec::new(), "")
    }

    pub fn seed_file(&self, parent: &str, name: &str, content: &[u8]) -> String {
        self.state
            .lock()
            .unwrap()
            .insert(parent, name, EntryKind::File, content.to_vec(), "text/plain")
    }

    pub fn fail_listing(&self, folder_id: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_lists
            .insert(folder_id.to_string());
    }

    pub fn fail_folder_create(&self, name: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_creates
            .insert(name.to_string());
    }

    pub fn fail_upload(&self, name: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_uploads
            .insert(name.to_string());
    }

    /// Uploads of `name` panic inside the store
    pub fn panic_on_upload(&self, name: &str) {
        self.state
            .lock()
            .unwrap()
            .panicking_uploads
            .insert(name.to_string());
    }

    pub fn set_upload_delay(&self, delay: Duration) {
        self.state.lock().unwrap().upload_delay = Some(delay);
    }

    pub fn children(&self, parent: &str) -> Vec<DriveNode> {
        self.state
            .lock()
            .unwrap()
            .nodes
            .iter()
            .filter(|n| n.parent == parent)
            .cloned()
            .collect()
    }

    pub fn child(&self, parent: &str, name: &str) -> Option<DriveNode> {
        self.children(parent).into_iter().find(|n| n.name == name)
    }

    pub fn count_named(&self, parent: &str, name: &str) -> usize {
        self.children(parent)
            .iter()
            .filter(|n| n.name == name)
            .count()
    }

    pub fn list_calls(&self, folder_id: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .list_calls
            .get(folder_id)
            .copied()
            .unwrap_or(0)
    }

    pub fn total_list_calls(&self) -> usize {
        self.state.lock().unwrap().list_calls.values().sum()
    }

    pub fn find_calls(&self) -> usize {
        self.state.lock().unwrap().find_calls
    }

    pub fn folder_creates(&self) -> usize {
        self.state.lock().unwrap().folder_creates
    }

    pub fn connects(&self) -> usize {
        self.state.lock().unwrap().connects
    }

    pub fn max_in_flight(&self) -> usize {
        self.state.lock().unwrap().max_in_flight
    }

    pub fn probed_sizes(&self) -> Vec<u64> {
        self.state.lock().unwrap().probed_sizes.clone()
    }
}

impl DestinationConnector for FakeDrive {
    fn connect(&self) -> Result<Box<dyn DestinationStore>> {
        self.state.lock().unwrap().connects += 1;
        Ok(Box::new(FakeDriveClient {
            state: Arc::clone(&self.state),
        }))
    }
}

/// One connected client of a [`FakeDrive`]
struct FakeDriveClient {
    state: Arc<Mutex<DriveState>>,
}

#[async_trait::async_trait]
impl DestinationStore for FakeDriveClient {
    async fn find_folder(&self, name: &str, parent_id: &str) -> Result<Option<String>> {
        let mut state = self.state.lock().unwrap();
        state.find_calls += 1;
        Ok(state.find(parent_id, name, EntryKind::Folder))
    }

    async fn create_folder(&self, name: &str, parent_id: &str) -> Result<String> {
        let mut state = self.state.lock().unwrap();
        if state.failing_creates.contains(name) {
            anyhow::bail!("HTTP 403 creating folder {name}");
        }
        state.folder_creates += 1;
        Ok(state.insert(parent_id, name, EntryKind::Folder, Vec::new(), ""))
    }

    async fn find_file(&self, name: &str, parent_id: &str) -> Result<Option<String>> {
        let mut state = self.state.lock().unwrap();
        state.find_calls += 1;
        Ok(state.find(parent_id, name, EntryKind::File))
    }

    async fn list_children_page(
        &self,
        parent_id: &str,
        page_token: Option<&str>,
    ) -> Result<ListPage<DestinationEntry>> {
        let mut state = self.state.lock().unwrap();
        *state.list_calls.entry(parent_id.to_string()).or_default() += 1;
        if state.failing_lists.contains(parent_id) {
            anyhow::bail!("HTTP 500 listing destination {parent_id}");
        }

        let all: Vec<DestinationEntry> = state
            .nodes
            .iter()
            .filter(|n| n.parent == parent_id)
            .map(|n| DestinationEntry::new(n.name.clone(), n.id.clone(), n.kind))
            .collect();
        let start: usize = page_token.map(str::parse).transpose()?.unwrap_or(0);
        let end = (start + 1000).min(all.len());
        let items = all[start..end].to_vec();
        if end < all.len() {
            Ok(ListPage::with_next(items, end.to_string()))
        } else {
            Ok(ListPage::last(items))
        }
    }

    async fn create_file_streaming(
        &self,
        request: UploadRequest,
        mut content: SizedStream<ByteStream>,
    ) -> Result<String> {
        let (delay, panics) = {
            let mut state = self.state.lock().unwrap();
            if state.failing_uploads.contains(&request.name) {
                anyhow::bail!("HTTP 500 uploading {}", request.name);
            }
            let panics = state.panicking_uploads.contains(&request.name);
            if !panics {
                state.in_flight += 1;
                state.max_in_flight = state.max_in_flight.max(state.in_flight);
            }
            (state.upload_delay, panics)
        };
        // Lock released first so the state is not poisoned.
        if panics {
            panic!("store bug while uploading {}", request.name);
        }

        // Same length probe a real upload helper performs.
        let size = content.seek(SeekFrom::End(0)).await?;
        content.seek(SeekFrom::Start(0)).await?;

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let mut body = Vec::new();
        content.read_to_end(&mut body).await?;

        let mut state = self.state.lock().unwrap();
        state.in_flight -= 1;
        state.probed_sizes.push(size);
        anyhow::ensure!(
            body.len() as u64 == size,
            "short body: {} of {size} bytes",
            body.len()
        );
        Ok(state.insert(
            &request.parent_id,
            &request.name,
            EntryKind::File,
            body,
            &request.content_type,
        ))
    }
}

/// Connector whose clients can never be built
pub struct BrokenConnector;

impl DestinationConnector for BrokenConnector {
    fn connect(&self) -> Result<Box<dyn DestinationStore>> {
        anyhow::bail!("no credential")
    }
}
