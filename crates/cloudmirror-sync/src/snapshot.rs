//! Destination folder snapshots
//!
//! A [`FolderSnapshot`] maps each child name of one destination folder to
//! its id and kind. It is taken once when the walker enters the folder and
//! then updated with every folder created and file dispatched during the
//! visit, so later children see names assigned earlier in the same run.
//!
//! [`DestinationIndex`] puts the two lookup strategies behind one interface:
//! a full snapshot, or one destination query per name.

use std::collections::HashMap;

use anyhow::Result;
use tracing::debug;

use cloudmirror_core::config::LookupStrategy;
use cloudmirror_core::domain::EntryKind;
use cloudmirror_core::ports::DestinationStore;

/// What a snapshot knows about one name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotEntry {
    /// Destination id; empty for files whose transfer is still in flight
    pub id: String,
    pub kind: EntryKind,
}

/// Point-in-time listing of one destination folder's direct children
#[derive(Debug, Clone, Default)]
pub struct FolderSnapshot {
    entries: HashMap<String, SnapshotEntry>,
}

impl FolderSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lists every child of `folder_id`, following page tokens until exhausted
    ///
    /// Names are matched exactly. When the backend reports the same name
    /// more than once, the entry listed last wins.
    pub async fn capture(store: &dyn DestinationStore, folder_id: &str) -> Result<Self> {
        let mut snapshot = Self::new();
        let mut page_token: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let page = store
                .list_children_page(folder_id, page_token.as_deref())
                .await?;
            pages += 1;

            for entry in page.items {
                snapshot.record(entry.name, entry.id, entry.kind);
            }

            match page.next_cursor {
                Some(next) => page_token = Some(next),
                None => break,
            }
        }

        debug!(
            folder_id,
            entries = snapshot.len(),
            pages,
            "Captured destination folder snapshot"
        );
        Ok(snapshot)
    }

    pub fn get(&self, name: &str) -> Option<&SnapshotEntry> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Records `name` as `kind` with the given id, replacing any previous entry
    pub fn record(&mut self, name: impl Into<String>, id: impl Into<String>, kind: EntryKind) {
        self.entries.insert(
            name.into(),
            SnapshotEntry {
                id: id.into(),
                kind,
            },
        );
    }

    /// Marks `name` as taken by a file whose upload has not finished yet
    pub fn reserve_file(&mut self, name: impl Into<String>) {
        self.record(name, String::new(), EntryKind::File);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Name lookups for one destination folder under the configured strategy
#[derive(Debug)]
pub enum DestinationIndex {
    /// Every child was listed up front
    Snapshot(FolderSnapshot),
    /// Names are queried one at a time; `assigned` holds what this run created
    PerItem {
        parent_id: String,
        assigned: FolderSnapshot,
    },
}

impl DestinationIndex {
    /// Prepares lookups for `folder_id`
    ///
    /// With [`LookupStrategy::Snapshot`] this lists the folder, so a failure
    /// here means the folder's children cannot be matched.
    pub async fn open(
        strategy: LookupStrategy,
        store: &dyn DestinationStore,
        folder_id: &str,
    ) -> Result<Self> {
        match strategy {
            LookupStrategy::Snapshot => Ok(Self::Snapshot(
                FolderSnapshot::capture(store, folder_id).await?,
            )),
            LookupStrategy::PerItem => Ok(Self::PerItem {
                parent_id: folder_id.to_string(),
                assigned: FolderSnapshot::new(),
            }),
        }
    }

    /// Returns what currently occupies `name` in the folder, if anything
    pub async fn lookup(
        &self,
        store: &dyn DestinationStore,
        name: &str,
    ) -> Result<Option<SnapshotEntry>> {
        match self {
            Self::Snapshot(snapshot) => Ok(snapshot.get(name).cloned()),
            Self::PerItem {
                parent_id,
                assigned,
            } => {
                if let Some(entry) = assigned.get(name) {
                    return Ok(Some(entry.clone()));
                }
                if let Some(id) = store.find_folder(name, parent_id).await? {
                    return Ok(Some(SnapshotEntry {
                        id,
                        kind: EntryKind::Folder,
                    }));
                }
                Ok(store
                    .find_file(name, parent_id)
                    .await?
                    .map(|id| SnapshotEntry {
                        id,
                        kind: EntryKind::File,
                    }))
            }
        }
    }

    fn assigned_mut(&mut self) -> &mut FolderSnapshot {
        match self {
            Self::Snapshot(snapshot) => snapshot,
            Self::PerItem { assigned, .. } => assigned,
        }
    }

    /// Records a folder created during this run
    pub fn record_folder(&mut self, name: &str, id: &str) {
        self.assigned_mut().record(name, id, EntryKind::Folder);
    }

    /// Records a file name handed to the transfer pool
    pub fn reserve_file(&mut self, name: &str) {
        self.assigned_mut().reserve_file(name);
    }
}
