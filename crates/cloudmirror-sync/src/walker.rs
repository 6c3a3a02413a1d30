//! Tree walker - pairs source folders with destination folders
//!
//! The walk is depth-first over an explicit stack of folder pairs, run on a
//! single control task. For every pair it:
//!
//! 1. Prepares destination lookups (a snapshot, unless per-item lookups are configured)
//! 2. Lists the source folder
//! 3. Reuses or creates a destination folder for every source subfolder
//! 4. Resolves a free name for every source file and submits its transfer
//!
//! A destination folder is always created before anything targets it as a
//! parent, because children are only pushed once their folder id is known.
//! Failures are contained: a failed listing skips that folder's subtree and
//! a failed folder creation skips that child.

use anyhow::Result;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use cloudmirror_core::config::LookupStrategy;
use cloudmirror_core::domain::{EntryKind, FolderError, ListError, RemoteEntry};
use cloudmirror_core::ports::{DestinationStore, SourceLister};

use crate::resolver::{ConflictResolver, Occupancy};
use crate::scheduler::{PendingTransfers, TransferScheduler, TransferTask};
use crate::snapshot::DestinationIndex;

/// Counters collected during one walk
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WalkStats {
    pub folders_visited: u64,
    pub folders_created: u64,
    pub folders_reused: u64,
    /// Folders whose subtree was skipped after a listing or creation failure
    pub branches_skipped: u64,
    pub files_dispatched: u64,
    pub files_renamed: u64,
    /// Files skipped because their destination name could not be checked
    pub files_skipped: u64,
}

/// Result of a walk: transfers not yet settled plus counters
#[derive(Debug, Default)]
pub struct WalkOutcome {
    pub transfers: PendingTransfers,
    pub stats: WalkStats,
}

/// A source folder and the destination folder mirroring it
#[derive(Debug, Clone)]
struct FolderPair {
    source_id: String,
    destination_id: String,
    /// Slash-separated source path; empty for the root
    path: String,
}

pub(crate) struct TreeWalker<'a> {
    pub source: &'a dyn SourceLister,
    pub store: &'a dyn DestinationStore,
    pub scheduler: &'a TransferScheduler,
    pub resolver: &'a ConflictResolver,
    pub lookup: LookupStrategy,
}

impl TreeWalker<'_> {
    /// Mirrors the tree under `source_root` into `destination_root`
    pub async fn walk(&self, source_root: &str, destination_root: &str) -> WalkOutcome {
        let mut outcome = WalkOutcome::default();
        let mut stack = vec![FolderPair {
            source_id: source_root.to_string(),
            destination_id: destination_root.to_string(),
            path: String::new(),
        }];

        while let Some(pair) = stack.pop() {
            outcome.stats.folders_visited += 1;
            match self.visit(&pair, &mut outcome).await {
                Ok(subfolders) => {
                    // Reversed so subfolders are descended in listing order.
                    stack.extend(subfolders.into_iter().rev());
                }
                Err(e) => {
                    outcome.stats.branches_skipped += 1;
                    let path = display_path(e.path()).to_string();
                    let error = anyhow::Error::new(e);
                    error!(path = %path, error = %format!("{error:#}"), "Skipping folder subtree");
                }
            }
        }

        outcome
    }

    /// Processes the children of one folder pair and returns the subfolder
    /// pairs still to be visited
    async fn visit(
        &self,
        pair: &FolderPair,
        outcome: &mut WalkOutcome,
    ) -> Result<Vec<FolderPair>, ListError> {
        let mut index = DestinationIndex::open(self.lookup, self.store, &pair.destination_id)
            .await
            .map_err(|source| ListError::DestinationSnapshot {
                folder_id: pair.destination_id.clone(),
                path: pair.path.clone(),
                source,
            })?;

        let children = self
            .source
            .list_children(&pair.source_id)
            .await
            .map_err(|source| ListError::SourceListing {
                folder_id: pair.source_id.clone(),
                path: pair.path.clone(),
                source,
            })?;

        debug!(
            path = %display_path(&pair.path),
            children = children.len(),
            "Listed source folder"
        );

        let mut subfolders = Vec::new();
        for child in children {
            let child_path = join_path(&pair.path, &child.name);
            match child.kind {
                EntryKind::Folder => {
                    match self
                        .ensure_folder(&mut index, pair, &child, &child_path, &mut outcome.stats)
                        .await
                    {
                        Ok(destination_id) => subfolders.push(FolderPair {
                            source_id: child.id,
                            destination_id,
                            path: child_path,
                        }),
                        Err(e) => {
                            outcome.stats.branches_skipped += 1;
                            error!(
                                path = %e.path,
                                name = %e.name,
                                parent_id = %e.parent_id,
                                error = %format!("{:#}", e.source),
                                "Failed to prepare destination folder; skipping"
                            );
                        }
                    }
                }
                EntryKind::File => {
                    self.dispatch_file(&mut index, pair, child, child_path, outcome)
                        .await;
                }
            }
        }

        Ok(subfolders)
    }

    /// Returns the id of the destination folder mirroring `child`, creating it
    /// when no folder of that name exists yet
    async fn ensure_folder(
        &self,
        index: &mut DestinationIndex,
        pair: &FolderPair,
        child: &RemoteEntry,
        child_path: &str,
        stats: &mut WalkStats,
    ) -> Result<String, FolderError> {
        let folder_error = |source: anyhow::Error| FolderError {
            name: child.name.clone(),
            parent_id: pair.destination_id.clone(),
            path: child_path.to_string(),
            source,
        };

        let existing = index
            .lookup(self.store, &child.name)
            .await
            .map_err(folder_error)?;

        match existing {
            Some(entry) if entry.kind == EntryKind::Folder => {
                stats.folders_reused += 1;
                debug!(path = %child_path, folder_id = %entry.id, "Reusing destination folder");
                Ok(entry.id)
            }
            existing => {
                if existing.is_some() {
                    warn!(
                        path = %child_path,
                        "A file with this name exists in the destination; creating folder next to it"
                    );
                }
                let id = self
                    .store
                    .create_folder(&child.name, &pair.destination_id)
                    .await
                    .map_err(folder_error)?;
                index.record_folder(&child.name, &id);
                stats.folders_created += 1;
                info!(path = %child_path, folder_id = %id, "Created destination folder");
                Ok(id)
            }
        }
    }

    async fn dispatch_file(
        &self,
        index: &mut DestinationIndex,
        pair: &FolderPair,
        child: RemoteEntry,
        child_path: String,
        outcome: &mut WalkOutcome,
    ) {
        let target_name = match self.resolve_name(index, &child.name, &child_path).await {
            Ok(name) => name,
            Err(e) => {
                outcome.stats.files_skipped += 1;
                error!(
                    path = %child_path,
                    error = %format!("{e:#}"),
                    "Failed to check destination name; skipping file"
                );
                return;
            }
        };
        if target_name != child.name {
            outcome.stats.files_renamed += 1;
        }

        index.reserve_file(&target_name);
        let task = TransferTask {
            source_id: child.id,
            source_path: child_path,
            parent_id: pair.destination_id.clone(),
            target_name,
            size: child.size,
            content_type: child.content_type,
        };
        outcome.transfers.push(self.scheduler.submit(task).await);
        outcome.stats.files_dispatched += 1;
    }

    /// Picks the name a file is created under in the destination
    async fn resolve_name(
        &self,
        index: &DestinationIndex,
        name: &str,
        path: &str,
    ) -> Result<String> {
        let existing = index.lookup(self.store, name).await?;
        let occupancy = Occupancy::of(existing.map(|entry| entry.kind));
        if occupancy.is_free() {
            return Ok(name.to_string());
        }

        for (attempt, candidate) in self.resolver.candidates(name).enumerate() {
            if index.lookup(self.store, &candidate).await?.is_none() {
                info!(
                    path,
                    original = name,
                    renamed = %candidate,
                    occupied_by = %occupancy,
                    "Name taken in destination; uploading under a new name"
                );
                return Ok(candidate);
            }
            warn!(
                path,
                candidate = %candidate,
                attempt = attempt + 1,
                "Renamed candidate is taken as well; adding a counter"
            );
        }

        anyhow::bail!("no free name found for '{name}'")
    }
}

fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}/{name}")
    }
}

fn display_path(path: &str) -> &str {
    if path.is_empty() {
        "/"
    } else {
        path
    }
}
