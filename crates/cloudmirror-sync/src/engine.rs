//! Tree-sync engine
//!
//! [`TreeSync`] is the single entry point the driver calls once per run.
//! It wires the walker to a fresh transfer pool, walks the whole source
//! tree, waits for every submitted transfer to settle, and then stops the
//! pool.
//!
//! ## Run Flow
//!
//! 1. **Connect**: build the control task's own destination client
//! 2. **Walk**: match folders and submit file transfers (see [`crate::walker`])
//! 3. **Drain**: wait on every transfer handle, then shut the pool down
//!
//! Nothing is returned; every skipped folder and failed transfer has been
//! logged where it happened. Counters for the last run are available from
//! [`TreeSync::stats`].

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;

use cloudmirror_core::config::{LookupStrategy, TransferConfig};
use cloudmirror_core::ports::{DestinationConnector, SourceLister};

use crate::resolver::ConflictResolver;
use crate::scheduler::{TransferScheduler, TransferStats};
use crate::walker::{TreeWalker, WalkStats};

/// Tuning for one run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOptions {
    /// Transfer worker count
    pub workers: usize,
    /// Cap on queued plus running transfers; unbounded when `None`
    pub max_outstanding: Option<usize>,
    pub lookup: LookupStrategy,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            workers: 5,
            max_outstanding: None,
            lookup: LookupStrategy::Snapshot,
        }
    }
}

impl From<&TransferConfig> for SyncOptions {
    fn from(config: &TransferConfig) -> Self {
        Self {
            workers: config.workers,
            max_outstanding: config.max_outstanding,
            lookup: config.lookup,
        }
    }
}

/// Summary of the most recent run
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncStats {
    /// Correlates the run's log lines; `None` before the first run
    pub run_id: Option<Uuid>,
    pub walk: WalkStats,
    pub transfers: TransferStats,
    /// Wall-clock duration of the run in milliseconds
    pub duration_ms: u64,
    /// The run stopped before walking because the destination was unreachable
    pub aborted: bool,
}

impl SyncStats {
    /// True when nothing was skipped and every transfer settled successfully
    pub fn is_complete(&self) -> bool {
        !self.aborted
            && self.walk.branches_skipped == 0
            && self.walk.files_skipped == 0
            && self.transfers.failed == 0
            && self.transfers.pending() == 0
    }
}

/// One-way mirror of a source tree into a destination tree
pub struct TreeSync {
    source: Arc<dyn SourceLister>,
    connector: Arc<dyn DestinationConnector>,
    options: SyncOptions,
    resolver: ConflictResolver,
    last_stats: SyncStats,
}

impl TreeSync {
    /// Creates an engine over the given source and destination
    ///
    /// # Arguments
    /// * `source` - lists the source tree and opens file content
    /// * `connector` - builds destination clients; one for the walk and one per worker
    /// * `options` - pool size, outstanding cap and lookup strategy
    pub fn new(
        source: Arc<dyn SourceLister>,
        connector: Arc<dyn DestinationConnector>,
        options: SyncOptions,
    ) -> Self {
        Self {
            source,
            connector,
            options,
            resolver: ConflictResolver::new(),
            last_stats: SyncStats::default(),
        }
    }

    /// Replaces the conflict resolver, e.g. to pin the rename timestamp
    pub fn with_resolver(mut self, resolver: ConflictResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    /// Counters of the most recent [`sync_tree`](Self::sync_tree) call
    pub fn stats(&self) -> &SyncStats {
        &self.last_stats
    }

    /// Mirrors `source_root` into `destination_root` and returns once every
    /// submitted transfer has settled
    pub async fn sync_tree(&mut self, source_root: &str, destination_root: &str) {
        let run_id = Uuid::new_v4();
        let span = info_span!(
            "sync_tree",
            %run_id,
            source_root,
            destination_root
        );

        let stats = self
            .run(source_root, destination_root)
            .instrument(span)
            .await;
        self.last_stats = SyncStats {
            run_id: Some(run_id),
            ..stats
        };
    }

    async fn run(&self, source_root: &str, destination_root: &str) -> SyncStats {
        let started = Instant::now();
        info!(
            workers = self.options.workers,
            lookup = ?self.options.lookup,
            "Starting mirror run"
        );

        let store = match self.connector.connect() {
            Ok(store) => store,
            Err(e) => {
                error!(error = %format!("{e:#}"), "Failed to connect to destination; nothing mirrored");
                return SyncStats {
                    aborted: true,
                    duration_ms: started.elapsed().as_millis() as u64,
                    ..SyncStats::default()
                };
            }
        };

        let scheduler = TransferScheduler::new(
            Arc::clone(&self.source),
            Arc::clone(&self.connector),
            self.options.workers,
            self.options.max_outstanding,
        );

        let walker = TreeWalker {
            source: self.source.as_ref(),
            store: store.as_ref(),
            scheduler: &scheduler,
            resolver: &self.resolver,
            lookup: self.options.lookup,
        };
        let outcome = walker.walk(source_root, destination_root).await;

        info!(
            folders = outcome.stats.folders_visited,
            dispatched = outcome.stats.files_dispatched,
            unsettled = outcome.transfers.len(),
            "Tree walk finished; waiting for transfers"
        );

        let lost = outcome.transfers.settle().await;
        let mut transfers = scheduler.shutdown().await;
        // Lost results were never counted by a worker.
        transfers.failed += lost;
        let stats = SyncStats {
            run_id: None,
            walk: outcome.stats,
            transfers,
            duration_ms: started.elapsed().as_millis() as u64,
            aborted: false,
        };

        info!(
            folders_created = stats.walk.folders_created,
            folders_reused = stats.walk.folders_reused,
            branches_skipped = stats.walk.branches_skipped,
            files_renamed = stats.walk.files_renamed,
            uploaded = stats.transfers.uploaded,
            failed = stats.transfers.failed,
            bytes = stats.transfers.bytes_uploaded,
            duration_ms = stats.duration_ms,
            "Mirror run complete"
        );
        stats
    }
}
