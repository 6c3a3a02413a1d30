//! Transfer scheduler - fixed worker pool for file transfers
//!
//! The walker submits one [`TransferTask`] per file and keeps going; a fixed
//! set of worker tasks drains the shared queue and streams each file from
//! the source into the destination.
//!
//! ## Flow
//!
//! ```text
//! TreeWalker ──submit──→ mpsc queue ──→ worker 1..N ──→ DestinationStore
//!      │                                    │
//!      └── TransferHandle ←── oneshot ──────┘
//! ```
//!
//! Each worker builds its own destination client from the shared connector
//! the first time it picks up a task and keeps it until the pool shuts down.
//! A failed transfer is logged with its source path and reported through its
//! handle; it never stops the worker or any other transfer. A transfer that
//! panics is caught and reported as failed at [`TransferStage::Aborted`],
//! and the worker moves on to the next task with a fresh client.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures_util::FutureExt;
use serde::Serialize;
use tokio::sync::oneshot::error::TryRecvError;
use tokio::sync::{mpsc, oneshot, Mutex, OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use cloudmirror_core::domain::{TransferError, TransferStage};
use cloudmirror_core::ports::{DestinationConnector, DestinationStore, SourceLister, UploadRequest};
use cloudmirror_core::stream::SizedStream;

// ============================================================================
// Tasks and results
// ============================================================================

/// One file to copy from the source into a destination folder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferTask {
    /// Source item id, opened lazily by the worker
    pub source_id: String,
    /// Source path, used in log lines
    pub source_path: String,
    /// Destination folder receiving the file
    pub parent_id: String,
    /// Conflict-resolved name to create the file under
    pub target_name: String,
    /// Declared size in bytes
    pub size: u64,
    pub content_type: String,
}

impl TransferTask {
    fn upload_request(&self) -> UploadRequest {
        UploadRequest {
            name: self.target_name.clone(),
            parent_id: self.parent_id.clone(),
            content_type: self.content_type.clone(),
            size: self.size,
        }
    }

    fn failure(&self, stage: TransferStage, source: anyhow::Error) -> TransferError {
        TransferError {
            path: self.source_path.clone(),
            target_name: self.target_name.clone(),
            stage,
            source,
        }
    }
}

/// A completed transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferOutcome {
    /// Id of the created destination file
    pub file_id: String,
    pub bytes: u64,
}

pub type TransferResult = Result<TransferOutcome, TransferError>;

/// Completion handle for one submitted transfer
#[derive(Debug)]
pub struct TransferHandle {
    path: String,
    target_name: String,
    reply: oneshot::Receiver<TransferResult>,
}

impl TransferHandle {
    /// Source path of the file being transferred
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Waits for the transfer to settle
    ///
    /// If the pool went away without reporting, the transfer counts as
    /// failed at [`TransferStage::Aborted`].
    pub async fn wait(self) -> TransferResult {
        match self.reply.await {
            Ok(result) => result,
            Err(_) => Err(TransferError {
                path: self.path,
                target_name: self.target_name,
                stage: TransferStage::Aborted,
                source: anyhow::anyhow!("transfer worker exited before reporting a result"),
            }),
        }
    }
}

// ============================================================================
// Pending transfers
// ============================================================================

/// Smallest number of held handles that triggers a prune
const MIN_PRUNE_AT: usize = 64;

/// Handles of submitted transfers that have not been seen to settle
///
/// Settled handles are pruned as new ones arrive, so the set grows with the
/// number of unsettled transfers rather than with the size of the tree.
/// A handle whose worker vanished without reporting counts as lost.
#[derive(Debug, Default)]
pub struct PendingTransfers {
    handles: Vec<TransferHandle>,
    prune_at: usize,
    lost: u64,
}

impl PendingTransfers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, handle: TransferHandle) {
        self.handles.push(handle);
        if self.handles.len() >= self.prune_at {
            self.prune();
            self.prune_at = (self.handles.len() * 2).max(MIN_PRUNE_AT);
        }
    }

    /// Handles still held
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Lost results seen so far
    pub fn lost(&self) -> u64 {
        self.lost
    }

    fn prune(&mut self) {
        let mut lost = 0;
        self.handles.retain_mut(|handle| match handle.reply.try_recv() {
            Ok(_) => false,
            Err(TryRecvError::Empty) => true,
            Err(TryRecvError::Closed) => {
                error!(path = %handle.path, target = %handle.target_name, "Transfer result lost");
                lost += 1;
                false
            }
        });
        self.lost += lost;
    }

    /// Waits for every held transfer and returns the total number of lost
    /// results
    ///
    /// Workers log and count their own outcomes; only lost results are
    /// reported here.
    pub async fn settle(self) -> u64 {
        let mut lost = self.lost;
        for handle in self.handles {
            if handle.reply.await.is_err() {
                error!(path = %handle.path, target = %handle.target_name, "Transfer result lost");
                lost += 1;
            }
        }
        lost
    }
}

// ============================================================================
// Statistics
// ============================================================================

/// Snapshot of the pool's counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TransferStats {
    pub submitted: u64,
    pub uploaded: u64,
    pub failed: u64,
    pub bytes_uploaded: u64,
}

impl TransferStats {
    /// Transfers submitted but not yet settled
    pub fn pending(&self) -> u64 {
        self.submitted
            .saturating_sub(self.uploaded)
            .saturating_sub(self.failed)
    }
}

#[derive(Debug, Default)]
struct Counters {
    submitted: AtomicU64,
    uploaded: AtomicU64,
    failed: AtomicU64,
    bytes_uploaded: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> TransferStats {
        TransferStats {
            submitted: self.submitted.load(Ordering::Acquire),
            uploaded: self.uploaded.load(Ordering::Acquire),
            failed: self.failed.load(Ordering::Acquire),
            bytes_uploaded: self.bytes_uploaded.load(Ordering::Acquire),
        }
    }
}

// ============================================================================
// TransferScheduler
// ============================================================================

struct QueuedTransfer {
    task: TransferTask,
    reply: oneshot::Sender<TransferResult>,
    /// Slot held until the transfer settles, when outstanding work is capped
    _slot: Option<OwnedSemaphorePermit>,
}

type SharedQueue = Arc<Mutex<mpsc::UnboundedReceiver<QueuedTransfer>>>;

/// Fixed-size pool executing file transfers concurrently
pub struct TransferScheduler {
    sender: mpsc::UnboundedSender<QueuedTransfer>,
    workers: Vec<JoinHandle<()>>,
    slots: Option<Arc<Semaphore>>,
    counters: Arc<Counters>,
}

impl TransferScheduler {
    /// Starts `workers` transfer workers
    ///
    /// # Arguments
    /// * `source` - opens file content at transfer time
    /// * `connector` - builds one destination client per worker
    /// * `workers` - pool size; at least one worker is always started
    /// * `max_outstanding` - when set, at most this many transfers are queued
    ///   or running and [`submit`](Self::submit) waits for a free slot
    pub fn new(
        source: Arc<dyn SourceLister>,
        connector: Arc<dyn DestinationConnector>,
        workers: usize,
        max_outstanding: Option<usize>,
    ) -> Self {
        let workers = workers.max(1);
        let (sender, receiver) = mpsc::unbounded_channel();
        let queue: SharedQueue = Arc::new(Mutex::new(receiver));
        let counters = Arc::new(Counters::default());

        info!(
            workers,
            max_outstanding = ?max_outstanding,
            "Starting transfer workers"
        );

        let handles = (0..workers)
            .map(|worker_id| {
                tokio::spawn(worker_loop(
                    worker_id,
                    Arc::clone(&queue),
                    Arc::clone(&source),
                    Arc::clone(&connector),
                    Arc::clone(&counters),
                ))
            })
            .collect();

        Self {
            sender,
            workers: handles,
            slots: max_outstanding.map(|max| Arc::new(Semaphore::new(max.max(1)))),
            counters,
        }
    }

    /// Queues a transfer and returns its completion handle
    ///
    /// Returns immediately unless outstanding work is capped and every slot
    /// is taken, in which case it waits for a running transfer to settle.
    pub async fn submit(&self, task: TransferTask) -> TransferHandle {
        let slot = match &self.slots {
            Some(slots) => Arc::clone(slots).acquire_owned().await.ok(),
            None => None,
        };

        let (reply, receiver) = oneshot::channel();
        let handle = TransferHandle {
            path: task.source_path.clone(),
            target_name: task.target_name.clone(),
            reply: receiver,
        };

        debug!(
            path = %task.source_path,
            target = %task.target_name,
            size = task.size,
            "Queueing transfer"
        );
        self.counters.submitted.fetch_add(1, Ordering::AcqRel);

        if let Err(rejected) = self.sender.send(QueuedTransfer {
            task,
            reply,
            _slot: slot,
        }) {
            let QueuedTransfer { task, reply, .. } = rejected.0;
            self.counters.failed.fetch_add(1, Ordering::AcqRel);
            error!(
                path = %task.source_path,
                "Transfer pool is gone; transfer not queued"
            );
            let _ = reply.send(Err(task.failure(
                TransferStage::Aborted,
                anyhow::anyhow!("transfer pool is gone"),
            )));
        }

        handle
    }

    /// Current counters
    pub fn stats(&self) -> TransferStats {
        self.counters.snapshot()
    }

    /// Closes the queue and waits for every worker to exit
    ///
    /// Transfers already queued are still executed before the workers stop.
    pub async fn shutdown(self) -> TransferStats {
        let Self {
            sender,
            workers,
            counters,
            ..
        } = self;
        drop(sender);

        for worker in workers {
            if let Err(e) = worker.await {
                error!(error = %e, "Transfer worker terminated abnormally");
            }
        }

        let stats = counters.snapshot();
        info!(
            uploaded = stats.uploaded,
            failed = stats.failed,
            bytes = stats.bytes_uploaded,
            "Transfer workers stopped"
        );
        stats
    }
}

async fn worker_loop(
    worker_id: usize,
    queue: SharedQueue,
    source: Arc<dyn SourceLister>,
    connector: Arc<dyn DestinationConnector>,
    counters: Arc<Counters>,
) {
    // Built on first use, owned by this worker only.
    let mut client: Option<Box<dyn DestinationStore>> = None;

    loop {
        let next = queue.lock().await.recv().await;
        let Some(job) = next else {
            break;
        };
        let QueuedTransfer { task, reply, _slot } = job;

        let caught = AssertUnwindSafe(execute(
            &task,
            &mut client,
            source.as_ref(),
            connector.as_ref(),
        ))
        .catch_unwind()
        .await;
        let result = match caught {
            Ok(result) => result,
            Err(payload) => {
                // The client may have been mid-request.
                client = None;
                Err(task.failure(
                    TransferStage::Aborted,
                    anyhow::anyhow!("transfer panicked: {}", panic_message(payload.as_ref())),
                ))
            }
        };

        match &result {
            Ok(outcome) => {
                counters.uploaded.fetch_add(1, Ordering::AcqRel);
                counters
                    .bytes_uploaded
                    .fetch_add(outcome.bytes, Ordering::AcqRel);
                info!(
                    worker_id,
                    path = %task.source_path,
                    target = %task.target_name,
                    bytes = outcome.bytes,
                    file_id = %outcome.file_id,
                    "Uploaded file"
                );
            }
            Err(e) => {
                counters.failed.fetch_add(1, Ordering::AcqRel);
                error!(
                    worker_id,
                    path = %e.path,
                    target = %e.target_name,
                    stage = %e.stage,
                    error = %format!("{:#}", e.source),
                    "File transfer failed"
                );
            }
        }

        if reply.send(result).is_err() {
            warn!(path = %task.source_path, "Transfer result dropped; nobody is waiting");
        }
    }

    debug!(worker_id, "Transfer worker exiting");
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

async fn execute(
    task: &TransferTask,
    client: &mut Option<Box<dyn DestinationStore>>,
    source: &dyn SourceLister,
    connector: &dyn DestinationConnector,
) -> TransferResult {
    if client.is_none() {
        let built = connector
            .connect()
            .map_err(|e| task.failure(TransferStage::Connect, e))?;
        *client = Some(built);
    }
    let store = client.as_deref().ok_or_else(|| {
        task.failure(
            TransferStage::Connect,
            anyhow::anyhow!("destination client unavailable"),
        )
    })?;

    let stream = source
        .open_content(&task.source_id)
        .await
        .map_err(|e| task.failure(TransferStage::Open, e))?;
    let content = SizedStream::new(stream, task.size);

    let file_id = store
        .create_file_streaming(task.upload_request(), content)
        .await
        .map_err(|e| task.failure(TransferStage::Upload, e))?;

    Ok(TransferOutcome {
        file_id,
        bytes: task.size,
    })
}
