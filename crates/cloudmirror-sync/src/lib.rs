//! cloudmirror sync - one-way tree mirroring engine
//!
//! Provides:
//! - Destination folder snapshots built from one paginated listing
//! - Timestamp-based renaming of files whose name is already taken
//! - A fixed worker pool streaming file transfers in parallel
//! - A depth-first walker pairing source folders with destination folders
//!
//! ## Modules
//!
//! - [`engine`] - [`TreeSync`], the `sync_tree` entry point and run statistics
//! - [`walker`] - folder matching and task production
//! - [`scheduler`] - transfer worker pool
//! - [`resolver`] - conflict renaming
//! - [`snapshot`] - destination folder snapshots and per-item lookups

pub mod engine;
pub mod resolver;
pub mod scheduler;
pub mod snapshot;
pub mod walker;

pub use engine::{SyncOptions, SyncStats, TreeSync};
pub use resolver::{ConflictResolver, Occupancy};
pub use scheduler::{PendingTransfers, TransferHandle, TransferOutcome, TransferScheduler, TransferStats, TransferTask};
pub use snapshot::{DestinationIndex, FolderSnapshot, SnapshotEntry};
pub use walker::WalkStats;
