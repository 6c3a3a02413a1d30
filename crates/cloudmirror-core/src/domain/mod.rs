//! Domain types
//!
//! - Listing entries produced by the source and destination sides
//! - The pagination shape shared by both sides
//! - Error types scoped to a branch, a task or the whole run

pub mod entry;
pub mod errors;

pub use entry::{
    DestinationEntry, EntryKind, ListPage, RemoteEntry, DEFAULT_CONTENT_TYPE, ROOT_ALIAS,
};
pub use errors::{FatalAuthError, FolderError, ListError, TransferError, TransferStage};
