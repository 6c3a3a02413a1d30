//! Port definitions
//!
//! Ports are the interfaces the tree-sync engine depends on; their
//! implementations live in the adapter crates.
//!
//! ## Ports Overview
//!
//! - [`SourceLister`] - paginated enumeration of the source tree plus lazy content streams
//! - [`DestinationStore`] - folder/file lookup, folder creation and streaming upload
//! - [`DestinationConnector`] - builds one [`DestinationStore`] client per caller
//! - [`CredentialProvider`] - produces a valid bearer credential or a fatal error

pub mod credential;
pub mod destination;
pub mod source;

pub use credential::{Credential, CredentialProvider, Tokens};
pub use destination::{DestinationConnector, DestinationStore, UploadRequest};
pub use source::{ByteStream, SourceLister};
