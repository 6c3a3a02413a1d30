//! cloudmirror core - domain types, ports and configuration
//!
//! This crate holds everything the tree-sync engine and the provider adapters
//! agree on:
//! - **Domain types** - `RemoteEntry`, `DestinationEntry`, `ListPage`, the error taxonomy
//! - **Port definitions** - `SourceLister`, `DestinationStore`, `DestinationConnector`,
//!   `CredentialProvider`
//! - **Stream size adapter** - `SizedStream`, a forward-only stream that answers length probes
//! - **Configuration** - YAML-backed `Config` with validation and a builder
//!
//! # Architecture
//!
//! The engine (`cloudmirror-sync`) depends only on the ports defined here.
//! Adapter crates (`cloudmirror-graph`, `cloudmirror-gdrive`, `cloudmirror-auth`)
//! implement them.

pub mod config;
pub mod domain;
pub mod ports;
pub mod stream;
