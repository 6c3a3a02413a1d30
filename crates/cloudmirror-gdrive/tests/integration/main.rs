//! Integration tests for the Google Drive destination store

mod common;
