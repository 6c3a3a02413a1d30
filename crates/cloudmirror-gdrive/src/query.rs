//! Builders for the Drive `q` search parameter
//!
//! String literals in a query are single-quoted. Backslashes are escaped
//! before quotes so an escaped quote is never escaped twice.

use crate::FOLDER_MIME_TYPE;

/// Escapes a value for use inside a single-quoted query literal
pub fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Non-trashed folders named `name` directly under `parent_id`
pub fn folder_query(name: &str, parent_id: &str) -> String {
    format!(
        "mimeType='{FOLDER_MIME_TYPE}' and name='{}' and trashed=false and '{}' in parents",
        escape(name),
        escape(parent_id)
    )
}

/// Non-trashed, non-folder files named `name` directly under `parent_id`
pub fn file_query(name: &str, parent_id: &str) -> String {
    format!(
        "name='{}' and trashed=false and mimeType!='{FOLDER_MIME_TYPE}' and '{}' in parents",
        escape(name),
        escape(parent_id)
    )
}

/// Every non-trashed direct child of `parent_id`
pub fn children_query(parent_id: &str) -> String {
    format!("'{}' in parents and trashed=false", escape(parent_id))
}
