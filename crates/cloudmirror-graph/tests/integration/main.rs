//! Integration tests for cloudmirror-graph
//!
//! Uses wiremock to simulate Microsoft Graph API endpoints.

mod test_children;
mod test_content;
