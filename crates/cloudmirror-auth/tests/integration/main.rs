//! Integration tests for cloudmirror-auth

mod test_credential;
