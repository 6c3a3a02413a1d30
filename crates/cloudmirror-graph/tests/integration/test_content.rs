//! Integration tests for streaming downloads

use cloudmirror_core::ports::SourceLister;
use cloudmirror_core::stream::SizedStream;
use cloudmirror_graph::GraphError;
use tokio::io::AsyncReadExt;

use crate::common;

#[tokio::test]
async fn test_open_content_streams_body() {
    let (server, lister) = common::setup_graph_mock().await;
    let content = b"Hello, OneDrive! This is test content.";
    common::mount_content(&server, "I1", content).await;

    let mut stream = lister.open_content("I1").await.expect("open succeeds");
    let mut body = Vec::new();
    stream.read_to_end(&mut body).await.unwrap();

    assert_eq!(body, content);
}

#[tokio::test]
async fn test_large_content_is_read_in_full() {
    let (server, lister) = common::setup_graph_mock().await;
    let content: Vec<u8> = (0..(3 * 1024 * 1024)).map(|i| (i % 251) as u8).collect();
    common::mount_content(&server, "BIG", &content).await;

    let stream = lister.open_content("BIG").await.unwrap();
    let mut sized = SizedStream::new(stream, content.len() as u64);
    let mut body = Vec::new();
    sized.read_to_end(&mut body).await.unwrap();

    assert_eq!(sized.position(), content.len() as u64);
    assert_eq!(body, content);
}

#[tokio::test]
async fn test_open_missing_item_fails() {
    let (server, lister) = common::setup_graph_mock().await;
    common::mount_error(&server, "/me/drive/items/NOPE/content", 404, "itemNotFound").await;

    let err = match lister.open_content("NOPE").await {
        Ok(_) => panic!("expected failure"),
        Err(e) => e,
    };

    assert!(matches!(
        err.downcast_ref::<GraphError>(),
        Some(GraphError::NotFound(_))
    ));
}
