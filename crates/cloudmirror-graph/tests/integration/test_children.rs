//! Integration tests for folder listings

use cloudmirror_core::domain::EntryKind;
use cloudmirror_core::ports::SourceLister;
use cloudmirror_graph::GraphError;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

use crate::common;

#[tokio::test]
async fn test_single_page_listing() {
    let (server, lister) = common::setup_graph_mock().await;
    common::mount_children(
        &server,
        "root",
        serde_json::json!({
            "value": [
                common::folder_item("F1", "A"),
                common::file_item("I1", "doc.txt", 10, "text/plain"),
                { "id": "I2", "name": "unknown.bin" }
            ]
        }),
    )
    .await;

    let page = lister
        .list_children_page("root", None)
        .await
        .expect("listing succeeds");

    assert!(page.is_last());
    assert_eq!(page.items.len(), 3);
    assert_eq!(page.items[0].kind, EntryKind::Folder);
    assert_eq!(page.items[0].id, "F1");
    assert_eq!(page.items[1].size, 10);
    assert_eq!(page.items[1].content_type, "text/plain");
    assert_eq!(page.items[2].kind, EntryKind::File);
    assert_eq!(page.items[2].content_type, "application/octet-stream");
}

#[tokio::test]
async fn test_listing_follows_next_link() {
    let (server, lister) = common::setup_graph_mock().await;
    let next_link = format!(
        "{}/me/drive/items/root/children?$top=1000&$skiptoken=page2",
        server.uri()
    );

    Mock::given(method("GET"))
        .and(path("/me/drive/items/root/children"))
        .and(query_param("$skiptoken", "page2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "value": [common::file_item("I3", "c.txt", 3, "text/plain")]
        })))
        .expect(1)
        .mount(&server)
        .await;
    // page-2 requests also carry $top=1000; the mock mounted first wins
    Mock::given(method("GET"))
        .and(path("/me/drive/items/root/children"))
        .and(query_param("$top", "1000"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "value": [
                common::file_item("I1", "a.txt", 1, "text/plain"),
                common::file_item("I2", "b.txt", 2, "text/plain")
            ],
            "@odata.nextLink": next_link
        })))
        .expect(1)
        .mount(&server)
        .await;

    let entries = lister.list_children("root").await.expect("listing succeeds");

    let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["a.txt", "b.txt", "c.txt"]);
    server.verify().await;
}

#[tokio::test]
async fn test_empty_folder() {
    let (server, lister) = common::setup_graph_mock().await;
    common::mount_children(&server, "EMPTY", serde_json::json!({ "value": [] })).await;

    let entries = lister.list_children("EMPTY").await.unwrap();

    assert!(entries.is_empty());
}

#[tokio::test]
async fn test_not_found_maps_to_graph_error() {
    let (server, lister) = common::setup_graph_mock().await;
    common::mount_error(&server, "/me/drive/items/GONE/children", 404, "itemNotFound").await;

    let err = lister.list_children_page("GONE", None).await.unwrap_err();

    let graph_error = err
        .downcast_ref::<GraphError>()
        .expect("GraphError in chain");
    match graph_error {
        GraphError::NotFound(message) => assert!(message.contains("itemNotFound")),
        other => panic!("unexpected error {other:?}"),
    }
    assert!(format!("{err:#}").contains("GONE"));
}

#[tokio::test]
async fn test_unauthorized_maps_to_graph_error() {
    let (server, lister) = common::setup_graph_mock().await;
    common::mount_error(&server, "/me/drive/items/root/children", 401, "InvalidAuthenticationToken")
        .await;

    let err = lister.list_children("root").await.unwrap_err();

    let graph_error = err.downcast_ref::<GraphError>().unwrap();
    assert!(graph_error.is_auth_error());
}

#[tokio::test]
async fn test_server_error_maps_to_graph_error() {
    let (server, lister) = common::setup_graph_mock().await;
    common::mount_error(&server, "/me/drive/items/root/children", 503, "serviceNotAvailable").await;

    let err = lister.list_children("root").await.unwrap_err();

    assert!(matches!(
        err.downcast_ref::<GraphError>(),
        Some(GraphError::ServerError(_))
    ));
}

#[tokio::test]
async fn test_malformed_body_is_invalid_response() {
    let (server, lister) = common::setup_graph_mock().await;
    Mock::given(method("GET"))
        .and(path("/me/drive/items/root/children"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = lister.list_children("root").await.unwrap_err();

    assert!(matches!(
        err.downcast_ref::<GraphError>(),
        Some(GraphError::InvalidResponse(_))
    ));
}
