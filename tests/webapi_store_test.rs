//! HTTP-level tests for the Web API record store

use grantflow::adapters::store::{ItemOutcome, RecordStore, WebApiStore};
use grantflow::config::{secret_string, RetryConfig, StoreConfig};
use grantflow::core::paging::PageRequest;
use grantflow::domain::{EngineError, EntityName, Payload, PendingOperation, RecordRef, StoreError};
use mockito::{Matcher, Server};
use serde_json::json;

const APP_1: &str = "5f0c8a9e-1b2c-4d3e-8f40-0a1b2c3d4e01";
const APP_2: &str = "5f0c8a9e-1b2c-4d3e-8f40-0a1b2c3d4e02";
const NOTE: &str = "5f0c8a9e-1b2c-4d3e-8f40-0a1b2c3d4e03";

fn store(server: &Server) -> WebApiStore {
    store_with_retries(server, 3)
}

fn store_with_retries(server: &Server, max_retries: usize) -> WebApiStore {
    let config = StoreConfig {
        base_url: server.url(),
        access_token: Some(secret_string("test-token".to_string())),
        retry: RetryConfig {
            max_retries,
            initial_delay_ms: 1,
            max_delay_ms: 5,
            backoff_multiplier: 2.0,
        },
        ..Default::default()
    };
    WebApiStore::new(&config, false).unwrap()
}

fn entity(name: &str) -> EntityName {
    EntityName::new(name).unwrap()
}

fn page_request() -> PageRequest {
    PageRequest {
        entity: entity("applications"),
        id_field: "applicationid".to_string(),
        query: "<fetch page='1' count='2'/>".to_string(),
        page: 1,
        page_size: 2,
    }
}

#[tokio::test]
async fn test_query_page_reads_rows_and_annotations() {
    let mut server = Server::new_async().await;
    let body = json!({
        "value": [
            { "applicationid": APP_1, "name": "First" },
            { "applicationid": APP_2, "name": "Second" }
        ],
        "@Microsoft.Dynamics.CRM.morerecords": true,
        "@Microsoft.Dynamics.CRM.fetchxmlpagingcookie": "<cookie pagenumber=\"2\" pagingcookie=\"%253ccookie%253e\" />"
    });
    let mock = server
        .mock("GET", "/api/data/v9.2/applications")
        .match_query(Matcher::UrlEncoded(
            "fetchXml".to_string(),
            "<fetch page='1' count='2'/>".to_string(),
        ))
        .match_header("authorization", "Bearer test-token")
        .match_header("prefer", Matcher::Regex("morerecords".to_string()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(body.to_string())
        .expect(1)
        .create_async()
        .await;

    let page = store(&server).query_page(&page_request()).await.unwrap();

    mock.assert_async().await;
    assert_eq!(page.items.len(), 2);
    assert_eq!(page.items[0].id.to_string(), APP_1);
    assert_eq!(page.items[1].get_str("name"), Some("Second"));
    assert!(page.more_records);
    assert!(page.raw_token.unwrap().contains("pagingcookie"));
}

#[tokio::test]
async fn test_query_page_without_annotations_is_last_page() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/api/data/v9.2/applications")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(json!({ "value": [] }).to_string())
        .create_async()
        .await;

    let page = store(&server).query_page(&page_request()).await.unwrap();
    assert!(page.items.is_empty());
    assert!(!page.more_records);
    assert!(page.raw_token.is_none());
}

#[tokio::test]
async fn test_query_retries_transient_failures() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/api/data/v9.2/applications")
        .match_query(Matcher::Any)
        .with_status(503)
        .with_body(json!({ "error": { "code": "0x80044151", "message": "Busy" } }).to_string())
        .expect(4)
        .create_async()
        .await;

    let err = store(&server).query_page(&page_request()).await.unwrap_err();

    mock.assert_async().await;
    match err {
        EngineError::Store(StoreError::ServerError { status, message }) => {
            assert_eq!(status, 503);
            assert_eq!(message, "Busy (0x80044151)");
        }
        other => panic!("expected server error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_single_retry_sends_two_requests() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/api/data/v9.2/applications")
        .match_query(Matcher::Any)
        .with_status(503)
        .expect(2)
        .create_async()
        .await;

    let result = store_with_retries(&server, 1).query_page(&page_request()).await;

    mock.assert_async().await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_authentication_failure_is_not_retried() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/api/data/v9.2/applications")
        .match_query(Matcher::Any)
        .with_status(401)
        .expect(1)
        .create_async()
        .await;

    let err = store(&server).query_page(&page_request()).await.unwrap_err();

    mock.assert_async().await;
    assert!(matches!(
        err,
        EngineError::Store(StoreError::AuthenticationFailed(_))
    ));
}

#[tokio::test]
async fn test_execute_batch_parses_multipart_response() {
    let mut server = Server::new_async().await;
    let response = format!(
        "--batchresponse_1\r\n\
         Content-Type: application/http\r\n\
         Content-Transfer-Encoding: binary\r\n\
         \r\n\
         HTTP/1.1 204 No Content\r\n\
         OData-EntityId: {url}/api/data/v9.2/notifications({NOTE})\r\n\
         \r\n\
         \r\n\
         --batchresponse_1\r\n\
         Content-Type: application/http\r\n\
         Content-Transfer-Encoding: binary\r\n\
         \r\n\
         HTTP/1.1 400 Bad Request\r\n\
         Content-Type: application/json\r\n\
         \r\n\
         {{\"error\":{{\"code\":\"0x0\",\"message\":\"Recipient is required\"}}}}\r\n\
         --batchresponse_1--\r\n",
        url = server.url()
    );
    let mock = server
        .mock("POST", "/api/data/v9.2/$batch")
        .match_header("prefer", "odata.continue-on-error")
        .match_header("content-type", Matcher::Regex("^multipart/mixed; boundary=batch_".to_string()))
        .match_body(Matcher::Regex("POST /api/data/v9.2/notifications HTTP/1.1".to_string()))
        .with_status(200)
        .with_header("content-type", "multipart/mixed; boundary=batchresponse_1")
        .with_body(response)
        .expect(1)
        .create_async()
        .await;

    let mut payload = Payload::new();
    payload.insert("recipient".to_string(), json!("alice"));
    let operations = vec![
        PendingOperation::create(entity("notifications"), payload),
        PendingOperation::create(entity("notifications"), Payload::new()),
    ];

    let outcomes = store(&server).execute_batch(&operations).await.unwrap();

    mock.assert_async().await;
    assert_eq!(outcomes.len(), 2);
    assert_eq!(outcomes[0], ItemOutcome::created(NOTE.parse().unwrap()));
    match &outcomes[1] {
        ItemOutcome::Failed { message } => assert!(message.contains("Recipient is required")),
        other => panic!("expected failure, got {other:?}"),
    }
}

#[tokio::test]
async fn test_batch_is_not_retried_on_server_error() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/api/data/v9.2/$batch")
        .with_status(500)
        .with_body("upstream failure")
        .expect(1)
        .create_async()
        .await;

    let operations = vec![PendingOperation::create(entity("notifications"), Payload::new())];
    let err = store(&server).execute_batch(&operations).await.unwrap_err();

    mock.assert_async().await;
    assert!(matches!(
        err,
        EngineError::Store(StoreError::ServerError { status: 500, .. })
    ));
}

#[tokio::test]
async fn test_batch_is_retried_when_throttled() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/api/data/v9.2/$batch")
        .with_status(429)
        .expect(4)
        .create_async()
        .await;

    let operations = vec![PendingOperation::create(entity("notifications"), Payload::new())];
    let err = store(&server).execute_batch(&operations).await.unwrap_err();

    mock.assert_async().await;
    assert!(matches!(err, EngineError::Store(StoreError::Throttled(_))));
}

#[tokio::test]
async fn test_create_reads_entity_id_header() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/api/data/v9.2/questionnaires")
        .match_body(Matcher::Json(json!({ "name": "Capital grant (copy)" })))
        .with_status(204)
        .with_header(
            "OData-EntityId",
            &format!("{}/api/data/v9.2/questionnaires({NOTE})", server.url()),
        )
        .expect(1)
        .create_async()
        .await;

    let mut payload = Payload::new();
    payload.insert("name".to_string(), json!("Capital grant (copy)"));
    let created = store(&server)
        .create(&entity("questionnaires"), &payload)
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(created.entity.as_str(), "questionnaires");
    assert_eq!(created.id.to_string(), NOTE);
}

#[tokio::test]
async fn test_create_without_entity_id_is_invalid_response() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/api/data/v9.2/questionnaires")
        .with_status(204)
        .create_async()
        .await;

    let err = store(&server)
        .create(&entity("questionnaires"), &Payload::new())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Store(StoreError::InvalidResponse(_))
    ));
}

#[tokio::test]
async fn test_delete_of_missing_record_succeeds() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("DELETE", format!("/api/data/v9.2/questionnaires({NOTE})").as_str())
        .with_status(404)
        .expect(1)
        .create_async()
        .await;

    let target = RecordRef::new(entity("questionnaires"), NOTE.parse().unwrap());
    store(&server).delete(&target).await.unwrap();

    mock.assert_async().await;
}

#[tokio::test]
async fn test_dry_run_sends_no_writes() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let config = StoreConfig {
        base_url: server.url(),
        ..Default::default()
    };
    let store = WebApiStore::new(&config, true).unwrap();

    let created = store
        .create(&entity("questionnaires"), &Payload::new())
        .await
        .unwrap();
    store.delete(&created).await.unwrap();

    mock.assert_async().await;
}
