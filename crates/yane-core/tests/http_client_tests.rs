use secrecy::SecretString;
use serde_json::json;
use wiremock::{
    matchers::{body_json, header, method, path},
    Mock, MockServer, ResponseTemplate,
};

use yane_core::model::{ExportFormat, ExportStatus, ScanStatus};
use yane_core::{Error, ExportConfig, NessusClient, ScanService, Session};

fn client_for_uri(uri: &str) -> NessusClient {
    NessusClient::new(uri, &ExportConfig::default()).unwrap()
}

fn session_for(server: &MockServer) -> Session {
    Session::new("abc123", server.uri())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_login_returns_token() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/session"))
        .and(body_json(json!({"username": "admin", "password": "pw"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "abc123"})))
        .expect(1)
        .mount(&server)
        .await;

    let uri = server.uri();
    let token = tokio::task::spawn_blocking(move || {
        let client = client_for_uri(&uri);
        client.login("admin", &SecretString::new("pw".into()))
    })
    .await
    .unwrap()
    .unwrap();

    assert_eq!(token, "abc123");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_rejected_login_is_authentication_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/session"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"error": "Invalid Credentials"})),
        )
        .mount(&server)
        .await;

    let uri = server.uri();
    let result = tokio::task::spawn_blocking(move || {
        let client = client_for_uri(&uri);
        client.login("admin", &SecretString::new("bad".into()))
    })
    .await
    .unwrap();

    match result {
        Err(Error::Authentication(message)) => assert_eq!(message, "Invalid Credentials"),
        other => panic!("expected authentication error, got {:?}", other),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_authenticated_calls_send_token_header() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/scans"))
        .and(header("X-Cookie", "token=abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "folders": [{"id": 5, "name": "Weekly Scans", "type": "custom"}],
            "scans": [{
                "id": 42, "name": "web", "status": "completed", "folder_id": 5,
                "last_modification_date": 1700000000
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let session = session_for(&server);
    let uri = server.uri();
    let listing = tokio::task::spawn_blocking(move || {
        let client = client_for_uri(&uri);
        client.list_scans(&session)
    })
    .await
    .unwrap()
    .unwrap();

    assert_eq!(listing.folders[0].id, 5);
    assert_eq!(listing.scans[0].status, ScanStatus::Completed);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_export_status_and_download() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/scans/42/export"))
        .and(body_json(json!({"format": "csv"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"file": 777})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/scans/42/export/777/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ready"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/scans/42/export/777/download"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"Plugin ID,CVE\n".to_vec()))
        .mount(&server)
        .await;

    let session = session_for(&server);
    let uri = server.uri();
    let (file_id, status, body) = tokio::task::spawn_blocking(move || {
        let client = client_for_uri(&uri);
        let file_id = client
            .request_export(&session, 42, ExportFormat::Csv)
            .unwrap()
            .unwrap();
        let status = client.export_status(&session, 42, file_id).unwrap();
        let body = client.download(&session, 42, file_id).unwrap();
        (file_id, status, body)
    })
    .await
    .unwrap();

    assert_eq!(file_id, 777);
    assert_eq!(status, ExportStatus::Ready);
    assert_eq!(body, b"Plugin ID,CVE\n".to_vec());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_service_error_message_is_carried() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/scans/9/export"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({"error": "The requested file was not found"})),
        )
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/session"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let session = session_for(&server);
    let uri = server.uri();
    let (export, logout) = tokio::task::spawn_blocking(move || {
        let client = client_for_uri(&uri);
        let export = client.request_export(&session, 9, ExportFormat::Nessus);
        let logout = client.logout(&session);
        (export, logout)
    })
    .await
    .unwrap();

    match export {
        Err(Error::Transport { status, message }) => {
            assert_eq!(status, 404);
            assert_eq!(message, "The requested file was not found");
        }
        other => panic!("expected transport error, got {:?}", other),
    }
    assert!(logout.is_ok());
}

#[test]
fn test_client_rejects_url_without_port() {
    let err = NessusClient::new("https://nessus.local", &ExportConfig::default()).unwrap_err();
    assert!(matches!(err, Error::InvalidUrl(_)));
}
