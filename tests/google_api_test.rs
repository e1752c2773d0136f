//! Google API layer tests against a mock HTTP server.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_json, method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use remontnik::core::retry::RetryConfig;
use remontnik::google::auth::TokenProvider;
use remontnik::google::drive::DriveClient;
use remontnik::google::sheets::SheetsClient;
use remontnik::models::request::{MaintenanceRequest, RequestStatus};
use remontnik::models::user::{Role, User};
use remontnik::services::requests;
use remontnik::services::users::UserService;

const SHEET_ID: &str = "sheet-test";

fn sheets_client(server: &MockServer) -> Arc<SheetsClient> {
    Arc::new(
        SheetsClient::with_base_url(
            reqwest::Client::new(),
            Arc::new(TokenProvider::fixed("test-token")),
            SHEET_ID.to_string(),
            server.uri(),
        )
        .with_retry(RetryConfig::no_retry()),
    )
}

fn drive_client(server: &MockServer) -> DriveClient {
    DriveClient::with_base_url(
        reqwest::Client::new(),
        Arc::new(TokenProvider::fixed("test-token")),
        "folder-test".to_string(),
        server.uri(),
    )
    .with_retry(RetryConfig::no_retry())
}

fn users_values() -> serde_json::Value {
    json!({
        "values": [
            ["telegram_id", "name", "role"],
            ["111", "Мария", "housekeeper"],
            ["222", "Иван", "technician"],
            ["oops", "broken row", "admin"]
        ]
    })
}

async fn mount_users_sheet(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(format!("/v4/spreadsheets/{SHEET_ID}/values/users")))
        .respond_with(ResponseTemplate::new(200).set_body_json(users_values()))
        .mount(server)
        .await;
}

#[tokio::test]
async fn lists_users_and_skips_malformed_rows() {
    let server = MockServer::start().await;
    mount_users_sheet(&server).await;

    let users = sheets_client(&server).list_users().await.unwrap();
    assert_eq!(
        users,
        vec![
            User { telegram_id: 111, name: "Мария".to_string(), role: Role::Housekeeper },
            User { telegram_id: 222, name: "Иван".to_string(), role: Role::Technician },
        ]
    );
}

#[tokio::test]
async fn adding_a_user_appends_a_row() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("/v4/spreadsheets/{SHEET_ID}/values/users!A1:append")))
        .and(query_param("valueInputOption", "RAW"))
        .and(body_json(json!({ "values": [["333", "Олег", "technician"]] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let user = User { telegram_id: 333, name: "Олег".to_string(), role: Role::Technician };
    sheets_client(&server).add_user(&user).await.unwrap();
}

#[tokio::test]
async fn deleting_a_user_removes_its_row_by_index() {
    let server = MockServer::start().await;
    mount_users_sheet(&server).await;
    Mock::given(method("GET"))
        .and(path(format!("/v4/spreadsheets/{SHEET_ID}")))
        .and(query_param("fields", "sheets.properties"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "sheets": [
                { "properties": { "sheetId": 0, "title": "users" } },
                { "properties": { "sheetId": 77, "title": "requests" } }
            ]
        })))
        .mount(&server)
        .await;
    // "222" is the third row of the worksheet
    Mock::given(method("POST"))
        .and(path(format!("/v4/spreadsheets/{SHEET_ID}:batchUpdate")))
        .and(body_json(json!({
            "requests": [{
                "deleteDimension": {
                    "range": { "sheetId": 0, "dimension": "ROWS", "startIndex": 2, "endIndex": 3 }
                }
            }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let client = sheets_client(&server);
    assert!(client.delete_user(222).await.unwrap());
    assert!(!client.delete_user(999).await.unwrap());
}

fn requests_values(status: &str, assignee_id: &str) -> serde_json::Value {
    json!({
        "values": [
            ["request_uuid", "status"],
            [
                "uuid-1", status, "номер 204", "Сантехника", "", "111", "Мария",
                "2026-08-23T10:00:00Z", assignee_id, "", "", ""
            ]
        ]
    })
}

#[tokio::test]
async fn accept_moves_a_new_request_into_progress() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/v4/spreadsheets/{SHEET_ID}/values/requests")))
        .respond_with(ResponseTemplate::new(200).set_body_json(requests_values("new", "")))
        .mount(&server)
        .await;
    // status, assignee id, assignee name, accepted_at
    Mock::given(method("PUT"))
        .and(path_regex(format!(r"^/v4/spreadsheets/{SHEET_ID}/values/requests!.*")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(4)
        .mount(&server)
        .await;

    assert!(sheets_client(&server).accept_request("uuid-1", 222, "Иван").await.unwrap());
}

#[tokio::test]
async fn accept_refuses_a_request_already_in_progress() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/v4/spreadsheets/{SHEET_ID}/values/requests")))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(requests_values("in_progress", "222")),
        )
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path_regex(r"^/v4/spreadsheets/.*"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(&server)
        .await;

    assert!(!sheets_client(&server).accept_request("uuid-1", 333, "Олег").await.unwrap());
}

#[tokio::test]
async fn only_the_assignee_completes_a_request_in_progress() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/v4/spreadsheets/{SHEET_ID}/values/requests")))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(requests_values("in_progress", "222")),
        )
        .mount(&server)
        .await;
    // status + completed_at for the successful call only
    Mock::given(method("PUT"))
        .and(path_regex(format!(r"^/v4/spreadsheets/{SHEET_ID}/values/requests!.*")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(2)
        .mount(&server)
        .await;

    let client = sheets_client(&server);
    assert!(!client.complete_request("uuid-1", 333).await.unwrap());
    assert!(client.complete_request("uuid-1", 222).await.unwrap());
}

#[tokio::test]
async fn completed_requests_cannot_be_completed_again() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/v4/spreadsheets/{SHEET_ID}/values/requests")))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(requests_values("completed", "222")),
        )
        .mount(&server)
        .await;

    assert!(!sheets_client(&server).complete_request("uuid-1", 222).await.unwrap());
}

#[tokio::test]
async fn creating_a_request_appends_the_full_row() {
    let server = MockServer::start().await;
    let mut request = MaintenanceRequest::new(111, "Мария".to_string());
    request.location = Some("номер 204".to_string());
    request.issue_type = Some("Сантехника".to_string());

    let row = request.to_row();
    Mock::given(method("POST"))
        .and(path(format!("/v4/spreadsheets/{SHEET_ID}/values/requests!A1:append")))
        .and(body_json(json!({ "values": [row] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    sheets_client(&server).create_request(&request).await.unwrap();
}

#[tokio::test]
async fn rollback_deletes_the_draft_row_by_uuid() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/v4/spreadsheets/{SHEET_ID}/values/requests")))
        .respond_with(ResponseTemplate::new(200).set_body_json(requests_values("creating", "")))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/v4/spreadsheets/{SHEET_ID}")))
        .and(query_param("fields", "sheets.properties"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "sheets": [{ "properties": { "sheetId": 77, "title": "requests" } }]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("/v4/spreadsheets/{SHEET_ID}:batchUpdate")))
        .and(body_json(json!({
            "requests": [{
                "deleteDimension": {
                    "range": { "sheetId": 77, "dimension": "ROWS", "startIndex": 1, "endIndex": 2 }
                }
            }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let client = sheets_client(&server);
    assert!(client.delete_request("uuid-1").await.unwrap());
    assert!(!client.delete_request("uuid-missing").await.unwrap());
}

#[tokio::test]
async fn failed_photo_upload_rolls_back_the_draft_row() {
    let server = MockServer::start().await;
    let mut request = MaintenanceRequest::new(111, "Мария".to_string());
    request.location = Some("номер 204".to_string());
    request.issue_type = Some("Сантехника".to_string());
    let uuid = request.request_uuid.to_string();

    // the draft row goes in once
    Mock::given(method("POST"))
        .and(path(format!("/v4/spreadsheets/{SHEET_ID}/values/requests!A1:append")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;
    // the upload fails
    Mock::given(method("POST"))
        .and(path("/upload/drive/v3/files"))
        .respond_with(ResponseTemplate::new(500).set_body_string("backend error"))
        .expect(1)
        .mount(&server)
        .await;
    // the rollback finds the draft by uuid and deletes its row
    Mock::given(method("GET"))
        .and(path(format!("/v4/spreadsheets/{SHEET_ID}/values/requests")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "values": [["request_uuid", "status"], [uuid, "creating"]]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/v4/spreadsheets/{SHEET_ID}")))
        .and(query_param("fields", "sheets.properties"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "sheets": [{ "properties": { "sheetId": 77, "title": "requests" } }]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("/v4/spreadsheets/{SHEET_ID}:batchUpdate")))
        .and(body_json(json!({
            "requests": [{
                "deleteDimension": {
                    "range": { "sheetId": 77, "dimension": "ROWS", "startIndex": 1, "endIndex": 2 }
                }
            }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let sheets = sheets_client(&server);
    let drive = drive_client(&server);
    let result = requests::store_with_photo(&sheets, &drive, &mut request, b"JPEG").await;
    assert!(result.is_err());
    assert_eq!(request.status, RequestStatus::Creating);
    assert_eq!(request.photo_before_url, None);
}

#[tokio::test]
async fn drive_upload_returns_the_view_link_and_shares_the_file() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/upload/drive/v3/files"))
        .and(query_param("uploadType", "multipart"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "file-1",
            "webViewLink": "https://drive.google.com/file/d/file-1/view"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/drive/v3/files/file-1/permissions"))
        .and(body_json(json!({ "type": "anyone", "role": "reader" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let link = drive_client(&server).upload_photo("request_x.jpg", b"JPEG").await.unwrap();
    assert_eq!(link, "https://drive.google.com/file/d/file-1/view");
}

#[tokio::test]
async fn drive_upload_propagates_api_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/upload/drive/v3/files"))
        .respond_with(ResponseTemplate::new(403).set_body_string("quota exceeded"))
        .mount(&server)
        .await;

    assert!(drive_client(&server).upload_photo("request_x.jpg", b"JPEG").await.is_err());
}

#[tokio::test]
async fn user_cache_serves_repeat_lookups_without_refetching() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/v4/spreadsheets/{SHEET_ID}/values/users")))
        .respond_with(ResponseTemplate::new(200).set_body_json(users_values()))
        .expect(1)
        .mount(&server)
        .await;

    let users = UserService::with_ttl(sheets_client(&server), Duration::from_secs(60));
    assert_eq!(users.get_all().await.len(), 2);
    assert_eq!(users.get(111).await.unwrap().role, Role::Housekeeper);
    assert!(users.has_role(222, &[Role::Technician]).await);
}

#[tokio::test]
async fn user_cache_falls_back_to_stale_data_on_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/v4/spreadsheets/{SHEET_ID}/values/users")))
        .respond_with(ResponseTemplate::new(200).set_body_json(users_values()))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/v4/spreadsheets/{SHEET_ID}/values/users")))
        .respond_with(ResponseTemplate::new(500).set_body_string("backend error"))
        .mount(&server)
        .await;

    let users = UserService::with_ttl(sheets_client(&server), Duration::ZERO);
    assert_eq!(users.get_all().await.len(), 2);
    // the refetch hits a 500 and the stale copy is served
    assert_eq!(users.get_all().await.len(), 2);
}

#[tokio::test]
async fn user_mutations_invalidate_the_cache() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/v4/spreadsheets/{SHEET_ID}/values/users")))
        .respond_with(ResponseTemplate::new(200).set_body_json(users_values()))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("/v4/spreadsheets/{SHEET_ID}/values/users!A1:append")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let users = UserService::with_ttl(sheets_client(&server), Duration::from_secs(60));
    users.get_all().await;
    users
        .add(&User { telegram_id: 333, name: "Олег".to_string(), role: Role::Technician })
        .await
        .unwrap();
    // cache was dropped, this refetches
    users.get_all().await;
}
