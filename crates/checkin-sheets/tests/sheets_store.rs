// crates/checkin-sheets/tests/sheets_store.rs
// ============================================================================
// Module: Sheets Store Tests
// Description: Wire-level tests for the spreadsheet participant store.
// Purpose: Validate request shapes, decoding, limits, and error mapping.
// Dependencies: checkin-sheets, checkin-config, checkin-core, tiny_http
// ============================================================================

//! ## Overview
//! A local `tiny_http` server stands in for the values API. Each test
//! captures the requests the store sends and replies with canned bodies.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    clippy::float_cmp,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::fs;
use std::sync::Arc;
use std::sync::mpsc;
use std::thread;

use checkin_config::SheetsAuthConfig;
use checkin_config::SheetsConfig;
use checkin_core::CellValue;
use checkin_core::ColumnWindow;
use checkin_core::MemoryAuditSink;
use checkin_core::ParticipantStore;
use checkin_core::StoreError;
use checkin_sheets::SheetsParticipantStore;
use serde_json::Value;
use tempfile::TempDir;
use tiny_http::Header;
use tiny_http::Response;
use tiny_http::Server;

// ============================================================================
// SECTION: Test Helpers
// ============================================================================

/// Request observed by the fake API.
struct Captured {
    /// HTTP method.
    method: String,
    /// Path and query.
    url: String,
    /// Authorization header, if sent.
    authorization: Option<String>,
    /// Request body.
    body: String,
}

/// Spawns a fake API answering each request with the next canned reply.
fn spawn_server(replies: Vec<(u16, String)>) -> (String, mpsc::Receiver<Captured>) {
    let server = Server::http("127.0.0.1:0").unwrap();
    let addr = server.server_addr().to_ip().unwrap();
    let (sender, receiver) = mpsc::channel();
    thread::spawn(move || {
        for (status, body) in replies {
            let Ok(mut request) = server.recv() else {
                return;
            };
            let mut request_body = String::new();
            let _ = request.as_reader().read_to_string(&mut request_body);
            let authorization = request
                .headers()
                .iter()
                .find(|header| header.field.equiv("Authorization"))
                .map(|header| header.value.to_string());
            let _ = sender.send(Captured {
                method: request.method().to_string(),
                url: request.url().to_string(),
                authorization,
                body: request_body,
            });
            let content_type = Header::from_bytes("Content-Type", "application/json").unwrap();
            let response =
                Response::from_string(body).with_status_code(status).with_header(content_type);
            let _ = request.respond(response);
        }
    });
    (format!("http://{addr}"), receiver)
}

/// Writes a token file and returns a store configured for the fake API.
fn local_store(base_url: &str) -> (SheetsParticipantStore, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let token_path = dir.path().join("token");
    fs::write(&token_path, "test-token\n").unwrap();
    let config = SheetsConfig {
        api_base_url: base_url.to_string(),
        allow_http: true,
        timeout_ms: 5_000,
        auth: SheetsAuthConfig::BearerToken {
            token_env: None,
            token_file: Some(token_path.to_string_lossy().into_owned()),
        },
        ..SheetsConfig::new("sheet-123")
    };
    (SheetsParticipantStore::new(config), dir)
}

/// Renders a values API read response.
fn values_body(rows: &Value) -> String {
    serde_json::json!({
        "range": "Participants!A1:F10",
        "majorDimension": "ROWS",
        "values": rows,
    })
    .to_string()
}

// ============================================================================
// SECTION: Reads
// ============================================================================

#[test]
fn fetch_all_reads_fixed_range_with_bearer_token() {
    let body = values_body(&serde_json::json!([
        ["QR Code", "Name", "Surname", "Visited", "Donation", "Updated"],
        ["Q1", "Ann", "Lee", false, 0, ""],
        ["Q2", "Bob", "Ray", true, 12.5, "2024-05-01T12:30:00"],
        ["Q3"],
    ]));
    let (url, requests) = spawn_server(vec![(200, body)]);
    let (store, _dir) = local_store(&url);

    let participants = store.fetch_all().unwrap();

    assert_eq!(participants.len(), 3);
    assert!(!participants[0].present);
    assert!(participants[1].present);
    assert_eq!(participants[1].donation_total, 12.5);
    assert_eq!(participants[2].identifier, "Q3");
    assert_eq!(participants[2].given_name, "");
    let request = requests.recv().unwrap();
    assert_eq!(request.method, "GET");
    assert!(request.url.starts_with("/v4/spreadsheets/sheet-123/values/Participants!A:F?"));
    assert!(request.url.contains("valueRenderOption=UNFORMATTED_VALUE"));
    assert!(request.url.contains("dateTimeRenderOption=FORMATTED_STRING"));
    assert_eq!(request.authorization.as_deref(), Some("Bearer test-token"));
}

#[test]
fn empty_range_yields_no_participants() {
    let body = r#"{"range":"Participants!A1:F1000"}"#.to_string();
    let (url, _requests) = spawn_server(vec![(200, body)]);
    let (store, _dir) = local_store(&url);
    assert!(store.fetch_all().unwrap().is_empty());
}

#[test]
fn malformed_cells_are_reported_not_fatal() {
    let body = values_body(&serde_json::json!([
        ["header"],
        ["Q1", "Ann", "Lee", "FALSE", "lots", ""],
    ]));
    let (url, _requests) = spawn_server(vec![(200, body)]);
    let (store, _dir) = local_store(&url);
    let sink = Arc::new(MemoryAuditSink::new());
    let store = store.with_audit(sink.clone());

    let participants = store.fetch_all().unwrap();

    assert_eq!(participants[0].donation_total, 0.0);
    let lines = sink.lines();
    assert!(lines.iter().any(|line| line.contains("\"event\":\"store_client\"")));
    assert!(lines.iter().any(|line| line.contains("\"raw\":\"lots\"")));
}

// ============================================================================
// SECTION: Writes
// ============================================================================

#[test]
fn check_in_window_is_written_raw_to_offset_row() {
    let (url, requests) = spawn_server(vec![(200, r#"{"updatedCells":3}"#.into())]);
    let (store, _dir) = local_store(&url);

    store
        .update_range(0, ColumnWindow::CHECK_IN, &[
            CellValue::text("TRUE"),
            CellValue::Number(0.0),
            CellValue::text("2024-05-01T12:30:00"),
        ])
        .unwrap();

    let request = requests.recv().unwrap();
    assert_eq!(request.method, "PUT");
    assert_eq!(
        request.url,
        "/v4/spreadsheets/sheet-123/values/Participants!D2:F2?valueInputOption=RAW"
    );
    let body: Value = serde_json::from_str(&request.body).unwrap();
    assert_eq!(body["range"], "Participants!D2:F2");
    assert_eq!(body["majorDimension"], "ROWS");
    assert_eq!(body["values"], serde_json::json!([["TRUE", 0.0, "2024-05-01T12:30:00"]]));
}

#[test]
fn donation_window_targets_columns_e_to_f() {
    let (url, requests) = spawn_server(vec![(200, "{}".into())]);
    let (store, _dir) = local_store(&url);

    store
        .update_range(4, ColumnWindow::DONATION, &[
            CellValue::Number(25.0),
            CellValue::text("2024-05-01T12:30:00"),
        ])
        .unwrap();

    let request = requests.recv().unwrap();
    assert!(request.url.contains("/values/Participants!E6:F6?"));
}

#[test]
fn width_mismatch_is_rejected_before_sending() {
    let (store, _dir) = local_store("http://127.0.0.1:9");
    let err =
        store.update_range(0, ColumnWindow::DONATION, &[CellValue::Number(1.0)]).unwrap_err();
    assert!(matches!(err, StoreError::Protocol(_)));
}

// ============================================================================
// SECTION: Failures
// ============================================================================

#[test]
fn forbidden_maps_to_auth_error() {
    let body = r#"{"error":{"code":403,"message":"The caller does not have permission"}}"#;
    let (url, _requests) = spawn_server(vec![(403, body.into())]);
    let (store, _dir) = local_store(&url);
    let err = store.fetch_all().unwrap_err();
    assert!(matches!(&err, StoreError::Auth(message) if message.contains("permission")));
}

#[test]
fn server_error_maps_to_unavailable() {
    let (url, _requests) = spawn_server(vec![(503, "{}".into())]);
    let (store, _dir) = local_store(&url);
    assert!(matches!(store.fetch_all(), Err(StoreError::Unavailable(_))));
}

#[test]
fn oversized_response_is_rejected() {
    let big = values_body(&serde_json::json!([["x".repeat(4096)]]));
    let (url, _requests) = spawn_server(vec![(200, big)]);
    let (store, _dir) = local_store(&url);
    let mut config = store.config().clone();
    config.max_response_bytes = 1024;
    let store = SheetsParticipantStore::new(config);
    assert!(matches!(store.fetch_all(), Err(StoreError::Protocol(_))));
}

#[test]
fn unreachable_host_is_unavailable() {
    let server = Server::http("127.0.0.1:0").unwrap();
    let addr = server.server_addr().to_ip().unwrap();
    drop(server);
    let (store, _dir) = local_store(&format!("http://{addr}"));
    assert!(matches!(store.fetch_all(), Err(StoreError::Unavailable(_))));
}

#[test]
fn missing_credential_fails_and_retries_on_next_call() {
    let config = SheetsConfig {
        api_base_url: "http://127.0.0.1:9".to_string(),
        allow_http: true,
        auth: SheetsAuthConfig::BearerToken {
            token_env: None,
            token_file: Some("/nonexistent/checkin/token".to_string()),
        },
        ..SheetsConfig::new("sheet-123")
    };
    let sink = Arc::new(MemoryAuditSink::new());
    let store = SheetsParticipantStore::new(config).with_audit(sink.clone());
    assert!(matches!(store.fetch_all(), Err(StoreError::Config(_))));
    assert!(matches!(store.fetch_all(), Err(StoreError::Config(_))));
    let failures = sink.lines().iter().filter(|line| line.contains("init_failed")).count();
    assert_eq!(failures, 2);
}

#[test]
fn cleartext_url_requires_opt_in() {
    let (store, _dir) = local_store("http://127.0.0.1:9");
    let mut config = store.config().clone();
    config.allow_http = false;
    let store = SheetsParticipantStore::new(config);
    assert!(matches!(store.fetch_all(), Err(StoreError::Config(_))));
}
