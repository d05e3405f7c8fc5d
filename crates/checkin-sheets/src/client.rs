// crates/checkin-sheets/src/client.rs
// ============================================================================
// Module: Sheets Participant Store
// Description: Participant store over the spreadsheet values API.
// Purpose: Fetch the participant range and write single-row cell windows.
// Dependencies: checkin-core, checkin-config, reqwest, serde_json
// ============================================================================

//! ## Overview
//! Reads use `GET /v4/spreadsheets/{id}/values/{range}` with unformatted
//! values so numbers and booleans arrive as JSON scalars. Writes use
//! `PUT` on the same resource with `valueInputOption=RAW`, so text is stored
//! literally and never re-interpreted by the spreadsheet.
//!
//! The blocking HTTP client is built on first use and kept in a
//! [`OnceLock`]; a failed build is reported and retried on the next call.
//! Redirects are disabled and response bodies are size-limited.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Read;
use std::sync::Arc;
use std::sync::OnceLock;
use std::time::Duration;

use checkin_config::SheetsConfig;
use checkin_core::AuditSink;
use checkin_core::CellValue;
use checkin_core::ColumnWindow;
use checkin_core::NoopAuditSink;
use checkin_core::Participant;
use checkin_core::ParticipantStore;
use checkin_core::RowDiagnosticEvent;
use checkin_core::StoreClientEvent;
use checkin_core::StoreError;
use checkin_core::parse_table;
use reqwest::StatusCode;
use reqwest::Url;
use reqwest::blocking::Client;
use reqwest::blocking::RequestBuilder;
use reqwest::blocking::Response;
use reqwest::header::CONTENT_TYPE;
use reqwest::redirect::Policy;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::auth::Credential;
use crate::range::read_range;
use crate::range::write_range;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum length of a remote error message carried into a store error.
const MAX_REMOTE_MESSAGE_CHARS: usize = 200;

// ============================================================================
// SECTION: Wire Types
// ============================================================================

/// Body of a values read.
#[derive(Debug, Deserialize)]
struct ValueRange {
    /// Rows of cells; absent when the range is empty.
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

/// Body of a values write.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ValueRangeUpdate<'a> {
    /// Target range in A1 notation.
    range: &'a str,
    /// Row-major layout.
    major_dimension: &'static str,
    /// One row of values.
    values: [&'a [CellValue]; 1],
}

/// Error envelope returned by the API.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    /// Error detail.
    error: ErrorDetail,
}

/// Error detail returned by the API.
#[derive(Debug, Deserialize)]
struct ErrorDetail {
    /// Human-readable message.
    #[serde(default)]
    message: String,
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// Initialized HTTP state shared by every request.
struct SheetsClient {
    /// Blocking HTTP client.
    http: Client,
    /// Resolved credential.
    credential: Credential,
    /// Parsed API base URL.
    base: Url,
}

/// Participant store backed by a remote spreadsheet.
pub struct SheetsParticipantStore {
    /// Spreadsheet and transport settings.
    config: SheetsConfig,
    /// Lazily built client.
    client: OnceLock<SheetsClient>,
    /// Sink for row diagnostics and client lifecycle events.
    audit: Arc<dyn AuditSink>,
}

impl SheetsParticipantStore {
    /// Creates a store; no network or credential access happens until the
    /// first call.
    #[must_use]
    pub fn new(config: SheetsConfig) -> Self {
        Self {
            config,
            client: OnceLock::new(),
            audit: Arc::new(NoopAuditSink),
        }
    }

    /// Attaches an audit sink.
    #[must_use]
    pub fn with_audit(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    /// Returns the store configuration.
    #[must_use]
    pub const fn config(&self) -> &SheetsConfig {
        &self.config
    }

    /// Returns the shared client, building it on first use.
    fn client(&self) -> Result<&SheetsClient, StoreError> {
        if let Some(client) = self.client.get() {
            return Ok(client);
        }
        match build_client(&self.config) {
            Ok(client) => {
                if self.client.set(client).is_ok() {
                    self.audit.record_store_client(&StoreClientEvent::new("initialized", None));
                }
            }
            Err(err) => {
                let event = StoreClientEvent::new("init_failed", Some(err.to_string()));
                self.audit.record_store_client(&event);
                return Err(err);
            }
        }
        self.client
            .get()
            .ok_or_else(|| StoreError::Config("sheets client unavailable".to_string()))
    }

    /// Returns the values URL for `range`.
    fn values_url(&self, client: &SheetsClient, range: &str) -> Result<Url, StoreError> {
        let mut url = client.base.clone();
        url.path_segments_mut()
            .map_err(|()| StoreError::Config("sheets api base url cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(["v4", "spreadsheets", self.config.spreadsheet_id.trim(), "values", range]);
        if let Credential::ApiKey(key) = &client.credential {
            url.query_pairs_mut().append_pair("key", key);
        }
        Ok(url)
    }

    /// Attaches a bearer token when configured and sends the request.
    fn send(&self, client: &SheetsClient, request: RequestBuilder) -> Result<Response, StoreError> {
        let request = match &client.credential {
            Credential::Bearer(token) => request.bearer_auth(token),
            Credential::ApiKey(_) => request,
        };
        let mut response = request
            .send()
            .map_err(|err| StoreError::Unavailable(format!("sheets request failed: {err}")))?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = read_response_limited(&mut response, self.config.max_response_bytes)
            .unwrap_or_default();
        Err(status_error(status, &body))
    }
}

impl ParticipantStore for SheetsParticipantStore {
    fn fetch_all(&self) -> Result<Vec<Participant>, StoreError> {
        let client = self.client()?;
        let mut url = self.values_url(client, &read_range(&self.config.sheet_name))?;
        url.query_pairs_mut()
            .append_pair("majorDimension", "ROWS")
            .append_pair("valueRenderOption", "UNFORMATTED_VALUE")
            .append_pair("dateTimeRenderOption", "FORMATTED_STRING");
        let mut response = self.send(client, client.http.get(url))?;
        let body = read_response_limited(&mut response, self.config.max_response_bytes)?;
        let range: ValueRange = serde_json::from_slice(&body)
            .map_err(|err| StoreError::Protocol(format!("invalid values response: {err}")))?;
        let rows: Vec<Vec<String>> = range
            .values
            .iter()
            .map(|row| row.iter().map(cell_text).collect())
            .collect();
        let table = parse_table(&rows);
        for diagnostic in &table.diagnostics {
            self.audit.record_row_diagnostic(&RowDiagnosticEvent::new(diagnostic));
        }
        Ok(table.participants)
    }

    fn update_range(
        &self,
        row_index: usize,
        columns: ColumnWindow,
        values: &[CellValue],
    ) -> Result<(), StoreError> {
        if values.len() != columns.width() {
            return Err(StoreError::Protocol(format!(
                "expected {} values for range, got {}",
                columns.width(),
                values.len()
            )));
        }
        let client = self.client()?;
        let range = write_range(&self.config.sheet_name, row_index, columns);
        let mut url = self.values_url(client, &range)?;
        url.query_pairs_mut().append_pair("valueInputOption", "RAW");
        let payload = serde_json::to_vec(&ValueRangeUpdate {
            range: &range,
            major_dimension: "ROWS",
            values: [values],
        })
        .map_err(|err| StoreError::Protocol(format!("failed to encode update: {err}")))?;
        let request = client.http.put(url).header(CONTENT_TYPE, "application/json").body(payload);
        let mut response = self.send(client, request)?;
        read_response_limited(&mut response, self.config.max_response_bytes)?;
        Ok(())
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Builds the HTTP client and resolves the credential.
fn build_client(config: &SheetsConfig) -> Result<SheetsClient, StoreError> {
    let base = Url::parse(config.api_base_url.trim())
        .map_err(|err| StoreError::Config(format!("invalid sheets api base url: {err}")))?;
    match base.scheme() {
        "https" => {}
        "http" if config.allow_http => {}
        _ => return Err(StoreError::Config("unsupported sheets api url scheme".to_string())),
    }
    let credential = Credential::resolve(&config.auth)?;
    let http = Client::builder()
        .timeout(Duration::from_millis(config.timeout_ms))
        .user_agent(config.user_agent.clone())
        .redirect(Policy::none())
        .build()
        .map_err(|_| StoreError::Config("http client build failed".to_string()))?;
    Ok(SheetsClient {
        http,
        credential,
        base,
    })
}

/// Renders one JSON cell as the text a spreadsheet would display.
fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(true) => "TRUE".to_string(),
        Value::Bool(false) => "FALSE".to_string(),
        Value::Number(number) => number.to_string(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Maps a non-success status to a store error.
fn status_error(status: StatusCode, body: &[u8]) -> StoreError {
    let remote = serde_json::from_slice::<ErrorEnvelope>(body)
        .map(|envelope| envelope.error.message)
        .unwrap_or_default();
    let remote: String = remote.chars().take(MAX_REMOTE_MESSAGE_CHARS).collect();
    let detail = if remote.is_empty() {
        format!("sheets returned {status}")
    } else {
        format!("sheets returned {status}: {remote}")
    };
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => StoreError::Auth(detail),
        StatusCode::TOO_MANY_REQUESTS => StoreError::Unavailable(detail),
        _ if status.is_server_error() => StoreError::Unavailable(detail),
        _ => StoreError::Protocol(detail),
    }
}

/// Reads the response body while enforcing a byte limit.
fn read_response_limited(
    response: &mut Response,
    max_bytes: usize,
) -> Result<Vec<u8>, StoreError> {
    let expected_len = response.content_length();
    let max_bytes_u64 = u64::try_from(max_bytes)
        .map_err(|_| StoreError::Config("response size limit exceeds u64".to_string()))?;
    if let Some(expected) = expected_len
        && expected > max_bytes_u64
    {
        return Err(StoreError::Protocol("sheets response exceeds size limit".to_string()));
    }
    let mut buf = Vec::new();
    let limit = max_bytes_u64.saturating_add(1);
    let mut handle = response.take(limit);
    handle
        .read_to_end(&mut buf)
        .map_err(|err| StoreError::Unavailable(format!("failed to read sheets response: {err}")))?;
    if buf.len() > max_bytes {
        return Err(StoreError::Protocol("sheets response exceeds size limit".to_string()));
    }
    if let Some(expected) = expected_len {
        let expected = usize::try_from(expected)
            .map_err(|_| StoreError::Protocol("invalid response length".to_string()))?;
        if buf.len() < expected {
            return Err(StoreError::Unavailable("sheets response truncated".to_string()));
        }
    }
    Ok(buf)
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use checkin_core::StoreError;
    use reqwest::StatusCode;
    use serde_json::json;

    use super::cell_text;
    use super::status_error;

    #[test]
    fn json_cells_render_as_sheet_text() {
        assert_eq!(cell_text(&json!(true)), "TRUE");
        assert_eq!(cell_text(&json!(false)), "FALSE");
        assert_eq!(cell_text(&json!(12.5)), "12.5");
        assert_eq!(cell_text(&json!(600)), "600");
        assert_eq!(cell_text(&json!(null)), "");
        assert_eq!(cell_text(&json!("Ann")), "Ann");
    }

    #[test]
    fn statuses_map_to_store_errors() {
        let body = br#"{"error":{"code":403,"message":"The caller does not have permission"}}"#;
        let err = status_error(StatusCode::FORBIDDEN, body);
        assert!(matches!(&err, StoreError::Auth(message) if message.contains("permission")));
        assert!(matches!(
            status_error(StatusCode::SERVICE_UNAVAILABLE, b""),
            StoreError::Unavailable(_)
        ));
        assert!(matches!(
            status_error(StatusCode::TOO_MANY_REQUESTS, b""),
            StoreError::Unavailable(_)
        ));
        assert!(matches!(
            status_error(StatusCode::BAD_REQUEST, b"not json"),
            StoreError::Protocol(_)
        ));
    }
}
