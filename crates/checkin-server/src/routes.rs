// crates/checkin-server/src/routes.rs
// ============================================================================
// Module: Participant Routes
// Description: HTTP handlers for the participant API.
// Purpose: Translate JSON requests into service calls and service results into
//          status codes and `{"error": ...}` bodies.
// Dependencies: checkin-core, axum, tower-http, tokio
// ============================================================================

//! ## Overview
//! Each handler parses its body, runs the service call on the blocking pool
//! (the store client is synchronous), maps the outcome to a response, and
//! records one `participant_request` audit event. Security posture: request
//! bodies are untrusted; size is capped before parsing and QR codes are kept
//! out of audit output unless explicitly enabled.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::Instant;

use axum::Json;
use axum::Router;
use axum::body::Bytes;
use axum::extract::DefaultBodyLimit;
use axum::extract::State;
use axum::extract::rejection::BytesRejection;
use axum::http::Method;
use axum::http::StatusCode;
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::get;
use axum::routing::post;
use checkin_config::CheckinConfig;
use checkin_core::AuditSink;
use checkin_core::CheckinError;
use checkin_core::CheckinService;
use checkin_core::Rejection;
use checkin_core::RequestAuditEvent;
use checkin_core::RequestAuditEventParams;
use checkin_core::RequestOutcome;
use checkin_core::StoreError;
use checkin_core::require_qr_code;
use checkin_core::service::AMOUNT_INVALID;
use checkin_core::service::AMOUNT_REQUIRED;
use checkin_core::service::DEFAULT_LOTTERY_WINNERS;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use serde_json::json;
use tower_http::cors::Any;
use tower_http::cors::CorsLayer;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default maximum request body size in bytes.
const DEFAULT_MAX_BODY_BYTES: usize = 64 * 1024;
/// Success message for a check-in.
const CHECKIN_SUCCESS: &str = "Check-in successful";
/// Success message for a donation.
const DONATION_SUCCESS: &str = "Donation added successfully";
/// Failure message for an unparsable body.
const INVALID_BODY: &str = "Invalid request body";
/// Failure message for an oversized body.
const BODY_TOO_LARGE: &str = "Request body too large";
/// Store fault detail shown when store errors are hidden.
const STORE_UNAVAILABLE: &str = "store unavailable";

// ============================================================================
// SECTION: State
// ============================================================================

/// Request handling settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApiSettings {
    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,
    /// Include store failure detail in 500 responses.
    pub expose_store_errors: bool,
    /// Include QR codes in request audit events.
    pub log_qr_codes: bool,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            expose_store_errors: true,
            log_qr_codes: false,
        }
    }
}

impl ApiSettings {
    /// Derives request settings from configuration.
    #[must_use]
    pub const fn from_config(config: &CheckinConfig) -> Self {
        Self {
            max_body_bytes: config.server.max_body_bytes,
            expose_store_errors: config.server.expose_store_errors,
            log_qr_codes: config.audit.log_qr_codes,
        }
    }
}

/// Shared state for participant handlers.
pub struct AppState {
    /// Participant operations.
    service: Arc<CheckinService>,
    /// Request audit sink.
    audit: Arc<dyn AuditSink>,
    /// Request handling settings.
    settings: ApiSettings,
}

impl AppState {
    /// Creates handler state.
    #[must_use]
    pub fn new(service: CheckinService, audit: Arc<dyn AuditSink>, settings: ApiSettings) -> Self {
        Self {
            service: Arc::new(service),
            audit,
            settings,
        }
    }

    /// Returns the request handling settings.
    #[must_use]
    pub const fn settings(&self) -> &ApiSettings {
        &self.settings
    }
}

// ============================================================================
// SECTION: Router
// ============================================================================

/// Builds the participant API router.
///
/// CORS accepts any origin for `GET` and `POST` with a `Content-Type` header.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([CONTENT_TYPE]);
    let body_limit = state.settings.max_body_bytes;
    Router::new()
        .route("/api/participants", get(list_participants))
        .route("/api/participants/checkin", post(check_in))
        .route("/api/participants/donation", post(add_donation))
        .route("/api/participants/stats", get(participant_stats))
        .route("/api/participants/lottery", post(draw_lottery))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .with_state(state)
}

// ============================================================================
// SECTION: Requests
// ============================================================================

/// Check-in request body.
#[derive(Debug, Deserialize)]
struct CheckinRequest {
    /// QR code of the arriving participant.
    #[serde(rename = "qrCode", default)]
    qr_code: Option<String>,
}

/// Donation request body.
#[derive(Debug, Deserialize)]
struct DonationRequest {
    /// QR code of the donor.
    #[serde(rename = "qrCode", default)]
    qr_code: Option<String>,
    /// Amount to add.
    #[serde(default)]
    amount: Option<AmountInput>,
}

/// Donation amount as sent by clients.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AmountInput {
    /// JSON number.
    Number(f64),
    /// Numeric string.
    Text(String),
    /// Anything else; always rejected.
    Other(#[expect(dead_code, reason = "payload only captured so untagged deserialization succeeds")] Value),
}

impl AmountInput {
    /// Converts the input to a number without range checks.
    fn parse(&self) -> Result<f64, CheckinError> {
        let invalid = || CheckinError::Validation(AMOUNT_INVALID.to_string());
        match self {
            Self::Number(amount) => Ok(*amount),
            Self::Text(text) => text.trim().parse().map_err(|_| invalid()),
            Self::Other(_) => Err(invalid()),
        }
    }
}

/// Lottery request body.
#[derive(Debug, Deserialize)]
struct LotteryRequest {
    /// Number of winners to draw; one when absent.
    #[serde(default)]
    winners: Option<usize>,
}

// ============================================================================
// SECTION: Handlers
// ============================================================================

/// Handles `GET /api/participants`.
async fn list_participants(State(state): State<Arc<AppState>>) -> Response {
    let started = Instant::now();
    let result = run_blocking(&state, CheckinService::list)
        .await
        .map(|participants| Json(participants).into_response())
        .map_err(|err| ApiError::from_checkin(Operation::List, err, &state.settings));
    finish(&state, Operation::List, None, started, result)
}

/// Handles `POST /api/participants/checkin`.
async fn check_in(
    State(state): State<Arc<AppState>>,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let started = Instant::now();
    let request: CheckinRequest = match parse_body(&state.settings, body) {
        Ok(request) => request,
        Err(err) => return finish(&state, Operation::CheckIn, None, started, Err(err)),
    };
    let qr_code = request.qr_code.unwrap_or_default();
    let code = qr_code.clone();
    let result = run_blocking(&state, move |service| service.check_in(&code))
        .await
        .map(|_| Json(json!({ "message": CHECKIN_SUCCESS })).into_response())
        .map_err(|err| ApiError::from_checkin(Operation::CheckIn, err, &state.settings));
    finish(&state, Operation::CheckIn, Some(&qr_code), started, result)
}

/// Handles `POST /api/participants/donation`.
async fn add_donation(
    State(state): State<Arc<AppState>>,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let started = Instant::now();
    let request: DonationRequest = match parse_body(&state.settings, body) {
        Ok(request) => request,
        Err(err) => return finish(&state, Operation::Donation, None, started, Err(err)),
    };
    let qr_code = request.qr_code.unwrap_or_default();
    let result = match donation_amount(&qr_code, request.amount.as_ref()) {
        Ok(amount) => {
            let code = qr_code.clone();
            run_blocking(&state, move |service| service.add_donation(&code, amount)).await
        }
        Err(err) => Err(err),
    };
    let result = result
        .map(|receipt| {
            Json(json!({
                "message": DONATION_SUCCESS,
                "amount": receipt.amount,
                "total": receipt.total,
            }))
            .into_response()
        })
        .map_err(|err| ApiError::from_checkin(Operation::Donation, err, &state.settings));
    finish(&state, Operation::Donation, Some(&qr_code), started, result)
}

/// Handles `GET /api/participants/stats`.
async fn participant_stats(State(state): State<Arc<AppState>>) -> Response {
    let started = Instant::now();
    let result = run_blocking(&state, CheckinService::stats)
        .await
        .map(|stats| Json(stats).into_response())
        .map_err(|err| ApiError::from_checkin(Operation::Stats, err, &state.settings));
    finish(&state, Operation::Stats, None, started, result)
}

/// Handles `POST /api/participants/lottery`.
async fn draw_lottery(
    State(state): State<Arc<AppState>>,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let started = Instant::now();
    let request: LotteryRequest = match parse_body(&state.settings, body) {
        Ok(request) => request,
        Err(err) => return finish(&state, Operation::Lottery, None, started, Err(err)),
    };
    let count = request.winners.unwrap_or(DEFAULT_LOTTERY_WINNERS);
    let result = run_blocking(&state, move |service| {
        service.draw_lottery(count, &mut rand::thread_rng())
    })
    .await
    .map(|draw| Json(draw).into_response())
    .map_err(|err| ApiError::from_checkin(Operation::Lottery, err, &state.settings));
    finish(&state, Operation::Lottery, None, started, result)
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Validates the donation inputs in the order clients expect: code first,
/// then presence of the amount, then its format.
fn donation_amount(qr_code: &str, amount: Option<&AmountInput>) -> Result<f64, CheckinError> {
    require_qr_code(qr_code)?;
    amount.ok_or_else(|| CheckinError::Validation(AMOUNT_REQUIRED.to_string()))?.parse()
}

/// Enforces the body limit and decodes a JSON body.
fn parse_body<T: DeserializeOwned>(
    settings: &ApiSettings,
    body: Result<Bytes, BytesRejection>,
) -> Result<T, ApiError> {
    let bytes = body.map_err(|rejection| {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::body_too_large()
        } else {
            ApiError::invalid_body()
        }
    })?;
    if bytes.len() > settings.max_body_bytes {
        return Err(ApiError::body_too_large());
    }
    serde_json::from_slice(&bytes).map_err(|_| ApiError::invalid_body())
}

/// Runs a service call on the blocking pool.
async fn run_blocking<T, F>(state: &AppState, call: F) -> Result<T, CheckinError>
where
    T: Send + 'static,
    F: FnOnce(&CheckinService) -> Result<T, CheckinError> + Send + 'static,
{
    let service = Arc::clone(&state.service);
    tokio::task::spawn_blocking(move || call(&service)).await.unwrap_or_else(|err| {
        Err(CheckinError::Store(StoreError::Unavailable(format!("store task failed: {err}"))))
    })
}

/// Records the request audit event and returns the response.
fn finish(
    state: &AppState,
    operation: Operation,
    qr_code: Option<&str>,
    started: Instant,
    result: Result<Response, ApiError>,
) -> Response {
    let (response, outcome, error_kind) = match result {
        Ok(response) => (response, RequestOutcome::Ok, None),
        Err(err) => {
            let outcome = err.outcome;
            let kind = err.kind;
            (err.into_response(), outcome, Some(kind))
        }
    };
    let qr_code = qr_code.filter(|_| state.settings.log_qr_codes).map(str::to_string);
    state.audit.record_request(&RequestAuditEvent::new(RequestAuditEventParams {
        operation: operation.as_str(),
        qr_code,
        outcome,
        status: response.status().as_u16(),
        error_kind,
        latency_ms: started.elapsed().as_millis(),
    }));
    response
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Participant API operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    /// Full listing.
    List,
    /// Check-in.
    CheckIn,
    /// Donation.
    Donation,
    /// Statistics.
    Stats,
    /// Lottery draw.
    Lottery,
}

impl Operation {
    /// Returns the audit label.
    const fn as_str(self) -> &'static str {
        match self {
            Self::List => "list",
            Self::CheckIn => "check_in",
            Self::Donation => "donation",
            Self::Stats => "stats",
            Self::Lottery => "lottery",
        }
    }

    /// Returns the prefix of store fault messages.
    const fn fault_prefix(self) -> &'static str {
        match self {
            Self::List => "Failed to fetch participants",
            Self::CheckIn => "Check-in failed",
            Self::Donation => "Failed to add donation",
            Self::Stats => "Failed to compute statistics",
            Self::Lottery => "Lottery draw failed",
        }
    }

    /// Returns the client message for a refused operation.
    const fn rejection_message(self, rejection: Rejection) -> &'static str {
        match (self, rejection) {
            (Self::CheckIn, Rejection::NotFound | Rejection::AlreadyCheckedIn) => {
                "Participant not found or already checked in"
            }
            (_, Rejection::NoEligibleParticipants) => "No participants eligible for the lottery",
            (_, Rejection::NotFound | Rejection::AlreadyCheckedIn) => "Participant not found",
        }
    }
}

/// Failure response with its audit classification.
#[derive(Debug)]
struct ApiError {
    /// HTTP status.
    status: StatusCode,
    /// Audit outcome.
    outcome: RequestOutcome,
    /// Audit error kind.
    kind: &'static str,
    /// Client-facing message.
    message: String,
}

impl ApiError {
    /// Maps a service error for `operation`.
    fn from_checkin(operation: Operation, err: CheckinError, settings: &ApiSettings) -> Self {
        let kind = err.kind();
        match err {
            CheckinError::Validation(message) => Self {
                status: StatusCode::BAD_REQUEST,
                outcome: RequestOutcome::Invalid,
                kind,
                message,
            },
            CheckinError::Rejected(rejection) => Self {
                status: StatusCode::BAD_REQUEST,
                outcome: RequestOutcome::Rejected,
                kind,
                message: operation.rejection_message(rejection).to_string(),
            },
            CheckinError::Store(error) => {
                let detail = if settings.expose_store_errors {
                    error.to_string()
                } else {
                    STORE_UNAVAILABLE.to_string()
                };
                Self {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    outcome: RequestOutcome::Fault,
                    kind,
                    message: format!("{}: {detail}", operation.fault_prefix()),
                }
            }
        }
    }

    /// Body that is not valid JSON for the route.
    fn invalid_body() -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            outcome: RequestOutcome::Invalid,
            kind: "invalid_body",
            message: INVALID_BODY.to_string(),
        }
    }

    /// Body above the configured limit.
    fn body_too_large() -> Self {
        Self {
            status: StatusCode::PAYLOAD_TOO_LARGE,
            outcome: RequestOutcome::Invalid,
            kind: "body_too_large",
            message: BODY_TOO_LARGE.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        reason = "Test-only assertions."
    )]

    use checkin_core::CheckinError;
    use checkin_core::Rejection;
    use checkin_core::StoreError;

    use super::AmountInput;
    use super::ApiError;
    use super::ApiSettings;
    use super::Operation;
    use super::donation_amount;

    #[test]
    fn amount_accepts_numbers_and_numeric_strings() {
        assert_eq!(donation_amount("Q1", Some(&AmountInput::Number(12.5))).unwrap(), 12.5);
        let text = AmountInput::Text(" 40 ".to_string());
        assert_eq!(donation_amount("Q1", Some(&text)).unwrap(), 40.0);
    }

    #[test]
    fn qr_code_is_checked_before_amount() {
        let err = donation_amount(" ", None).unwrap_err();
        assert_eq!(err, CheckinError::Validation("QR code is required".to_string()));
        let err = donation_amount("Q1", None).unwrap_err();
        assert_eq!(err, CheckinError::Validation("Donation amount is required".to_string()));
        let err = donation_amount("Q1", Some(&AmountInput::Text("ten".into()))).unwrap_err();
        assert_eq!(err, CheckinError::Validation("Invalid donation amount format".to_string()));
        let other = AmountInput::Other(serde_json::json!(true));
        assert!(donation_amount("Q1", Some(&other)).is_err());
    }

    #[test]
    fn check_in_rejections_share_one_message() {
        let settings = ApiSettings::default();
        for rejection in [Rejection::NotFound, Rejection::AlreadyCheckedIn] {
            let err = ApiError::from_checkin(
                Operation::CheckIn,
                CheckinError::Rejected(rejection),
                &settings,
            );
            assert_eq!(err.message, "Participant not found or already checked in");
        }
        let err = ApiError::from_checkin(
            Operation::Donation,
            CheckinError::Rejected(Rejection::NotFound),
            &settings,
        );
        assert_eq!(err.message, "Participant not found");
    }

    #[test]
    fn store_detail_can_be_hidden() {
        let settings = ApiSettings {
            expose_store_errors: false,
            ..ApiSettings::default()
        };
        let err = ApiError::from_checkin(
            Operation::List,
            CheckinError::Store(StoreError::Auth("token rejected".to_string())),
            &settings,
        );
        assert_eq!(err.message, "Failed to fetch participants: store unavailable");
        assert_eq!(err.kind, "store_auth");
    }
}
