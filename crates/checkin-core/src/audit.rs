// crates/checkin-core/src/audit.rs
// ============================================================================
// Module: Check-in Audit Logging
// Description: Structured audit events for requests, row coercion, and clients.
// Purpose: Emit JSON-line diagnostics without a logging framework dependency.
// Dependencies: crate::participant, serde, serde_json
// ============================================================================

//! ## Overview
//! Every observable event is a serializable struct tagged with an `event`
//! label and a millisecond timestamp. Sinks decide where the JSON line goes:
//! stderr, an append-only file, memory (tests), or nowhere.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;

use crate::participant::DiagnosticReason;
use crate::participant::RowDiagnostic;
use crate::participant::SheetColumn;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Request outcome classification.
///
/// # Invariants
/// - Variants are stable for audit labeling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestOutcome {
    /// Operation succeeded.
    Ok,
    /// Caller input was invalid.
    Invalid,
    /// Operation was refused (not found, already checked in).
    Rejected,
    /// The store failed.
    Fault,
}

/// Participant API request audit event.
#[derive(Debug, Clone, Serialize)]
pub struct RequestAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Operation name (`list`, `check_in`, `donation`, ...).
    pub operation: &'static str,
    /// QR code, only when code logging is enabled.
    pub qr_code: Option<String>,
    /// Request outcome.
    pub outcome: RequestOutcome,
    /// HTTP status returned.
    pub status: u16,
    /// Normalized error kind label.
    pub error_kind: Option<&'static str>,
    /// Handler latency in milliseconds.
    pub latency_ms: u128,
}

/// Inputs required to construct a request audit event.
pub struct RequestAuditEventParams {
    /// Operation name.
    pub operation: &'static str,
    /// QR code, only when code logging is enabled.
    pub qr_code: Option<String>,
    /// Request outcome.
    pub outcome: RequestOutcome,
    /// HTTP status returned.
    pub status: u16,
    /// Normalized error kind label.
    pub error_kind: Option<&'static str>,
    /// Handler latency in milliseconds.
    pub latency_ms: u128,
}

impl RequestAuditEvent {
    /// Creates a new request audit event with a consistent timestamp.
    #[must_use]
    pub fn new(params: RequestAuditEventParams) -> Self {
        Self {
            event: "participant_request",
            timestamp_ms: now_ms(),
            operation: params.operation,
            qr_code: params.qr_code,
            outcome: params.outcome,
            status: params.status,
            error_kind: params.error_kind,
            latency_ms: params.latency_ms,
        }
    }
}

/// Row coercion audit event.
#[derive(Debug, Clone, Serialize)]
pub struct RowDiagnosticEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// 1-based sheet row number.
    pub sheet_row: usize,
    /// Column holding the malformed value.
    pub column: SheetColumn,
    /// Raw cell text.
    pub raw: String,
    /// Coercion reason label.
    pub reason: &'static str,
}

impl RowDiagnosticEvent {
    /// Creates an event from a decoding diagnostic.
    #[must_use]
    pub fn new(diagnostic: &RowDiagnostic) -> Self {
        Self {
            event: "row_diagnostic",
            timestamp_ms: now_ms(),
            sheet_row: diagnostic.sheet_row,
            column: diagnostic.column,
            raw: diagnostic.raw.clone(),
            reason: DiagnosticReason::as_str(diagnostic.reason),
        }
    }
}

/// Store client lifecycle event.
#[derive(Debug, Clone, Serialize)]
pub struct StoreClientEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Lifecycle stage (`initialized`, `init_failed`).
    pub stage: &'static str,
    /// Optional detail message.
    pub message: Option<String>,
}

impl StoreClientEvent {
    /// Creates a store client event.
    #[must_use]
    pub fn new(stage: &'static str, message: Option<String>) -> Self {
        Self {
            event: "store_client",
            timestamp_ms: now_ms(),
            stage,
            message,
        }
    }
}

/// Returns milliseconds since the Unix epoch.
fn now_ms() -> u128 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis()
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Audit sink for check-in events.
pub trait AuditSink: Send + Sync {
    /// Record a request event.
    fn record_request(&self, event: &RequestAuditEvent);

    /// Record a row coercion event.
    fn record_row_diagnostic(&self, _event: &RowDiagnosticEvent) {}

    /// Record a store client lifecycle event.
    fn record_store_client(&self, _event: &StoreClientEvent) {}
}

/// Audit sink that logs JSON lines to stderr.
pub struct StderrAuditSink;

impl StderrAuditSink {
    /// Writes one serialized event to stderr.
    fn emit(event: &impl Serialize) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

impl AuditSink for StderrAuditSink {
    fn record_request(&self, event: &RequestAuditEvent) {
        Self::emit(event);
    }

    fn record_row_diagnostic(&self, event: &RowDiagnosticEvent) {
        Self::emit(event);
    }

    fn record_store_client(&self, event: &StoreClientEvent) {
        Self::emit(event);
    }
}

/// Audit sink that logs JSON lines to a file.
pub struct FileAuditSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileAuditSink {
    /// Opens the audit log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }

    /// Appends one serialized event.
    fn emit(&self, event: &impl Serialize) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

impl AuditSink for FileAuditSink {
    fn record_request(&self, event: &RequestAuditEvent) {
        self.emit(event);
    }

    fn record_row_diagnostic(&self, event: &RowDiagnosticEvent) {
        self.emit(event);
    }

    fn record_store_client(&self, event: &StoreClientEvent) {
        self.emit(event);
    }
}

/// Audit sink that keeps JSON lines in memory.
#[derive(Default)]
pub struct MemoryAuditSink {
    /// Captured payloads in arrival order.
    lines: Mutex<Vec<String>>,
}

impl MemoryAuditSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the captured lines.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().map(|lines| lines.clone()).unwrap_or_default()
    }

    /// Captures one serialized event.
    fn emit(&self, event: &impl Serialize) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut lines) = self.lines.lock()
        {
            lines.push(payload);
        }
    }
}

impl AuditSink for MemoryAuditSink {
    fn record_request(&self, event: &RequestAuditEvent) {
        self.emit(event);
    }

    fn record_row_diagnostic(&self, event: &RowDiagnosticEvent) {
        self.emit(event);
    }

    fn record_store_client(&self, event: &StoreClientEvent) {
        self.emit(event);
    }
}

/// No-op audit sink.
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {
    fn record_request(&self, _event: &RequestAuditEvent) {}
}

// ============================================================================
// SECTION: Tests
// ============================================================================
