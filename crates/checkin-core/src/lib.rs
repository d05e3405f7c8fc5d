// crates/checkin-core/src/lib.rs
// ============================================================================
// Module: Check-in Core Library
// Description: Participant model, store capability, and check-in operations.
// Purpose: Keep the check-in logic independent of the backing tabular store.
// Dependencies: serde, thiserror, time, rand
// ============================================================================

//! ## Overview
//! `checkin-core` owns the participant record model, the two-operation
//! [`ParticipantStore`] capability, and the operations built on top of it:
//! listing, check-in, donations, statistics, and the lottery draw. Every
//! operation re-reads the full participant table and locates its target by a
//! linear scan; the row position in that fetch is the write address.
//!
//! Concurrency: operations are synchronous and hold no state between calls.
//! Concurrent mutations of the same participant can race unless
//! [`ServiceConfig::serialize_mutations`] is enabled.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod clock;
pub mod interfaces;
pub mod participant;
pub mod service;
pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::AuditSink;
pub use audit::FileAuditSink;
pub use audit::MemoryAuditSink;
pub use audit::NoopAuditSink;
pub use audit::RequestAuditEvent;
pub use audit::RequestAuditEventParams;
pub use audit::RequestOutcome;
pub use audit::RowDiagnosticEvent;
pub use audit::StderrAuditSink;
pub use audit::StoreClientEvent;
pub use interfaces::CellValue;
pub use interfaces::ColumnWindow;
pub use interfaces::ParticipantStore;
pub use interfaces::StoreError;
pub use participant::DiagnosticReason;
pub use participant::ParsedTable;
pub use participant::Participant;
pub use participant::RowDiagnostic;
pub use participant::SheetColumn;
pub use participant::parse_table;
pub use participant::sheet_row_number;
pub use service::CheckinError;
pub use service::CheckinReceipt;
pub use service::CheckinService;
pub use service::DonationReceipt;
pub use service::LotteryDraw;
pub use service::ParticipantStats;
pub use service::Rejection;
pub use service::ServiceConfig;
pub use service::require_qr_code;
pub use store::InMemoryParticipantStore;
pub use store::RangeWrite;
pub use store::SharedParticipantStore;
pub use clock::Clock;
pub use clock::FixedClock;
pub use clock::LocalTimestamp;
pub use clock::SystemClock;
