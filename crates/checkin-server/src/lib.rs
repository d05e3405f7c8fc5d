// crates/checkin-server/src/lib.rs
// ============================================================================
// Module: Check-in Server
// Description: HTTP surface for the conference check-in service.
// Purpose: Expose participant operations as a small JSON REST API.
// Dependencies: checkin-core, checkin-config, checkin-sheets, axum, tokio
// ============================================================================

//! ## Overview
//! The server crate maps the five participant routes onto
//! [`checkin_core::CheckinService`] and owns the listener lifecycle.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod routes;
pub mod server;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use routes::ApiSettings;
pub use routes::AppState;
pub use routes::router;
pub use server::CheckinServer;
pub use server::ServerError;
pub use server::build_audit_sink;
pub use server::sheets_service;
