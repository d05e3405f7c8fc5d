// crates/checkin-sheets/src/lib.rs
// ============================================================================
// Module: Check-in Sheets Library
// Description: Participant store backed by a remote spreadsheet.
// Purpose: Implement the participant store capability over the values API.
// Dependencies: checkin-core, checkin-config, reqwest, serde_json
// ============================================================================

//! ## Overview
//! [`SheetsParticipantStore`] reads the participant range with one GET and
//! writes one row window with one PUT. The HTTP client and credential are
//! resolved lazily on first use and shared for the life of the store.
//!
//! Security posture: spreadsheet contents are untrusted input; responses are
//! size-limited and every cell is decoded defensively.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod auth;
pub mod client;
pub mod range;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use auth::Credential;
pub use client::SheetsParticipantStore;
pub use range::read_range;
pub use range::write_range;
