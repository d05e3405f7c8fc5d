// crates/checkin-config/src/lib.rs
// ============================================================================
// Module: Check-in Config Library
// Description: Configuration model and validation for the check-in service.
// Purpose: Single source of truth for checkin.toml semantics.
// Dependencies: checkin-core, serde, toml
// ============================================================================

//! ## Overview
//! `checkin-config` defines the configuration model for the check-in
//! service and its spreadsheet backend. Loading is strict and fails closed:
//! oversize files, non-UTF-8 content, unknown auth modes, and inconsistent
//! settings are rejected before any network client is built.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
