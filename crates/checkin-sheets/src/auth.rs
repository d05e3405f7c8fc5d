// crates/checkin-sheets/src/auth.rs
// ============================================================================
// Module: Sheets Credentials
// Description: Credential resolution for spreadsheet requests.
// Purpose: Load an already-issued token or key from the environment or a file.
// Dependencies: checkin-config, checkin-core
// ============================================================================

//! ## Overview
//! Credentials are resolved once, when the store builds its client. Token
//! files are size-limited and trimmed; empty values are rejected so a
//! misconfigured deployment fails on the first request instead of sending an
//! anonymous call.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fmt;
use std::fs;
use std::io::Read;

use checkin_config::SheetsAuthConfig;
use checkin_core::StoreError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum token file size in bytes.
const MAX_TOKEN_FILE_BYTES: u64 = 16 * 1024;

// ============================================================================
// SECTION: Credential
// ============================================================================

/// Resolved request credential.
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    /// OAuth bearer token sent in the `Authorization` header.
    Bearer(String),
    /// API key sent as the `key` query parameter.
    ApiKey(String),
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bearer(_) => f.write_str("Credential::Bearer(<redacted>)"),
            Self::ApiKey(_) => f.write_str("Credential::ApiKey(<redacted>)"),
        }
    }
}

impl Credential {
    /// Resolves the credential described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Config`] when the variable or file is missing,
    /// unreadable, oversized, or empty.
    pub fn resolve(config: &SheetsAuthConfig) -> Result<Self, StoreError> {
        match config {
            SheetsAuthConfig::BearerToken {
                token_env: Some(name),
                ..
            } => read_env(name).map(Self::Bearer),
            SheetsAuthConfig::BearerToken {
                token_file: Some(path),
                ..
            } => read_file(path).map(Self::Bearer),
            SheetsAuthConfig::BearerToken {
                ..
            } => Err(StoreError::Config("bearer token source not configured".to_string())),
            SheetsAuthConfig::ApiKey {
                key_env,
            } => read_env(key_env).map(Self::ApiKey),
        }
    }
}

/// Reads a non-empty secret from an environment variable.
fn read_env(name: &str) -> Result<String, StoreError> {
    let value = env::var(name)
        .map_err(|_| StoreError::Config(format!("credential variable {name} is not set")))?;
    non_empty(value, name)
}

/// Reads a non-empty secret from a file.
fn read_file(path: &str) -> Result<String, StoreError> {
    let file = fs::File::open(path.trim())
        .map_err(|err| StoreError::Config(format!("credential file unreadable: {err}")))?;
    let mut buf = String::new();
    file.take(MAX_TOKEN_FILE_BYTES.saturating_add(1))
        .read_to_string(&mut buf)
        .map_err(|err| StoreError::Config(format!("credential file unreadable: {err}")))?;
    if u64::try_from(buf.len()).unwrap_or(u64::MAX) > MAX_TOKEN_FILE_BYTES {
        return Err(StoreError::Config("credential file exceeds size limit".to_string()));
    }
    non_empty(buf, "credential file")
}

/// Trims a secret and rejects empty values.
fn non_empty(value: String, source: &str) -> Result<String, StoreError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(StoreError::Config(format!("{source} is empty")));
    }
    Ok(trimmed.to_string())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
