// crates/checkin-config/src/config.rs
// ============================================================================
// Module: Check-in Configuration
// Description: Configuration loading and validation for the check-in service.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: checkin-core, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! The path comes from the caller, then `CHECKIN_CONFIG`, then
//! `checkin.toml` in the working directory. Every section validates itself;
//! the first failure aborts loading.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::path::PathBuf;

use checkin_core::ServiceConfig;
use checkin_core::service::DEFAULT_MINIMUM_DONATION;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "checkin.toml";
/// Environment variable holding an explicit config path.
pub const CONFIG_ENV_VAR: &str = "CHECKIN_CONFIG";
/// Maximum config file size in bytes.
const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Default bind address for the HTTP API.
const DEFAULT_BIND: &str = "127.0.0.1:8080";
/// Default maximum request body size in bytes.
const DEFAULT_MAX_BODY_BYTES: usize = 64 * 1024;
/// Default sheet (tab) name holding participants.
const DEFAULT_SHEET_NAME: &str = "Participants";
/// Maximum sheet name length accepted by the spreadsheet service.
const MAX_SHEET_NAME_LENGTH: usize = 100;
/// Maximum spreadsheet identifier length.
const MAX_SPREADSHEET_ID_LENGTH: usize = 128;
/// Default spreadsheet API base URL.
const DEFAULT_API_BASE_URL: &str = "https://sheets.googleapis.com";
/// Default request timeout in milliseconds.
const DEFAULT_TIMEOUT_MS: u64 = 10_000;
/// Minimum accepted request timeout in milliseconds.
const MIN_TIMEOUT_MS: u64 = 100;
/// Maximum accepted request timeout in milliseconds.
const MAX_TIMEOUT_MS: u64 = 120_000;
/// Default response size cap in bytes.
const DEFAULT_MAX_RESPONSE_BYTES: usize = 8 * 1024 * 1024;
/// Maximum response size cap in bytes.
const MAX_MAX_RESPONSE_BYTES: usize = 64 * 1024 * 1024;
/// Default user agent for spreadsheet requests.
const DEFAULT_USER_AGENT: &str = "checkin-sheets/0.1";
/// Default environment variable holding the bearer token.
pub const DEFAULT_TOKEN_ENV: &str = "CHECKIN_SHEETS_TOKEN";
/// Maximum environment variable name length.
const MAX_ENV_NAME_LENGTH: usize = 128;

// ============================================================================
// SECTION: Top-Level Config
// ============================================================================

/// Check-in service configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckinConfig {
    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Spreadsheet backend configuration.
    pub sheets: SheetsConfig,
    /// Audit logging configuration.
    #[serde(default)]
    pub audit: AuditConfig,
    /// Lottery and statistics configuration.
    #[serde(default)]
    pub lottery: LotteryConfig,
}

impl CheckinConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.sheets.validate()?;
        self.audit.validate()?;
        self.lottery.validate()?;
        Ok(())
    }

    /// Returns the operation settings derived from this configuration.
    #[must_use]
    pub const fn service_config(&self) -> ServiceConfig {
        ServiceConfig {
            minimum_donation: self.lottery.minimum_donation,
            serialize_mutations: self.server.serialize_mutations,
        }
    }
}

// ============================================================================
// SECTION: Server
// ============================================================================

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address for the HTTP API.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Maximum request body size in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    /// Include store failure detail in 500 responses.
    #[serde(default = "default_expose_store_errors")]
    pub expose_store_errors: bool,
    /// Serialize check-in and donation behind one process-wide lock.
    #[serde(default)]
    pub serialize_mutations: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_body_bytes: default_max_body_bytes(),
            expose_store_errors: default_expose_store_errors(),
            serialize_mutations: false,
        }
    }
}

impl ServerConfig {
    /// Returns the parsed bind address.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the address does not parse.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid("invalid server.bind address".to_string()))
    }

    /// Validates server configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_body_bytes == 0 {
            return Err(ConfigError::Invalid(
                "server.max_body_bytes must be greater than zero".to_string(),
            ));
        }
        self.bind_addr()?;
        Ok(())
    }
}

// ============================================================================
// SECTION: Sheets
// ============================================================================

/// Spreadsheet backend configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SheetsConfig {
    /// Spreadsheet identifier.
    pub spreadsheet_id: String,
    /// Sheet (tab) holding the participant table.
    #[serde(default = "default_sheet_name")]
    pub sheet_name: String,
    /// API base URL, without a trailing path.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Allow a cleartext `http://` base URL.
    #[serde(default)]
    pub allow_http: bool,
    /// Request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Maximum response body size in bytes.
    #[serde(default = "default_max_response_bytes")]
    pub max_response_bytes: usize,
    /// User agent sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Credential source.
    #[serde(default)]
    pub auth: SheetsAuthConfig,
}

impl SheetsConfig {
    /// Creates a configuration for `spreadsheet_id` with every other field
    /// at its default.
    #[must_use]
    pub fn new(spreadsheet_id: impl Into<String>) -> Self {
        Self {
            spreadsheet_id: spreadsheet_id.into(),
            sheet_name: default_sheet_name(),
            api_base_url: default_api_base_url(),
            allow_http: false,
            timeout_ms: default_timeout_ms(),
            max_response_bytes: default_max_response_bytes(),
            user_agent: default_user_agent(),
            auth: SheetsAuthConfig::default(),
        }
    }

    /// Validates spreadsheet configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        let id = self.spreadsheet_id.trim();
        if id.is_empty() {
            return Err(ConfigError::Invalid("sheets.spreadsheet_id must be non-empty".to_string()));
        }
        if id.len() > MAX_SPREADSHEET_ID_LENGTH {
            return Err(ConfigError::Invalid(
                "sheets.spreadsheet_id exceeds max length".to_string(),
            ));
        }
        if !id.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_') {
            return Err(ConfigError::Invalid(
                "sheets.spreadsheet_id must contain only [A-Za-z0-9_-]".to_string(),
            ));
        }
        validate_sheet_name(&self.sheet_name)?;
        self.validate_base_url()?;
        if !(MIN_TIMEOUT_MS..=MAX_TIMEOUT_MS).contains(&self.timeout_ms) {
            return Err(ConfigError::Invalid(format!(
                "sheets.timeout_ms must be between {MIN_TIMEOUT_MS} and {MAX_TIMEOUT_MS}"
            )));
        }
        if self.max_response_bytes == 0 || self.max_response_bytes > MAX_MAX_RESPONSE_BYTES {
            return Err(ConfigError::Invalid(format!(
                "sheets.max_response_bytes must be between 1 and {MAX_MAX_RESPONSE_BYTES}"
            )));
        }
        if self.user_agent.trim().is_empty() {
            return Err(ConfigError::Invalid("sheets.user_agent must be non-empty".to_string()));
        }
        self.auth.validate()
    }

    /// Validates the API base URL scheme.
    fn validate_base_url(&self) -> Result<(), ConfigError> {
        let url = self.api_base_url.trim();
        let rest = if let Some(rest) = url.strip_prefix("https://") {
            rest
        } else if let Some(rest) = url.strip_prefix("http://") {
            if !self.allow_http {
                return Err(ConfigError::Invalid(
                    "sheets.api_base_url uses http without sheets.allow_http".to_string(),
                ));
            }
            rest
        } else {
            return Err(ConfigError::Invalid(
                "sheets.api_base_url must start with https://".to_string(),
            ));
        };
        if rest.trim_end_matches('/').is_empty() {
            return Err(ConfigError::Invalid("sheets.api_base_url is missing a host".to_string()));
        }
        if rest.contains(['?', '#']) {
            return Err(ConfigError::Invalid(
                "sheets.api_base_url must not carry a query or fragment".to_string(),
            ));
        }
        Ok(())
    }
}

/// Credential source for spreadsheet requests.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SheetsAuthConfig {
    /// Already-issued OAuth bearer token.
    BearerToken {
        /// Environment variable holding the token.
        #[serde(default)]
        token_env: Option<String>,
        /// File holding the token.
        #[serde(default)]
        token_file: Option<String>,
    },
    /// API key; only reads are authorized by the spreadsheet service.
    ApiKey {
        /// Environment variable holding the key.
        key_env: String,
    },
}

impl Default for SheetsAuthConfig {
    fn default() -> Self {
        Self::BearerToken {
            token_env: Some(DEFAULT_TOKEN_ENV.to_string()),
            token_file: None,
        }
    }
}

impl SheetsAuthConfig {
    /// Validates the credential source.
    fn validate(&self) -> Result<(), ConfigError> {
        match self {
            Self::BearerToken {
                token_env,
                token_file,
            } => match (token_env, token_file) {
                (Some(name), None) => validate_env_name("sheets.auth.token_env", name),
                (None, Some(path)) => validate_path_string("sheets.auth.token_file", path),
                _ => Err(ConfigError::Invalid(
                    "sheets.auth bearer_token requires exactly one of token_env or token_file"
                        .to_string(),
                )),
            },
            Self::ApiKey {
                key_env,
            } => validate_env_name("sheets.auth.key_env", key_env),
        }
    }
}

// ============================================================================
// SECTION: Audit
// ============================================================================

/// Audit sink selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditSinkKind {
    /// JSON lines on stderr.
    #[default]
    Stderr,
    /// JSON lines appended to a file.
    File,
    /// Discard events.
    None,
}

/// Audit logging configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuditConfig {
    /// Sink selection.
    #[serde(default)]
    pub sink: AuditSinkKind,
    /// Audit log path for the file sink.
    #[serde(default)]
    pub path: Option<String>,
    /// Include QR codes in request events (explicit opt-in).
    #[serde(default)]
    pub log_qr_codes: bool,
}

impl AuditConfig {
    /// Validates audit configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(path) = &self.path {
            validate_path_string("audit.path", path)?;
        }
        if self.sink == AuditSinkKind::File && self.path.is_none() {
            return Err(ConfigError::Invalid("audit.sink = file requires audit.path".to_string()));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Lottery
// ============================================================================

/// Lottery and statistics configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LotteryConfig {
    /// Donation total required for lottery eligibility.
    #[serde(default = "default_minimum_donation")]
    pub minimum_donation: f64,
}

impl Default for LotteryConfig {
    fn default() -> Self {
        Self {
            minimum_donation: default_minimum_donation(),
        }
    }
}

impl LotteryConfig {
    /// Validates lottery configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if !self.minimum_donation.is_finite() || self.minimum_donation < 0.0 {
            return Err(ConfigError::Invalid(
                "lottery.minimum_donation must be a finite, non-negative number".to_string(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from CLI or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against length limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        if component.as_os_str().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Validates an environment variable name.
fn validate_env_name(field: &str, value: &str) -> Result<(), ConfigError> {
    if value.is_empty() || value.len() > MAX_ENV_NAME_LENGTH {
        return Err(ConfigError::Invalid(format!(
            "{field} must be 1 to {MAX_ENV_NAME_LENGTH} characters"
        )));
    }
    if !value.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '_') {
        return Err(ConfigError::Invalid(format!("{field} must contain only [A-Za-z0-9_]")));
    }
    Ok(())
}

/// Validates a sheet (tab) name for use in an A1 range.
fn validate_sheet_name(value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Invalid("sheets.sheet_name must be non-empty".to_string()));
    }
    if value.chars().count() > MAX_SHEET_NAME_LENGTH {
        return Err(ConfigError::Invalid("sheets.sheet_name exceeds max length".to_string()));
    }
    if value.contains(['!', '\'']) || value.chars().any(char::is_control) {
        return Err(ConfigError::Invalid(
            "sheets.sheet_name must not contain '!', quotes, or control characters".to_string(),
        ));
    }
    Ok(())
}

/// Default bind address.
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}

/// Default maximum request body size.
const fn default_max_body_bytes() -> usize {
    DEFAULT_MAX_BODY_BYTES
}

/// Store failure detail is surfaced unless disabled.
const fn default_expose_store_errors() -> bool {
    true
}

/// Default sheet name.
fn default_sheet_name() -> String {
    DEFAULT_SHEET_NAME.to_string()
}

/// Default API base URL.
fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

/// Default request timeout.
const fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

/// Default response size cap.
const fn default_max_response_bytes() -> usize {
    DEFAULT_MAX_RESPONSE_BYTES
}

/// Default user agent.
fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

/// Default lottery minimum.
const fn default_minimum_donation() -> f64 {
    DEFAULT_MINIMUM_DONATION
}

// ============================================================================
// SECTION: Tests
// ============================================================================
