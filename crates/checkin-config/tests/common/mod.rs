// crates/checkin-config/tests/common/mod.rs
// =============================================================================
// Module: Config Test Helpers
// Description: Shared helpers for config validation tests.
// Purpose: Reduce duplication across integration tests for checkin-config.
// =============================================================================

#![allow(dead_code, reason = "Test helpers are selectively used across suites.")]

use checkin_config::CheckinConfig;
use checkin_config::ConfigError;

/// Smallest TOML document that validates.
pub const MINIMAL_TOML: &str = "[sheets]\nspreadsheet_id = \"sheet-123\"\n";

/// Test outcome with a readable failure message.
pub type TestResult = Result<(), String>;

/// Parses a TOML string into a `CheckinConfig` for tests.
pub fn config_from_toml(toml_str: &str) -> Result<CheckinConfig, toml::de::Error> {
    toml::from_str(toml_str)
}

/// Returns a minimal config with all defaults applied.
pub fn minimal_config() -> Result<CheckinConfig, String> {
    config_from_toml(MINIMAL_TOML).map_err(|err| err.to_string())
}

/// Asserts that validation failed with a message containing `needle`.
pub fn assert_invalid(result: Result<(), ConfigError>, needle: &str) -> TestResult {
    match result {
        Err(error) => {
            let message = error.to_string();
            if message.contains(needle) {
                Ok(())
            } else {
                Err(format!("error {message} did not contain {needle}"))
            }
        }
        Ok(()) => Err("expected invalid config".to_string()),
    }
}
