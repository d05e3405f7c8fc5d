//! Config defaults and validation tests for checkin-config.
// crates/checkin-config/tests/config_validation.rs
// =============================================================================
// Module: Config Defaults and Validation Tests
// Description: Validate default behavior and section invariants.
// Purpose: Ensure a minimal config is valid and bad settings fail closed.
// =============================================================================

use checkin_config::AuditSinkKind;
use checkin_config::SheetsAuthConfig;

mod common;

use common::TestResult;
use common::assert_invalid;

#[test]
fn minimal_config_validates_with_defaults() -> TestResult {
    let config = common::minimal_config()?;
    config.validate().map_err(|err| err.to_string())?;
    if config.server.bind != "127.0.0.1:8080" {
        return Err(format!("unexpected default bind {}", config.server.bind));
    }
    if config.server.max_body_bytes != 64 * 1024 {
        return Err("unexpected default max_body_bytes".to_string());
    }
    if !config.server.expose_store_errors || config.server.serialize_mutations {
        return Err("unexpected default server flags".to_string());
    }
    if config.sheets.sheet_name != "Participants" {
        return Err("unexpected default sheet name".to_string());
    }
    if config.sheets.api_base_url != "https://sheets.googleapis.com" {
        return Err("unexpected default api base url".to_string());
    }
    if config.sheets.auth != SheetsAuthConfig::default() {
        return Err("unexpected default auth".to_string());
    }
    if config.audit.sink != AuditSinkKind::Stderr || config.audit.log_qr_codes {
        return Err("unexpected default audit settings".to_string());
    }
    let service = config.service_config();
    if (service.minimum_donation - 500.0).abs() > f64::EPSILON || service.serialize_mutations {
        return Err("unexpected service config".to_string());
    }
    Ok(())
}

#[test]
fn sheets_section_is_required() -> TestResult {
    match common::config_from_toml("[server]\nbind = \"127.0.0.1:9000\"\n") {
        Ok(_) => Err("expected missing sheets section to fail".to_string()),
        Err(err) if err.to_string().contains("sheets") => Ok(()),
        Err(err) => Err(format!("unexpected error: {err}")),
    }
}

#[test]
fn invalid_bind_is_rejected() -> TestResult {
    let mut config = common::minimal_config()?;
    config.server.bind = "localhost".to_string();
    assert_invalid(config.validate(), "invalid server.bind address")
}

#[test]
fn zero_body_limit_is_rejected() -> TestResult {
    let mut config = common::minimal_config()?;
    config.server.max_body_bytes = 0;
    assert_invalid(config.validate(), "server.max_body_bytes must be greater than zero")
}

#[test]
fn spreadsheet_id_must_be_url_safe() -> TestResult {
    let mut config = common::minimal_config()?;
    config.sheets.spreadsheet_id = "abc/../def".to_string();
    assert_invalid(config.validate(), "sheets.spreadsheet_id must contain only")?;
    config.sheets.spreadsheet_id = "  ".to_string();
    assert_invalid(config.validate(), "sheets.spreadsheet_id must be non-empty")
}

#[test]
fn sheet_name_cannot_break_the_range() -> TestResult {
    let mut config = common::minimal_config()?;
    config.sheets.sheet_name = "Guests!A1".to_string();
    assert_invalid(config.validate(), "sheets.sheet_name must not contain")
}

#[test]
fn http_base_url_requires_opt_in() -> TestResult {
    let mut config = common::minimal_config()?;
    config.sheets.api_base_url = "http://127.0.0.1:9999".to_string();
    assert_invalid(config.validate(), "without sheets.allow_http")?;
    config.sheets.allow_http = true;
    config.validate().map_err(|err| err.to_string())?;
    config.sheets.api_base_url = "ftp://example.com".to_string();
    assert_invalid(config.validate(), "must start with https://")
}

#[test]
fn timeout_must_stay_in_range() -> TestResult {
    let mut config = common::minimal_config()?;
    config.sheets.timeout_ms = 50;
    assert_invalid(config.validate(), "sheets.timeout_ms must be between")?;
    config.sheets.timeout_ms = 120_001;
    assert_invalid(config.validate(), "sheets.timeout_ms must be between")
}

#[test]
fn bearer_token_requires_exactly_one_source() -> TestResult {
    let mut config = common::minimal_config()?;
    config.sheets.auth = SheetsAuthConfig::BearerToken {
        token_env: Some("TOKEN".to_string()),
        token_file: Some("token.txt".to_string()),
    };
    assert_invalid(config.validate(), "exactly one of token_env or token_file")?;
    config.sheets.auth = SheetsAuthConfig::BearerToken {
        token_env: None,
        token_file: None,
    };
    assert_invalid(config.validate(), "exactly one of token_env or token_file")
}

#[test]
fn api_key_mode_parses_from_toml() -> TestResult {
    let config = common::config_from_toml(
        "[sheets]\nspreadsheet_id = \"abc\"\n[sheets.auth]\nmode = \"api_key\"\nkey_env = \
         \"SHEETS_KEY\"\n",
    )
    .map_err(|err| err.to_string())?;
    config.validate().map_err(|err| err.to_string())?;
    if config.sheets.auth
        != (SheetsAuthConfig::ApiKey {
            key_env: "SHEETS_KEY".to_string(),
        })
    {
        return Err("expected api_key auth".to_string());
    }
    Ok(())
}

#[test]
fn unknown_auth_mode_fails_to_parse() -> TestResult {
    let parsed = common::config_from_toml(
        "[sheets]\nspreadsheet_id = \"abc\"\n[sheets.auth]\nmode = \"service_account\"\n",
    );
    if parsed.is_ok() {
        return Err("expected unknown auth mode to fail".to_string());
    }
    Ok(())
}

#[test]
fn file_audit_sink_requires_path() -> TestResult {
    let mut config = common::minimal_config()?;
    config.audit.sink = AuditSinkKind::File;
    assert_invalid(config.validate(), "audit.sink = file requires audit.path")?;
    config.audit.path = Some("audit.jsonl".to_string());
    config.validate().map_err(|err| err.to_string())
}

#[test]
fn minimum_donation_must_be_non_negative() -> TestResult {
    let mut config = common::minimal_config()?;
    config.lottery.minimum_donation = -1.0;
    assert_invalid(config.validate(), "lottery.minimum_donation")?;
    config.lottery.minimum_donation = f64::NAN;
    assert_invalid(config.validate(), "lottery.minimum_donation")
}
