//! Config file loading tests for checkin-config.
// crates/checkin-config/tests/config_load.rs
// =============================================================================
// Module: Config Load Tests
// Description: Validate file-level loading guards.
// Purpose: Ensure size, encoding, and parse failures map to the right errors.
// =============================================================================

use std::fs;

use checkin_config::CheckinConfig;
use checkin_config::ConfigError;

mod common;

use common::TestResult;

#[test]
fn load_reads_and_validates_a_file() -> TestResult {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    let path = dir.path().join("checkin.toml");
    let content = format!(
        "{}[server]\nbind = \"0.0.0.0:9090\"\nserialize_mutations = true\n\
         [lottery]\nminimum_donation = 250.0\n",
        common::MINIMAL_TOML
    );
    fs::write(&path, content).map_err(|err| err.to_string())?;
    let config = CheckinConfig::load(Some(&path)).map_err(|err| err.to_string())?;
    let addr = config.server.bind_addr().map_err(|err| err.to_string())?;
    if addr.port() != 9090 {
        return Err(format!("unexpected port {}", addr.port()));
    }
    let service = config.service_config();
    if !service.serialize_mutations || (service.minimum_donation - 250.0).abs() > f64::EPSILON {
        return Err("service config not derived from file".to_string());
    }
    Ok(())
}

#[test]
fn missing_file_is_an_io_error() -> TestResult {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    match CheckinConfig::load(Some(&dir.path().join("absent.toml"))) {
        Err(ConfigError::Io(_)) => Ok(()),
        Err(err) => Err(format!("expected io error, got {err}")),
        Ok(_) => Err("expected missing file to fail".to_string()),
    }
}

#[test]
fn oversized_file_is_rejected() -> TestResult {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    let path = dir.path().join("big.toml");
    let padding = "#".repeat(1024 * 1024 + 1);
    fs::write(&path, format!("{}{padding}\n", common::MINIMAL_TOML))
        .map_err(|err| err.to_string())?;
    common::assert_invalid(CheckinConfig::load(Some(&path)).map(|_| ()), "exceeds size limit")
}

#[test]
fn non_utf8_file_is_rejected() -> TestResult {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    let path = dir.path().join("binary.toml");
    fs::write(&path, [0xff_u8, 0xfe, 0x00]).map_err(|err| err.to_string())?;
    common::assert_invalid(CheckinConfig::load(Some(&path)).map(|_| ()), "must be utf-8")
}

#[test]
fn malformed_toml_is_a_parse_error() -> TestResult {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    let path = dir.path().join("broken.toml");
    fs::write(&path, "[sheets\nspreadsheet_id = ").map_err(|err| err.to_string())?;
    match CheckinConfig::load(Some(&path)) {
        Err(ConfigError::Parse(_)) => Ok(()),
        Err(err) => Err(format!("expected parse error, got {err}")),
        Ok(_) => Err("expected malformed toml to fail".to_string()),
    }
}

#[test]
fn validation_runs_on_load() -> TestResult {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    let path = dir.path().join("invalid.toml");
    fs::write(&path, "[sheets]\nspreadsheet_id = \"\"\n").map_err(|err| err.to_string())?;
    common::assert_invalid(
        CheckinConfig::load(Some(&path)).map(|_| ()),
        "sheets.spreadsheet_id must be non-empty",
    )
}
