// crates/checkin-core/tests/row_decoding.rs
// ============================================================================
// Module: Row Decoding Property Tests
// Description: Property tests for participant row coercion.
// Purpose: Ensure arbitrary cell text never panics, drops rows, or goes negative.
// Dependencies: checkin-core, proptest
// ============================================================================
//! ## Overview
//! Feeds arbitrary ragged tables through `parse_table` and checks the
//! positional and numeric invariants the write path relies on.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    clippy::float_cmp,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use checkin_core::DiagnosticReason;
use checkin_core::SheetColumn;
use checkin_core::parse_table;
use checkin_core::sheet_row_number;
use proptest::prelude::*;

/// Cell text mixing valid, boundary, and arbitrary values.
fn cell() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(String::new()),
        Just("TRUE".to_string()),
        Just("false".to_string()),
        Just("NaN".to_string()),
        Just("-1".to_string()),
        "[0-9]{1,4}(\\.[0-9]{1,2})?",
        ".{0,12}",
    ]
}

/// Ragged tables of up to twenty rows.
fn table() -> impl Strategy<Value = Vec<Vec<String>>> {
    prop::collection::vec(prop::collection::vec(cell(), 0..8), 0..20)
}

proptest! {
    #[test]
    fn decoding_keeps_one_record_per_data_row(rows in table()) {
        let parsed = parse_table(&rows);
        prop_assert_eq!(parsed.participants.len(), rows.len().saturating_sub(1));
        for participant in &parsed.participants {
            prop_assert!(participant.donation_total.is_finite());
            prop_assert!(participant.donation_total >= 0.0);
        }
    }

    #[test]
    fn diagnostics_point_at_real_data_rows(rows in table()) {
        let parsed = parse_table(&rows);
        for diagnostic in &parsed.diagnostics {
            prop_assert!(diagnostic.sheet_row >= 2);
            prop_assert!(diagnostic.sheet_row <= rows.len());
            prop_assert_eq!(diagnostic.column, SheetColumn::Donation);
            let index = diagnostic.sheet_row - 2;
            prop_assert_eq!(parsed.participants[index].donation_total, 0.0);
        }
    }
}

#[test]
fn header_only_table_is_empty() {
    let rows = vec![vec!["QR Code".to_string(), "Name".to_string()]];
    assert!(parse_table(&rows).participants.is_empty());
    assert!(parse_table::<Vec<String>>(&[]).participants.is_empty());
}

#[test]
fn every_coercion_reason_is_reported() {
    let rows: Vec<Vec<String>> = [
        vec!["h"],
        vec!["A", "", "", "", "abc"],
        vec!["B", "", "", "", "inf"],
        vec!["C", "", "", "", "-2"],
        vec!["D", "", "", "", "  "],
    ]
    .iter()
    .map(|row| row.iter().map(ToString::to_string).collect())
    .collect();
    let parsed = parse_table(&rows);
    let reasons: Vec<(usize, DiagnosticReason)> =
        parsed.diagnostics.iter().map(|d| (d.sheet_row, d.reason)).collect();
    assert_eq!(reasons, vec![
        (sheet_row_number(0), DiagnosticReason::NotANumber),
        (sheet_row_number(1), DiagnosticReason::NonFinite),
        (sheet_row_number(2), DiagnosticReason::Negative),
    ]);
    assert_eq!(parsed.participants.len(), 4);
}
