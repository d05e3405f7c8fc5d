// crates/checkin-sheets/src/range.rs
// ============================================================================
// Module: A1 Ranges
// Description: A1-notation ranges for the participant table.
// Purpose: Keep row and column arithmetic for remote reads and writes in one place.
// Dependencies: checkin-core
// ============================================================================

//! ## Overview
//! The read range always spans the six participant columns of every row.
//! Write ranges cover one column window of one row; the sheet row number is
//! the batch position plus the header offset.

// ============================================================================
// SECTION: Imports
// ============================================================================

use checkin_core::ColumnWindow;
use checkin_core::SheetColumn;
use checkin_core::sheet_row_number;

// ============================================================================
// SECTION: Ranges
// ============================================================================

/// Returns the range covering every participant column, e.g. `Participants!A:F`.
#[must_use]
pub fn read_range(sheet_name: &str) -> String {
    format!(
        "{}!{}:{}",
        sheet_reference(sheet_name),
        SheetColumn::Identifier.letter(),
        SheetColumn::LastUpdated.letter()
    )
}

/// Returns the range for `columns` of the row at `row_index`, e.g.
/// `Participants!D2:F2`.
#[must_use]
pub fn write_range(sheet_name: &str, row_index: usize, columns: ColumnWindow) -> String {
    let row = sheet_row_number(row_index);
    format!(
        "{}!{}{row}:{}{row}",
        sheet_reference(sheet_name),
        columns.first().letter(),
        columns.last().letter()
    )
}

/// Quotes sheet names that are not plain identifiers.
fn sheet_reference(sheet_name: &str) -> String {
    if sheet_name.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '_') {
        sheet_name.to_string()
    } else {
        format!("'{sheet_name}'")
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
