// crates/checkin-core/src/participant.rs
// ============================================================================
// Module: Participant Records
// Description: Typed participant rows and the row-to-record translation.
// Purpose: Decode ragged, untrusted spreadsheet rows without failing a batch.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! The participant table is a six-column range with a header in the first
//! row. [`parse_table`] skips the header and turns every following row into a
//! [`Participant`], in order. Rows are never dropped: the position of a
//! record in the returned vector is the address used for later writes, so an
//! empty or malformed row must still occupy its slot.
//!
//! Malformed cells are coerced to their zero value and reported as
//! [`RowDiagnostic`] entries instead of errors.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Layout
// ============================================================================

/// Number of header rows preceding participant data.
pub const HEADER_ROWS: usize = 1;

/// Sheet row number (1-based) of the first participant.
pub const FIRST_DATA_ROW: usize = HEADER_ROWS + 1;

/// Columns of the participant range, in sheet order.
///
/// # Invariants
/// - Discriminant order matches the left-to-right column order `A..F`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SheetColumn {
    /// Column A: QR code.
    Identifier,
    /// Column B: given name.
    GivenName,
    /// Column C: family name.
    FamilyName,
    /// Column D: presence flag.
    Present,
    /// Column E: donation total.
    Donation,
    /// Column F: last-updated timestamp.
    LastUpdated,
}

impl SheetColumn {
    /// All columns in sheet order.
    pub const ALL: [Self; 6] = [
        Self::Identifier,
        Self::GivenName,
        Self::FamilyName,
        Self::Present,
        Self::Donation,
        Self::LastUpdated,
    ];

    /// Returns the zero-based cell index of the column within a row.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Identifier => 0,
            Self::GivenName => 1,
            Self::FamilyName => 2,
            Self::Present => 3,
            Self::Donation => 4,
            Self::LastUpdated => 5,
        }
    }

    /// Returns the A1-notation column letter.
    #[must_use]
    pub const fn letter(self) -> char {
        match self {
            Self::Identifier => 'A',
            Self::GivenName => 'B',
            Self::FamilyName => 'C',
            Self::Present => 'D',
            Self::Donation => 'E',
            Self::LastUpdated => 'F',
        }
    }
}

/// Converts a position in a fetched batch into its 1-based sheet row number.
#[must_use]
pub const fn sheet_row_number(row_index: usize) -> usize {
    row_index.saturating_add(FIRST_DATA_ROW)
}

// ============================================================================
// SECTION: Participant
// ============================================================================

/// One participant row.
///
/// # Invariants
/// - `donation_total` is finite and non-negative once decoded.
/// - JSON field names follow the public participant API.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Participant {
    /// External unique key printed in the participant's QR code.
    #[serde(rename = "qrCode")]
    pub identifier: String,
    /// Given name.
    #[serde(rename = "name")]
    pub given_name: String,
    /// Family name.
    #[serde(rename = "surname")]
    pub family_name: String,
    /// Whether the participant has checked in.
    #[serde(rename = "visited")]
    pub present: bool,
    /// Accumulated donations.
    #[serde(rename = "donation")]
    pub donation_total: f64,
    /// Last-updated timestamp as stored in the sheet.
    #[serde(rename = "updatedAt")]
    pub last_updated: String,
}

// ============================================================================
// SECTION: Diagnostics
// ============================================================================

/// Why a cell was coerced to its zero value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticReason {
    /// The cell does not parse as a number.
    NotANumber,
    /// The cell parses to NaN or an infinity.
    NonFinite,
    /// The cell holds a negative amount.
    Negative,
}

impl DiagnosticReason {
    /// Returns a stable label for audit output.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotANumber => "not_a_number",
            Self::NonFinite => "non_finite",
            Self::Negative => "negative",
        }
    }
}

/// A malformed cell that was coerced during decoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowDiagnostic {
    /// 1-based sheet row number.
    pub sheet_row: usize,
    /// Column holding the malformed value.
    pub column: SheetColumn,
    /// Raw cell text.
    pub raw: String,
    /// Coercion reason.
    pub reason: DiagnosticReason,
}

/// Result of decoding a fetched range.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedTable {
    /// Participants in sheet order, header excluded.
    pub participants: Vec<Participant>,
    /// Cells coerced while decoding.
    pub diagnostics: Vec<RowDiagnostic>,
}

// ============================================================================
// SECTION: Decoding
// ============================================================================

/// Decodes a raw range (header included) into participants.
///
/// Row 0 is always treated as the header. Missing trailing cells take their
/// defaults; malformed donation cells become `0.0` plus a diagnostic.
#[must_use]
pub fn parse_table<R: AsRef<[String]>>(rows: &[R]) -> ParsedTable {
    let mut table = ParsedTable::default();
    for (row_index, row) in rows.iter().skip(HEADER_ROWS).enumerate() {
        let sheet_row = sheet_row_number(row_index);
        let participant = parse_row(sheet_row, row.as_ref(), &mut table.diagnostics);
        table.participants.push(participant);
    }
    table
}

/// Decodes a single data row.
fn parse_row(
    sheet_row: usize,
    cells: &[String],
    diagnostics: &mut Vec<RowDiagnostic>,
) -> Participant {
    let text = |column: SheetColumn| cells.get(column.index()).cloned().unwrap_or_default();
    let donation_raw = text(SheetColumn::Donation);
    let donation_total = match parse_donation(&donation_raw) {
        Ok(value) => value,
        Err(reason) => {
            diagnostics.push(RowDiagnostic {
                sheet_row,
                column: SheetColumn::Donation,
                raw: donation_raw,
                reason,
            });
            0.0
        }
    };
    Participant {
        identifier: text(SheetColumn::Identifier),
        given_name: text(SheetColumn::GivenName),
        family_name: text(SheetColumn::FamilyName),
        present: parse_flag(&text(SheetColumn::Present)),
        donation_total,
        last_updated: text(SheetColumn::LastUpdated),
    }
}

/// Parses a presence flag; only `true` (any ASCII case) is true.
fn parse_flag(raw: &str) -> bool {
    raw.trim().eq_ignore_ascii_case("true")
}

/// Parses a donation cell. Blank cells are zero without a diagnostic.
fn parse_donation(raw: &str) -> Result<f64, DiagnosticReason> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(0.0);
    }
    let value: f64 = trimmed.parse().map_err(|_| DiagnosticReason::NotANumber)?;
    if !value.is_finite() {
        return Err(DiagnosticReason::NonFinite);
    }
    if value < 0.0 {
        return Err(DiagnosticReason::Negative);
    }
    Ok(value)
}

// ============================================================================
// SECTION: Tests
// ============================================================================
