// crates/checkin-core/src/interfaces.rs
// ============================================================================
// Module: Check-in Interfaces
// Description: Backend-agnostic capability for the participant table.
// Purpose: Define the contract surface between operations and storage.
// Dependencies: crate::participant, serde, thiserror
// ============================================================================

//! ## Overview
//! The participant table is reached only through [`ParticipantStore`], which
//! has exactly two operations: a full fetch and a blind write of one
//! contiguous cell window in one row. Neither operation is atomic with the
//! other; callers that read, decide, and write are exposed to lost updates.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::participant::Participant;
use crate::participant::SheetColumn;

// ============================================================================
// SECTION: Cell Values
// ============================================================================

/// Literal value written into a cell.
///
/// # Invariants
/// - Serializes as a bare JSON string or number.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    /// Text cell.
    Text(String),
    /// Numeric cell.
    Number(f64),
}

impl CellValue {
    /// Builds a text cell.
    #[must_use]
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(value) => f.write_str(value),
            Self::Number(value) => write!(f, "{value}"),
        }
    }
}

// ============================================================================
// SECTION: Column Windows
// ============================================================================

/// Inclusive, contiguous run of columns within one row.
///
/// # Invariants
/// - `first` never sits to the right of `last`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ColumnWindow {
    /// Leftmost column.
    first: SheetColumn,
    /// Rightmost column.
    last: SheetColumn,
}

impl ColumnWindow {
    /// Columns written by a check-in: presence, donation, last-updated.
    pub const CHECK_IN: Self = Self {
        first: SheetColumn::Present,
        last: SheetColumn::LastUpdated,
    };
    /// Columns written by a donation: donation, last-updated.
    pub const DONATION: Self = Self {
        first: SheetColumn::Donation,
        last: SheetColumn::LastUpdated,
    };

    /// Creates a window, returning `None` when the bounds are reversed.
    #[must_use]
    pub fn new(first: SheetColumn, last: SheetColumn) -> Option<Self> {
        (first <= last).then_some(Self {
            first,
            last,
        })
    }

    /// Returns the leftmost column.
    #[must_use]
    pub const fn first(&self) -> SheetColumn {
        self.first
    }

    /// Returns the rightmost column.
    #[must_use]
    pub const fn last(&self) -> SheetColumn {
        self.last
    }

    /// Returns the number of cells covered.
    #[must_use]
    pub const fn width(&self) -> usize {
        self.last.index() - self.first.index() + 1
    }
}

// ============================================================================
// SECTION: Participant Store
// ============================================================================

/// Store errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The store could not be reached or the transport failed.
    #[error("store unavailable: {0}")]
    Unavailable(String),
    /// The store rejected the credentials.
    #[error("store authentication failed: {0}")]
    Auth(String),
    /// The store answered with something unexpected.
    #[error("store protocol error: {0}")]
    Protocol(String),
    /// The client is misconfigured.
    #[error("store configuration error: {0}")]
    Config(String),
}

impl StoreError {
    /// Returns a stable label for audit output.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Unavailable(_) => "store_unavailable",
            Self::Auth(_) => "store_auth",
            Self::Protocol(_) => "store_protocol",
            Self::Config(_) => "store_config",
        }
    }
}

/// Backend-agnostic participant table.
pub trait ParticipantStore {
    /// Fetches every participant, in sheet order, header excluded.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the table cannot be read. A malformed row
    /// is never an error.
    fn fetch_all(&self) -> Result<Vec<Participant>, StoreError>;

    /// Overwrites `columns` of the row at `row_index` (position within the
    /// last fetch) with `values`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the write fails or `values` does not match
    /// the window width.
    fn update_range(
        &self,
        row_index: usize,
        columns: ColumnWindow,
        values: &[CellValue],
    ) -> Result<(), StoreError>;
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, reason = "Test-only assertions.")]

    use super::CellValue;
    use super::ColumnWindow;
    use crate::participant::SheetColumn;

    #[test]
    fn fixed_windows_cover_expected_widths() {
        assert_eq!(ColumnWindow::CHECK_IN.width(), 3);
        assert_eq!(ColumnWindow::DONATION.width(), 2);
    }

    #[test]
    fn reversed_window_is_rejected() {
        assert!(ColumnWindow::new(SheetColumn::LastUpdated, SheetColumn::Present).is_none());
        let single = ColumnWindow::new(SheetColumn::Donation, SheetColumn::Donation).unwrap();
        assert_eq!(single.width(), 1);
    }

    #[test]
    fn cells_serialize_as_bare_values() {
        let cells = vec![CellValue::text("TRUE"), CellValue::Number(25.0)];
        let json = serde_json::to_string(&cells).unwrap();
        assert_eq!(json, r#"["TRUE",25.0]"#);
        assert_eq!(CellValue::Number(25.0).to_string(), "25");
        assert_eq!(CellValue::Number(12.5).to_string(), "12.5");
    }
}
