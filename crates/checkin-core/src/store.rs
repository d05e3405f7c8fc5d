// crates/checkin-core/src/store.rs
// ============================================================================
// Module: Check-in In-Memory Store
// Description: Raw-row participant table held in memory, plus a shared wrapper.
// Purpose: Provide a deterministic store for tests, demos, and the CLI.
// Dependencies: crate::audit, crate::interfaces, crate::participant
// ============================================================================

//! ## Overview
//! [`InMemoryParticipantStore`] keeps the table as raw text rows, header
//! included, and decodes it with the same [`parse_table`] used for remote
//! reads. Writes are applied to the rows and also recorded as
//! [`RangeWrite`] entries so tests can assert on exactly what was sent.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;

use crate::audit::AuditSink;
use crate::audit::RowDiagnosticEvent;
use crate::interfaces::CellValue;
use crate::interfaces::ColumnWindow;
use crate::interfaces::ParticipantStore;
use crate::interfaces::StoreError;
use crate::participant::HEADER_ROWS;
use crate::participant::Participant;
use crate::participant::SheetColumn;
use crate::participant::parse_table;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Header row used when a store is seeded from participants.
const DEFAULT_HEADER: [&str; 6] = ["QR Code", "Name", "Surname", "Visited", "Donation", "Updated"];

/// One range write observed by the in-memory store.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeWrite {
    /// Position of the row within the fetched batch.
    pub row_index: usize,
    /// Columns overwritten.
    pub columns: ColumnWindow,
    /// Values written, left to right.
    pub values: Vec<CellValue>,
}

/// Mutable state behind the store mutex.
#[derive(Debug, Default)]
struct TableState {
    /// Raw rows, header first.
    rows: Vec<Vec<String>>,
    /// Writes in arrival order.
    writes: Vec<RangeWrite>,
    /// Injected failure returned by every call while set.
    fault: Option<StoreError>,
}

/// In-memory participant table for tests and local demos.
#[derive(Clone)]
pub struct InMemoryParticipantStore {
    /// Table state protected by a mutex.
    state: Arc<Mutex<TableState>>,
    /// Optional sink for row coercion diagnostics.
    audit: Option<Arc<dyn AuditSink>>,
}

impl InMemoryParticipantStore {
    /// Creates a store from raw rows; the first row is the header.
    #[must_use]
    pub fn from_rows(rows: Vec<Vec<String>>) -> Self {
        Self {
            state: Arc::new(Mutex::new(TableState {
                rows,
                writes: Vec::new(),
                fault: None,
            })),
            audit: None,
        }
    }

    /// Creates a store holding `participants` under a default header.
    #[must_use]
    pub fn from_participants(participants: &[Participant]) -> Self {
        let mut rows = Vec::with_capacity(participants.len() + HEADER_ROWS);
        rows.push(DEFAULT_HEADER.iter().map(ToString::to_string).collect());
        rows.extend(participants.iter().map(participant_row));
        Self::from_rows(rows)
    }

    /// Attaches an audit sink for row diagnostics.
    #[must_use]
    pub fn with_audit(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Makes every subsequent call fail with `error`, or clears the fault.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] when the store mutex is poisoned.
    pub fn set_fault(&self, error: Option<StoreError>) -> Result<(), StoreError> {
        self.lock()?.fault = error;
        Ok(())
    }

    /// Returns the writes received so far.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] when the store mutex is poisoned.
    pub fn writes(&self) -> Result<Vec<RangeWrite>, StoreError> {
        Ok(self.lock()?.writes.clone())
    }

    /// Returns a copy of the raw rows, header included.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] when the store mutex is poisoned.
    pub fn rows(&self) -> Result<Vec<Vec<String>>, StoreError> {
        Ok(self.lock()?.rows.clone())
    }

    /// Locks the table state.
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, TableState>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::Unavailable("participant store mutex poisoned".to_string()))
    }
}

impl ParticipantStore for InMemoryParticipantStore {
    fn fetch_all(&self) -> Result<Vec<Participant>, StoreError> {
        let table = {
            let guard = self.lock()?;
            if let Some(fault) = &guard.fault {
                return Err(fault.clone());
            }
            parse_table(&guard.rows)
        };
        if let Some(audit) = &self.audit {
            for diagnostic in &table.diagnostics {
                audit.record_row_diagnostic(&RowDiagnosticEvent::new(diagnostic));
            }
        }
        Ok(table.participants)
    }

    fn update_range(
        &self,
        row_index: usize,
        columns: ColumnWindow,
        values: &[CellValue],
    ) -> Result<(), StoreError> {
        if values.len() != columns.width() {
            return Err(StoreError::Protocol(format!(
                "expected {} values for range, got {}",
                columns.width(),
                values.len()
            )));
        }
        let mut guard = self.lock()?;
        if let Some(fault) = &guard.fault {
            return Err(fault.clone());
        }
        let position = row_index.saturating_add(HEADER_ROWS);
        if guard.rows.len() <= position {
            guard.rows.resize_with(position + 1, Vec::new);
        }
        let row = &mut guard.rows[position];
        if row.len() <= columns.last().index() {
            row.resize(columns.last().index() + 1, String::new());
        }
        for (offset, value) in values.iter().enumerate() {
            row[columns.first().index() + offset] = value.to_string();
        }
        guard.writes.push(RangeWrite {
            row_index,
            columns,
            values: values.to_vec(),
        });
        drop(guard);
        Ok(())
    }
}

/// Renders a participant back into raw cell text.
fn participant_row(participant: &Participant) -> Vec<String> {
    SheetColumn::ALL
        .iter()
        .map(|column| match column {
            SheetColumn::Identifier => participant.identifier.clone(),
            SheetColumn::GivenName => participant.given_name.clone(),
            SheetColumn::FamilyName => participant.family_name.clone(),
            SheetColumn::Present => presence_text(participant.present).to_string(),
            SheetColumn::Donation => CellValue::Number(participant.donation_total).to_string(),
            SheetColumn::LastUpdated => participant.last_updated.clone(),
        })
        .collect()
}

/// Returns the cell text for a presence flag.
const fn presence_text(present: bool) -> &'static str {
    if present { "TRUE" } else { "FALSE" }
}

// ============================================================================
// SECTION: Shared Store Wrapper
// ============================================================================

/// Shared participant store backed by an `Arc` trait object.
#[derive(Clone)]
pub struct SharedParticipantStore {
    /// Inner store implementation.
    inner: Arc<dyn ParticipantStore + Send + Sync>,
}

impl SharedParticipantStore {
    /// Wraps a participant store in a shared, clonable wrapper.
    #[must_use]
    pub fn from_store(store: impl ParticipantStore + Send + Sync + 'static) -> Self {
        Self {
            inner: Arc::new(store),
        }
    }

    /// Wraps an existing shared store.
    #[must_use]
    pub const fn new(store: Arc<dyn ParticipantStore + Send + Sync>) -> Self {
        Self {
            inner: store,
        }
    }
}

impl ParticipantStore for SharedParticipantStore {
    fn fetch_all(&self) -> Result<Vec<Participant>, StoreError> {
        self.inner.fetch_all()
    }

    fn update_range(
        &self,
        row_index: usize,
        columns: ColumnWindow,
        values: &[CellValue],
    ) -> Result<(), StoreError> {
        self.inner.update_range(row_index, columns, values)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
