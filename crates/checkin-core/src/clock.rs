// crates/checkin-core/src/clock.rs
// ============================================================================
// Module: Check-in Clock
// Description: Local wall-clock timestamps written to the last-updated column.
// Purpose: Keep the timestamp format fixed and the clock injectable.
// Dependencies: time
// ============================================================================

//! ## Overview
//! Operations never read the wall clock directly; they ask a [`Clock`]. The
//! production [`SystemClock`] resolves the local UTC offset once, before the
//! async runtime starts worker threads, because offset detection is refused
//! by the `time` crate once a process is multi-threaded.
//!
//! Timestamps are rendered as `YYYY-MM-DDTHH:MM:SS` with no offset and no
//! fractional seconds, matching the existing spreadsheet contents.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use time::OffsetDateTime;
use time::PrimitiveDateTime;
use time::UtcOffset;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;

// ============================================================================
// SECTION: Timestamp
// ============================================================================

/// Layout of the last-updated column.
const TIMESTAMP_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");

/// Local date-time without offset, as stored in the last-updated column.
///
/// # Invariants
/// - Display output is always `YYYY-MM-DDTHH:MM:SS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct LocalTimestamp(PrimitiveDateTime);

impl LocalTimestamp {
    /// Wraps a primitive date-time.
    #[must_use]
    pub const fn new(value: PrimitiveDateTime) -> Self {
        Self(value)
    }

    /// Returns the wrapped date-time.
    #[must_use]
    pub const fn as_primitive(&self) -> PrimitiveDateTime {
        self.0
    }
}

impl fmt::Display for LocalTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered = self.0.format(TIMESTAMP_FORMAT).map_err(|_| fmt::Error)?;
        f.write_str(&rendered)
    }
}

// ============================================================================
// SECTION: Clocks
// ============================================================================

/// Source of "now" for operations that stamp rows.
pub trait Clock: Send + Sync {
    /// Returns the current local timestamp.
    fn now(&self) -> LocalTimestamp;
}

/// Wall clock shifted by a fixed UTC offset.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    /// Offset applied to the current UTC instant.
    offset: UtcOffset,
}

impl SystemClock {
    /// Creates a clock with an explicit offset.
    #[must_use]
    pub const fn with_offset(offset: UtcOffset) -> Self {
        Self {
            offset,
        }
    }

    /// Detects the host's local offset, falling back to UTC.
    ///
    /// Call this before spawning threads; detection fails in multi-threaded
    /// processes on most Unix targets.
    #[must_use]
    pub fn detect() -> Self {
        Self::with_offset(UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC))
    }

    /// Returns the offset this clock applies.
    #[must_use]
    pub const fn offset(&self) -> UtcOffset {
        self.offset
    }
}

impl Clock for SystemClock {
    fn now(&self) -> LocalTimestamp {
        let now = OffsetDateTime::now_utc().to_offset(self.offset);
        LocalTimestamp(PrimitiveDateTime::new(now.date(), now.time()))
    }
}

/// Clock pinned to one instant, for tests and replays.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(LocalTimestamp);

impl FixedClock {
    /// Creates a clock that always reports `value`.
    #[must_use]
    pub const fn new(value: PrimitiveDateTime) -> Self {
        Self(LocalTimestamp(value))
    }
}

impl Clock for FixedClock {
    fn now(&self) -> LocalTimestamp {
        self.0
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
