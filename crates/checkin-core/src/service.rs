// crates/checkin-core/src/service.rs
// ============================================================================
// Module: Check-in Service
// Description: Listing, check-in, donation, statistics, and lottery operations.
// Purpose: Apply one validated state transition per call against the store.
// Dependencies: crate::clock, crate::interfaces, crate::store, rand, serde
// ============================================================================

//! ## Overview
//! Every operation validates its input first, then performs a full fetch,
//! locates the target by linear scan (first exact, case-sensitive match),
//! and issues at most one range write. Validation failures never reach the
//! store.
//!
//! Security posture: QR codes and amounts are caller input; they are
//! validated here before any remote call is made.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;

use rand::Rng;
use serde::Serialize;
use thiserror::Error;

use crate::clock::Clock;
use crate::interfaces::CellValue;
use crate::interfaces::ColumnWindow;
use crate::interfaces::ParticipantStore;
use crate::interfaces::StoreError;
use crate::participant::Participant;
use crate::store::SharedParticipantStore;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Validation message for a blank or missing QR code.
pub const QR_CODE_REQUIRED: &str = "QR code is required";
/// Validation message for a missing donation amount.
pub const AMOUNT_REQUIRED: &str = "Donation amount is required";
/// Validation message for an amount that is not a finite number.
pub const AMOUNT_INVALID: &str = "Invalid donation amount format";
/// Validation message for a zero or negative amount.
pub const AMOUNT_NOT_POSITIVE: &str = "Donation amount must be positive";
/// Validation message for a lottery draw of zero winners.
pub const WINNERS_REQUIRED: &str = "Winner count must be at least 1";
/// Winners drawn when a lottery request names no count.
pub const DEFAULT_LOTTERY_WINNERS: usize = 1;
/// Presence flag text written on check-in.
const PRESENT_TEXT: &str = "TRUE";
/// Default minimum donation for lottery eligibility.
pub const DEFAULT_MINIMUM_DONATION: f64 = 500.0;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Reasons an operation was refused after a successful fetch.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Rejection {
    /// No participant carries the QR code.
    #[error("participant not found")]
    NotFound,
    /// The participant is already marked present.
    #[error("participant already checked in")]
    AlreadyCheckedIn,
    /// No participant meets the lottery minimum.
    #[error("no participants eligible for the lottery")]
    NoEligibleParticipants,
}

impl Rejection {
    /// Returns a stable label for audit output.
    #[must_use]
    pub const fn kind(self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::AlreadyCheckedIn => "already_checked_in",
            Self::NoEligibleParticipants => "no_eligible_participants",
        }
    }
}

/// Check-in operation errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
/// - `Validation` is only produced before the store is contacted.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CheckinError {
    /// Caller input failed validation.
    #[error("{0}")]
    Validation(String),
    /// The operation was refused.
    #[error("{0}")]
    Rejected(Rejection),
    /// The store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl CheckinError {
    /// Returns a stable label for audit output.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Rejected(rejection) => rejection.kind(),
            Self::Store(error) => error.kind(),
        }
    }
}

// ============================================================================
// SECTION: Types
// ============================================================================

/// Operation settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ServiceConfig {
    /// Donation total at which a participant counts as a big donor.
    pub minimum_donation: f64,
    /// Serialize check-in and donation behind one process-wide lock.
    pub serialize_mutations: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            minimum_donation: DEFAULT_MINIMUM_DONATION,
            serialize_mutations: false,
        }
    }
}

/// Successful check-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckinReceipt {
    /// Position of the updated row in the fetch.
    pub row_index: usize,
    /// Timestamp written to the last-updated column.
    pub updated_at: String,
}

/// Successful donation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DonationReceipt {
    /// Amount added.
    pub amount: f64,
    /// Donation total after the write.
    pub total: f64,
    /// Timestamp written to the last-updated column.
    pub updated_at: String,
}

/// Aggregate view of the participant table.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantStats {
    /// Number of participant rows.
    pub total: usize,
    /// Participants marked present.
    pub present: usize,
    /// Sum of all donation totals.
    pub total_donations: f64,
    /// Participants whose total reaches the minimum donation.
    pub big_donors: usize,
    /// Threshold used for `big_donors`.
    pub minimum_donation: f64,
}

/// Result of a lottery draw.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LotteryDraw {
    /// Number of eligible participants.
    pub eligible: usize,
    /// Distinct winners in draw order.
    pub winners: Vec<Participant>,
}

// ============================================================================
// SECTION: Service
// ============================================================================

/// Participant operations over a shared store.
pub struct CheckinService {
    /// Backing participant table.
    store: SharedParticipantStore,
    /// Timestamp source.
    clock: Arc<dyn Clock>,
    /// Operation settings.
    config: ServiceConfig,
    /// Guard taken by mutations when serialization is enabled.
    mutation_lock: Mutex<()>,
}

impl CheckinService {
    /// Creates a service.
    #[must_use]
    pub fn new(
        store: SharedParticipantStore,
        clock: Arc<dyn Clock>,
        config: ServiceConfig,
    ) -> Self {
        Self {
            store,
            clock,
            config,
            mutation_lock: Mutex::new(()),
        }
    }

    /// Returns the operation settings.
    #[must_use]
    pub const fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Returns every participant in sheet order.
    ///
    /// # Errors
    ///
    /// Returns [`CheckinError::Store`] when the fetch fails.
    pub fn list(&self) -> Result<Vec<Participant>, CheckinError> {
        Ok(self.store.fetch_all()?)
    }

    /// Marks the participant carrying `qr_code` as present.
    ///
    /// The prior donation total is rewritten unchanged so the write covers
    /// one contiguous window.
    ///
    /// # Errors
    ///
    /// Returns [`CheckinError::Validation`] for a blank code,
    /// [`CheckinError::Rejected`] when the participant is missing or already
    /// present, and [`CheckinError::Store`] when the fetch or write fails.
    pub fn check_in(&self, qr_code: &str) -> Result<CheckinReceipt, CheckinError> {
        require_qr_code(qr_code)?;
        let _guard = self.mutation_guard();
        let participants = self.store.fetch_all()?;
        let (row_index, participant) =
            find(&participants, qr_code).ok_or(CheckinError::Rejected(Rejection::NotFound))?;
        if participant.present {
            return Err(CheckinError::Rejected(Rejection::AlreadyCheckedIn));
        }
        let updated_at = self.clock.now().to_string();
        self.store.update_range(row_index, ColumnWindow::CHECK_IN, &[
            CellValue::text(PRESENT_TEXT),
            CellValue::Number(participant.donation_total),
            CellValue::text(updated_at.clone()),
        ])?;
        Ok(CheckinReceipt {
            row_index,
            updated_at,
        })
    }

    /// Adds `amount` to the donation total of the participant carrying
    /// `qr_code`.
    ///
    /// # Errors
    ///
    /// Returns [`CheckinError::Validation`] for a blank code, an amount that
    /// is not a finite positive number, or a new total that would overflow,
    /// [`CheckinError::Rejected`] when
    /// the participant is missing, and [`CheckinError::Store`] when the fetch
    /// or write fails.
    pub fn add_donation(
        &self,
        qr_code: &str,
        amount: f64,
    ) -> Result<DonationReceipt, CheckinError> {
        require_qr_code(qr_code)?;
        validate_amount(amount)?;
        let _guard = self.mutation_guard();
        let participants = self.store.fetch_all()?;
        let (row_index, participant) =
            find(&participants, qr_code).ok_or(CheckinError::Rejected(Rejection::NotFound))?;
        let total = participant.donation_total + amount;
        if !total.is_finite() {
            return Err(CheckinError::Validation(AMOUNT_INVALID.to_string()));
        }
        let updated_at = self.clock.now().to_string();
        self.store.update_range(row_index, ColumnWindow::DONATION, &[
            CellValue::Number(total),
            CellValue::text(updated_at.clone()),
        ])?;
        Ok(DonationReceipt {
            amount,
            total,
            updated_at,
        })
    }

    /// Computes participant statistics from one fetch.
    ///
    /// # Errors
    ///
    /// Returns [`CheckinError::Store`] when the fetch fails.
    pub fn stats(&self) -> Result<ParticipantStats, CheckinError> {
        let participants = self.store.fetch_all()?;
        let minimum_donation = self.config.minimum_donation;
        Ok(ParticipantStats {
            total: participants.len(),
            present: participants.iter().filter(|participant| participant.present).count(),
            total_donations: participants
                .iter()
                .map(|participant| participant.donation_total)
                .sum(),
            big_donors: participants
                .iter()
                .filter(|participant| participant.donation_total >= minimum_donation)
                .count(),
            minimum_donation,
        })
    }

    /// Returns participants whose donation total reaches the minimum
    /// donation, in sheet order.
    ///
    /// # Errors
    ///
    /// Returns [`CheckinError::Store`] when the fetch fails.
    pub fn big_donors(&self) -> Result<Vec<Participant>, CheckinError> {
        let minimum_donation = self.config.minimum_donation;
        Ok(self
            .store
            .fetch_all()?
            .into_iter()
            .filter(|participant| participant.donation_total >= minimum_donation)
            .collect())
    }

    /// Draws `count` distinct winners among participants whose donation
    /// total reaches the minimum donation.
    ///
    /// # Errors
    ///
    /// Returns [`CheckinError::Validation`] when `count` is zero or exceeds
    /// the eligible count, [`CheckinError::Rejected`] when nobody is
    /// eligible, and [`CheckinError::Store`] when the fetch fails.
    pub fn draw_lottery<R: Rng + ?Sized>(
        &self,
        count: usize,
        rng: &mut R,
    ) -> Result<LotteryDraw, CheckinError> {
        if count == 0 {
            return Err(CheckinError::Validation(WINNERS_REQUIRED.to_string()));
        }
        let eligible = self.big_donors()?;
        if eligible.is_empty() {
            return Err(CheckinError::Rejected(Rejection::NoEligibleParticipants));
        }
        if count > eligible.len() {
            return Err(CheckinError::Validation(format!("Maximum winners: {}", eligible.len())));
        }
        let winners = rand::seq::index::sample(rng, eligible.len(), count)
            .into_iter()
            .filter_map(|index| eligible.get(index).cloned())
            .collect();
        Ok(LotteryDraw {
            eligible: eligible.len(),
            winners,
        })
    }

    /// Takes the mutation lock when serialization is enabled.
    fn mutation_guard(&self) -> Option<MutexGuard<'_, ()>> {
        self.config
            .serialize_mutations
            .then(|| self.mutation_lock.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Rejects blank QR codes.
///
/// # Errors
///
/// Returns [`CheckinError::Validation`] when the code is empty after trimming.
pub fn require_qr_code(qr_code: &str) -> Result<(), CheckinError> {
    if qr_code.trim().is_empty() {
        return Err(CheckinError::Validation(QR_CODE_REQUIRED.to_string()));
    }
    Ok(())
}

/// Rejects amounts that are not finite and positive.
fn validate_amount(amount: f64) -> Result<(), CheckinError> {
    if !amount.is_finite() {
        return Err(CheckinError::Validation(AMOUNT_INVALID.to_string()));
    }
    if amount <= 0.0 {
        return Err(CheckinError::Validation(AMOUNT_NOT_POSITIVE.to_string()));
    }
    Ok(())
}

/// Returns the first participant whose identifier equals `qr_code`.
fn find<'a>(participants: &'a [Participant], qr_code: &str) -> Option<(usize, &'a Participant)> {
    participants.iter().enumerate().find(|(_, participant)| participant.identifier == qr_code)
}
