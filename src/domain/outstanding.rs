// ==========================================
// Transformer Dispatch - reconciliation outputs
// ==========================================
// Results handed to dashboard / report consumers. Nothing here is
// persisted; every value is recomputed from current records.
// ==========================================

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::domain::dispatch::Unit;
use crate::domain::types::{Direction, DocumentKind};

// ==========================================
// OutstandingReason
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutstandingReason {
    /// Pass 1: intake batch not fully matched by linked returns
    NotYetReturned,
    /// Pass 2: return never tied back to an intake document
    ReturnedWithoutIntakeLink,
    /// Pass 3: sent for lab testing, not yet received back
    SentForTesting,
}

impl OutstandingReason {
    pub fn i18n_key(&self) -> &'static str {
        match self {
            OutstandingReason::NotYetReturned => "reason.not_yet_returned",
            OutstandingReason::ReturnedWithoutIntakeLink => "reason.returned_without_intake_link",
            OutstandingReason::SentForTesting => "reason.sent_for_testing",
        }
    }

    /// Localised human-readable annotation
    pub fn label(&self) -> String {
        crate::i18n::t(self.i18n_key())
    }
}

impl fmt::Display for OutstandingReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutstandingReason::NotYetReturned => write!(f, "NOT_YET_RETURNED"),
            OutstandingReason::ReturnedWithoutIntakeLink => {
                write!(f, "RETURNED_WITHOUT_INTAKE_LINK")
            }
            OutstandingReason::SentForTesting => write!(f, "SENT_FOR_TESTING"),
        }
    }
}

// ==========================================
// OutstandingUnit
// ==========================================
/// One unit still outstanding, with its owning document and the reason
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutstandingUnit {
    pub unit: Unit,
    pub dispatch_id: String,
    pub dispatch_number: String,
    pub date: NaiveDate,
    pub transaction_date: NaiveDate,
    pub direction: Direction,
    pub document_kind: DocumentKind,
    pub reason: OutstandingReason,
    pub reason_label: String,
}

// ==========================================
// IntakeBatchStatus
// ==========================================
/// Completion state of one intake batch against its linked returns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntakeBatchStatus {
    pub dispatch_id: String,
    pub dispatch_number: String,
    pub date: NaiveDate,
    pub unit_count: usize,
    pub returned_count: usize,
    /// capacity category -> units not yet covered by returns
    pub shortfall: BTreeMap<String, usize>,
    pub is_complete: bool,
}

// ==========================================
// DashboardTotals
// ==========================================
/// Naive counts; expected to diverge from the resolver's precise list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardTotals {
    pub total_intake: i64,
    pub total_return: i64,
    pub naive_outstanding: i64,
}

impl DashboardTotals {
    pub fn new(total_intake: i64, total_return: i64) -> Self {
        Self {
            total_intake,
            total_return,
            naive_outstanding: total_intake - total_return,
        }
    }
}

// ==========================================
// DuplicateSerial
// ==========================================
/// An existing unit that conflicts with a serial being registered
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateSerial {
    pub serial_number: String,
    pub conflicting_dispatch_id: String,
    pub conflicting_dispatch_number: String,
    pub conflicting_direction: Direction,
}

impl fmt::Display for DuplicateSerial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            crate::i18n::t_with_args(
                "duplicate.serial_exists",
                &[
                    ("serial", self.serial_number.as_str()),
                    ("dispatch", self.conflicting_dispatch_number.as_str()),
                ],
            )
        )
    }
}

// ==========================================
// Unit listings with owning document
// ==========================================
/// Unit plus the owning dispatch header, for dashboard lists
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitWithDispatch {
    pub unit: Unit,
    pub dispatch_id: String,
    pub dispatch_number: String,
    pub date: NaiveDate,
    pub direction: Direction,
    pub document_kind: DocumentKind,
    pub is_lab_round_trip: bool,
}
