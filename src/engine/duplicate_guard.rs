// ==========================================
// Transformer Dispatch - duplicate-serial guard
// ==========================================
// Advisory only: callers warn and let the user confirm.
// A serial conflicts when it already exists in a non-lab document of
// the same direction, unless that unit failed lab testing and has
// already been re-circulated.
// ==========================================

use std::sync::Arc;
use tracing::warn;

use crate::domain::outstanding::{DuplicateSerial, UnitWithDispatch};
use crate::domain::types::{Direction, LabTestResult};
use crate::repository::{RepositoryResult, UnitRepository};

pub struct DuplicateSerialGuard {
    unit_repo: Arc<UnitRepository>,
}

impl DuplicateSerialGuard {
    pub fn new(unit_repo: Arc<UnitRepository>) -> Self {
        Self { unit_repo }
    }

    /// Serials from `serials` already registered in the same flow
    ///
    /// Lab round-trip documents reuse serials across directions, so they
    /// never report duplicates. `exclude_dispatch_id` skips the document
    /// currently being edited.
    pub fn check(
        &self,
        serials: &[String],
        direction: Direction,
        is_lab_round_trip: bool,
        exclude_dispatch_id: Option<&str>,
    ) -> RepositoryResult<Vec<DuplicateSerial>> {
        if is_lab_round_trip {
            return Ok(Vec::new());
        }

        let wanted: Vec<String> = serials
            .iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if wanted.is_empty() {
            return Ok(Vec::new());
        }

        let candidates = self.unit_repo.find_by_serials(&wanted, direction)?;
        let duplicates = conflicts(candidates, exclude_dispatch_id);

        for dup in &duplicates {
            warn!(
                serial = %dup.serial_number,
                dispatch = %dup.conflicting_dispatch_number,
                direction = %dup.conflicting_direction,
                "duplicate serial"
            );
        }
        Ok(duplicates)
    }
}

/// Apply the conflict policy to units sharing a serial and direction
pub fn conflicts(
    candidates: Vec<UnitWithDispatch>,
    exclude_dispatch_id: Option<&str>,
) -> Vec<DuplicateSerial> {
    candidates
        .into_iter()
        .filter(|c| !c.is_lab_round_trip)
        .filter(|c| Some(c.dispatch_id.as_str()) != exclude_dispatch_id)
        .filter(|c| still_in_circulation(c))
        .map(|c| DuplicateSerial {
            serial_number: c.unit.serial_number,
            conflicting_dispatch_id: c.dispatch_id,
            conflicting_dispatch_number: c.dispatch_number,
            conflicting_direction: c.direction,
        })
        .collect()
}

/// A failed unit that was already re-added elsewhere no longer conflicts
fn still_in_circulation(candidate: &UnitWithDispatch) -> bool {
    match candidate.unit.lab_test_result {
        None | Some(LabTestResult::Pass) => true,
        Some(LabTestResult::Fail) => !candidate.unit.is_processed,
    }
}
