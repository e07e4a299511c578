// ==========================================
// Transformer Dispatch - unreturned-units resolver
// ==========================================
// Recomputes, on every call, which units are still outstanding:
//   pass 1: OFFICIAL non-lab INTAKE batches short of linked returns
//   pass 2: non-lab RETURN documents never tied to an intake
//   pass 3: lab RETURN documents not yet received back
// Nothing is persisted. Superseded PROVISIONAL documents (already
// formalized by an OFFICIAL one) never contribute to any pass.
// ==========================================

use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use crate::domain::dispatch::{Dispatch, DispatchFilter, Unit};
use crate::domain::outstanding::{DashboardTotals, IntakeBatchStatus, OutstandingReason, OutstandingUnit};
use crate::domain::types::{Direction, DocumentKind, TeamScope};
use crate::engine::capacity::{capacity_counts, same_capacity_mix, shortfall, HasCapacity};
use crate::repository::{DispatchRepository, RepositoryResult, UnitRepository};

#[cfg(test)]
mod tests;

// ==========================================
// ReconcileInput
// ==========================================

/// Current records for one resolver run, already team-scoped
#[derive(Debug, Clone, Default)]
pub struct ReconcileInput {
    /// OFFICIAL, non-lab INTAKE documents
    pub intake_batches: Vec<Dispatch>,
    /// RETURN documents whose source is one of `intake_batches`
    pub linked_returns: Vec<Dispatch>,
    /// Non-lab RETURN documents without a source
    pub orphan_returns: Vec<Dispatch>,
    /// Lab RETURN documents, superseded PROVISIONAL ones included
    pub lab_returns: Vec<Dispatch>,
    /// source_dispatch_id values referenced by INTAKE documents
    pub received_back_ids: HashSet<String>,
}

// ==========================================
// Pure reconciliation
// ==========================================

/// Run the three passes over `input`
pub fn reconcile(input: &ReconcileInput) -> Vec<OutstandingUnit> {
    let mut outstanding = Vec::new();

    let returns_by_source = group_returns_by_source(&input.linked_returns);
    for batch in input.intake_batches.iter().filter(|d| qualifies_for_pass1(d)) {
        let returned = returns_by_source
            .get(batch.id.as_str())
            .map(|units| units.as_slice())
            .unwrap_or_default();
        for unit in unreturned_from_batch(batch, returned) {
            outstanding.push(outstanding_entry(batch, unit, OutstandingReason::NotYetReturned));
        }
    }
    let pass1 = outstanding.len();

    for dispatch in input.orphan_returns.iter().filter(|d| qualifies_for_pass2(d)) {
        for unit in &dispatch.units {
            outstanding.push(outstanding_entry(
                dispatch,
                unit,
                OutstandingReason::ReturnedWithoutIntakeLink,
            ));
        }
    }
    let pass2 = outstanding.len() - pass1;

    for dispatch in pending_lab(&input.lab_returns, &input.received_back_ids) {
        for unit in &dispatch.units {
            outstanding.push(outstanding_entry(dispatch, unit, OutstandingReason::SentForTesting));
        }
    }
    let pass3 = outstanding.len() - pass1 - pass2;

    debug!(pass1, pass2, pass3, "resolver passes complete");
    verify_no_duplicates(&outstanding);
    outstanding
}

/// Completion state of every pass-1 batch
pub fn batch_statuses(input: &ReconcileInput) -> Vec<IntakeBatchStatus> {
    let returns_by_source = group_returns_by_source(&input.linked_returns);

    input
        .intake_batches
        .iter()
        .filter(|d| qualifies_for_pass1(d))
        .map(|batch| {
            let returned = returns_by_source
                .get(batch.id.as_str())
                .map(|units| units.as_slice())
                .unwrap_or_default();
            let gap = shortfall(&capacity_counts(&batch.units), &capacity_counts(returned));
            IntakeBatchStatus {
                dispatch_id: batch.id.clone(),
                dispatch_number: batch.document_number.clone(),
                date: batch.date,
                unit_count: batch.units.len(),
                returned_count: returned.len(),
                shortfall: gap,
                is_complete: same_capacity_mix(&batch.units, returned),
            }
        })
        .collect()
}

/// Lab RETURN documents not yet received back
///
/// A lab RETURN counts as received back when an INTAKE references it, or
/// references a PROVISIONAL document it superseded.
pub fn pending_lab<'a>(
    lab_returns: &'a [Dispatch],
    received_back_ids: &HashSet<String>,
) -> Vec<&'a Dispatch> {
    let mut closed: HashSet<&str> = received_back_ids.iter().map(|s| s.as_str()).collect();
    for provisional in lab_returns.iter().filter(|d| d.is_superseded()) {
        if let Some(official_id) = provisional.linked_official_id.as_deref() {
            if received_back_ids.contains(&provisional.id) {
                closed.insert(official_id);
            }
        }
    }

    lab_returns
        .iter()
        .filter(|d| d.direction == Direction::Return && d.is_lab_round_trip)
        .filter(|d| !d.is_superseded())
        .filter(|d| !closed.contains(d.id.as_str()))
        .collect()
}

fn qualifies_for_pass1(dispatch: &Dispatch) -> bool {
    dispatch.direction == Direction::Intake
        && dispatch.document_kind == DocumentKind::Official
        && !dispatch.is_lab_round_trip
}

fn qualifies_for_pass2(dispatch: &Dispatch) -> bool {
    dispatch.direction == Direction::Return
        && !dispatch.is_lab_round_trip
        && dispatch.source_dispatch_id.is_none()
        && !dispatch.is_superseded()
}

/// Returned units keyed by the intake batch they reference
fn group_returns_by_source(returns: &[Dispatch]) -> HashMap<&str, Vec<&Unit>> {
    let mut grouped: HashMap<&str, Vec<&Unit>> = HashMap::new();
    for dispatch in returns
        .iter()
        .filter(|d| d.direction == Direction::Return && !d.is_superseded())
    {
        if let Some(source) = dispatch.source_dispatch_id.as_deref() {
            grouped.entry(source).or_default().extend(dispatch.units.iter());
        }
    }
    grouped
}

/// First N units per capacity (entry order), N being the uncovered count
fn unreturned_from_batch<'a>(batch: &'a Dispatch, returned: &[&Unit]) -> Vec<&'a Unit> {
    let mut remaining = shortfall(&capacity_counts(&batch.units), &capacity_counts(returned));
    if remaining.is_empty() {
        return Vec::new();
    }

    batch
        .units
        .iter()
        .filter(|unit| match remaining.get_mut(unit.capacity_category()) {
            Some(left) if *left > 0 => {
                *left -= 1;
                true
            }
            _ => false,
        })
        .collect()
}

fn outstanding_entry(dispatch: &Dispatch, unit: &Unit, reason: OutstandingReason) -> OutstandingUnit {
    OutstandingUnit {
        unit: unit.clone(),
        dispatch_id: dispatch.id.clone(),
        dispatch_number: dispatch.document_number.clone(),
        date: dispatch.date,
        transaction_date: dispatch.effective_transaction_date(),
        direction: dispatch.direction,
        document_kind: dispatch.document_kind,
        reason,
        reason_label: reason.label(),
    }
}

fn verify_no_duplicates(outstanding: &[OutstandingUnit]) {
    let mut seen = HashSet::with_capacity(outstanding.len());
    for entry in outstanding {
        if !seen.insert(entry.unit.id.as_str()) {
            warn!(
                unit_id = %entry.unit.id,
                dispatch = %entry.dispatch_number,
                "unit reported by more than one resolver pass"
            );
        }
    }
}

// ==========================================
// UnreturnedUnitsResolver
// ==========================================

pub struct UnreturnedUnitsResolver {
    dispatch_repo: Arc<DispatchRepository>,
    unit_repo: Arc<UnitRepository>,
}

impl UnreturnedUnitsResolver {
    pub fn new(dispatch_repo: Arc<DispatchRepository>, unit_repo: Arc<UnitRepository>) -> Self {
        Self {
            dispatch_repo,
            unit_repo,
        }
    }

    /// Load the records one resolver run needs, restricted to `scope`
    pub fn load_input(&self, scope: &TeamScope) -> RepositoryResult<ReconcileInput> {
        let intake_batches = self.dispatch_repo.find_all(
            &DispatchFilter::new()
                .scope(scope)
                .direction(Direction::Intake)
                .kind(DocumentKind::Official)
                .lab_round_trip(false),
        )?;

        let batch_ids: Vec<String> = intake_batches.iter().map(|d| d.id.clone()).collect();
        let linked_returns = if batch_ids.is_empty() {
            Vec::new()
        } else {
            self.dispatch_repo.find_all(
                &DispatchFilter::new()
                    .scope(scope)
                    .direction(Direction::Return)
                    .source_in(batch_ids),
            )?
        };

        let orphan_returns = self.dispatch_repo.find_all(
            &DispatchFilter::new()
                .scope(scope)
                .direction(Direction::Return)
                .lab_round_trip(false)
                .has_source(false),
        )?;

        let lab_returns = self.dispatch_repo.find_all(
            &DispatchFilter::new()
                .scope(scope)
                .direction(Direction::Return)
                .lab_round_trip(true),
        )?;

        let received_back_ids = self
            .dispatch_repo
            .find_all(
                &DispatchFilter::new()
                    .scope(scope)
                    .direction(Direction::Intake)
                    .has_source(true),
            )?
            .into_iter()
            .filter_map(|d| d.source_dispatch_id)
            .collect();

        Ok(ReconcileInput {
            intake_batches,
            linked_returns,
            orphan_returns,
            lab_returns,
            received_back_ids,
        })
    }

    /// Every outstanding unit visible to `scope`, with its reason
    #[instrument(skip(self))]
    pub fn resolve(&self, scope: &TeamScope) -> RepositoryResult<Vec<OutstandingUnit>> {
        let input = self.load_input(scope)?;
        Ok(reconcile(&input))
    }

    /// Pass-1 batches whose capacity mix differs from their linked returns
    pub fn incomplete_batches(&self, scope: &TeamScope) -> RepositoryResult<Vec<IntakeBatchStatus>> {
        let input = self.load_input(scope)?;
        Ok(batch_statuses(&input)
            .into_iter()
            .filter(|status| !status.is_complete)
            .collect())
    }

    /// Lab RETURN documents still waiting to be received back
    pub fn pending_lab_returns(&self, scope: &TeamScope) -> RepositoryResult<Vec<Dispatch>> {
        let input = self.load_input(scope)?;
        Ok(pending_lab(&input.lab_returns, &input.received_back_ids)
            .into_iter()
            .cloned()
            .collect())
    }

    /// Naive unit totals; independent of the passes above
    pub fn totals(
        &self,
        scope: &TeamScope,
        date_range: Option<(NaiveDate, NaiveDate)>,
    ) -> RepositoryResult<DashboardTotals> {
        let base = match date_range {
            Some((start, end)) => DispatchFilter::new().scope(scope).between(start, end),
            None => DispatchFilter::new().scope(scope),
        };
        let total_intake = self
            .unit_repo
            .count(&base.clone().direction(Direction::Intake))?;
        let total_return = self.unit_repo.count(&base.direction(Direction::Return))?;
        Ok(DashboardTotals::new(total_intake, total_return))
    }
}
