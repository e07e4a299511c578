// ==========================================
// Transformer Dispatch - dashboard API
// ==========================================
// Outstanding-unit views. The resolver list is the authoritative detail;
// the totals are a fast naive estimate and are expected to differ.
// ==========================================

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::api::error::{ApiError, ApiResult};
use crate::domain::dispatch::{Dispatch, DispatchFilter};
use crate::domain::outstanding::{DashboardTotals, IntakeBatchStatus, OutstandingUnit, UnitWithDispatch};
use crate::domain::types::{Direction, LabTestResult, TeamScope};
use crate::engine::resolver::UnreturnedUnitsResolver;
use crate::repository::UnitRepository;

/// Units shown beside the totals when no limit is given
pub const DEFAULT_RECENT_LIMIT: usize = 20;

/// Totals plus the latest registered units
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardOverview {
    pub totals: DashboardTotals,
    pub recent_units: Vec<UnitWithDispatch>,
}

// ==========================================
// DashboardApi
// ==========================================
pub struct DashboardApi {
    resolver: Arc<UnreturnedUnitsResolver>,
    unit_repo: Arc<UnitRepository>,
}

impl DashboardApi {
    pub fn new(resolver: Arc<UnreturnedUnitsResolver>, unit_repo: Arc<UnitRepository>) -> Self {
        Self { resolver, unit_repo }
    }

    /// Every outstanding unit with the reason it is outstanding
    pub fn resolve_unreturned_units(&self, scope: &TeamScope) -> ApiResult<Vec<OutstandingUnit>> {
        let outstanding = self.resolver.resolve(scope)?;
        debug!(%scope, count = outstanding.len(), "resolved outstanding units");
        Ok(outstanding)
    }

    /// Naive totals, optionally limited to documents dated in a range
    pub fn get_dashboard_totals(
        &self,
        scope: &TeamScope,
        date_range: Option<(NaiveDate, NaiveDate)>,
    ) -> ApiResult<DashboardTotals> {
        if let Some((start, end)) = date_range {
            if start > end {
                return Err(ApiError::InvalidInput(format!(
                    "date range start {} is after end {}",
                    start, end
                )));
            }
        }
        Ok(self.resolver.totals(scope, date_range)?)
    }

    pub fn get_dashboard_overview(&self, scope: &TeamScope) -> ApiResult<DashboardOverview> {
        Ok(DashboardOverview {
            totals: self.get_dashboard_totals(scope, None)?,
            recent_units: self.recent_units(scope, None)?,
        })
    }

    /// OFFICIAL intake batches not matched by their linked returns
    pub fn list_incomplete_intake_batches(&self, scope: &TeamScope) -> ApiResult<Vec<IntakeBatchStatus>> {
        Ok(self.resolver.incomplete_batches(scope)?)
    }

    /// Lab RETURN documents still out for testing
    pub fn list_pending_lab_returns(&self, scope: &TeamScope) -> ApiResult<Vec<Dispatch>> {
        Ok(self.resolver.pending_lab_returns(scope)?)
    }

    /// Units received back from the lab with a FAIL result and not yet
    /// re-added to a new RETURN batch
    pub fn list_failed_lab_units(&self, scope: &TeamScope) -> ApiResult<Vec<UnitWithDispatch>> {
        let received = self.unit_repo.find_by_dispatch_filter(
            &DispatchFilter::new()
                .scope(scope)
                .direction(Direction::Intake)
                .lab_round_trip(true),
        )?;

        Ok(received
            .into_iter()
            .filter(|u| u.unit.lab_test_result == Some(LabTestResult::Fail) && !u.unit.is_processed)
            .collect())
    }

    /// Most recently registered units, newest first
    pub fn recent_units(&self, scope: &TeamScope, limit: Option<usize>) -> ApiResult<Vec<UnitWithDispatch>> {
        let limit = limit.unwrap_or(DEFAULT_RECENT_LIMIT);
        Ok(self
            .unit_repo
            .find_recent(&DispatchFilter::new().scope(scope), limit)?)
    }
}
