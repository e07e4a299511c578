// ==========================================
// Transformer Dispatch - report API
// ==========================================
// Selects units (by id or by document date) and hands them to the
// report shaper. CSV export flattens a shaped report, one row per unit.
// ==========================================

use chrono::NaiveDate;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::info;

use crate::api::error::{ApiError, ApiResult};
use crate::domain::dispatch::{DispatchFilter, Unit};
use crate::domain::report::{ReportData, ReportDateGroup};
use crate::domain::types::TeamScope;
use crate::engine::report_shaper::{shape_dispatches, shape_report};
use crate::repository::{DispatchOrder, DispatchRepository, UnitRepository};

const CSV_HEADER: [&str; 10] = [
    "section",
    "date",
    "dispatch_number",
    "document_kind",
    "serial_number",
    "capacity_rating",
    "model_tag",
    "lab_test_result",
    "note",
    "lab_round_trip",
];

pub struct ReportApi {
    dispatch_repo: Arc<DispatchRepository>,
    unit_repo: Arc<UnitRepository>,
}

impl ReportApi {
    pub fn new(dispatch_repo: Arc<DispatchRepository>, unit_repo: Arc<UnitRepository>) -> Self {
        Self {
            dispatch_repo,
            unit_repo,
        }
    }

    /// Report over an explicit unit selection; unknown ids are ignored
    pub fn shape_report_by_unit_ids(&self, unit_ids: &[String]) -> ApiResult<ReportData> {
        if unit_ids.is_empty() {
            return Ok(ReportData::default());
        }

        let selected = self.unit_repo.find_by_ids(unit_ids)?;
        let dispatch_ids: Vec<String> = selected
            .iter()
            .map(|u| u.dispatch_id.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let dispatches = self.dispatch_repo.find_ordered(
            &DispatchFilter::new().ids(dispatch_ids),
            DispatchOrder::DateAsc,
            None,
        )?;

        let units: Vec<Unit> = selected.into_iter().map(|u| u.unit).collect();
        Ok(shape_report(&dispatches, &units))
    }

    /// Every document dated within `[start, end]`, all units included
    pub fn shape_report_by_date_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        scope: &TeamScope,
    ) -> ApiResult<ReportData> {
        if start > end {
            return Err(ApiError::InvalidInput(format!(
                "date range start {} is after end {}",
                start, end
            )));
        }

        let dispatches = self.dispatch_repo.find_ordered(
            &DispatchFilter::new().scope(scope).between(start, end),
            DispatchOrder::DateAsc,
            None,
        )?;
        Ok(shape_dispatches(&dispatches))
    }

    /// Every document dated `date`
    pub fn daily_report(&self, date: NaiveDate, scope: &TeamScope) -> ApiResult<ReportData> {
        self.shape_report_by_date_range(date, date, scope)
    }

    /// Render a shaped report as CSV, intake section first
    pub fn export_csv(&self, report: &ReportData) -> ApiResult<String> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(CSV_HEADER).map_err(csv_error)?;

        write_section(&mut writer, "INTAKE", &report.intake_dispatches)?;
        write_section(&mut writer, "RETURN", &report.return_dispatches)?;

        let bytes = writer
            .into_inner()
            .map_err(|e| ApiError::InternalError(format!("csv flush failed: {}", e)))?;
        let csv = String::from_utf8(bytes)
            .map_err(|e| ApiError::InternalError(format!("csv is not utf-8: {}", e)))?;

        info!(
            intake_units = report.intake_unit_count(),
            return_units = report.return_unit_count(),
            "report exported"
        );
        Ok(csv)
    }
}

fn write_section(
    writer: &mut csv::Writer<Vec<u8>>,
    section: &str,
    groups: &[ReportDateGroup],
) -> ApiResult<()> {
    for group in groups {
        let date = group.date.format("%Y-%m-%d").to_string();
        for entry in &group.dispatches {
            let kind = entry.dispatch.document_kind.to_db_str();
            let lab = if entry.dispatch.is_lab_round_trip { "1" } else { "0" };
            for unit in &entry.units {
                let lab_result = unit.lab_test_result.map(|r| r.to_db_str()).unwrap_or("");
                writer
                    .write_record([
                        section,
                        date.as_str(),
                        entry.dispatch.document_number.as_str(),
                        kind,
                        unit.serial_number.as_str(),
                        unit.capacity_rating.as_deref().unwrap_or(""),
                        unit.model_tag.as_deref().unwrap_or(""),
                        lab_result,
                        unit.note.as_deref().unwrap_or(""),
                        lab,
                    ])
                    .map_err(csv_error)?;
            }
        }
    }
    Ok(())
}

fn csv_error(err: csv::Error) -> ApiError {
    ApiError::InternalError(format!("csv write failed: {}", err))
}
