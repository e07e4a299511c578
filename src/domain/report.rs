// ==========================================
// Transformer Dispatch - report shapes
// ==========================================

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::dispatch::{Dispatch, Unit};

/// One document in a report, carrying only the selected units
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportDispatch {
    pub dispatch: Dispatch,
    pub units: Vec<Unit>,
}

/// Documents of one direction sharing the same date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportDateGroup {
    pub date: NaiveDate,
    pub dispatches: Vec<ReportDispatch>,
}

/// Report data split by direction, each side grouped by date ascending
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportData {
    pub intake_dispatches: Vec<ReportDateGroup>,
    pub return_dispatches: Vec<ReportDateGroup>,
}

impl ReportData {
    pub fn is_empty(&self) -> bool {
        self.intake_dispatches.is_empty() && self.return_dispatches.is_empty()
    }

    pub fn intake_unit_count(&self) -> usize {
        count_units(&self.intake_dispatches)
    }

    pub fn return_unit_count(&self) -> usize {
        count_units(&self.return_dispatches)
    }
}

fn count_units(groups: &[ReportDateGroup]) -> usize {
    groups
        .iter()
        .flat_map(|g| g.dispatches.iter())
        .map(|d| d.units.len())
        .sum()
}
