// ==========================================
// Transformer Dispatch - report data shaper
// ==========================================
// Pure reshaping: a flat unit selection is grouped back into its owning
// documents, split by direction, then grouped by date ascending.
// ==========================================

use std::collections::BTreeMap;

use crate::domain::dispatch::{Dispatch, Unit};
use crate::domain::report::{ReportData, ReportDateGroup, ReportDispatch};
use crate::domain::types::Direction;

/// Group `units` under their documents
///
/// `dispatches` supplies the headers; units whose dispatch is missing are
/// dropped. Documents with no selected unit are left out. Within a date,
/// documents keep the order in which their first unit appears.
pub fn shape_report(dispatches: &[Dispatch], units: &[Unit]) -> ReportData {
    let headers: BTreeMap<&str, &Dispatch> =
        dispatches.iter().map(|d| (d.id.as_str(), d)).collect();

    let mut order: Vec<&str> = Vec::new();
    let mut selected: BTreeMap<&str, Vec<Unit>> = BTreeMap::new();
    for unit in units {
        if !headers.contains_key(unit.dispatch_id.as_str()) {
            continue;
        }
        let bucket = selected.entry(unit.dispatch_id.as_str()).or_insert_with(|| {
            order.push(unit.dispatch_id.as_str());
            Vec::new()
        });
        bucket.push(unit.clone());
    }

    let mut intake = BTreeMap::new();
    let mut returned = BTreeMap::new();
    for id in order {
        let (Some(dispatch), Some(units)) = (headers.get(id), selected.remove(id)) else {
            continue;
        };
        let side = match dispatch.direction {
            Direction::Intake => &mut intake,
            Direction::Return => &mut returned,
        };
        side.entry(dispatch.date)
            .or_insert_with(Vec::new)
            .push(ReportDispatch {
                dispatch: header_only(dispatch),
                units,
            });
    }

    ReportData {
        intake_dispatches: into_groups(intake),
        return_dispatches: into_groups(returned),
    }
}

/// Shape whole documents (every unit selected)
pub fn shape_dispatches(dispatches: &[Dispatch]) -> ReportData {
    let units: Vec<Unit> = dispatches
        .iter()
        .flat_map(|d| d.units.iter().cloned())
        .collect();
    shape_report(dispatches, &units)
}

fn header_only(dispatch: &Dispatch) -> Dispatch {
    Dispatch {
        units: Vec::new(),
        ..dispatch.clone()
    }
}

fn into_groups(by_date: BTreeMap<chrono::NaiveDate, Vec<ReportDispatch>>) -> Vec<ReportDateGroup> {
    by_date
        .into_iter()
        .map(|(date, dispatches)| ReportDateGroup { date, dispatches })
        .collect()
}
