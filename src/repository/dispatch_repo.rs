// ==========================================
// Transformer Dispatch - dispatch repository
// ==========================================
// Tables: dispatch, unit
// Repository holds no reconciliation rules, only data mapping.
// ==========================================

mod core;
mod queries;
mod writer;


pub use self::core::DispatchRepository;
pub use queries::DispatchOrder;
pub use writer::DispatchWriter;

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::types::Type;
use rusqlite::Row;

use crate::domain::dispatch::{Dispatch, Unit};
use crate::domain::types::{Direction, DocumentKind, LabTestResult};

pub(crate) const DATE_FORMAT: &str = "%Y-%m-%d";
pub(crate) const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Dispatch columns, in the order read by `map_dispatch_row`
pub(crate) const DISPATCH_COLUMNS: &str = "d.id, d.document_number, d.date, d.transaction_date, \
     d.direction, d.document_kind, d.is_lab_round_trip, d.linked_official_id, \
     d.source_dispatch_id, d.team_id, d.file_url, d.created_at";

/// Unit columns, in the order read by `map_unit_row`
pub(crate) const UNIT_COLUMNS: &str = "u.id, u.dispatch_id, u.serial_number, u.capacity_rating, \
     u.model_tag, u.note, u.photo_url, u.lab_test_result, u.is_processed, u.created_at";

/// Number of columns in UNIT_COLUMNS
pub(crate) const UNIT_COLUMN_COUNT: usize = 10;

// ==========================================
// Row mapping
// ==========================================

fn conversion_error(idx: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, message.into())
}

pub(crate) fn parse_date(idx: usize, raw: &str) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .map_err(|e| conversion_error(idx, format!("invalid date '{}': {}", raw, e)))
}

pub(crate) fn parse_timestamp(idx: usize, raw: &str) -> rusqlite::Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
        .map_err(|e| conversion_error(idx, format!("invalid timestamp '{}': {}", raw, e)))
}

/// Map a row selected with DISPATCH_COLUMNS starting at `offset` (units left empty)
pub(crate) fn map_dispatch_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<Dispatch> {
    let date_raw: String = row.get(offset + 2)?;
    let tx_date_raw: Option<String> = row.get(offset + 3)?;
    let direction_raw: String = row.get(offset + 4)?;
    let kind_raw: String = row.get(offset + 5)?;
    let created_raw: String = row.get(offset + 11)?;

    let direction = Direction::from_db_str(&direction_raw).ok_or_else(|| {
        conversion_error(offset + 4, format!("unknown direction '{}'", direction_raw))
    })?;
    let document_kind = DocumentKind::from_db_str(&kind_raw).ok_or_else(|| {
        conversion_error(offset + 5, format!("unknown document kind '{}'", kind_raw))
    })?;

    Ok(Dispatch {
        id: row.get(offset)?,
        document_number: row.get(offset + 1)?,
        date: parse_date(offset + 2, &date_raw)?,
        transaction_date: tx_date_raw
            .as_deref()
            .map(|raw| parse_date(offset + 3, raw))
            .transpose()?,
        direction,
        document_kind,
        is_lab_round_trip: row.get::<_, i64>(offset + 6)? != 0,
        linked_official_id: row.get(offset + 7)?,
        source_dispatch_id: row.get(offset + 8)?,
        team_id: row.get(offset + 9)?,
        file_url: row.get(offset + 10)?,
        created_at: parse_timestamp(offset + 11, &created_raw)?,
        units: Vec::new(),
    })
}

/// Map a row selected with UNIT_COLUMNS starting at `offset`
pub(crate) fn map_unit_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<Unit> {
    let lab_raw: Option<String> = row.get(offset + 7)?;
    let created_raw: String = row.get(offset + 9)?;

    let lab_test_result = match lab_raw {
        Some(raw) => Some(LabTestResult::from_db_str(&raw).ok_or_else(|| {
            conversion_error(offset + 7, format!("unknown lab test result '{}'", raw))
        })?),
        None => None,
    };

    Ok(Unit {
        id: row.get(offset)?,
        dispatch_id: row.get(offset + 1)?,
        serial_number: row.get(offset + 2)?,
        capacity_rating: row.get(offset + 3)?,
        model_tag: row.get(offset + 4)?,
        note: row.get(offset + 5)?,
        photo_url: row.get(offset + 6)?,
        lab_test_result,
        is_processed: row.get::<_, i64>(offset + 8)? != 0,
        created_at: parse_timestamp(offset + 9, &created_raw)?,
    })
}
