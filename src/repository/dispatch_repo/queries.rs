// ==========================================
// Dispatch repository - read queries
// ==========================================
// Functions take a borrowed connection so they can run both under the
// repository lock and inside an open transaction.
// ==========================================

use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use std::collections::HashMap;

use super::{map_dispatch_row, map_unit_row, DISPATCH_COLUMNS, UNIT_COLUMNS};
use crate::domain::dispatch::{Dispatch, DispatchFilter, Unit};
use crate::repository::error::RepositoryResult;
use crate::repository::filter_sql::build_dispatch_predicate;

/// Result ordering for dispatch listings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOrder {
    /// Document date descending (dashboard lists)
    DateDesc,
    /// Document date ascending (reports)
    DateAsc,
    /// Creation time descending (search)
    CreatedDesc,
}

impl DispatchOrder {
    fn sql(&self) -> &'static str {
        match self {
            DispatchOrder::DateDesc => "d.date DESC, d.created_at DESC, d.rowid DESC",
            DispatchOrder::DateAsc => "d.date ASC, d.created_at ASC, d.rowid ASC",
            DispatchOrder::CreatedDesc => "d.created_at DESC, d.rowid DESC",
        }
    }
}

/// Load dispatches matching a filter, each with its units in entry order
pub(crate) fn load_dispatches(
    conn: &Connection,
    filter: &DispatchFilter,
    order: DispatchOrder,
    limit: Option<usize>,
) -> RepositoryResult<Vec<Dispatch>> {
    let predicate = build_dispatch_predicate(filter);

    let mut sql = format!(
        "SELECT {} FROM dispatch d WHERE {} ORDER BY {}",
        DISPATCH_COLUMNS,
        predicate.clause,
        order.sql()
    );
    if let Some(limit) = limit {
        sql.push_str(&format!(" LIMIT {}", limit));
    }

    let mut stmt = conn.prepare(&sql)?;
    let mut dispatches = stmt
        .query_map(params_from_iter(predicate.values.iter()), |row| {
            map_dispatch_row(row, 0)
        })?
        .collect::<rusqlite::Result<Vec<Dispatch>>>()?;

    if dispatches.is_empty() {
        return Ok(dispatches);
    }

    let ids: Vec<String> = dispatches.iter().map(|d| d.id.clone()).collect();
    let mut units_by_dispatch = load_units_for(conn, &ids)?;
    for dispatch in dispatches.iter_mut() {
        dispatch.units = units_by_dispatch.remove(&dispatch.id).unwrap_or_default();
    }

    Ok(dispatches)
}

/// Load one dispatch with its units
pub(crate) fn load_dispatch(conn: &Connection, id: &str) -> RepositoryResult<Option<Dispatch>> {
    let sql = format!("SELECT {} FROM dispatch d WHERE d.id = ?1", DISPATCH_COLUMNS);
    let dispatch = conn
        .query_row(&sql, params![id], |row| map_dispatch_row(row, 0))
        .optional()?;

    match dispatch {
        Some(mut dispatch) => {
            let mut units = load_units_for(conn, &[dispatch.id.clone()])?;
            dispatch.units = units.remove(&dispatch.id).unwrap_or_default();
            Ok(Some(dispatch))
        }
        None => Ok(None),
    }
}

/// Units grouped by dispatch id, each group in entry order
fn load_units_for(
    conn: &Connection,
    dispatch_ids: &[String],
) -> RepositoryResult<HashMap<String, Vec<Unit>>> {
    let mut grouped: HashMap<String, Vec<Unit>> = HashMap::new();

    // chunked to stay under SQLite's bound-parameter limit
    for chunk in dispatch_ids.chunks(500) {
        let sql = format!(
            "SELECT {} FROM unit u WHERE {} ORDER BY u.dispatch_id, u.seq_no, u.rowid",
            UNIT_COLUMNS,
            crate::repository::filter_sql::in_list("u.dispatch_id", chunk.len())
        );
        let mut stmt = conn.prepare(&sql)?;
        let units = stmt
            .query_map(params_from_iter(chunk.iter()), |row| map_unit_row(row, 0))?
            .collect::<rusqlite::Result<Vec<Unit>>>()?;

        for unit in units {
            grouped.entry(unit.dispatch_id.clone()).or_default().push(unit);
        }
    }

    Ok(grouped)
}

/// Whether a dispatch row exists
pub(crate) fn dispatch_exists(conn: &Connection, id: &str) -> RepositoryResult<bool> {
    let found = conn
        .query_row("SELECT 1 FROM dispatch WHERE id = ?1", params![id], |_| Ok(()))
        .optional()?;
    Ok(found.is_some())
}
