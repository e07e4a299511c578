// ==========================================
// Transformer Dispatch - unit repository
// ==========================================
// Unit-level reads joined with their owning dispatch, plus the few
// single-unit writes (field edit, processed flag).
// ==========================================

use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

use crate::domain::dispatch::{DispatchFilter, Unit};
use crate::domain::outstanding::UnitWithDispatch;
use crate::domain::types::Direction;
use crate::repository::dispatch_repo::{
    map_dispatch_row, map_unit_row, DISPATCH_COLUMNS, UNIT_COLUMNS, UNIT_COLUMN_COUNT,
};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::filter_sql::{build_dispatch_predicate, in_list};

// ==========================================
// UnitRepository
// ==========================================
pub struct UnitRepository {
    conn: Arc<Mutex<Connection>>,
}

impl UnitRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn map_joined(row: &rusqlite::Row<'_>) -> rusqlite::Result<UnitWithDispatch> {
        let unit = map_unit_row(row, 0)?;
        let dispatch = map_dispatch_row(row, UNIT_COLUMN_COUNT)?;
        Ok(UnitWithDispatch {
            unit,
            dispatch_id: dispatch.id,
            dispatch_number: dispatch.document_number,
            date: dispatch.date,
            direction: dispatch.direction,
            document_kind: dispatch.document_kind,
            is_lab_round_trip: dispatch.is_lab_round_trip,
        })
    }

    // ==========================================
    // Reads
    // ==========================================

    pub fn find_by_id(&self, id: &str) -> RepositoryResult<Option<Unit>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM unit u WHERE u.id = ?1", UNIT_COLUMNS);
        let unit = conn
            .query_row(&sql, params![id], |row| map_unit_row(row, 0))
            .optional()?;
        Ok(unit)
    }

    /// Units by id with their dispatch, ordered by dispatch date ascending
    ///
    /// Unknown ids are skipped.
    pub fn find_by_ids(&self, ids: &[String]) -> RepositoryResult<Vec<UnitWithDispatch>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {}, {} FROM unit u JOIN dispatch d ON d.id = u.dispatch_id \
             WHERE {} ORDER BY d.date ASC, d.created_at ASC, u.seq_no ASC",
            UNIT_COLUMNS,
            DISPATCH_COLUMNS,
            in_list("u.id", ids.len())
        );
        let mut stmt = conn.prepare(&sql)?;
        let units = stmt
            .query_map(params_from_iter(ids.iter()), Self::map_joined)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(units)
    }

    /// Units whose owning dispatch matches `filter`, newest first
    pub fn find_by_dispatch_filter(
        &self,
        filter: &DispatchFilter,
    ) -> RepositoryResult<Vec<UnitWithDispatch>> {
        self.query_by_dispatch_filter(filter, None)
    }

    fn query_by_dispatch_filter(
        &self,
        filter: &DispatchFilter,
        limit: Option<usize>,
    ) -> RepositoryResult<Vec<UnitWithDispatch>> {
        let conn = self.get_conn()?;
        let predicate = build_dispatch_predicate(filter);
        let mut sql = format!(
            "SELECT {}, {} FROM unit u JOIN dispatch d ON d.id = u.dispatch_id \
             WHERE {} ORDER BY u.created_at DESC, u.rowid DESC",
            UNIT_COLUMNS, DISPATCH_COLUMNS, predicate.clause
        );
        if let Some(limit) = limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }

        let mut stmt = conn.prepare(&sql)?;
        let units = stmt
            .query_map(params_from_iter(predicate.values.iter()), Self::map_joined)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(units)
    }

    /// Units carrying one of `serials` in a dispatch of `direction`
    pub fn find_by_serials(
        &self,
        serials: &[String],
        direction: Direction,
    ) -> RepositoryResult<Vec<UnitWithDispatch>> {
        if serials.is_empty() {
            return Ok(Vec::new());
        }

        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {}, {} FROM unit u JOIN dispatch d ON d.id = u.dispatch_id \
             WHERE {} AND d.direction = ? ORDER BY d.date ASC, u.seq_no ASC",
            UNIT_COLUMNS,
            DISPATCH_COLUMNS,
            in_list("u.serial_number", serials.len())
        );

        let mut values: Vec<&str> = serials.iter().map(|s| s.as_str()).collect();
        values.push(direction.to_db_str());

        let mut stmt = conn.prepare(&sql)?;
        let units = stmt
            .query_map(params_from_iter(values), Self::map_joined)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(units)
    }

    /// Most recently created units
    pub fn find_recent(
        &self,
        filter: &DispatchFilter,
        limit: usize,
    ) -> RepositoryResult<Vec<UnitWithDispatch>> {
        self.query_by_dispatch_filter(filter, Some(limit))
    }

    /// Count units whose owning dispatch matches `filter`
    pub fn count(&self, filter: &DispatchFilter) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let predicate = build_dispatch_predicate(filter);
        let sql = format!(
            "SELECT COUNT(*) FROM unit u JOIN dispatch d ON d.id = u.dispatch_id WHERE {}",
            predicate.clause
        );
        let count: i64 =
            conn.query_row(&sql, params_from_iter(predicate.values.iter()), |row| row.get(0))?;
        Ok(count)
    }

    // ==========================================
    // Writes
    // ==========================================

    /// Edit the descriptive fields of one unit
    pub fn update_fields(
        &self,
        id: &str,
        serial_number: &str,
        capacity_rating: Option<&str>,
        model_tag: Option<&str>,
        note: Option<&str>,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            r#"
            UPDATE unit SET serial_number = ?2, capacity_rating = ?3, model_tag = ?4, note = ?5
            WHERE id = ?1
            "#,
            params![id, serial_number, capacity_rating, model_tag, note],
        )?;
        if affected == 0 {
            return Err(RepositoryError::not_found("Unit", id));
        }
        Ok(())
    }

    /// Flag a unit as re-circulated
    pub fn mark_processed(&self, id: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            "UPDATE unit SET is_processed = 1 WHERE id = ?1",
            params![id],
        )?;
        if affected == 0 {
            return Err(RepositoryError::not_found("Unit", id));
        }
        Ok(())
    }
}
