// ==========================================
// Dispatch repository - transactional writer
// ==========================================
// A DispatchWriter only exists inside `DispatchRepository::write`, so
// every write issued through it commits or rolls back together.
// ==========================================

use chrono::Utc;
use rusqlite::{params, params_from_iter, Connection};
use uuid::Uuid;

use super::queries::{dispatch_exists, load_dispatch};
use super::{DATE_FORMAT, TIMESTAMP_FORMAT};
use crate::domain::dispatch::{Dispatch, NewDispatch, NewUnit};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::filter_sql::in_list;

pub struct DispatchWriter<'a> {
    conn: &'a Connection,
}

impl<'a> DispatchWriter<'a> {
    pub(crate) fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Insert a dispatch and its units; returns the new id
    pub fn insert(&self, new: &NewDispatch) -> RepositoryResult<String> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().naive_utc().format(TIMESTAMP_FORMAT).to_string();

        self.conn.execute(
            r#"
            INSERT INTO dispatch (
                id, document_number, date, transaction_date, direction,
                document_kind, is_lab_round_trip, linked_official_id,
                source_dispatch_id, team_id, file_url, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, NULL, ?8, ?9, ?10, ?11)
            "#,
            params![
                id,
                new.document_number,
                new.date.format(DATE_FORMAT).to_string(),
                new.transaction_date.map(|d| d.format(DATE_FORMAT).to_string()),
                new.direction.to_db_str(),
                new.document_kind.to_db_str(),
                new.is_lab_round_trip as i64,
                new.source_dispatch_id,
                new.team_id,
                new.file_url,
                now,
            ],
        )?;

        self.insert_units(&id, &new.units)?;
        Ok(id)
    }

    /// Overwrite the scalar fields of an existing dispatch
    ///
    /// Direction is fixed at creation and not touched here. Only PROVISIONAL
    /// documents carry a link, so switching to OFFICIAL drops it.
    pub fn update_fields(&self, id: &str, new: &NewDispatch) -> RepositoryResult<()> {
        let affected = self.conn.execute(
            r#"
            UPDATE dispatch SET
                document_number = ?2,
                date = ?3,
                transaction_date = ?4,
                document_kind = ?5,
                linked_official_id = CASE WHEN ?5 = 'OFFICIAL' THEN NULL ELSE linked_official_id END,
                is_lab_round_trip = ?6,
                source_dispatch_id = ?7,
                team_id = ?8,
                file_url = ?9
            WHERE id = ?1
            "#,
            params![
                id,
                new.document_number,
                new.date.format(DATE_FORMAT).to_string(),
                new.transaction_date.map(|d| d.format(DATE_FORMAT).to_string()),
                new.document_kind.to_db_str(),
                new.is_lab_round_trip as i64,
                new.source_dispatch_id,
                new.team_id,
                new.file_url,
            ],
        )?;

        if affected == 0 {
            return Err(RepositoryError::not_found("Dispatch", id));
        }
        Ok(())
    }

    /// Delete every unit of a dispatch and insert the new list
    pub fn replace_units(&self, dispatch_id: &str, units: &[NewUnit]) -> RepositoryResult<usize> {
        if !dispatch_exists(self.conn, dispatch_id)? {
            return Err(RepositoryError::not_found("Dispatch", dispatch_id));
        }
        self.conn
            .execute("DELETE FROM unit WHERE dispatch_id = ?1", params![dispatch_id])?;
        self.insert_units(dispatch_id, units)
    }

    fn insert_units(&self, dispatch_id: &str, units: &[NewUnit]) -> RepositoryResult<usize> {
        let now = Utc::now().naive_utc().format(TIMESTAMP_FORMAT).to_string();
        let mut stmt = self.conn.prepare(
            r#"
            INSERT INTO unit (
                id, dispatch_id, serial_number, capacity_rating, model_tag,
                note, photo_url, lab_test_result, is_processed, seq_no, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 0, ?9, ?10)
            "#,
        )?;

        for (seq_no, unit) in units.iter().enumerate() {
            stmt.execute(params![
                Uuid::new_v4().to_string(),
                dispatch_id,
                unit.serial_number.trim(),
                unit.capacity_rating,
                unit.model_tag,
                unit.note,
                unit.photo_url,
                unit.lab_test_result.map(|r| r.to_db_str()),
                seq_no as i64,
                now,
            ])?;
        }

        Ok(units.len())
    }

    /// Point PROVISIONAL documents at an official document
    ///
    /// Ids that are not PROVISIONAL, do not share the official document's
    /// direction, or do not exist are skipped; returns the number of rows
    /// actually linked.
    pub fn set_linked_official(
        &self,
        provisional_ids: &[String],
        official_id: &str,
    ) -> RepositoryResult<usize> {
        if provisional_ids.is_empty() {
            return Ok(0);
        }

        let sql = format!(
            "UPDATE dispatch SET linked_official_id = ? \
             WHERE {} AND document_kind = 'PROVISIONAL' AND id <> ? \
             AND direction = (SELECT direction FROM dispatch WHERE id = ?)",
            in_list("id", provisional_ids.len())
        );

        let mut values: Vec<&str> = Vec::with_capacity(provisional_ids.len() + 3);
        values.push(official_id);
        values.extend(provisional_ids.iter().map(|s| s.as_str()));
        values.push(official_id);
        values.push(official_id);

        let affected = self.conn.execute(&sql, params_from_iter(values))?;
        Ok(affected)
    }

    /// Clear linked_official_id on every document pointing at `official_id`
    pub fn clear_links_to(&self, official_id: &str) -> RepositoryResult<usize> {
        let affected = self.conn.execute(
            "UPDATE dispatch SET linked_official_id = NULL WHERE linked_official_id = ?1",
            params![official_id],
        )?;
        Ok(affected)
    }

    /// Delete a dispatch; units go with it (ON DELETE CASCADE)
    pub fn delete(&self, id: &str) -> RepositoryResult<()> {
        let affected = self
            .conn
            .execute("DELETE FROM dispatch WHERE id = ?1", params![id])?;
        if affected == 0 {
            return Err(RepositoryError::not_found("Dispatch", id));
        }
        Ok(())
    }

    /// Read a dispatch within the same transaction
    pub fn load(&self, id: &str) -> RepositoryResult<Option<Dispatch>> {
        load_dispatch(self.conn, id)
    }

    /// Read a dispatch that must exist
    pub fn load_required(&self, id: &str) -> RepositoryResult<Dispatch> {
        self.load(id)?
            .ok_or_else(|| RepositoryError::not_found("Dispatch", id))
    }
}
