use rusqlite::Connection;
use std::sync::{Arc, Mutex};

use super::queries::{load_dispatch, load_dispatches, DispatchOrder};
use super::writer::DispatchWriter;
use crate::domain::dispatch::{Dispatch, DispatchFilter, NewDispatch};
use crate::repository::error::{RepositoryError, RepositoryResult};

// ==========================================
// DispatchRepository
// ==========================================
pub struct DispatchRepository {
    conn: Arc<Mutex<Connection>>,
}

impl DispatchRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    pub(super) fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // Writes
    // ==========================================

    /// Run `f` inside one transaction
    ///
    /// Commits when `f` returns Ok; any error rolls back every write made
    /// through the writer.
    pub fn write<T, F>(&self, f: F) -> RepositoryResult<T>
    where
        F: FnOnce(&DispatchWriter<'_>) -> RepositoryResult<T>,
    {
        let mut conn = self.get_conn()?;
        let tx = conn
            .transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        let value = {
            let writer = DispatchWriter::new(&tx);
            f(&writer)?
        };

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(value)
    }

    /// Create a dispatch with its units in one transaction
    pub fn create(&self, new: &NewDispatch) -> RepositoryResult<Dispatch> {
        self.write(|w| {
            let id = w.insert(new)?;
            w.load_required(&id)
        })
    }

    /// Delete a dispatch and (by cascade) its units
    pub fn delete(&self, id: &str) -> RepositoryResult<()> {
        self.write(|w| w.delete(id))
    }

    // ==========================================
    // Reads
    // ==========================================

    pub fn find_by_id(&self, id: &str) -> RepositoryResult<Option<Dispatch>> {
        let conn = self.get_conn()?;
        load_dispatch(&conn, id)
    }

    /// Dispatches matching `filter`, newest document date first
    pub fn find_all(&self, filter: &DispatchFilter) -> RepositoryResult<Vec<Dispatch>> {
        self.find_ordered(filter, DispatchOrder::DateDesc, None)
    }

    pub fn find_ordered(
        &self,
        filter: &DispatchFilter,
        order: DispatchOrder,
        limit: Option<usize>,
    ) -> RepositoryResult<Vec<Dispatch>> {
        let conn = self.get_conn()?;
        load_dispatches(&conn, filter, order, limit)
    }
}
