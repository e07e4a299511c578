// ==========================================
// Transformer Dispatch - team repository
// ==========================================

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::domain::team::{normalize_team_code, Team};
use crate::repository::dispatch_repo::{parse_timestamp, TIMESTAMP_FORMAT};
use crate::repository::error::{RepositoryError, RepositoryResult};

pub struct TeamRepository {
    conn: Arc<Mutex<Connection>>,
}

impl TeamRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Team> {
        let created_raw: String = row.get(3)?;
        Ok(Team {
            id: row.get(0)?,
            code: row.get(1)?,
            name: row.get(2)?,
            created_at: parse_timestamp(3, &created_raw)?,
        })
    }

    /// Create a team; the code is stored upper-cased and must be unique
    pub fn create(&self, code: &str, name: &str) -> RepositoryResult<Team> {
        let code = normalize_team_code(code);
        if code.is_empty() {
            return Err(RepositoryError::FieldValueError {
                field: "code".to_string(),
                message: "team code must not be empty".to_string(),
            });
        }

        let now = Utc::now().naive_utc();
        let team = Team {
            id: Uuid::new_v4().to_string(),
            code,
            name: name.trim().to_string(),
            created_at: now,
        };

        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO team (id, code, name, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                team.id,
                team.code,
                team.name,
                now.format(TIMESTAMP_FORMAT).to_string()
            ],
        )?;

        Ok(team)
    }

    /// All teams ordered by code
    pub fn list(&self) -> RepositoryResult<Vec<Team>> {
        let conn = self.get_conn()?;
        let mut stmt =
            conn.prepare("SELECT id, code, name, created_at FROM team ORDER BY code")?;
        let teams = stmt
            .query_map([], Self::map_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(teams)
    }

    pub fn find_by_id(&self, id: &str) -> RepositoryResult<Option<Team>> {
        let conn = self.get_conn()?;
        let team = conn
            .query_row(
                "SELECT id, code, name, created_at FROM team WHERE id = ?1",
                params![id],
                Self::map_row,
            )
            .optional()?;
        Ok(team)
    }

    pub fn find_by_code(&self, code: &str) -> RepositoryResult<Option<Team>> {
        let conn = self.get_conn()?;
        let team = conn
            .query_row(
                "SELECT id, code, name, created_at FROM team WHERE code = ?1",
                params![normalize_team_code(code)],
                Self::map_row,
            )
            .optional()?;
        Ok(team)
    }
}
