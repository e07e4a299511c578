// ==========================================
// Transformer Dispatch - application state
// ==========================================
// Wires one shared connection through every repository, engine and API.
// ==========================================

use rusqlite::Connection;
use std::sync::{Arc, Mutex};

use crate::api::{DashboardApi, DispatchApi, DispatchValidator, ReportApi};
use crate::config::config_manager::ConfigManager;
use crate::engine::{DocumentLinker, DuplicateSerialGuard, UnreturnedUnitsResolver};
use crate::repository::{DispatchRepository, TeamRepository, UnitRepository};

/// Environment variable overriding the database location
pub const DB_PATH_ENV: &str = "TRANSFORMER_DISPATCH_DB_PATH";

/// Application state
///
/// Holds every API instance plus the repositories callers need directly.
pub struct AppState {
    pub db_path: String,

    pub dispatch_api: Arc<DispatchApi>,
    pub dashboard_api: Arc<DashboardApi>,
    pub report_api: Arc<ReportApi>,

    pub team_repo: Arc<TeamRepository>,
    pub config_manager: Arc<ConfigManager>,
}

impl AppState {
    /// Open (or create) the database at `db_path` and build every layer
    pub fn new(db_path: String) -> Result<Self, String> {
        tracing::info!("initialising AppState, database: {}", db_path);

        let conn = crate::db::open_sqlite_connection(&db_path)
            .map_err(|e| format!("cannot open database: {}", e))?;
        crate::db::init_schema(&conn).map_err(|e| format!("cannot initialise schema: {}", e))?;

        Self::from_connection(db_path, conn)
    }

    /// Build every layer over an already configured connection
    pub fn from_connection(db_path: String, conn: Connection) -> Result<Self, String> {
        let conn = Arc::new(Mutex::new(conn));

        // ==========================================
        // Repositories
        // ==========================================
        let dispatch_repo = Arc::new(DispatchRepository::new(conn.clone()));
        let unit_repo = Arc::new(UnitRepository::new(conn.clone()));
        let team_repo = Arc::new(TeamRepository::new(conn.clone()));
        let config_manager = Arc::new(
            ConfigManager::from_connection(conn.clone())
                .map_err(|e| format!("cannot create ConfigManager: {}", e))?,
        );

        // ==========================================
        // Engines
        // ==========================================
        let linker = Arc::new(DocumentLinker::new(dispatch_repo.clone()));
        let duplicate_guard = Arc::new(DuplicateSerialGuard::new(unit_repo.clone()));
        let resolver = Arc::new(UnreturnedUnitsResolver::new(
            dispatch_repo.clone(),
            unit_repo.clone(),
        ));
        let validator = Arc::new(DispatchValidator::new(dispatch_repo.clone()));

        // ==========================================
        // APIs
        // ==========================================
        let dispatch_api = Arc::new(DispatchApi::new(
            dispatch_repo.clone(),
            unit_repo.clone(),
            team_repo.clone(),
            linker,
            duplicate_guard,
            validator,
            config_manager.clone(),
        ));
        let dashboard_api = Arc::new(DashboardApi::new(resolver, unit_repo.clone()));
        let report_api = Arc::new(ReportApi::new(dispatch_repo, unit_repo));

        match config_manager.get_locale() {
            Ok(locale) => crate::i18n::set_locale(&locale),
            Err(e) => tracing::warn!("cannot read locale, keeping default: {}", e),
        }

        tracing::info!("AppState ready");
        Ok(Self {
            db_path,
            dispatch_api,
            dashboard_api,
            report_api,
            team_repo,
            config_manager,
        })
    }

    pub fn get_db_path(&self) -> &str {
        &self.db_path
    }
}

// ==========================================
// Default database path
// ==========================================

/// Database path: env override, then the user data directory, then the
/// working directory
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    if let Ok(path) = std::env::var(DB_PATH_ENV) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./transformer_dispatch.db");

    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("transformer-dispatch");
        // fall back to the working directory if the data dir is not writable
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("transformer_dispatch.db");
        }
    }

    path.to_string_lossy().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_default_db_path() {
        let path = get_default_db_path();
        assert!(!path.is_empty());
        assert!(path.ends_with(".db"));
    }

    #[test]
    fn test_state_over_in_memory_connection() {
        // AppState applies the configured locale
        let _guard = crate::i18n::LOCALE_TEST_LOCK.lock().unwrap();
        let conn = crate::db::open_in_memory().unwrap();
        let state = AppState::from_connection(":memory:".to_string(), conn).unwrap();
        assert_eq!(state.get_db_path(), ":memory:");
        assert!(state.team_repo.list().unwrap().is_empty());
    }
}
