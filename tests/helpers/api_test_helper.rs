// ==========================================
// API integration test environment
// ==========================================

#[path = "../test_helpers.rs"]
mod test_helpers;

use std::sync::Arc;
use tempfile::NamedTempFile;

use transformer_dispatch::api::{ApiResult, DashboardApi, DispatchApi, ReportApi};
use transformer_dispatch::app::AppState;
use transformer_dispatch::config::ConfigManager;
use transformer_dispatch::domain::{Dispatch, OutstandingReason, OutstandingUnit, Team, TeamScope};
use transformer_dispatch::repository::TeamRepository;

use super::test_data_builder::DispatchBuilder;

// ==========================================
// ApiTestEnv
// ==========================================

/// Fully wired application over a temporary database file
pub struct ApiTestEnv {
    pub db_path: String,
    pub dispatch_api: Arc<DispatchApi>,
    pub dashboard_api: Arc<DashboardApi>,
    pub report_api: Arc<ReportApi>,
    pub team_repo: Arc<TeamRepository>,
    pub config_manager: Arc<ConfigManager>,

    // keeps the database file alive
    _temp_file: NamedTempFile,
}

impl ApiTestEnv {
    pub fn new() -> Result<Self, String> {
        let (temp_file, db_path) = test_helpers::create_test_db()
            .map_err(|e| format!("cannot create test database: {}", e))?;

        let state = AppState::new(db_path.clone())?;

        Ok(Self {
            db_path,
            dispatch_api: state.dispatch_api,
            dashboard_api: state.dashboard_api,
            report_api: state.report_api,
            team_repo: state.team_repo,
            config_manager: state.config_manager,
            _temp_file: temp_file,
        })
    }

    /// Create a document through the API
    pub fn create(&self, builder: DispatchBuilder) -> ApiResult<Dispatch> {
        self.dispatch_api.create_dispatch(&builder.request())
    }

    pub fn create_team(&self, code: &str) -> Team {
        self.team_repo
            .create(code, &format!("Team {}", code))
            .expect("team created")
    }

    /// Resolver output for the administrative scope
    pub fn outstanding(&self) -> Vec<OutstandingUnit> {
        self.dashboard_api
            .resolve_unreturned_units(&TeamScope::All)
            .expect("resolver ran")
    }
}

// ==========================================
// Assertions
// ==========================================

/// Outstanding entries belonging to one document
pub fn outstanding_for<'a>(all: &'a [OutstandingUnit], dispatch_id: &str) -> Vec<&'a OutstandingUnit> {
    all.iter().filter(|o| o.dispatch_id == dispatch_id).collect()
}

pub fn assert_all_tagged(entries: &[&OutstandingUnit], reason: OutstandingReason) {
    for entry in entries {
        assert_eq!(
            entry.reason, reason,
            "unit {} tagged {:?}",
            entry.unit.serial_number, entry.reason
        );
    }
}

pub use test_helpers::day;
