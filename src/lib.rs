// ==========================================
// Transformer Dispatch - library root
// ==========================================
// Intake/return tracking for transformer units:
// documents, units, document linking and outstanding-unit reconciliation.
// ==========================================
// Layers:
// - domain: entities and enums
// - repository: SQLite access
// - engine: business rules (resolver, linker, guards, shaping)
// - config: key/value configuration
// - api: in-process operations with validation
// - app: wiring
// ==========================================

// Locale files under locales/, Vietnamese fallback
rust_i18n::i18n!("locales", fallback = "vi");

// ==========================================
// Modules
// ==========================================

pub mod domain;
pub mod repository;
pub mod engine;
pub mod config;
pub mod db;
pub mod logging;
pub mod i18n;
pub mod api;
pub mod app;

// ==========================================
// Re-exports
// ==========================================

// Domain
pub use domain::{
    Direction, Dispatch, DispatchFilter, DocumentKind, LabTestResult, NewDispatch, NewUnit,
    OutstandingReason, OutstandingUnit, ReportData, Team, TeamScope, Unit,
};

// Engines
pub use engine::{reconcile, DocumentLinker, DuplicateSerialGuard, ReconcileInput, UnreturnedUnitsResolver};

// API
pub use api::{ApiError, ApiResult, DashboardApi, DispatchApi, DispatchRequest, ReportApi};

// App
pub use app::AppState;

// ==========================================
// Constants
// ==========================================

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub const APP_NAME: &str = "Transformer Dispatch";
