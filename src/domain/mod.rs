// ==========================================
// Transformer Dispatch - domain layer
// ==========================================
// Entities, enums and result shapes.
// No data access, no reconciliation rules.
// ==========================================

pub mod dispatch;
pub mod outstanding;
pub mod report;
pub mod team;
pub mod types;

pub use dispatch::{
    Dispatch, DispatchFilter, DispatchSummary, NewDispatch, NewUnit, Unit, UNKNOWN_CAPACITY,
};
pub use outstanding::{
    DashboardTotals, DuplicateSerial, IntakeBatchStatus, OutstandingReason, OutstandingUnit,
    UnitWithDispatch,
};
pub use report::{ReportData, ReportDateGroup, ReportDispatch};
pub use team::Team;
pub use types::{Direction, DocumentKind, LabTestResult, TeamScope};
