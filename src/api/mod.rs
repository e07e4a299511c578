// ==========================================
// Transformer Dispatch - API layer
// ==========================================
// In-process operations exposed to forms, dashboards and reports.
// Every operation returns ApiResult.
// ==========================================

pub mod dashboard_api;
pub mod dispatch_api;
pub mod error;
pub mod report_api;
pub mod validator;

pub use dashboard_api::{DashboardApi, DashboardOverview};
pub use dispatch_api::{DispatchApi, DispatchDetail, DispatchUpdateResult, UnitUpdate};
pub use error::{ApiError, ApiResult, FieldViolation};
pub use report_api::ReportApi;
pub use validator::{DispatchRequest, DispatchValidator};
