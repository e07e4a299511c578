// ==========================================
// Transformer Dispatch - repository layer
// ==========================================
// Data access only: parameterised SQL, no reconciliation rules.
// All repositories share one connection (Arc<Mutex<Connection>>).
// ==========================================

pub mod dispatch_repo;
pub mod error;
pub mod filter_sql;
pub mod team_repo;
pub mod unit_repo;

pub use dispatch_repo::{DispatchOrder, DispatchRepository, DispatchWriter};
pub use error::{RepositoryError, RepositoryResult};
pub use team_repo::TeamRepository;
pub use unit_repo::UnitRepository;
