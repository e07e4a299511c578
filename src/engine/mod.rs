// ==========================================
// Transformer Dispatch - engine layer
// ==========================================
// Business rules only. Engines never build SQL; they read and write
// through the repositories.
// ==========================================

pub mod capacity;
pub mod document_number;
pub mod duplicate_guard;
pub mod linker;
pub mod report_shaper;
pub mod resolver;

pub use capacity::{capacity_counts, same_capacity_mix, CapacityCounts, HasCapacity};
pub use document_number::SuffixTemplates;
pub use duplicate_guard::DuplicateSerialGuard;
pub use linker::DocumentLinker;
pub use report_shaper::{shape_dispatches, shape_report};
pub use resolver::{reconcile, ReconcileInput, UnreturnedUnitsResolver};
