// ==========================================
// Transformer Dispatch - capacity multiset comparator
// ==========================================
// Completion is decided by quantity per capacity category, never by
// serial number: units of the same capacity are fungible.
// Missing ratings count under UNKNOWN_CAPACITY.
// ==========================================

use std::collections::BTreeMap;

use crate::domain::dispatch::{NewUnit, Unit, UNKNOWN_CAPACITY};

/// capacity category -> unit count
pub type CapacityCounts = BTreeMap<String, usize>;

/// Anything that carries a capacity rating
pub trait HasCapacity {
    fn capacity_rating(&self) -> Option<&str>;

    /// Category used for counting
    fn capacity_category(&self) -> &str {
        match self.capacity_rating() {
            Some(rating) if !rating.trim().is_empty() => rating,
            _ => UNKNOWN_CAPACITY,
        }
    }
}

impl HasCapacity for Unit {
    fn capacity_rating(&self) -> Option<&str> {
        self.capacity_rating.as_deref()
    }
}

impl HasCapacity for NewUnit {
    fn capacity_rating(&self) -> Option<&str> {
        self.capacity_rating.as_deref()
    }
}

impl<T: HasCapacity + ?Sized> HasCapacity for &T {
    fn capacity_rating(&self) -> Option<&str> {
        (**self).capacity_rating()
    }
}

/// Count units per capacity category
pub fn capacity_counts<I>(units: I) -> CapacityCounts
where
    I: IntoIterator,
    I::Item: HasCapacity,
{
    let mut counts = CapacityCounts::new();
    for unit in units {
        *counts
            .entry(unit.capacity_category().to_string())
            .or_insert(0) += 1;
    }
    counts
}

/// Whether two collections have the same count per capacity category
pub fn same_capacity_mix<A, B>(a: A, b: B) -> bool
where
    A: IntoIterator,
    A::Item: HasCapacity,
    B: IntoIterator,
    B::Item: HasCapacity,
{
    capacity_counts(a) == capacity_counts(b)
}

/// Per-category count still uncovered: `intake[cap] - returned[cap]`,
/// keeping only positive values
///
/// Categories present only on the return side never produce a shortfall.
pub fn shortfall(intake: &CapacityCounts, returned: &CapacityCounts) -> CapacityCounts {
    intake
        .iter()
        .filter_map(|(cap, &count)| {
            let covered = returned.get(cap).copied().unwrap_or(0);
            (count > covered).then(|| (cap.clone(), count - covered))
        })
        .collect()
}
