// ==========================================
// Transformer Dispatch - dispatch document model
// ==========================================
// Dispatch: one paper document moving a batch of units
// Unit: one physical transformer, owned by exactly one dispatch
// ==========================================

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::domain::types::{Direction, DocumentKind, LabTestResult, TeamScope};

/// Capacity category used when a unit has no rating
pub const UNKNOWN_CAPACITY: &str = "unknown";

// ==========================================
// Unit
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    pub id: String,
    pub dispatch_id: String,
    pub serial_number: String,
    pub capacity_rating: Option<String>,
    pub model_tag: Option<String>,
    pub note: Option<String>,
    pub photo_url: Option<String>,
    pub lab_test_result: Option<LabTestResult>,
    pub is_processed: bool,
    pub created_at: NaiveDateTime,
}

// ==========================================
// Dispatch
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dispatch {
    pub id: String,
    pub document_number: String,
    pub date: NaiveDate,
    pub transaction_date: Option<NaiveDate>,
    pub direction: Direction,
    pub document_kind: DocumentKind,
    pub is_lab_round_trip: bool,
    pub linked_official_id: Option<String>,
    pub source_dispatch_id: Option<String>,
    pub team_id: Option<String>,
    pub file_url: Option<String>,
    pub created_at: NaiveDateTime,
    pub units: Vec<Unit>,
}

impl Dispatch {
    /// Physical transaction date, falling back to the document date
    pub fn effective_transaction_date(&self) -> NaiveDate {
        self.transaction_date.unwrap_or(self.date)
    }

    /// PROVISIONAL paperwork already formalized by an OFFICIAL document
    pub fn is_superseded(&self) -> bool {
        self.document_kind == DocumentKind::Provisional && self.linked_official_id.is_some()
    }

    pub fn summary(&self) -> DispatchSummary {
        DispatchSummary {
            id: self.id.clone(),
            document_number: self.document_number.clone(),
            date: self.date,
            direction: self.direction,
            document_kind: self.document_kind,
        }
    }
}

/// Lightweight reference to a dispatch, used for link listings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchSummary {
    pub id: String,
    pub document_number: String,
    pub date: NaiveDate,
    pub direction: Direction,
    pub document_kind: DocumentKind,
}

// ==========================================
// Write models
// ==========================================

/// Unit payload for create / replace-on-update
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewUnit {
    pub serial_number: String,
    pub capacity_rating: Option<String>,
    pub model_tag: Option<String>,
    pub note: Option<String>,
    pub photo_url: Option<String>,
    pub lab_test_result: Option<LabTestResult>,
}

impl NewUnit {
    pub fn new(serial_number: &str, capacity_rating: &str) -> Self {
        Self {
            serial_number: serial_number.to_string(),
            capacity_rating: Some(capacity_rating.to_string()),
            ..Default::default()
        }
    }

    /// Copy the descriptive fields of a stored unit (promotion duplicates by value)
    pub fn from_unit(unit: &Unit) -> Self {
        Self {
            serial_number: unit.serial_number.clone(),
            capacity_rating: unit.capacity_rating.clone(),
            model_tag: unit.model_tag.clone(),
            note: unit.note.clone(),
            photo_url: unit.photo_url.clone(),
            lab_test_result: unit.lab_test_result,
        }
    }
}

/// Dispatch payload for create and full update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewDispatch {
    pub document_number: String,
    pub date: NaiveDate,
    pub transaction_date: Option<NaiveDate>,
    pub direction: Direction,
    pub document_kind: DocumentKind,
    pub is_lab_round_trip: bool,
    pub source_dispatch_id: Option<String>,
    pub team_id: Option<String>,
    pub file_url: Option<String>,
    pub units: Vec<NewUnit>,
}

impl NewDispatch {
    pub fn new(document_number: &str, date: NaiveDate, direction: Direction) -> Self {
        Self {
            document_number: document_number.to_string(),
            date,
            transaction_date: None,
            direction,
            document_kind: DocumentKind::Official,
            is_lab_round_trip: false,
            source_dispatch_id: None,
            team_id: None,
            file_url: None,
            units: Vec::new(),
        }
    }
}

// ==========================================
// DispatchFilter
// ==========================================
// Every field is an explicit optional predicate; `None` means "do not
// filter on it". Combined with AND.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DispatchFilter {
    pub direction: Option<Direction>,
    pub document_kind: Option<DocumentKind>,
    pub is_lab_round_trip: Option<bool>,
    pub team: TeamScope,
    pub ids: Option<Vec<String>>,
    /// Some(true): source_dispatch_id IS NOT NULL, Some(false): IS NULL
    pub has_source: Option<bool>,
    pub source_dispatch_ids: Option<Vec<String>>,
    /// Some(true): linked_official_id IS NOT NULL, Some(false): IS NULL
    pub has_linked_official: Option<bool>,
    pub linked_official_id: Option<String>,
    pub date_range: Option<(NaiveDate, NaiveDate)>,
    pub number_contains: Option<String>,
}

impl DispatchFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn direction(mut self, direction: Direction) -> Self {
        self.direction = Some(direction);
        self
    }

    pub fn kind(mut self, kind: DocumentKind) -> Self {
        self.document_kind = Some(kind);
        self
    }

    pub fn lab_round_trip(mut self, flag: bool) -> Self {
        self.is_lab_round_trip = Some(flag);
        self
    }

    pub fn scope(mut self, scope: &TeamScope) -> Self {
        self.team = scope.clone();
        self
    }

    pub fn ids(mut self, ids: Vec<String>) -> Self {
        self.ids = Some(ids);
        self
    }

    pub fn has_source(mut self, flag: bool) -> Self {
        self.has_source = Some(flag);
        self
    }

    pub fn source_in(mut self, ids: Vec<String>) -> Self {
        self.source_dispatch_ids = Some(ids);
        self
    }

    pub fn has_linked_official(mut self, flag: bool) -> Self {
        self.has_linked_official = Some(flag);
        self
    }

    pub fn linked_to(mut self, official_id: &str) -> Self {
        self.linked_official_id = Some(official_id.to_string());
        self
    }

    pub fn between(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.date_range = Some((start, end));
        self
    }

    pub fn number_contains(mut self, query: &str) -> Self {
        self.number_contains = Some(query.to_string());
        self
    }
}
