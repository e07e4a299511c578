// ==========================================
// Test data builders
// ==========================================

use chrono::NaiveDate;
use transformer_dispatch::api::DispatchRequest;
use transformer_dispatch::domain::{
    Direction, DocumentKind, LabTestResult, NewDispatch, NewUnit,
};

// ==========================================
// NewDispatch builder
// ==========================================

pub struct DispatchBuilder {
    dispatch: NewDispatch,
    linked_provisional_ids: Vec<String>,
}

impl DispatchBuilder {
    pub fn new(number: &str, date: NaiveDate, direction: Direction) -> Self {
        Self {
            dispatch: NewDispatch::new(number, date, direction),
            linked_provisional_ids: Vec::new(),
        }
    }

    /// OFFICIAL INTAKE document
    pub fn intake(number: &str, date: NaiveDate) -> Self {
        Self::new(number, date, Direction::Intake)
    }

    /// OFFICIAL RETURN document
    pub fn returned(number: &str, date: NaiveDate) -> Self {
        Self::new(number, date, Direction::Return)
    }

    pub fn provisional(mut self) -> Self {
        self.dispatch.document_kind = DocumentKind::Provisional;
        self
    }

    pub fn lab(mut self) -> Self {
        self.dispatch.is_lab_round_trip = true;
        self
    }

    pub fn source(mut self, source_dispatch_id: &str) -> Self {
        self.dispatch.source_dispatch_id = Some(source_dispatch_id.to_string());
        self
    }

    pub fn team(mut self, team_id: &str) -> Self {
        self.dispatch.team_id = Some(team_id.to_string());
        self
    }

    pub fn transaction_date(mut self, date: NaiveDate) -> Self {
        self.dispatch.transaction_date = Some(date);
        self
    }

    pub fn unit(mut self, serial: &str, capacity: &str) -> Self {
        self.dispatch.units.push(NewUnit::new(serial, capacity));
        self
    }

    pub fn unit_with_result(mut self, serial: &str, capacity: &str, result: LabTestResult) -> Self {
        let mut unit = NewUnit::new(serial, capacity);
        unit.lab_test_result = Some(result);
        self.dispatch.units.push(unit);
        self
    }

    /// `count` units of one capacity, serials `<number>-<capacity>-<n>`
    pub fn units(mut self, count: usize, capacity: &str) -> Self {
        let prefix = format!("{}-{}", self.dispatch.document_number, capacity);
        let start = self.dispatch.units.len();
        for n in 0..count {
            let serial = format!("{}-{}", prefix, start + n + 1);
            self.dispatch.units.push(NewUnit::new(&serial, capacity));
        }
        self
    }

    pub fn link(mut self, provisional_id: &str) -> Self {
        self.linked_provisional_ids.push(provisional_id.to_string());
        self
    }

    pub fn build(self) -> NewDispatch {
        self.dispatch
    }

    pub fn request(self) -> DispatchRequest {
        DispatchRequest::new(self.dispatch).with_links(self.linked_provisional_ids)
    }
}
