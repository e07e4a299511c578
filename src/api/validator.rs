// ==========================================
// Transformer Dispatch - dispatch request validator
// ==========================================
// Runs before any write. Field problems are collected and reported
// together; nothing is written when any check fails.
// ==========================================

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::error::{ApiError, ApiResult, FieldViolation};
use crate::domain::dispatch::{NewDispatch, NewUnit};
use crate::domain::types::DocumentKind;
use crate::i18n::{t, t_with_args};
use crate::repository::DispatchRepository;

// ==========================================
// DispatchRequest
// ==========================================

/// Create/update payload as submitted by a form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchRequest {
    pub dispatch: NewDispatch,
    /// PROVISIONAL documents this OFFICIAL document formalizes (full set)
    #[serde(default)]
    pub linked_provisional_ids: Vec<String>,
    /// Official paperwork that arrived for a PROVISIONAL document
    #[serde(default)]
    pub official_number: Option<String>,
    #[serde(default)]
    pub official_date: Option<NaiveDate>,
}

impl DispatchRequest {
    pub fn new(dispatch: NewDispatch) -> Self {
        Self {
            dispatch,
            linked_provisional_ids: Vec::new(),
            official_number: None,
            official_date: None,
        }
    }

    pub fn with_links(mut self, provisional_ids: Vec<String>) -> Self {
        self.linked_provisional_ids = provisional_ids;
        self
    }

    pub fn with_promotion(mut self, number: &str, date: NaiveDate) -> Self {
        self.official_number = Some(number.to_string());
        self.official_date = Some(date);
        self
    }

    /// Official number and date, when both were supplied
    pub fn promotion(&self) -> Option<(&str, NaiveDate)> {
        let number = self.official_number.as_deref().map(str::trim)?;
        let date = self.official_date?;
        (!number.is_empty()).then_some((number, date))
    }
}

// ==========================================
// DispatchValidator
// ==========================================
pub struct DispatchValidator {
    dispatch_repo: Arc<DispatchRepository>,
}

impl DispatchValidator {
    pub fn new(dispatch_repo: Arc<DispatchRepository>) -> Self {
        Self { dispatch_repo }
    }

    /// Full check of a create/update request
    pub fn validate_request(&self, request: &DispatchRequest) -> ApiResult<()> {
        let mut violations = Self::field_violations(&request.dispatch);
        violations.extend(Self::link_violations(request));
        violations.extend(self.source_violations(&request.dispatch)?);

        if violations.is_empty() {
            Ok(())
        } else {
            Err(ApiError::FieldValidation { violations })
        }
    }

    /// Required fields of the document and each unit
    pub fn field_violations(dispatch: &NewDispatch) -> Vec<FieldViolation> {
        let mut violations = Vec::new();

        if dispatch.document_number.trim().is_empty() {
            violations.push(FieldViolation::new(
                "document_number",
                t("validation.document_number_empty"),
            ));
        }

        if dispatch.units.is_empty() {
            violations.push(FieldViolation::new("units", t("validation.units_empty")));
        }

        for (idx, unit) in dispatch.units.iter().enumerate() {
            violations.extend(Self::unit_violations(&format!("units[{}]", idx), unit));
        }

        violations
    }

    fn unit_violations(prefix: &str, unit: &NewUnit) -> Vec<FieldViolation> {
        let mut violations = Vec::new();
        if unit.serial_number.trim().is_empty() {
            violations.push(FieldViolation::new(
                format!("{}.serial_number", prefix),
                t("validation.serial_empty"),
            ));
        }
        let capacity_missing = unit
            .capacity_rating
            .as_deref()
            .map(|c| c.trim().is_empty())
            .unwrap_or(true);
        if capacity_missing {
            violations.push(FieldViolation::new(
                format!("{}.capacity_rating", prefix),
                t("validation.capacity_empty"),
            ));
        }
        violations
    }

    /// Serial check for a single-unit edit
    pub fn validate_serial(serial_number: &str) -> ApiResult<()> {
        if serial_number.trim().is_empty() {
            return Err(ApiError::field("serial_number", t("validation.serial_empty")));
        }
        Ok(())
    }

    fn link_violations(request: &DispatchRequest) -> Vec<FieldViolation> {
        let mut violations = Vec::new();
        let kind = request.dispatch.document_kind;

        if !request.linked_provisional_ids.is_empty() && kind != DocumentKind::Official {
            violations.push(FieldViolation::new(
                "linked_provisional_ids",
                t("validation.links_only_official"),
            ));
        }

        let has_number = request
            .official_number
            .as_deref()
            .map(|n| !n.trim().is_empty())
            .unwrap_or(false);
        let has_date = request.official_date.is_some();
        if has_number != has_date {
            let field = if has_number { "official_date" } else { "official_number" };
            violations.push(FieldViolation::new(field, t("validation.promotion_incomplete")));
        } else if has_number && kind != DocumentKind::Provisional {
            violations.push(FieldViolation::new(
                "official_number",
                t("validation.promotion_only_provisional"),
            ));
        }

        violations
    }

    /// A source must exist and have the opposite direction
    fn source_violations(&self, dispatch: &NewDispatch) -> ApiResult<Vec<FieldViolation>> {
        let Some(source_id) = dispatch.source_dispatch_id.as_deref() else {
            return Ok(Vec::new());
        };

        let expected = dispatch.direction.opposite();
        let violation = match self.dispatch_repo.find_by_id(source_id)? {
            None => Some(t_with_args("validation.source_not_found", &[("id", source_id)])),
            Some(source) if source.direction != expected => Some(t_with_args(
                "validation.source_wrong_direction",
                &[
                    ("number", source.document_number.as_str()),
                    ("direction", expected.to_db_str()),
                ],
            )),
            Some(_) => None,
        };

        Ok(violation
            .map(|message| vec![FieldViolation::new("source_dispatch_id", message)])
            .unwrap_or_default())
    }
}
