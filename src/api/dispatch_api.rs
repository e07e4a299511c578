// ==========================================
// Transformer Dispatch - dispatch API
// ==========================================
// Create/update/delete of documents with their units, plus lookups.
// Workflows that touch two documents (create OFFICIAL + link, update +
// relink, promote PROVISIONAL) run in a single transaction.
// ==========================================

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::api::error::{ApiError, ApiResult};
use crate::api::validator::{DispatchRequest, DispatchValidator};
use crate::config::ConfigManager;
use crate::domain::dispatch::{Dispatch, DispatchFilter, DispatchSummary, Unit};
use crate::domain::outstanding::DuplicateSerial;
use crate::domain::types::{Direction, DocumentKind, TeamScope};
use crate::engine::duplicate_guard::DuplicateSerialGuard;
use crate::engine::linker::DocumentLinker;
use crate::repository::{
    DispatchOrder, DispatchRepository, RepositoryError, TeamRepository, UnitRepository,
};

/// Shortest query accepted by `search_dispatches`
pub const MIN_SEARCH_LEN: usize = 2;
/// Most results returned by `search_dispatches`
pub const SEARCH_LIMIT: usize = 5;

// ==========================================
// Response shapes
// ==========================================

/// A dispatch with the documents it is linked to
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchDetail {
    pub dispatch: Dispatch,
    /// OFFICIAL document this PROVISIONAL one was formalized by
    pub linked_official: Option<DispatchSummary>,
    /// PROVISIONAL documents pointing at this one
    pub linked_provisionals: Vec<DispatchSummary>,
    pub source: Option<DispatchSummary>,
}

/// Result of an update; `promoted` is set when a PROVISIONAL document
/// was formalized in the same call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchUpdateResult {
    pub dispatch: Dispatch,
    pub promoted: Option<Dispatch>,
}

/// Editable fields of a single unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitUpdate {
    pub serial_number: String,
    pub capacity_rating: Option<String>,
    pub model_tag: Option<String>,
    pub note: Option<String>,
}

// ==========================================
// DispatchApi
// ==========================================
pub struct DispatchApi {
    dispatch_repo: Arc<DispatchRepository>,
    unit_repo: Arc<UnitRepository>,
    team_repo: Arc<TeamRepository>,
    linker: Arc<DocumentLinker>,
    duplicate_guard: Arc<DuplicateSerialGuard>,
    validator: Arc<DispatchValidator>,
    config: Arc<ConfigManager>,
}

impl DispatchApi {
    pub fn new(
        dispatch_repo: Arc<DispatchRepository>,
        unit_repo: Arc<UnitRepository>,
        team_repo: Arc<TeamRepository>,
        linker: Arc<DocumentLinker>,
        duplicate_guard: Arc<DuplicateSerialGuard>,
        validator: Arc<DispatchValidator>,
        config: Arc<ConfigManager>,
    ) -> Self {
        Self {
            dispatch_repo,
            unit_repo,
            team_repo,
            linker,
            duplicate_guard,
            validator,
            config,
        }
    }

    // ==========================================
    // Writes
    // ==========================================

    /// Create a document with its units
    ///
    /// For an OFFICIAL document, `linked_provisional_ids` are linked in the
    /// same transaction.
    #[instrument(skip(self, request), fields(number = %request.dispatch.document_number))]
    pub fn create_dispatch(&self, request: &DispatchRequest) -> ApiResult<Dispatch> {
        self.validator.validate_request(request)?;

        let created = self.dispatch_repo.write(|w| {
            let id = w.insert(&request.dispatch)?;
            if request.dispatch.document_kind == DocumentKind::Official {
                DocumentLinker::link_in(w, &request.linked_provisional_ids, &id)?;
            }
            w.load_required(&id)
        })?;

        info!(
            dispatch_id = %created.id,
            direction = %created.direction,
            units = created.units.len(),
            "dispatch created"
        );
        Ok(created)
    }

    /// Replace a document's fields and units
    ///
    /// Units are deleted and recreated, so unit ids change. An OFFICIAL
    /// document gets its full link set replaced; a PROVISIONAL document
    /// with official number and date is promoted.
    #[instrument(skip(self, request), fields(number = %request.dispatch.document_number))]
    pub fn update_dispatch(
        &self,
        id: &str,
        request: &DispatchRequest,
    ) -> ApiResult<DispatchUpdateResult> {
        let existing = self
            .dispatch_repo
            .find_by_id(id)?
            .ok_or_else(|| RepositoryError::not_found("Dispatch", id))?;
        if existing.direction != request.dispatch.direction {
            return Err(ApiError::field(
                "direction",
                format!(
                    "{} is a {} document; direction cannot change",
                    existing.document_number, existing.direction
                ),
            ));
        }
        if existing.is_superseded() && request.dispatch.document_kind == DocumentKind::Official {
            return Err(ApiError::field(
                "document_kind",
                format!(
                    "{} is already formalized by another document; it cannot become OFFICIAL",
                    existing.document_number
                ),
            ));
        }
        self.validator.validate_request(request)?;

        let promotion = request.promotion();
        if promotion.is_some() && existing.is_superseded() {
            return Err(ApiError::BusinessRuleViolation(format!(
                "{} is already formalized by another document",
                existing.document_number
            )));
        }

        let (dispatch, promoted) = self.dispatch_repo.write(|w| {
            w.update_fields(id, &request.dispatch)?;
            w.replace_units(id, &request.dispatch.units)?;

            match request.dispatch.document_kind {
                DocumentKind::Official => {
                    DocumentLinker::relink_in(w, id, &request.linked_provisional_ids)?;
                }
                DocumentKind::Provisional => {
                    // a PROVISIONAL document cannot be a link target
                    w.clear_links_to(id)?;
                }
            }

            let updated = w.load_required(id)?;
            let promoted = match promotion {
                Some((number, date)) => Some(DocumentLinker::promote_in(w, &updated, number, date)?),
                None => None,
            };
            // reload: promotion sets linked_official_id
            Ok((w.load_required(id)?, promoted))
        })?;

        info!(
            dispatch_id = %dispatch.id,
            units = dispatch.units.len(),
            promoted = promoted.as_ref().map(|p| p.id.as_str()).unwrap_or("-"),
            "dispatch updated"
        );
        Ok(DispatchUpdateResult { dispatch, promoted })
    }

    /// Delete a document and its units
    pub fn delete_dispatch(&self, id: &str) -> ApiResult<()> {
        self.dispatch_repo.delete(id)?;
        info!(dispatch_id = id, "dispatch deleted");
        Ok(())
    }

    /// Flag a failed lab unit as re-added to a new RETURN batch
    pub fn mark_unit_processed(&self, unit_id: &str) -> ApiResult<()> {
        self.unit_repo.mark_processed(unit_id)?;
        info!(unit_id, "unit marked processed");
        Ok(())
    }

    /// Edit one unit in place
    pub fn update_unit(&self, unit_id: &str, update: &UnitUpdate) -> ApiResult<Unit> {
        DispatchValidator::validate_serial(&update.serial_number)?;

        let non_blank = |v: &Option<String>| {
            v.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        self.unit_repo.update_fields(
            unit_id,
            update.serial_number.trim(),
            non_blank(&update.capacity_rating).as_deref(),
            non_blank(&update.model_tag).as_deref(),
            non_blank(&update.note).as_deref(),
        )?;

        let unit = self
            .unit_repo
            .find_by_id(unit_id)?
            .ok_or_else(|| RepositoryError::not_found("Unit", unit_id))?;
        info!(unit_id, serial = %unit.serial_number, "unit updated");
        Ok(unit)
    }

    // ==========================================
    // Reads
    // ==========================================

    /// One document with its link neighbourhood
    pub fn get_dispatch(&self, id: &str) -> ApiResult<DispatchDetail> {
        let dispatch = self
            .dispatch_repo
            .find_by_id(id)?
            .ok_or_else(|| RepositoryError::not_found("Dispatch", id))?;

        let linked_official = match dispatch.linked_official_id.as_deref() {
            Some(official_id) => self.dispatch_repo.find_by_id(official_id)?.map(|d| d.summary()),
            None => None,
        };
        let source = match dispatch.source_dispatch_id.as_deref() {
            Some(source_id) => self.dispatch_repo.find_by_id(source_id)?.map(|d| d.summary()),
            None => None,
        };
        let linked_provisionals = self
            .linker
            .provisionals_linked_to(&dispatch.id)?
            .iter()
            .map(Dispatch::summary)
            .collect();

        Ok(DispatchDetail {
            dispatch,
            linked_official,
            linked_provisionals,
            source,
        })
    }

    /// Documents whose number contains `query`, newest created first
    pub fn search_dispatches(&self, query: &str, scope: &TeamScope) -> ApiResult<Vec<Dispatch>> {
        let query = query.trim();
        if query.chars().count() < MIN_SEARCH_LEN {
            return Ok(Vec::new());
        }

        let found = self.dispatch_repo.find_ordered(
            &DispatchFilter::new().scope(scope).number_contains(query),
            DispatchOrder::CreatedDesc,
            Some(SEARCH_LIMIT),
        )?;
        debug!(query, hits = found.len(), "dispatch search");
        Ok(found)
    }

    /// PROVISIONAL INTAKE documents still waiting for official paperwork
    pub fn get_unlinked_provisional_documents(&self, scope: &TeamScope) -> ApiResult<Vec<Dispatch>> {
        Ok(self.linker.unlinked_provisional_documents(scope)?)
    }

    /// Advisory duplicate check for serials about to be registered
    pub fn check_duplicate_serials(
        &self,
        serials: &[String],
        direction: Direction,
        is_lab_round_trip: bool,
        exclude_dispatch_id: Option<&str>,
    ) -> ApiResult<Vec<DuplicateSerial>> {
        Ok(self
            .duplicate_guard
            .check(serials, direction, is_lab_round_trip, exclude_dispatch_id)?)
    }

    /// Append the configured suffix for this kind of document
    ///
    /// PROVISIONAL and lab documents need the issuing team.
    pub fn compose_document_number(
        &self,
        base: &str,
        kind: DocumentKind,
        is_lab_round_trip: bool,
        team_id: Option<&str>,
    ) -> ApiResult<String> {
        let templates = self
            .config
            .get_suffix_templates()
            .map_err(|e| ApiError::InternalError(e.to_string()))?;

        let team_code = match team_id {
            Some(id) => Some(
                self.team_repo
                    .find_by_id(id)?
                    .ok_or_else(|| RepositoryError::not_found("Team", id))?
                    .code,
            ),
            None => None,
        };

        templates
            .compose(base, kind, is_lab_round_trip, team_code.as_deref())
            .ok_or_else(|| {
                ApiError::field("team_id", crate::i18n::t("validation.required"))
            })
    }
}
