// ==========================================
// Transformer Dispatch - document linker
// ==========================================
// PROVISIONAL -> OFFICIAL association (linked_official_id).
// Link targets must be OFFICIAL; ids that are not PROVISIONAL, or that
// move in the other direction, are skipped without error.
//
// The `*_in` functions take an open DispatchWriter so callers can
// combine them with other writes in one transaction.
// ==========================================

use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{info, warn};

use crate::domain::dispatch::{Dispatch, DispatchFilter, NewDispatch, NewUnit};
use crate::domain::types::{Direction, DocumentKind, TeamScope};
use crate::repository::{DispatchRepository, DispatchWriter, RepositoryError, RepositoryResult};

pub struct DocumentLinker {
    dispatch_repo: Arc<DispatchRepository>,
}

impl DocumentLinker {
    pub fn new(dispatch_repo: Arc<DispatchRepository>) -> Self {
        Self { dispatch_repo }
    }

    // ==========================================
    // Transaction-scoped operations
    // ==========================================

    /// Point each PROVISIONAL document in `provisional_ids` at `official_id`
    ///
    /// Returns how many documents were actually linked.
    pub fn link_in(
        w: &DispatchWriter<'_>,
        provisional_ids: &[String],
        official_id: &str,
    ) -> RepositoryResult<usize> {
        if provisional_ids.is_empty() {
            return Ok(0);
        }

        let official = w.load_required(official_id)?;
        if official.document_kind != DocumentKind::Official {
            return Err(RepositoryError::BusinessRuleViolation(format!(
                "{} is {}, only OFFICIAL documents can be link targets",
                official.document_number, official.document_kind
            )));
        }

        let linked = w.set_linked_official(provisional_ids, official_id)?;
        if linked < provisional_ids.len() {
            warn!(
                official = %official.document_number,
                requested = provisional_ids.len(),
                linked,
                "some ids were not PROVISIONAL documents of the same direction and were skipped"
            );
        }
        Ok(linked)
    }

    /// Replace the full set of PROVISIONAL documents linked to `official_id`
    pub fn relink_in(
        w: &DispatchWriter<'_>,
        official_id: &str,
        provisional_ids: &[String],
    ) -> RepositoryResult<usize> {
        let cleared = w.clear_links_to(official_id)?;
        let linked = Self::link_in(w, provisional_ids, official_id)?;
        info!(official_id, cleared, linked, "relinked provisional documents");
        Ok(linked)
    }

    /// Create the OFFICIAL counterpart of a PROVISIONAL document and link it
    ///
    /// Units are duplicated by value (new rows). Returns the new OFFICIAL
    /// document.
    pub fn promote_in(
        w: &DispatchWriter<'_>,
        provisional: &Dispatch,
        official_number: &str,
        official_date: NaiveDate,
    ) -> RepositoryResult<Dispatch> {
        if provisional.document_kind != DocumentKind::Provisional {
            return Err(RepositoryError::BusinessRuleViolation(format!(
                "{} is not a PROVISIONAL document",
                provisional.document_number
            )));
        }

        let official = NewDispatch {
            document_number: official_number.to_string(),
            date: official_date,
            transaction_date: provisional.transaction_date,
            direction: provisional.direction,
            document_kind: DocumentKind::Official,
            is_lab_round_trip: provisional.is_lab_round_trip,
            source_dispatch_id: provisional.source_dispatch_id.clone(),
            team_id: provisional.team_id.clone(),
            file_url: provisional.file_url.clone(),
            units: provisional.units.iter().map(NewUnit::from_unit).collect(),
        };

        let official_id = w.insert(&official)?;
        w.set_linked_official(&[provisional.id.clone()], &official_id)?;

        info!(
            provisional = %provisional.document_number,
            official = %official_number,
            units = provisional.units.len(),
            "promoted provisional document"
        );
        w.load_required(&official_id)
    }

    // ==========================================
    // Standalone operations (own transaction)
    // ==========================================

    pub fn link_provisional_to_official(
        &self,
        provisional_ids: &[String],
        official_id: &str,
    ) -> RepositoryResult<usize> {
        self.dispatch_repo
            .write(|w| Self::link_in(w, provisional_ids, official_id))
    }

    pub fn relink_official(
        &self,
        official_id: &str,
        provisional_ids: &[String],
    ) -> RepositoryResult<usize> {
        self.dispatch_repo
            .write(|w| Self::relink_in(w, official_id, provisional_ids))
    }

    pub fn promote_provisional_to_official(
        &self,
        provisional_id: &str,
        official_number: &str,
        official_date: NaiveDate,
    ) -> RepositoryResult<Dispatch> {
        self.dispatch_repo.write(|w| {
            let provisional = w.load_required(provisional_id)?;
            Self::promote_in(w, &provisional, official_number, official_date)
        })
    }

    // ==========================================
    // Queries
    // ==========================================

    /// PROVISIONAL INTAKE documents not yet formalized, newest first
    pub fn unlinked_provisional_documents(&self, scope: &TeamScope) -> RepositoryResult<Vec<Dispatch>> {
        self.dispatch_repo.find_all(
            &DispatchFilter::new()
                .scope(scope)
                .direction(Direction::Intake)
                .kind(DocumentKind::Provisional)
                .has_linked_official(false),
        )
    }

    /// PROVISIONAL documents currently pointing at `official_id`
    pub fn provisionals_linked_to(&self, official_id: &str) -> RepositoryResult<Vec<Dispatch>> {
        self.dispatch_repo.find_all(
            &DispatchFilter::new()
                .kind(DocumentKind::Provisional)
                .linked_to(official_id),
        )
    }
}
