// ==========================================
// DispatchApi integration tests
// ==========================================
// Coverage:
// 1. Create / validation / cascade delete
// 2. Update: unit replacement, relink, promotion
// 3. Lookups: get_dispatch, search
// 4. Duplicate serial guard
// 5. Unit edits and document-number suffixes
// ==========================================

mod helpers;

use helpers::api_test_helper::*;
use helpers::test_data_builder::DispatchBuilder;
use transformer_dispatch::api::{ApiError, DispatchRequest, UnitUpdate};
use transformer_dispatch::config::config_keys;
use transformer_dispatch::domain::{Direction, DocumentKind, LabTestResult, TeamScope};

// ==========================================
// Create
// ==========================================

#[test]
fn test_create_dispatch_persists_units() {
    let env = ApiTestEnv::new().expect("test env");
    let created = env
        .create(
            DispatchBuilder::intake("12/PCĐT-KT+KHVT", day(1))
                .transaction_date(day(2))
                .unit("SN-1", "50kVA")
                .unit("SN-2", "100kVA"),
        )
        .expect("created");

    assert_eq!(created.units.len(), 2);
    assert_eq!(created.direction, Direction::Intake);
    assert_eq!(created.document_kind, DocumentKind::Official);
    assert_eq!(created.effective_transaction_date(), day(2));

    let detail = env.dispatch_api.get_dispatch(&created.id).expect("detail");
    assert_eq!(detail.dispatch, created);
    assert!(detail.linked_official.is_none());
    assert!(detail.linked_provisionals.is_empty());
}

#[test]
fn test_create_rejects_missing_fields_without_writing() {
    let env = ApiTestEnv::new().expect("test env");

    let result = env.create(
        DispatchBuilder::intake("A1", day(1))
            .unit("SN-1", "50kVA")
            .unit("  ", "")
    );

    match result {
        Err(ApiError::FieldValidation { violations }) => {
            let fields: Vec<&str> = violations.iter().map(|v| v.field.as_str()).collect();
            assert!(fields.contains(&"units[1].serial_number"));
            assert!(fields.contains(&"units[1].capacity_rating"));
        }
        other => panic!("expected field validation, got {:?}", other),
    }

    let totals = env
        .dashboard_api
        .get_dashboard_totals(&TeamScope::All, None)
        .expect("totals");
    assert_eq!(totals.total_intake, 0);
}

#[test]
fn test_create_rejects_source_of_same_direction() {
    let env = ApiTestEnv::new().expect("test env");
    let a1 = env
        .create(DispatchBuilder::intake("A1", day(1)).units(1, "50kVA"))
        .expect("A1 created");

    let result = env.create(DispatchBuilder::intake("A2", day(2)).source(&a1.id).units(1, "50kVA"));
    assert!(matches!(result, Err(ApiError::FieldValidation { .. })));

    let result = env.create(DispatchBuilder::returned("B1", day(2)).source("missing").units(1, "50kVA"));
    assert!(matches!(result, Err(ApiError::FieldValidation { .. })));
}

#[test]
fn test_links_only_allowed_on_official() {
    let env = ApiTestEnv::new().expect("test env");
    let ttr = env
        .create(DispatchBuilder::intake("TTR-1", day(1)).provisional().units(1, "50kVA"))
        .expect("provisional created");

    let result = env.create(
        DispatchBuilder::intake("TTR-2", day(2))
            .provisional()
            .units(1, "50kVA")
            .link(&ttr.id),
    );
    assert!(matches!(result, Err(ApiError::FieldValidation { .. })));
}

#[test]
fn test_delete_cascades_to_units() {
    let env = ApiTestEnv::new().expect("test env");
    let created = env
        .create(DispatchBuilder::intake("A1", day(1)).units(2, "50kVA"))
        .expect("created");
    let unit_ids: Vec<String> = created.units.iter().map(|u| u.id.clone()).collect();

    env.dispatch_api.delete_dispatch(&created.id).expect("deleted");

    assert!(matches!(
        env.dispatch_api.get_dispatch(&created.id),
        Err(ApiError::NotFound(_))
    ));
    for unit_id in &unit_ids {
        assert!(matches!(
            env.dispatch_api.mark_unit_processed(unit_id),
            Err(ApiError::NotFound(_))
        ));
    }
    let report = env
        .report_api
        .shape_report_by_unit_ids(&unit_ids)
        .expect("report");
    assert!(report.is_empty());

    assert!(matches!(
        env.dispatch_api.delete_dispatch(&created.id),
        Err(ApiError::NotFound(_))
    ));
}

// ==========================================
// Update
// ==========================================

#[test]
fn test_update_replaces_unit_list() {
    let env = ApiTestEnv::new().expect("test env");
    let created = env
        .create(DispatchBuilder::intake("A1", day(1)).units(3, "50kVA"))
        .expect("created");

    let request = DispatchBuilder::intake("A1-rev", day(2))
        .unit("NEW-1", "100kVA")
        .request();
    let result = env
        .dispatch_api
        .update_dispatch(&created.id, &request)
        .expect("updated");

    assert!(result.promoted.is_none());
    assert_eq!(result.dispatch.document_number, "A1-rev");
    assert_eq!(result.dispatch.units.len(), 1);
    assert_eq!(result.dispatch.units[0].serial_number, "NEW-1");
    assert!(created.units.iter().all(|u| u.id != result.dispatch.units[0].id));
}

#[test]
fn test_update_cannot_change_direction() {
    let env = ApiTestEnv::new().expect("test env");
    let created = env
        .create(DispatchBuilder::intake("A1", day(1)).units(1, "50kVA"))
        .expect("created");

    let request = DispatchBuilder::returned("A1", day(1)).units(1, "50kVA").request();
    match env.dispatch_api.update_dispatch(&created.id, &request) {
        Err(ApiError::FieldValidation { violations }) => {
            assert_eq!(violations[0].field, "direction");
        }
        other => panic!("expected direction violation, got {:?}", other),
    }
}

#[test]
fn test_update_missing_dispatch_is_not_found() {
    let env = ApiTestEnv::new().expect("test env");
    let request = DispatchBuilder::intake("A1", day(1)).units(1, "50kVA").request();
    assert!(matches!(
        env.dispatch_api.update_dispatch("no-such-id", &request),
        Err(ApiError::NotFound(_))
    ));
}

#[test]
fn test_update_official_replaces_link_set() {
    let env = ApiTestEnv::new().expect("test env");
    let ttr_a = env
        .create(DispatchBuilder::intake("TTR-A", day(1)).provisional().units(1, "50kVA"))
        .expect("TTR-A");
    let ttr_b = env
        .create(DispatchBuilder::intake("TTR-B", day(1)).provisional().units(1, "50kVA"))
        .expect("TTR-B");
    let cv = env
        .create(DispatchBuilder::intake("CV-1", day(2)).units(1, "50kVA").link(&ttr_a.id))
        .expect("CV-1");

    let request = DispatchBuilder::intake("CV-1", day(2))
        .units(1, "50kVA")
        .link(&ttr_b.id)
        .request();
    env.dispatch_api
        .update_dispatch(&cv.id, &request)
        .expect("updated");

    let a = env.dispatch_api.get_dispatch(&ttr_a.id).expect("TTR-A detail");
    let b = env.dispatch_api.get_dispatch(&ttr_b.id).expect("TTR-B detail");
    assert!(a.dispatch.linked_official_id.is_none());
    assert_eq!(b.dispatch.linked_official_id.as_deref(), Some(cv.id.as_str()));

    let detail = env.dispatch_api.get_dispatch(&cv.id).expect("CV detail");
    assert_eq!(detail.linked_provisionals.len(), 1);
    assert_eq!(detail.linked_provisionals[0].id, ttr_b.id);
}

#[test]
fn test_promotion_duplicates_units_and_links_back() {
    let env = ApiTestEnv::new().expect("test env");
    let ttr = env
        .create(
            DispatchBuilder::intake("TTR-1", day(1))
                .provisional()
                .unit("SN-1", "50kVA")
                .unit("SN-2", "75kVA"),
        )
        .expect("provisional");

    let request = DispatchRequest::new(
        DispatchBuilder::intake("TTR-1", day(1))
            .provisional()
            .unit("SN-1", "50kVA")
            .unit("SN-2", "75kVA")
            .build(),
    )
    .with_promotion("CV-77", day(4));
    let result = env
        .dispatch_api
        .update_dispatch(&ttr.id, &request)
        .expect("promoted");

    let official = result.promoted.expect("official created");
    assert_eq!(official.document_number, "CV-77");
    assert_eq!(official.date, day(4));
    assert_eq!(official.document_kind, DocumentKind::Official);
    assert_eq!(official.direction, Direction::Intake);
    assert_eq!(official.units.len(), 2);

    let provisional_unit_ids: Vec<&str> =
        result.dispatch.units.iter().map(|u| u.id.as_str()).collect();
    assert!(official
        .units
        .iter()
        .all(|u| !provisional_unit_ids.contains(&u.id.as_str())));
    assert_eq!(
        result.dispatch.linked_official_id.as_deref(),
        Some(official.id.as_str())
    );

    // a second promotion of the same paperwork is refused
    let again = DispatchRequest::new(
        DispatchBuilder::intake("TTR-1", day(1))
            .provisional()
            .unit("SN-1", "50kVA")
            .build(),
    )
    .with_promotion("CV-78", day(5));
    assert!(matches!(
        env.dispatch_api.update_dispatch(&ttr.id, &again),
        Err(ApiError::BusinessRuleViolation(_))
    ));
}

#[test]
fn test_promotion_requires_number_and_date() {
    let env = ApiTestEnv::new().expect("test env");
    let ttr = env
        .create(DispatchBuilder::intake("TTR-1", day(1)).provisional().units(1, "50kVA"))
        .expect("provisional");

    let mut request = DispatchBuilder::intake("TTR-1", day(1))
        .provisional()
        .units(1, "50kVA")
        .request();
    request.official_number = Some("CV-1".to_string());

    assert!(matches!(
        env.dispatch_api.update_dispatch(&ttr.id, &request),
        Err(ApiError::FieldValidation { .. })
    ));
}

// ==========================================
// Lookups
// ==========================================

#[test]
fn test_search_requires_two_characters_and_caps_results() {
    let env = ApiTestEnv::new().expect("test env");
    for n in 0..7 {
        env.create(DispatchBuilder::intake(&format!("KT-{}", n), day(1)).units(1, "50kVA"))
            .expect("created");
    }
    env.create(DispatchBuilder::intake("ZZ-1", day(1)).units(1, "50kVA"))
        .expect("created");

    assert!(env
        .dispatch_api
        .search_dispatches("K", &TeamScope::All)
        .expect("search")
        .is_empty());

    let hits = env
        .dispatch_api
        .search_dispatches("KT", &TeamScope::All)
        .expect("search");
    assert_eq!(hits.len(), 5);
    assert!(hits.iter().all(|d| d.document_number.starts_with("KT-")));

    let one = env
        .dispatch_api
        .search_dispatches("zz", &TeamScope::All)
        .expect("search");
    // LIKE matching is case-insensitive for ASCII
    assert_eq!(one.len(), 1);
}

#[test]
fn test_search_respects_team_scope() {
    let env = ApiTestEnv::new().expect("test env");
    let north = env.create_team("north");
    env.create(DispatchBuilder::intake("KT-N", day(1)).team(&north.id).units(1, "50kVA"))
        .expect("north");
    env.create(DispatchBuilder::intake("KT-X", day(1)).units(1, "50kVA"))
        .expect("no team");

    let hits = env
        .dispatch_api
        .search_dispatches("KT", &TeamScope::Team(north.id.clone()))
        .expect("search");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].document_number, "KT-N");
}

// ==========================================
// Duplicate serial guard
// ==========================================

#[test]
fn test_duplicate_serial_detected_in_same_direction() {
    let env = ApiTestEnv::new().expect("test env");
    let existing = env
        .create(DispatchBuilder::intake("A1", day(1)).unit("SN123", "50kVA"))
        .expect("created");

    let serials = vec!["SN123".to_string(), "SN999".to_string()];
    let hits = env
        .dispatch_api
        .check_duplicate_serials(&serials, Direction::Intake, false, None)
        .expect("checked");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].serial_number, "SN123");
    assert_eq!(hits[0].conflicting_dispatch_number, "A1");
    assert_eq!(hits[0].conflicting_direction, Direction::Intake);

    // other direction, lab flow and the document itself are not conflicts
    assert!(env
        .dispatch_api
        .check_duplicate_serials(&serials, Direction::Return, false, None)
        .expect("checked")
        .is_empty());
    assert!(env
        .dispatch_api
        .check_duplicate_serials(&serials, Direction::Intake, true, None)
        .expect("checked")
        .is_empty());
    assert!(env
        .dispatch_api
        .check_duplicate_serials(&serials, Direction::Intake, false, Some(existing.id.as_str()))
        .expect("checked")
        .is_empty());
}

#[test]
fn test_padded_serial_is_still_a_duplicate() {
    let env = ApiTestEnv::new().expect("test env");
    let created = env
        .create(DispatchBuilder::intake("A1", day(1)).unit("SN123 ", "50kVA"))
        .expect("created");
    assert_eq!(created.units[0].serial_number, "SN123");

    let hits = env
        .dispatch_api
        .check_duplicate_serials(&[" SN123".to_string()], Direction::Intake, false, None)
        .expect("checked");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].serial_number, "SN123");
}

#[test]
fn test_processed_lab_failure_is_not_a_duplicate() {
    let env = ApiTestEnv::new().expect("test env");
    let failed = env
        .create(
            DispatchBuilder::intake("A1", day(1))
                .unit_with_result("SN123", "50kVA", LabTestResult::Fail),
        )
        .expect("created");
    let serials = vec!["SN123".to_string()];

    assert_eq!(
        env.dispatch_api
            .check_duplicate_serials(&serials, Direction::Intake, false, None)
            .expect("checked")
            .len(),
        1
    );

    env.dispatch_api
        .mark_unit_processed(&failed.units[0].id)
        .expect("processed");

    assert!(env
        .dispatch_api
        .check_duplicate_serials(&serials, Direction::Intake, false, None)
        .expect("checked")
        .is_empty());
}

// ==========================================
// Unit edits
// ==========================================

#[test]
fn test_update_unit_in_place() {
    let env = ApiTestEnv::new().expect("test env");
    let created = env
        .create(DispatchBuilder::intake("A1", day(1)).unit("SN-1", "50kVA"))
        .expect("created");
    let unit_id = &created.units[0].id;

    let updated = env
        .dispatch_api
        .update_unit(
            unit_id,
            &UnitUpdate {
                serial_number: " SN-1B ".to_string(),
                capacity_rating: Some("75kVA".to_string()),
                model_tag: Some("  ".to_string()),
                note: Some("bushing cracked".to_string()),
            },
        )
        .expect("unit updated");

    assert_eq!(&updated.id, unit_id);
    assert_eq!(updated.serial_number, "SN-1B");
    assert_eq!(updated.capacity_rating.as_deref(), Some("75kVA"));
    assert!(updated.model_tag.is_none());
    assert_eq!(updated.note.as_deref(), Some("bushing cracked"));

    let blank = UnitUpdate {
        serial_number: "".to_string(),
        capacity_rating: None,
        model_tag: None,
        note: None,
    };
    assert!(matches!(
        env.dispatch_api.update_unit(unit_id, &blank),
        Err(ApiError::FieldValidation { .. })
    ));
}

// ==========================================
// Document numbers
// ==========================================

#[test]
fn test_compose_document_number_with_team() {
    let env = ApiTestEnv::new().expect("test env");
    let team = env.create_team("dl1");

    let official = env
        .dispatch_api
        .compose_document_number("12", DocumentKind::Official, false, None)
        .expect("official number");
    assert_eq!(official, "12/PCĐT-KT+KHVT");

    let provisional = env
        .dispatch_api
        .compose_document_number("7", DocumentKind::Provisional, false, Some(team.id.as_str()))
        .expect("provisional number");
    assert_eq!(provisional, "7/TTr-DL1");

    let lab = env
        .dispatch_api
        .compose_document_number("3", DocumentKind::Official, true, Some(team.id.as_str()))
        .expect("lab number");
    assert_eq!(lab, "3/DL1-KT");

    assert!(matches!(
        env.dispatch_api
            .compose_document_number("7", DocumentKind::Provisional, false, None),
        Err(ApiError::FieldValidation { .. })
    ));
    assert!(matches!(
        env.dispatch_api
            .compose_document_number("7", DocumentKind::Provisional, false, Some("ghost")),
        Err(ApiError::NotFound(_))
    ));
}

#[test]
fn test_compose_document_number_uses_configured_suffix() {
    let env = ApiTestEnv::new().expect("test env");
    env.config_manager
        .set_value(config_keys::OFFICIAL_SUFFIX, "/CV-PC")
        .expect("suffix configured");

    let number = env
        .dispatch_api
        .compose_document_number("99", DocumentKind::Official, false, None)
        .expect("number");
    assert_eq!(number, "99/CV-PC");
}
