use super::*;
use crate::domain::dispatch::{NewDispatch, NewUnit};
use chrono::NaiveDateTime;
use proptest::prelude::*;
use rusqlite::Connection;
use std::sync::Mutex;

// ==========================================
// In-memory fixtures for the pure passes
// ==========================================

fn ts() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 5, 1)
        .unwrap()
        .and_hms_opt(9, 0, 0)
        .unwrap()
}

fn doc(id: &str, direction: Direction, caps: &[&str]) -> Dispatch {
    Dispatch {
        id: id.to_string(),
        document_number: format!("{}/PCĐT", id),
        date: NaiveDate::from_ymd_opt(2025, 5, 1).unwrap(),
        transaction_date: None,
        direction,
        document_kind: DocumentKind::Official,
        is_lab_round_trip: false,
        linked_official_id: None,
        source_dispatch_id: None,
        team_id: None,
        file_url: None,
        created_at: ts(),
        units: caps
            .iter()
            .enumerate()
            .map(|(i, cap)| Unit {
                id: format!("{}-u{}", id, i),
                dispatch_id: id.to_string(),
                serial_number: format!("{}-SN{}", id, i),
                capacity_rating: Some(cap.to_string()),
                model_tag: None,
                note: None,
                photo_url: None,
                lab_test_result: None,
                is_processed: false,
                created_at: ts(),
            })
            .collect(),
    }
}

fn returning(id: &str, source: &str, caps: &[&str]) -> Dispatch {
    let mut d = doc(id, Direction::Return, caps);
    d.source_dispatch_id = Some(source.to_string());
    d
}

fn lab_return(id: &str, caps: &[&str]) -> Dispatch {
    let mut d = doc(id, Direction::Return, caps);
    d.is_lab_round_trip = true;
    d
}

fn unit_ids(outstanding: &[OutstandingUnit]) -> Vec<&str> {
    outstanding.iter().map(|o| o.unit.id.as_str()).collect()
}

#[test]
fn test_intake_without_returns_is_fully_outstanding() {
    let input = ReconcileInput {
        intake_batches: vec![doc("A1", Direction::Intake, &["50kVA", "50kVA", "50kVA"])],
        ..Default::default()
    };

    let result = reconcile(&input);
    assert_eq!(result.len(), 3);
    assert!(result
        .iter()
        .all(|o| o.reason == OutstandingReason::NotYetReturned));
}

#[test]
fn test_partial_return_reports_trailing_unit() {
    let input = ReconcileInput {
        intake_batches: vec![doc("A1", Direction::Intake, &["50kVA", "50kVA", "50kVA"])],
        linked_returns: vec![returning("B1", "A1", &["50kVA", "50kVA"])],
        ..Default::default()
    };

    let result = reconcile(&input);
    assert_eq!(unit_ids(&result), vec!["A1-u0"]);
}

#[test]
fn test_shortfall_selects_first_units_per_capacity() {
    let input = ReconcileInput {
        intake_batches: vec![doc(
            "A1",
            Direction::Intake,
            &["50kVA", "75kVA", "50kVA", "75kVA", "50kVA"],
        )],
        linked_returns: vec![
            returning("B1", "A1", &["50kVA"]),
            returning("B2", "A1", &["75kVA", "75kVA"]),
        ],
        ..Default::default()
    };

    // 50kVA: 3 in, 1 back -> first two 50kVA units; 75kVA fully covered
    let result = reconcile(&input);
    assert_eq!(unit_ids(&result), vec!["A1-u0", "A1-u2"]);
}

#[test]
fn test_superseded_provisional_return_does_not_cover() {
    let mut provisional = returning("P1", "A1", &["50kVA"]);
    provisional.document_kind = DocumentKind::Provisional;
    provisional.linked_official_id = Some("B1".to_string());

    let input = ReconcileInput {
        intake_batches: vec![doc("A1", Direction::Intake, &["50kVA", "50kVA"])],
        linked_returns: vec![provisional, returning("B1", "A1", &["50kVA"])],
        ..Default::default()
    };

    // one physical shipment, recorded twice: counts once
    assert_eq!(reconcile(&input).len(), 1);
}

#[test]
fn test_orphan_return_is_outstanding() {
    let input = ReconcileInput {
        orphan_returns: vec![doc("E1", Direction::Return, &["100kVA"])],
        ..Default::default()
    };

    let result = reconcile(&input);
    assert_eq!(result.len(), 1);
    assert_eq!(result[0].reason, OutstandingReason::ReturnedWithoutIntakeLink);
    assert_eq!(result[0].dispatch_number, "E1/PCĐT");
}

#[test]
fn test_superseded_orphan_return_skipped() {
    let mut provisional = doc("P1", Direction::Return, &["50kVA"]);
    provisional.document_kind = DocumentKind::Provisional;
    provisional.linked_official_id = Some("E1".to_string());

    let input = ReconcileInput {
        orphan_returns: vec![provisional, doc("E1", Direction::Return, &["50kVA"])],
        ..Default::default()
    };

    let result = reconcile(&input);
    assert_eq!(unit_ids(&result), vec!["E1-u0"]);
}

#[test]
fn test_lab_return_closed_by_intake_reference() {
    let open = ReconcileInput {
        lab_returns: vec![lab_return("C1", &["50kVA", "75kVA"])],
        ..Default::default()
    };
    let result = reconcile(&open);
    assert_eq!(result.len(), 2);
    assert!(result
        .iter()
        .all(|o| o.reason == OutstandingReason::SentForTesting));

    let mut closed = open.clone();
    closed.received_back_ids.insert("C1".to_string());
    assert!(reconcile(&closed).is_empty());
}

#[test]
fn test_lab_return_closed_through_superseded_provisional() {
    let mut provisional = lab_return("P1", &["50kVA"]);
    provisional.document_kind = DocumentKind::Provisional;
    provisional.linked_official_id = Some("C1".to_string());

    let mut input = ReconcileInput {
        lab_returns: vec![provisional, lab_return("C1", &["50kVA"])],
        ..Default::default()
    };
    assert_eq!(unit_ids(&reconcile(&input)), vec!["C1-u0"]);

    input.received_back_ids.insert("P1".to_string());
    assert!(reconcile(&input).is_empty());
}

#[test]
fn test_lab_intake_batch_not_in_pass1() {
    let mut lab_intake = doc("D1", Direction::Intake, &["50kVA"]);
    lab_intake.is_lab_round_trip = true;
    let input = ReconcileInput {
        intake_batches: vec![lab_intake],
        ..Default::default()
    };
    assert!(reconcile(&input).is_empty());
}

#[test]
fn test_batch_status_flags_over_return_as_incomplete() {
    let input = ReconcileInput {
        intake_batches: vec![
            doc("A1", Direction::Intake, &["50kVA"]),
            doc("A2", Direction::Intake, &["50kVA"]),
        ],
        linked_returns: vec![
            returning("B1", "A1", &["50kVA", "50kVA"]),
            returning("B2", "A2", &["50kVA"]),
        ],
        ..Default::default()
    };

    let statuses = batch_statuses(&input);
    let a1 = statuses.iter().find(|s| s.dispatch_id == "A1").unwrap();
    assert!(!a1.is_complete);
    assert!(a1.shortfall.is_empty());
    assert_eq!(a1.returned_count, 2);

    let a2 = statuses.iter().find(|s| s.dispatch_id == "A2").unwrap();
    assert!(a2.is_complete);
}

#[test]
fn test_reason_label_is_localised() {
    let _guard = crate::i18n::LOCALE_TEST_LOCK.lock().unwrap();
    crate::i18n::set_locale("en");
    let input = ReconcileInput {
        intake_batches: vec![doc("A1", Direction::Intake, &["50kVA"])],
        ..Default::default()
    };
    let result = reconcile(&input);
    crate::i18n::set_locale(crate::i18n::DEFAULT_LOCALE);
    assert_eq!(result[0].reason_label, "Not yet returned");
}

// ==========================================
// Properties
// ==========================================

fn caps_strategy() -> impl Strategy<Value = Vec<&'static str>> {
    prop::collection::vec(prop::sample::select(vec!["25kVA", "50kVA", "75kVA"]), 0..10)
}

proptest! {
    #[test]
    fn prop_shortfall_count_is_exact(intake in caps_strategy(), back in caps_strategy()) {
        let input = ReconcileInput {
            intake_batches: vec![doc("A1", Direction::Intake, &intake)],
            linked_returns: vec![returning("B1", "A1", &back)],
            ..Default::default()
        };
        let result = reconcile(&input);

        for cap in ["25kVA", "50kVA", "75kVA"] {
            let in_count = intake.iter().filter(|c| **c == cap).count();
            let back_count = back.iter().filter(|c| **c == cap).count();
            let reported = result
                .iter()
                .filter(|o| o.unit.capacity_rating.as_deref() == Some(cap))
                .count();
            prop_assert_eq!(reported, in_count.saturating_sub(back_count));
        }
    }

    #[test]
    fn prop_no_unit_reported_twice(
        intake in caps_strategy(),
        back in caps_strategy(),
        orphan in caps_strategy(),
        lab in caps_strategy(),
    ) {
        let input = ReconcileInput {
            intake_batches: vec![doc("A1", Direction::Intake, &intake)],
            linked_returns: vec![returning("B1", "A1", &back)],
            orphan_returns: vec![doc("E1", Direction::Return, &orphan)],
            lab_returns: vec![lab_return("C1", &lab)],
            received_back_ids: HashSet::new(),
        };
        let result = reconcile(&input);
        let unique: HashSet<_> = result.iter().map(|o| o.unit.id.clone()).collect();
        prop_assert_eq!(unique.len(), result.len());
    }
}

// ==========================================
// Against storage
// ==========================================

fn setup() -> (Arc<DispatchRepository>, UnreturnedUnitsResolver) {
    let conn = crate::db::open_in_memory().unwrap();
    conn.execute(
        "INSERT INTO team (id, code, name, created_at) VALUES ('t1', 'ĐTB', 'Thanh Bình', '2025-01-01 00:00:00')",
        [],
    )
    .unwrap();
    let conn: Arc<Mutex<Connection>> = Arc::new(Mutex::new(conn));
    let dispatches = Arc::new(DispatchRepository::new(conn.clone()));
    let units = Arc::new(UnitRepository::new(conn));
    let resolver = UnreturnedUnitsResolver::new(dispatches.clone(), units);
    (dispatches, resolver)
}

fn new_doc(number: &str, direction: Direction, count: usize) -> NewDispatch {
    let mut new = NewDispatch::new(number, NaiveDate::from_ymd_opt(2025, 5, 2).unwrap(), direction);
    new.units = (0..count)
        .map(|i| NewUnit::new(&format!("{}-{}", number, i), "50kVA"))
        .collect();
    new
}

#[test]
fn test_resolve_end_to_end_with_scope() {
    let (repo, resolver) = setup();

    let mut owned = new_doc("A1", Direction::Intake, 2);
    owned.team_id = Some("t1".to_string());
    let owned = repo.create(&owned).unwrap();
    let mut back = new_doc("B1", Direction::Return, 1);
    back.team_id = Some("t1".to_string());
    back.source_dispatch_id = Some(owned.id.clone());
    repo.create(&back).unwrap();

    repo.create(&new_doc("X1", Direction::Intake, 4)).unwrap();

    let admin = resolver.resolve(&TeamScope::All).unwrap();
    assert_eq!(admin.len(), 5);

    let team = resolver.resolve(&TeamScope::Team("t1".to_string())).unwrap();
    assert_eq!(team.len(), 1);
    assert_eq!(team[0].dispatch_number, "A1");

    let incomplete = resolver.incomplete_batches(&TeamScope::All).unwrap();
    assert_eq!(incomplete.len(), 2);
}

#[test]
fn test_totals_are_naive() {
    let (repo, resolver) = setup();
    repo.create(&new_doc("A1", Direction::Intake, 3)).unwrap();
    repo.create(&new_doc("E1", Direction::Return, 5)).unwrap();

    let totals = resolver.totals(&TeamScope::All, None).unwrap();
    assert_eq!(totals.total_intake, 3);
    assert_eq!(totals.total_return, 5);
    assert_eq!(totals.naive_outstanding, -2);

    let day = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
    let empty = resolver.totals(&TeamScope::All, Some((day, day))).unwrap();
    assert_eq!(empty.total_intake, 0);
}

#[test]
fn test_pending_lab_returns_from_storage() {
    let (repo, resolver) = setup();
    let mut lab = new_doc("C1", Direction::Return, 2);
    lab.is_lab_round_trip = true;
    let lab = repo.create(&lab).unwrap();

    assert_eq!(resolver.pending_lab_returns(&TeamScope::All).unwrap().len(), 1);

    let mut back = new_doc("D1", Direction::Intake, 2);
    back.is_lab_round_trip = true;
    back.source_dispatch_id = Some(lab.id.clone());
    repo.create(&back).unwrap();

    assert!(resolver.pending_lab_returns(&TeamScope::All).unwrap().is_empty());
}
