//! Property-based tests for split planning and reconciliation.
//!
//! Uses proptest to verify that:
//! - additions and deletions never overlap
//! - the resulting count always equals the desired set size
//! - reconciling reaches exactly the desired rows, and a repeat is a no-op
//! - a ticket is `split` exactly when it has targets

use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use std::collections::BTreeSet;
use tracing::info;

use splitticket::model::{NewTicket, Status, TicketId};
use splitticket::split::{SplitPlan, SplitReconciler, SplitRequest};
use splitticket::storage::{SplitStore, SqliteStorage, TicketStore};

fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("info")
        .with_test_writer()
        .try_init();
}

fn id_set(max: i64) -> impl Strategy<Value = Vec<TicketId>> {
    prop::collection::vec((1..=max).prop_map(TicketId), 0..12)
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 100,
        ..Default::default()
    })]

    /// Property: a plan never both adds and deletes the same target
    #[test]
    fn additions_and_deletions_are_disjoint(stored in id_set(20), desired in id_set(20)) {
        init_test_logging();
        info!("proptest_disjoint: stored={} desired={}", stored.len(), desired.len());

        let plan = SplitPlan::compute(stored, desired);
        prop_assert!(plan.additions.is_disjoint(&plan.deletions));
        prop_assert!(plan.unchanged.is_disjoint(&plan.additions));
        prop_assert!(plan.unchanged.is_disjoint(&plan.deletions));
    }

    /// Property: the resulting count is the size of the desired set
    #[test]
    fn resulting_count_matches_desired(stored in id_set(20), desired in id_set(20)) {
        init_test_logging();

        let desired_set: BTreeSet<TicketId> = desired.iter().copied().collect();
        let plan = SplitPlan::compute(stored, desired);

        prop_assert_eq!(plan.resulting_count(), desired_set.len());
        prop_assert_eq!(plan.targets(), desired_set.clone());
        prop_assert_eq!(plan.derived_status() == Status::Split, !desired_set.is_empty());
    }

    /// Property: planning against its own targets changes nothing
    #[test]
    fn replanning_is_a_noop(stored in id_set(20), desired in id_set(20)) {
        init_test_logging();

        let first = SplitPlan::compute(stored, desired);
        let second = SplitPlan::compute(first.targets(), first.targets());
        prop_assert!(second.is_noop());
    }

    /// Property: free text yields exactly its digit runs
    #[test]
    fn target_text_yields_digit_runs(ids in prop::collection::vec(1i64..100_000, 0..8), sep in "[ ,;#]{1,3}") {
        init_test_logging();

        let text = ids
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(&sep);
        let parsed = SplitRequest::parse_targets(&text);
        let expected: Vec<TicketId> = ids.into_iter().map(TicketId).collect();
        prop_assert_eq!(parsed, expected);
    }
}

const TICKETS: i64 = 8;

fn seeded_storage() -> SqliteStorage {
    let mut storage = SqliteStorage::open_memory().expect("in-memory db");
    let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
    for i in 0..=TICKETS {
        storage
            .create_ticket(&NewTicket::with_summary(format!("Ticket {i}")), "seed", now)
            .expect("seed ticket");
    }
    storage
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 32,
        ..Default::default()
    })]

    /// Property: reconciling lands on the desired rows and status
    #[test]
    fn reconcile_reaches_desired_state(first in id_set(TICKETS), second in id_set(TICKETS)) {
        init_test_logging();
        info!("proptest_reconcile: first={} second={}", first.len(), second.len());

        // Ticket 1 is the source; shift targets so they never equal it.
        let shift = |ids: Vec<TicketId>| -> BTreeSet<TicketId> {
            ids.into_iter().map(|id| TicketId(id.get() + 1)).collect()
        };
        let first = shift(first);
        let second = shift(second);
        let source = TicketId(1);
        let mut storage = seeded_storage();
        let t1 = Utc.timestamp_opt(1_700_000_100, 0).unwrap();
        let t2 = Utc.timestamp_opt(1_700_000_200, 0).unwrap();

        SplitReconciler::new(&mut storage)
            .reconcile(source, [], first.clone(), t1, "alice")
            .unwrap();
        let outcome = SplitReconciler::new(&mut storage)
            .reconcile(source, first.clone(), second.clone(), t2, "alice")
            .unwrap();

        let rows = storage.list_by_source(source).unwrap();
        let on_record: BTreeSet<TicketId> = rows.iter().map(|r| r.target).collect();
        prop_assert_eq!(&on_record, &second);

        for row in &rows {
            let expected = if first.contains(&row.target) { t1 } else { t2 };
            prop_assert_eq!(row.split_at, expected);
        }

        let status = storage.get_ticket(source).unwrap().unwrap().status;
        prop_assert_eq!(status == Status::Split, !second.is_empty());
        prop_assert_eq!(outcome.resulting_count(), second.len());

        let again = SplitReconciler::new(&mut storage)
            .reconcile(source, second.clone(), second, t2, "alice")
            .unwrap();
        prop_assert!(!again.changed());
    }
}
