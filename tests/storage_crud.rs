mod common;

use common::{t, test_db, test_db_with_dir, test_log, ticket};
use splitticket::SplitError;
use splitticket::model::{NewTicket, Status, TicketId};
use splitticket::split::SplitReconciler;
use splitticket::storage::schema::{
    CURRENT_SCHEMA_VERSION, SCHEMA_VERSION_KEY, stored_schema_version,
};
use splitticket::storage::{SplitStore, SqliteStorage, TicketFilters, TicketStore};

#[test]
fn create_and_fetch_ticket() {
    let _log = test_log("create_and_fetch_ticket");
    let mut storage = test_db();
    storage.add_milestone("1.0", None).unwrap();
    storage.add_component("core").unwrap();

    let created = storage
        .create_ticket(
            &NewTicket {
                summary: "  Port the importer  ".to_string(),
                description: Some("Details".to_string()),
                milestone: Some("1.0".to_string()),
                component: Some("core".to_string()),
                keywords: Some("import".to_string()),
                ..NewTicket::default()
            },
            "alice",
            t(0),
        )
        .unwrap();

    let fetched = storage.get_ticket(created.id).unwrap().unwrap();
    assert_eq!(fetched, created);
    assert_eq!(fetched.summary, "Port the importer");
    assert_eq!(fetched.reporter.as_deref(), Some("alice"));
    assert_eq!(fetched.status, Status::New);
    assert_eq!(fetched.created_at, t(0));
    assert!(storage.get_ticket(TicketId(404)).unwrap().is_none());
}

#[test]
fn create_rejects_blank_summary() {
    let mut storage = test_db();
    let err = storage
        .create_ticket(&NewTicket::with_summary("   "), "alice", t(0))
        .unwrap_err();
    assert!(matches!(
        err,
        SplitError::Validation { .. } | SplitError::ValidationErrors { .. }
    ));
}

#[test]
fn ticket_ids_are_never_reused() {
    let mut storage = test_db();
    let first = ticket(&mut storage, "One").id;
    let second = ticket(&mut storage, "Two").id;
    assert!(second > first);
    assert!(first.is_valid());
}

#[test]
fn list_filters_by_status_milestone_and_component() {
    let mut storage = test_db();
    storage.add_milestone("1.0", None).unwrap();
    storage.add_milestone("2.0", None).unwrap();
    storage.add_component("ui").unwrap();

    let a = storage
        .create_ticket(
            &NewTicket {
                milestone: Some("1.0".to_string()),
                component: Some("ui".to_string()),
                ..NewTicket::with_summary("A")
            },
            "alice",
            t(0),
        )
        .unwrap();
    let b = storage
        .create_ticket(
            &NewTicket {
                milestone: Some("2.0".to_string()),
                ..NewTicket::with_summary("B")
            },
            "alice",
            t(0),
        )
        .unwrap();
    storage.set_status(b.id, &Status::Closed, "alice").unwrap();

    let by_milestone = storage
        .list_tickets(&TicketFilters {
            milestone: Some("1.0".to_string()),
            ..TicketFilters::default()
        })
        .unwrap();
    assert_eq!(by_milestone.len(), 1);
    assert_eq!(by_milestone[0].id, a.id);

    let closed = storage
        .list_tickets(&TicketFilters {
            status: Some(Status::Closed),
            ..TicketFilters::default()
        })
        .unwrap();
    assert_eq!(closed.len(), 1);
    assert_eq!(closed[0].id, b.id);

    let ui = storage
        .list_tickets(&TicketFilters {
            component: Some("ui".to_string()),
            ..TicketFilters::default()
        })
        .unwrap();
    assert_eq!(ui.len(), 1);

    let limited = storage
        .list_tickets(&TicketFilters {
            limit: Some(1),
            ..TicketFilters::default()
        })
        .unwrap();
    assert_eq!(limited.len(), 1);
}

#[test]
fn set_status_reports_whether_it_changed() {
    let mut storage = test_db();
    let id = ticket(&mut storage, "One").id;

    assert!(storage.set_status(id, &Status::Assigned, "alice").unwrap());
    assert!(!storage.set_status(id, &Status::Assigned, "alice").unwrap());

    let err = storage
        .set_status(TicketId(99), &Status::Closed, "alice")
        .unwrap_err();
    assert!(matches!(err, SplitError::TicketNotFound { .. }));
}

#[test]
fn milestones_order_and_completion() {
    let mut storage = test_db();
    storage.add_milestone("someday", None).unwrap();
    storage.add_milestone("2.0", Some(t(200))).unwrap();
    storage.add_milestone("1.0", Some(t(100))).unwrap();

    let names: Vec<_> = storage
        .active_milestones()
        .unwrap()
        .into_iter()
        .map(|m| m.name)
        .collect();
    assert_eq!(names, vec!["1.0", "2.0", "someday"]);

    let done = storage.complete_milestone("1.0", t(150)).unwrap();
    assert_eq!(done.completed, Some(t(150)));
    assert!(!done.is_active());

    assert_eq!(storage.list_milestones(false).unwrap().len(), 2);
    let all = storage.list_milestones(true).unwrap();
    assert_eq!(all.len(), 3);
    assert_eq!(all.last().unwrap().name, "1.0");

    let err = storage.complete_milestone("9.9", t(1)).unwrap_err();
    assert!(matches!(err, SplitError::MilestoneNotFound { .. }));
}

#[test]
fn duplicate_milestone_and_component_rejected() {
    let mut storage = test_db();
    storage.add_milestone("1.0", None).unwrap();
    storage.add_component("core").unwrap();

    assert!(storage.add_milestone("1.0", None).is_err());
    assert!(storage.add_component("core").is_err());
    assert!(storage.add_component("  ").is_err());
    assert!(storage.milestone_exists("1.0").unwrap());
    assert!(storage.component_exists("core").unwrap());
    assert!(!storage.component_exists("ui").unwrap());
}

#[test]
fn options_group_active_milestones() {
    let _log = test_log("options_group_active_milestones");
    let mut storage = test_db();
    storage.add_milestone("1.0", Some(t(10))).unwrap();
    storage.add_milestone("old", Some(t(1))).unwrap();
    storage.complete_milestone("old", t(5)).unwrap();
    storage.add_component("core").unwrap();
    storage.add_component("ui").unwrap();

    let mut make = |summary: &str, milestone: &str, component: Option<&str>| {
        storage
            .create_ticket(
                &NewTicket {
                    milestone: Some(milestone.to_string()),
                    component: component.map(str::to_string),
                    ..NewTicket::with_summary(summary)
                },
                "alice",
                t(0),
            )
            .unwrap()
            .id
    };
    let source = make("Source", "1.0", Some("core"));
    let ui = make("UI work", "1.0", Some("ui"));
    let core = make("Core work", "1.0", Some("core"));
    let loose = make("No component", "1.0", None);
    let _stale = make("Old milestone", "old", Some("core"));
    let closed = make("Closed", "1.0", Some("core"));
    storage.set_status(closed, &Status::Closed, "alice").unwrap();

    let options = SplitReconciler::new(&mut storage)
        .split_options(source)
        .unwrap();

    assert_eq!(options.milestones.len(), 1);
    let group = &options.milestones[0];
    assert_eq!(group.milestone, "1.0");
    let components: Vec<_> = group
        .components
        .iter()
        .map(|c| (c.component.as_deref(), c.tickets.iter().map(|t| t.id).collect::<Vec<_>>()))
        .collect();
    assert_eq!(
        components,
        vec![(None, vec![loose]), (Some("core"), vec![core]), (Some("ui"), vec![ui])]
    );
}

#[test]
fn list_by_source_orders_by_target() {
    let mut storage = test_db();
    let source = ticket(&mut storage, "Source").id;
    let b = ticket(&mut storage, "B").id;
    let a = ticket(&mut storage, "A").id;

    SplitReconciler::new(&mut storage)
        .reconcile(source, [], [a, b], t(1), "alice")
        .unwrap();

    let targets: Vec<_> = storage
        .list_by_source(source)
        .unwrap()
        .into_iter()
        .map(|rel| rel.target)
        .collect();
    assert_eq!(targets, vec![b, a]);
    assert_eq!(storage.list_by_target(a).unwrap()[0].source, source);
}

#[test]
fn reopened_database_keeps_schema_and_rows() {
    let (mut storage, dir) = test_db_with_dir();
    let id = ticket(&mut storage, "Persisted").id;
    drop(storage);

    let path = dir.path().join(".splitticket").join("tickets.db");
    let reopened = SqliteStorage::open(&path).unwrap();
    assert_eq!(reopened.get_ticket(id).unwrap().unwrap().summary, "Persisted");
    drop(reopened);

    let conn = rusqlite::Connection::open(&path).unwrap();
    assert_eq!(stored_schema_version(&conn).unwrap(), CURRENT_SCHEMA_VERSION);
}

#[test]
fn newer_schema_is_refused() {
    let (storage, dir) = test_db_with_dir();
    drop(storage);

    let path = dir.path().join(".splitticket").join("tickets.db");
    let conn = rusqlite::Connection::open(&path).unwrap();
    conn.execute(
        "UPDATE metadata SET value = ?1 WHERE key = ?2",
        [(CURRENT_SCHEMA_VERSION + 1).to_string().as_str(), SCHEMA_VERSION_KEY],
    )
    .unwrap();
    drop(conn);

    let err = SqliteStorage::open(&path).unwrap_err();
    assert!(matches!(err, SplitError::SchemaMismatch { .. }));
}

#[test]
fn unreadable_path_is_store_unavailable() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("missing").join("tickets.db");
    let err = SqliteStorage::open(&path).unwrap_err();
    assert!(matches!(err, SplitError::StoreUnavailable { .. }));
}
