#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use splitticket::model::{NewTicket, Ticket, TicketId};
use splitticket::storage::{SqliteStorage, TicketStore};
use std::sync::Once;
use std::time::Instant;
use tempfile::TempDir;
use tracing::info;

pub mod cli;

static INIT: Once = Once::new();

pub fn init_test_logging() {
    INIT.call_once(|| {
        splitticket::logging::init_test_logging();
    });
}

pub struct TestLogGuard {
    name: String,
    start: Instant,
}

impl TestLogGuard {
    fn new(name: &str) -> Self {
        init_test_logging();
        info!("{name}: starting");
        Self {
            name: name.to_string(),
            start: Instant::now(),
        }
    }
}

impl Drop for TestLogGuard {
    fn drop(&mut self) {
        info!(
            "{}: assertions passed (elapsed {:?})",
            self.name,
            self.start.elapsed()
        );
    }
}

pub fn test_log(name: &str) -> TestLogGuard {
    TestLogGuard::new(name)
}

pub fn test_db() -> SqliteStorage {
    init_test_logging();
    SqliteStorage::open_memory().expect("Failed to create test database")
}

pub fn test_db_with_dir() -> (SqliteStorage, TempDir) {
    init_test_logging();
    let dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = dir.path().join(".splitticket").join("tickets.db");
    std::fs::create_dir_all(db_path.parent().unwrap()).unwrap();
    let storage = SqliteStorage::open(&db_path).expect("Failed to create test database");
    (storage, dir)
}

pub fn t(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
}

pub fn ticket(storage: &mut SqliteStorage, summary: &str) -> Ticket {
    storage
        .create_ticket(&NewTicket::with_summary(summary), "tester", t(0))
        .expect("create ticket")
}

/// Create `n` tickets and return their ids in creation order.
pub fn tickets(storage: &mut SqliteStorage, n: usize) -> Vec<TicketId> {
    (1..=n)
        .map(|i| ticket(storage, &format!("Ticket {i}")).id)
        .collect()
}
