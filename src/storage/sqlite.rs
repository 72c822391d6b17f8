//! `SQLite` storage implementation.

use crate::error::{Result, SplitError};
use crate::model::{
    Component, Event, EventType, Milestone, NewTicket, SplitRelationship, Status, Ticket, TicketId,
};
use crate::storage::events::{
    get_events, insert_split_added_event, insert_split_removed_event,
    insert_status_changed_event,
};
use crate::storage::schema::apply_schema;
use crate::storage::{SplitStore, SplitTransaction, TicketStore};
use crate::validation::TicketValidator;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use rusqlite::{Connection, OptionalExtension, Transaction, TransactionBehavior, params};
use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, trace};

const TICKET_COLUMNS: &str = "id, summary, description, reporter, milestone, component, status, keywords, created_at, updated_at";

/// SQLite-based storage backend.
#[derive(Debug)]
pub struct SqliteStorage {
    conn: Connection,
}

/// Context for a mutation operation, collecting the audit events it emits.
pub struct MutationContext {
    pub op_name: String,
    pub actor: String,
    pub events: Vec<Event>,
}

impl MutationContext {
    #[must_use]
    pub fn new(op_name: &str, actor: &str) -> Self {
        Self {
            op_name: op_name.to_string(),
            actor: actor.to_string(),
            events: Vec::new(),
        }
    }

    pub fn record_event(&mut self, event_type: EventType, ticket_id: TicketId, details: Option<String>) {
        self.events.push(Event {
            id: 0, // Placeholder, DB assigns auto-inc ID
            ticket_id,
            event_type,
            actor: self.actor.clone(),
            old_value: None,
            new_value: None,
            comment: details,
            created_at: Utc::now(),
        });
    }

    /// Record a field change event with old and new values.
    pub fn record_field_change(
        &mut self,
        event_type: EventType,
        ticket_id: TicketId,
        old_value: Option<String>,
        new_value: Option<String>,
    ) {
        self.events.push(Event {
            id: 0,
            ticket_id,
            event_type,
            actor: self.actor.clone(),
            old_value,
            new_value,
            comment: None,
            created_at: Utc::now(),
        });
    }
}

impl SqliteStorage {
    /// Open a connection to the database at the given path.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` if the database cannot be opened, or an
    /// error if schema application fails.
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with_timeout(path, None)
    }

    /// Open a connection with an optional busy timeout (ms).
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` if the database cannot be opened, or an
    /// error if schema application fails.
    pub fn open_with_timeout(path: &Path, lock_timeout_ms: Option<u64>) -> Result<Self> {
        let unavailable = |reason: String| SplitError::StoreUnavailable {
            path: path.to_path_buf(),
            reason,
        };

        let conn = Connection::open(path).map_err(|e| unavailable(e.to_string()))?;
        if let Some(timeout) = lock_timeout_ms {
            conn.busy_timeout(Duration::from_millis(timeout))
                .map_err(|e| unavailable(e.to_string()))?;
        }
        apply_schema(&conn).map_err(|err| match err {
            SplitError::Database(ref e) if is_unavailable(e) => unavailable(e.to_string()),
            other => other,
        })?;

        debug!(path = %path.display(), "Opened ticket store");
        Ok(Self { conn })
    }

    /// Open an in-memory database for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        apply_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Execute a mutation inside an `IMMEDIATE` transaction.
    ///
    /// Events recorded on the context are written before commit.
    ///
    /// # Errors
    ///
    /// Returns an error if any step fails. The transaction is rolled back
    /// on error.
    pub fn mutate<F, R>(&mut self, op: &str, actor: &str, f: F) -> Result<R>
    where
        F: FnOnce(&Transaction, &mut MutationContext) -> Result<R>,
    {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let mut ctx = MutationContext::new(op, actor);

        let result = f(&tx, &mut ctx)?;

        for event in &ctx.events {
            tx.execute(
                "INSERT INTO events (ticket_id, event_type, actor, old_value, new_value, comment, created_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
                params![
                    event.ticket_id.get(),
                    event.event_type.as_str(),
                    event.actor,
                    event.old_value,
                    event.new_value,
                    event.comment,
                    event.created_at.to_rfc3339()
                ],
            )?;
        }

        tx.commit()?;
        trace!(op, events = ctx.events.len(), "Mutation committed");

        Ok(result)
    }

    /// List tickets matching the filters, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn list_tickets(&self, filters: &TicketFilters) -> Result<Vec<Ticket>> {
        let mut sql = format!("SELECT {TICKET_COLUMNS} FROM tickets WHERE 1=1");
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(ref status) = filters.status {
            sql.push_str(" AND status = ?");
            params.push(Box::new(status.as_str().to_string()));
        }

        if let Some(ref milestone) = filters.milestone {
            sql.push_str(" AND milestone = ?");
            params.push(Box::new(milestone.clone()));
        }

        if let Some(ref component) = filters.component {
            sql.push_str(" AND component = ?");
            params.push(Box::new(component.clone()));
        }

        sql.push_str(" ORDER BY id");

        if let Some(limit) = filters.limit {
            if limit > 0 {
                let _ = write!(sql, " LIMIT {limit}");
            }
        }

        let params_refs: Vec<&dyn rusqlite::ToSql> =
            params.iter().map(std::convert::AsRef::as_ref).collect();
        let mut stmt = self.conn.prepare(&sql)?;
        let tickets = stmt
            .query_map(params_refs.as_slice(), ticket_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(tickets)
    }

    /// Tickets `ticket` may be split to: assigned to an active milestone,
    /// not closed, not `ticket` itself. Ordered by component, then id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn list_split_candidates(&self, ticket: TicketId) -> Result<Vec<Ticket>> {
        let sql = format!(
            "SELECT {} FROM tickets t
             JOIN milestones m ON m.name = t.milestone
             WHERE m.completed IS NULL AND t.status <> 'closed' AND t.id <> ?
             ORDER BY t.component, t.id",
            TICKET_COLUMNS
                .split(", ")
                .map(|c| format!("t.{c}"))
                .collect::<Vec<_>>()
                .join(", ")
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let tickets = stmt
            .query_map([ticket.get()], ticket_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(tickets)
    }

    /// Add a milestone.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the name is empty or already taken.
    pub fn add_milestone(&mut self, name: &str, due: Option<DateTime<Utc>>) -> Result<Milestone> {
        let name = name.trim();
        if name.is_empty() {
            return Err(SplitError::validation("milestone", "name cannot be empty"));
        }
        if self.get_milestone(name)?.is_some() {
            return Err(SplitError::validation(
                "milestone",
                format!("'{name}' already exists"),
            ));
        }
        self.conn.execute(
            "INSERT INTO milestones (name, due, completed) VALUES (?, ?, NULL)",
            params![name, due.map(|dt| dt.to_rfc3339())],
        )?;
        debug!(milestone = name, "Added milestone");
        Ok(Milestone {
            name: name.to_string(),
            due,
            completed: None,
        })
    }

    /// Look up a milestone by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn get_milestone(&self, name: &str) -> Result<Option<Milestone>> {
        let milestone = self
            .conn
            .query_row(
                "SELECT name, due, completed FROM milestones WHERE name = ?",
                [name],
                milestone_from_row,
            )
            .optional()?;
        Ok(milestone)
    }

    /// List milestones: active ones first, ordered by due date (undated
    /// last) then name. Completed milestones are included only on request.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn list_milestones(&self, include_completed: bool) -> Result<Vec<Milestone>> {
        let sql = if include_completed {
            "SELECT name, due, completed FROM milestones
             ORDER BY completed IS NOT NULL, due IS NULL, due, name"
        } else {
            "SELECT name, due, completed FROM milestones
             WHERE completed IS NULL
             ORDER BY due IS NULL, due, name"
        };
        let mut stmt = self.conn.prepare(sql)?;
        let milestones = stmt
            .query_map([], milestone_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(milestones)
    }

    /// Mark a milestone completed at `at`.
    ///
    /// # Errors
    ///
    /// Returns `MilestoneNotFound` if no milestone has this name.
    pub fn complete_milestone(&mut self, name: &str, at: DateTime<Utc>) -> Result<Milestone> {
        let updated = self.conn.execute(
            "UPDATE milestones SET completed = ? WHERE name = ?",
            params![at.to_rfc3339(), name],
        )?;
        if updated == 0 {
            return Err(SplitError::MilestoneNotFound {
                name: name.to_string(),
            });
        }
        self.get_milestone(name)?
            .ok_or_else(|| SplitError::MilestoneNotFound {
                name: name.to_string(),
            })
    }

    /// Add a component.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the name is empty or already taken.
    pub fn add_component(&mut self, name: &str) -> Result<Component> {
        let name = name.trim();
        if name.is_empty() {
            return Err(SplitError::validation("component", "name cannot be empty"));
        }
        let inserted = self
            .conn
            .execute("INSERT OR IGNORE INTO components (name) VALUES (?)", [name])?;
        if inserted == 0 {
            return Err(SplitError::validation(
                "component",
                format!("'{name}' already exists"),
            ));
        }
        debug!(component = name, "Added component");
        Ok(Component {
            name: name.to_string(),
        })
    }

    /// List components alphabetically.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn list_components(&self) -> Result<Vec<Component>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM components ORDER BY name")?;
        let components = stmt
            .query_map([], |row| Ok(Component { name: row.get(0)? }))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(components)
    }

    /// Audit events for a ticket, newest first. A `limit` of 0 means all.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn get_events(&self, ticket: TicketId, limit: usize) -> Result<Vec<Event>> {
        get_events(&self.conn, ticket, limit)
    }

    fn relationships(&self, sql: &str, id: TicketId) -> Result<Vec<SplitRelationship>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt
            .query_map([id.get()], relationship_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

impl TicketStore for SqliteStorage {
    fn get_ticket(&self, id: TicketId) -> Result<Option<Ticket>> {
        let sql = format!("SELECT {TICKET_COLUMNS} FROM tickets WHERE id = ?");
        let ticket = self
            .conn
            .query_row(&sql, [id.get()], ticket_from_row)
            .optional()?;
        Ok(ticket)
    }

    fn create_ticket(
        &mut self,
        ticket: &NewTicket,
        actor: &str,
        now: DateTime<Utc>,
    ) -> Result<Ticket> {
        TicketValidator::validate(ticket).map_err(SplitError::from_validation_errors)?;

        let id = self.mutate("create_ticket", actor, |tx, ctx| {
            let timestamp = now.to_rfc3339();
            tx.execute(
                "INSERT INTO tickets (
                    summary, description, reporter, milestone, component,
                    status, keywords, created_at, updated_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    ticket.summary.trim(),
                    ticket.description.as_deref().unwrap_or(""),
                    ticket.reporter.as_deref().unwrap_or(actor),
                    ticket.milestone.as_deref().unwrap_or(""),
                    ticket.component.as_deref().unwrap_or(""),
                    ticket.status.as_str(),
                    ticket.keywords.as_deref().unwrap_or(""),
                    timestamp,
                    timestamp,
                ],
            )?;
            let id = TicketId(tx.last_insert_rowid());

            ctx.record_event(
                EventType::Created,
                id,
                Some(format!("Created ticket: {}", ticket.summary.trim())),
            );

            Ok(id)
        })?;

        debug!(ticket = %id, actor, "Created ticket");
        self.get_ticket(id)?
            .ok_or(SplitError::TicketNotFound { id })
    }

    fn set_status(&mut self, id: TicketId, status: &Status, actor: &str) -> Result<bool> {
        self.mutate("set_status", actor, |tx, ctx| {
            let old: Option<String> = tx
                .query_row("SELECT status FROM tickets WHERE id = ?", [id.get()], |row| {
                    row.get(0)
                })
                .optional()?;
            let Some(old) = old else {
                return Err(SplitError::TicketNotFound { id });
            };
            if old == status.as_str() {
                return Ok(false);
            }

            tx.execute(
                "UPDATE tickets SET status = ?, updated_at = ? WHERE id = ?",
                params![status.as_str(), Utc::now().to_rfc3339(), id.get()],
            )?;
            ctx.record_field_change(
                EventType::StatusChanged,
                id,
                Some(old),
                Some(status.as_str().to_string()),
            );
            Ok(true)
        })
    }

    fn milestone_exists(&self, name: &str) -> Result<bool> {
        Ok(self.get_milestone(name)?.is_some())
    }

    fn component_exists(&self, name: &str) -> Result<bool> {
        let found: Option<i64> = self
            .conn
            .query_row("SELECT 1 FROM components WHERE name = ?", [name], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(found.is_some())
    }

    fn active_milestones(&self) -> Result<Vec<Milestone>> {
        self.list_milestones(false)
    }

    fn split_candidates(&self, ticket: TicketId) -> Result<Vec<Ticket>> {
        self.list_split_candidates(ticket)
    }
}

impl SplitStore for SqliteStorage {
    type Transaction<'a> = SqliteSplitTransaction<'a>;

    fn list_by_source(&self, source: TicketId) -> Result<Vec<SplitRelationship>> {
        self.relationships(
            "SELECT ticket, split_to, split_at FROM ticket_split WHERE ticket = ? ORDER BY split_to",
            source,
        )
    }

    fn list_by_target(&self, target: TicketId) -> Result<Vec<SplitRelationship>> {
        self.relationships(
            "SELECT ticket, split_to, split_at FROM ticket_split WHERE split_to = ?",
            target,
        )
    }

    fn begin(&mut self, actor: &str) -> Result<SqliteSplitTransaction<'_>> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        Ok(SqliteSplitTransaction {
            tx,
            actor: actor.to_string(),
        })
    }
}

/// Write transaction for split reconciliation. Relationship rows, status
/// changes and their audit events commit together.
pub struct SqliteSplitTransaction<'conn> {
    tx: Transaction<'conn>,
    actor: String,
}

impl SplitTransaction for SqliteSplitTransaction<'_> {
    fn ticket_status(&self, id: TicketId) -> Result<Option<Status>> {
        let status: Option<String> = self
            .tx
            .query_row("SELECT status FROM tickets WHERE id = ?", [id.get()], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(status.as_deref().map(parse_status))
    }

    fn stored_targets(&self, source: TicketId) -> Result<BTreeSet<TicketId>> {
        let mut stmt = self
            .tx
            .prepare("SELECT split_to FROM ticket_split WHERE ticket = ?")?;
        let targets = stmt
            .query_map([source.get()], |row| Ok(TicketId(row.get(0)?)))?
            .collect::<std::result::Result<BTreeSet<_>, _>>()?;
        Ok(targets)
    }

    fn relationship_exists(&self, source: TicketId, target: TicketId) -> Result<bool> {
        let found: Option<i64> = self
            .tx
            .query_row(
                "SELECT 1 FROM ticket_split WHERE ticket = ? AND split_to = ?",
                [source.get(), target.get()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn insert(&mut self, relationship: &SplitRelationship) -> Result<bool> {
        let inserted = self.tx.execute(
            "INSERT OR IGNORE INTO ticket_split (ticket, split_to, split_at) VALUES (?, ?, ?)",
            params![
                relationship.source.get(),
                relationship.target.get(),
                relationship.split_at.timestamp()
            ],
        )?;
        if inserted == 0 {
            return Ok(false);
        }
        insert_split_added_event(&self.tx, relationship.source, relationship.target, &self.actor)?;
        trace!(source = %relationship.source, target = %relationship.target, "Inserted split row");
        Ok(true)
    }

    fn delete(&mut self, source: TicketId, target: TicketId) -> Result<bool> {
        let deleted = self.tx.execute(
            "DELETE FROM ticket_split WHERE ticket = ? AND split_to = ?",
            [source.get(), target.get()],
        )?;
        if deleted == 0 {
            return Ok(false);
        }
        insert_split_removed_event(&self.tx, source, target, &self.actor)?;
        trace!(%source, %target, "Deleted split row");
        Ok(true)
    }

    fn set_status(&mut self, id: TicketId, old: &Status, new: &Status) -> Result<()> {
        let updated = self.tx.execute(
            "UPDATE tickets SET status = ?, updated_at = ? WHERE id = ?",
            params![new.as_str(), Utc::now().to_rfc3339(), id.get()],
        )?;
        if updated == 0 {
            return Err(SplitError::TicketNotFound { id });
        }
        insert_status_changed_event(&self.tx, id, &self.actor, old.as_str(), new.as_str())?;
        Ok(())
    }

    fn commit(self) -> Result<()> {
        self.tx.commit()?;
        Ok(())
    }
}

/// Filter options for listing tickets.
#[derive(Debug, Clone, Default)]
pub struct TicketFilters {
    pub status: Option<Status>,
    pub milestone: Option<String>,
    pub component: Option<String>,
    pub limit: Option<usize>,
}

fn is_unavailable(err: &rusqlite::Error) -> bool {
    matches!(
        err.sqlite_error_code(),
        Some(
            rusqlite::ErrorCode::CannotOpen
                | rusqlite::ErrorCode::NotADatabase
                | rusqlite::ErrorCode::PermissionDenied
                | rusqlite::ErrorCode::ReadOnly
                | rusqlite::ErrorCode::SystemIoFailure
        )
    )
}

/// Convert empty string to None.
/// The database stores empty strings for NOT NULL DEFAULT '' fields,
/// but the API contract expects None for unset values.
#[inline]
fn empty_to_none(s: Option<String>) -> Option<String> {
    s.filter(|v| !v.is_empty())
}

fn parse_status(raw: &str) -> Status {
    raw.parse()
        .unwrap_or_else(|_| Status::Custom(raw.to_string()))
}

fn ticket_from_row(row: &rusqlite::Row) -> rusqlite::Result<Ticket> {
    Ok(Ticket {
        id: TicketId(row.get(0)?),
        summary: row.get(1)?,
        description: empty_to_none(row.get::<_, Option<String>>(2)?),
        reporter: empty_to_none(row.get::<_, Option<String>>(3)?),
        milestone: empty_to_none(row.get::<_, Option<String>>(4)?),
        component: empty_to_none(row.get::<_, Option<String>>(5)?),
        status: parse_status(&row.get::<_, String>(6)?),
        keywords: empty_to_none(row.get::<_, Option<String>>(7)?),
        created_at: parse_datetime(&row.get::<_, String>(8)?),
        updated_at: parse_datetime(&row.get::<_, String>(9)?),
    })
}

fn milestone_from_row(row: &rusqlite::Row) -> rusqlite::Result<Milestone> {
    Ok(Milestone {
        name: row.get(0)?,
        due: row.get::<_, Option<String>>(1)?.as_deref().map(parse_datetime),
        completed: row.get::<_, Option<String>>(2)?.as_deref().map(parse_datetime),
    })
}

fn relationship_from_row(row: &rusqlite::Row) -> rusqlite::Result<SplitRelationship> {
    Ok(SplitRelationship {
        source: TicketId(row.get(0)?),
        target: TicketId(row.get(1)?),
        split_at: DateTime::from_timestamp(row.get(2)?, 0).unwrap_or_default(),
    })
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Utc.from_utc_datetime(&naive);
    }

    Utc::now()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn create(storage: &mut SqliteStorage, summary: &str) -> Ticket {
        storage
            .create_ticket(&NewTicket::with_summary(summary), "tester", ts(1_700_000_000))
            .unwrap()
    }

    #[test]
    fn test_open_memory() {
        let storage = SqliteStorage::open_memory();
        assert!(storage.is_ok());
        assert!(storage.unwrap().list_tickets(&TicketFilters::default()).unwrap().is_empty());
    }

    #[test]
    fn test_create_and_get_ticket() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let ticket = storage
            .create_ticket(
                &NewTicket {
                    summary: "  Write docs ".to_string(),
                    description: Some(String::new()),
                    ..NewTicket::default()
                },
                "alice",
                ts(1_700_000_000),
            )
            .unwrap();

        assert_eq!(ticket.id, TicketId(1));
        assert_eq!(ticket.summary, "Write docs");
        assert_eq!(ticket.reporter.as_deref(), Some("alice"));
        assert_eq!(ticket.description, None);
        assert_eq!(ticket.status, Status::New);
        assert_eq!(ticket.created_at, ts(1_700_000_000));

        let events = storage.get_events(ticket.id, 0).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, EventType::Created);
    }

    #[test]
    fn test_create_ticket_rejects_empty_summary() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let err = storage
            .create_ticket(&NewTicket::with_summary("   "), "alice", Utc::now())
            .unwrap_err();
        assert!(matches!(err, SplitError::Validation { .. }));
        assert!(storage.list_tickets(&TicketFilters::default()).unwrap().is_empty());
    }

    #[test]
    fn test_set_status_records_event() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let ticket = create(&mut storage, "A");

        assert!(storage.set_status(ticket.id, &Status::Assigned, "bob").unwrap());
        assert!(!storage.set_status(ticket.id, &Status::Assigned, "bob").unwrap());

        let events = storage.get_events(ticket.id, 0).unwrap();
        assert_eq!(events[0].event_type, EventType::StatusChanged);
        assert_eq!(events[0].old_value.as_deref(), Some("new"));
        assert_eq!(events[0].new_value.as_deref(), Some("assigned"));

        let err = storage.set_status(TicketId(99), &Status::New, "bob").unwrap_err();
        assert!(matches!(err, SplitError::TicketNotFound { .. }));
    }

    #[test]
    fn test_split_transaction_commit_and_rollback() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let a = create(&mut storage, "A").id;
        let b = create(&mut storage, "B").id;
        let rel = SplitRelationship {
            source: a,
            target: b,
            split_at: ts(1_700_000_100),
        };

        {
            let mut tx = storage.begin("carol").unwrap();
            assert!(tx.insert(&rel).unwrap());
            // dropped without commit
        }
        assert!(storage.list_by_source(a).unwrap().is_empty());

        let mut tx = storage.begin("carol").unwrap();
        assert!(tx.insert(&rel).unwrap());
        assert!(!tx.insert(&rel).unwrap());
        assert!(tx.relationship_exists(a, b).unwrap());
        assert_eq!(tx.stored_targets(a).unwrap(), BTreeSet::from([b]));
        tx.set_status(a, &Status::New, &Status::Split).unwrap();
        tx.commit().unwrap();

        assert_eq!(storage.list_by_source(a).unwrap(), vec![rel.clone()]);
        assert_eq!(storage.list_by_target(b).unwrap(), vec![rel]);
        assert_eq!(storage.get_ticket(a).unwrap().unwrap().status, Status::Split);

        let mut tx = storage.begin("carol").unwrap();
        assert!(tx.delete(a, b).unwrap());
        assert!(!tx.delete(a, b).unwrap());
        tx.commit().unwrap();
        assert!(storage.list_by_source(a).unwrap().is_empty());
    }

    #[test]
    fn test_unknown_status_reads_back_as_custom() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let ticket = create(&mut storage, "A");
        storage.conn
            .execute("UPDATE tickets SET status = 'In Review' WHERE id = ?", [ticket.id.get()])
            .unwrap();
        let status = storage.get_ticket(ticket.id).unwrap().unwrap().status;
        assert_eq!(status, Status::Custom("In Review".to_string()));
    }

    #[test]
    fn test_milestones_ordering_and_completion() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        storage.add_milestone("later", Some(ts(2_000_000_000))).unwrap();
        storage.add_milestone("undated", None).unwrap();
        storage.add_milestone("soon", Some(ts(1_800_000_000))).unwrap();

        let names: Vec<String> = storage
            .list_milestones(false)
            .unwrap()
            .into_iter()
            .map(|m| m.name)
            .collect();
        assert_eq!(names, vec!["soon", "later", "undated"]);

        storage.complete_milestone("soon", ts(1_750_000_000)).unwrap();
        assert_eq!(storage.list_milestones(false).unwrap().len(), 2);
        let all = storage.list_milestones(true).unwrap();
        assert_eq!(all.last().unwrap().name, "soon");

        assert!(matches!(
            storage.complete_milestone("missing", Utc::now()),
            Err(SplitError::MilestoneNotFound { .. })
        ));
        assert!(storage.add_milestone("later", None).is_err());
    }

    #[test]
    fn test_components() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        storage.add_component("ui").unwrap();
        storage.add_component("backend").unwrap();
        assert!(storage.add_component("ui").is_err());
        assert!(storage.component_exists("ui").unwrap());
        assert!(!storage.component_exists("docs").unwrap());
        let names: Vec<String> = storage
            .list_components()
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["backend", "ui"]);
    }

    #[test]
    fn test_list_tickets_filters() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        storage.add_milestone("1.0", None).unwrap();
        storage
            .create_ticket(
                &NewTicket {
                    summary: "in milestone".to_string(),
                    milestone: Some("1.0".to_string()),
                    ..NewTicket::default()
                },
                "t",
                Utc::now(),
            )
            .unwrap();
        create(&mut storage, "loose");

        let filtered = storage
            .list_tickets(&TicketFilters {
                milestone: Some("1.0".to_string()),
                ..TicketFilters::default()
            })
            .unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].summary, "in milestone");

        let limited = storage
            .list_tickets(&TicketFilters {
                limit: Some(1),
                ..TicketFilters::default()
            })
            .unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[test]
    fn test_open_records_schema_version() {
        let storage = SqliteStorage::open_memory().unwrap();
        assert_eq!(
            crate::storage::schema::stored_schema_version(&storage.conn).unwrap(),
            crate::storage::schema::CURRENT_SCHEMA_VERSION
        );
    }

    #[test]
    fn test_open_file_and_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tickets.db");
        {
            let mut storage = SqliteStorage::open_with_timeout(&path, Some(1000)).unwrap();
            create(&mut storage, "persisted");
        }
        let storage = SqliteStorage::open(&path).unwrap();
        assert_eq!(storage.get_ticket(TicketId(1)).unwrap().unwrap().summary, "persisted");
    }

    #[test]
    fn test_open_missing_directory_is_unavailable() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("no-such-dir").join("tickets.db");
        let err = SqliteStorage::open(&path).unwrap_err();
        assert!(matches!(err, SplitError::StoreUnavailable { .. }));
    }

    #[test]
    fn test_open_garbage_file_is_unavailable() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("garbage.db");
        std::fs::write(&path, vec![0x42_u8; 4096]).unwrap();
        let err = SqliteStorage::open(&path).unwrap_err();
        assert!(matches!(err, SplitError::StoreUnavailable { .. }), "{err:?}");
    }

    #[test]
    fn test_parse_datetime_fallbacks() {
        assert_eq!(parse_datetime("2025-01-02T03:04:05Z"), Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap());
        assert_eq!(parse_datetime("2025-01-02 03:04:05"), Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap());
    }
}
