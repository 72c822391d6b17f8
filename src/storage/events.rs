//! Event storage operations.
//!
//! Every ticket mutation writes an audit row in the same transaction as the
//! change itself. Events are read back newest first.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, params};

use crate::error::Result;
use crate::model::{Event, EventType, TicketId};

/// Insert an event.
///
/// Call this with the transaction that performs the mutation being recorded
/// (a `Transaction` derefs to `Connection`), so the event commits or rolls
/// back with it.
///
/// # Errors
///
/// Returns an error if the database insert fails.
pub fn insert_event(
    conn: &Connection,
    ticket_id: TicketId,
    event_type: &EventType,
    actor: &str,
    old_value: Option<&str>,
    new_value: Option<&str>,
    comment: Option<&str>,
) -> Result<i64> {
    let now = Utc::now();
    conn.execute(
        r"
        INSERT INTO events (ticket_id, event_type, actor, old_value, new_value, comment, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        ",
        params![
            ticket_id.get(),
            event_type.as_str(),
            actor,
            old_value,
            new_value,
            comment,
            now.to_rfc3339(),
        ],
    )?;

    Ok(conn.last_insert_rowid())
}

/// Insert a "created" event for a new ticket.
///
/// # Errors
///
/// Returns an error if the database insert fails.
pub fn insert_created_event(conn: &Connection, ticket_id: TicketId, actor: &str) -> Result<i64> {
    insert_event(conn, ticket_id, &EventType::Created, actor, None, None, None)
}

/// Insert a `status_changed` event.
///
/// # Errors
///
/// Returns an error if the database insert fails.
pub fn insert_status_changed_event(
    conn: &Connection,
    ticket_id: TicketId,
    actor: &str,
    old_status: &str,
    new_status: &str,
) -> Result<i64> {
    insert_event(
        conn,
        ticket_id,
        &EventType::StatusChanged,
        actor,
        Some(old_status),
        Some(new_status),
        None,
    )
}

/// Insert a `split_added` event on the source ticket.
///
/// # Errors
///
/// Returns an error if the database insert fails.
pub fn insert_split_added_event(
    conn: &Connection,
    source: TicketId,
    target: TicketId,
    actor: &str,
) -> Result<i64> {
    let target = target.get().to_string();
    insert_event(
        conn,
        source,
        &EventType::SplitAdded,
        actor,
        None,
        Some(&target),
        None,
    )
}

/// Insert a `split_removed` event on the source ticket.
///
/// # Errors
///
/// Returns an error if the database insert fails.
pub fn insert_split_removed_event(
    conn: &Connection,
    source: TicketId,
    target: TicketId,
    actor: &str,
) -> Result<i64> {
    let target = target.get().to_string();
    insert_event(
        conn,
        source,
        &EventType::SplitRemoved,
        actor,
        Some(&target),
        None,
        None,
    )
}

/// Get events for a ticket, newest first. A `limit` of 0 means no limit.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn get_events(conn: &Connection, ticket_id: TicketId, limit: usize) -> Result<Vec<Event>> {
    let query = if limit > 0 {
        r"
            SELECT id, ticket_id, event_type, actor, old_value, new_value, comment, created_at
            FROM events
            WHERE ticket_id = ?1
            ORDER BY created_at DESC, id DESC
            LIMIT ?2
            "
    } else {
        r"
            SELECT id, ticket_id, event_type, actor, old_value, new_value, comment, created_at
            FROM events
            WHERE ticket_id = ?1
            ORDER BY created_at DESC, id DESC
            "
    };

    let mut stmt = conn.prepare(query)?;
    let events: Vec<Event> = if limit > 0 {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        stmt.query_map(params![ticket_id.get(), limit], event_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?
    } else {
        stmt.query_map(params![ticket_id.get()], event_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?
    };

    Ok(events)
}

fn event_from_row(row: &rusqlite::Row) -> rusqlite::Result<Event> {
    let event_type: String = row.get(2)?;
    let created_at: String = row.get(7)?;

    Ok(Event {
        id: row.get(0)?,
        ticket_id: TicketId(row.get(1)?),
        event_type: EventType::parse(&event_type),
        actor: row.get(3)?,
        old_value: row.get(4)?,
        new_value: row.get(5)?,
        comment: row.get(6)?,
        created_at: DateTime::parse_from_rfc3339(&created_at)
            .map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc)),
    })
}
