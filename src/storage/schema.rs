//! Database schema definitions and migration logic.
//!
//! The schema version lives in the `metadata` table under
//! [`SCHEMA_VERSION_KEY`]. Opening a database applies every migration newer
//! than the stored version, each in its own transaction.

use crate::error::{Result, SplitError};
use rusqlite::{Connection, OptionalExtension};
use tracing::debug;

pub const CURRENT_SCHEMA_VERSION: i32 = 1;

/// Metadata key holding the applied schema version.
pub const SCHEMA_VERSION_KEY: &str = "schema_version";

const METADATA_SQL: &str = r"
    CREATE TABLE IF NOT EXISTS metadata (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );
";

/// Version 1: tickets, split relationships, grouping tables and audit events.
const SCHEMA_V1_SQL: &str = r"
    -- Tickets
    -- TEXT fields use NOT NULL DEFAULT '' and read back as None when empty.
    CREATE TABLE IF NOT EXISTS tickets (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        summary TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        reporter TEXT NOT NULL DEFAULT '',
        milestone TEXT NOT NULL DEFAULT '',
        component TEXT NOT NULL DEFAULT '',
        status TEXT NOT NULL,
        keywords TEXT NOT NULL DEFAULT '',
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        CHECK (length(summary) >= 1 AND length(summary) <= 255)
    );
    CREATE INDEX IF NOT EXISTS idx_tickets_status ON tickets(status);
    CREATE INDEX IF NOT EXISTS idx_tickets_milestone ON tickets(milestone);
    CREATE INDEX IF NOT EXISTS idx_tickets_component ON tickets(component);

    -- Split relationships: ticket was split into split_to at split_at (epoch seconds)
    CREATE TABLE IF NOT EXISTS ticket_split (
        ticket INTEGER NOT NULL,
        split_to INTEGER NOT NULL,
        split_at INTEGER NOT NULL,
        PRIMARY KEY (ticket, split_to),
        CHECK (ticket <> split_to),
        FOREIGN KEY (ticket) REFERENCES tickets(id) ON DELETE CASCADE,
        FOREIGN KEY (split_to) REFERENCES tickets(id) ON DELETE CASCADE
    );
    CREATE INDEX IF NOT EXISTS idx_ticket_split_split_to ON ticket_split(split_to);

    -- Milestones
    CREATE TABLE IF NOT EXISTS milestones (
        name TEXT PRIMARY KEY,
        due TEXT,
        completed TEXT
    );

    -- Components
    CREATE TABLE IF NOT EXISTS components (
        name TEXT PRIMARY KEY
    );

    -- Events (Audit)
    CREATE TABLE IF NOT EXISTS events (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        ticket_id INTEGER NOT NULL,
        event_type TEXT NOT NULL,
        actor TEXT NOT NULL,
        old_value TEXT,
        new_value TEXT,
        comment TEXT,
        created_at TEXT NOT NULL,
        FOREIGN KEY (ticket_id) REFERENCES tickets(id) ON DELETE CASCADE
    );
    CREATE INDEX IF NOT EXISTS idx_events_ticket_id ON events(ticket_id);
    CREATE INDEX IF NOT EXISTS idx_events_event_type ON events(event_type);
    CREATE INDEX IF NOT EXISTS idx_events_created_at ON events(created_at);
";

/// Ordered migrations: `(version, ddl)`.
const MIGRATIONS: &[(i32, &str)] = &[(1, SCHEMA_V1_SQL)];

/// Apply the schema to the database.
///
/// Runs every pending migration, then sets the journal mode and enables
/// foreign keys.
///
/// # Errors
///
/// Returns `SchemaMismatch` if the database was written by a newer schema,
/// or a database error if any statement fails.
pub fn apply_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(METADATA_SQL)?;

    let stored = stored_schema_version(conn)?;
    if stored > CURRENT_SCHEMA_VERSION {
        return Err(SplitError::SchemaMismatch {
            expected: CURRENT_SCHEMA_VERSION,
            found: stored,
        });
    }

    for (version, ddl) in MIGRATIONS.iter().filter(|(version, _)| *version > stored) {
        let tx = conn.unchecked_transaction()?;
        tx.execute_batch(ddl)?;
        tx.execute(
            "INSERT OR REPLACE INTO metadata (key, value) VALUES (?, ?)",
            [SCHEMA_VERSION_KEY, &version.to_string()],
        )?;
        tx.commit()?;
        debug!(version, "Applied schema migration");
    }

    // Set journal mode to WAL for concurrency
    conn.pragma_update(None, "journal_mode", "WAL")?;

    // Enable foreign keys
    conn.pragma_update(None, "foreign_keys", "ON")?;

    Ok(())
}

/// Read the applied schema version. A missing or unreadable value counts
/// as version 0 (nothing applied).
///
/// # Errors
///
/// Returns an error if the metadata table cannot be queried.
pub fn stored_schema_version(conn: &Connection) -> Result<i32> {
    let value: Option<String> = conn
        .query_row(
            "SELECT value FROM metadata WHERE key = ?",
            [SCHEMA_VERSION_KEY],
            |row| row.get(0),
        )
        .optional()?;

    Ok(value
        .and_then(|value| value.trim().parse::<i32>().ok())
        .unwrap_or(0))
}
