//! Command implementations for the `st` binary.

pub mod component;
pub mod create;
pub mod history;
pub mod init;
pub mod list;
pub mod milestone;
pub mod options;
pub mod show;
pub mod split;
pub mod version;

use crate::error::Result;
use crate::model::TicketId;
use serde::Serialize;

/// Print a value as pretty JSON on stdout.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let payload = serde_json::to_string_pretty(value)?;
    println!("{payload}");
    Ok(())
}

/// Parse a ticket id argument (`12` or `#12`).
pub(crate) fn parse_id(input: &str) -> Result<TicketId> {
    input.parse()
}

/// Render ids as `#1, #3`.
pub(crate) fn join_ids(ids: &[TicketId]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
