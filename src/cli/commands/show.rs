//! Show command implementation.

use super::history::print_history;
use crate::config;
use crate::error::{Result, SplitError};
use crate::model::Ticket;
use crate::split::{SplitHistory, SplitReconciler};
use crate::storage::TicketStore;
use crate::util::format_split_time;
use serde::Serialize;

#[derive(Serialize)]
struct TicketDetails {
    #[serde(flatten)]
    ticket: Ticket,
    split: SplitHistory,
}

/// Execute the show command.
///
/// # Errors
///
/// Returns an error if an id is malformed or a ticket does not exist.
pub fn execute(ids: &[String], json: bool, cli: &config::CliOverrides) -> Result<()> {
    let (mut storage, _layer, _paths) = config::open_storage(cli)?;

    let mut details = Vec::with_capacity(ids.len());
    for input in ids {
        let id = super::parse_id(input)?;
        let ticket = storage
            .get_ticket(id)?
            .ok_or(SplitError::TicketNotFound { id })?;
        let split = SplitReconciler::new(&mut storage).split_history(id)?;
        details.push(TicketDetails { ticket, split });
    }

    if json {
        return super::print_json(&details);
    }

    for (i, entry) in details.iter().enumerate() {
        if i > 0 {
            println!();
        }
        print_ticket(&entry.ticket);
        print_history(&entry.split);
    }
    Ok(())
}

fn print_ticket(ticket: &Ticket) {
    println!("{} [{}] {}", ticket.id, ticket.status, ticket.summary);
    if let Some(ref milestone) = ticket.milestone {
        println!("Milestone: {milestone}");
    }
    if let Some(ref component) = ticket.component {
        println!("Component: {component}");
    }
    if let Some(ref reporter) = ticket.reporter {
        println!("Reporter: {reporter}");
    }
    if let Some(ref keywords) = ticket.keywords {
        println!("Keywords: {keywords}");
    }
    println!("Created: {}", format_split_time(ticket.created_at));
    println!("Updated: {}", format_split_time(ticket.updated_at));
    if let Some(ref description) = ticket.description {
        println!();
        println!("{description}");
    }
}
