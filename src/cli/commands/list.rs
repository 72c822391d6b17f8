//! List command implementation.

use crate::cli::ListArgs;
use crate::config;
use crate::error::Result;
use crate::model::Status;
use crate::storage::TicketFilters;

/// Execute the list command.
///
/// # Errors
///
/// Returns an error if the status filter is invalid or the query fails.
pub fn execute(args: &ListArgs, json: bool, cli: &config::CliOverrides) -> Result<()> {
    let (storage, _layer, _paths) = config::open_storage(cli)?;

    let filters = TicketFilters {
        status: args
            .status
            .as_deref()
            .map(str::parse::<Status>)
            .transpose()?,
        milestone: args.milestone.clone(),
        component: args.component.clone(),
        limit: args.limit,
    };
    let tickets = storage.list_tickets(&filters)?;

    if json {
        return super::print_json(&tickets);
    }

    if tickets.is_empty() {
        println!("No tickets found.");
        return Ok(());
    }
    for ticket in &tickets {
        let milestone = ticket.milestone.as_deref().unwrap_or("-");
        let component = ticket.component.as_deref().unwrap_or("-");
        println!(
            "{:<6} {:<9} {:<12} {:<12} {}",
            ticket.id.to_string(),
            ticket.status.to_string(),
            milestone,
            component,
            ticket.summary
        );
    }
    Ok(())
}
