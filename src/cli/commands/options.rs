//! Options command implementation.

use crate::config;
use crate::error::Result;
use crate::split::{SplitOptions, SplitReconciler};

/// Execute the options command.
///
/// # Errors
///
/// Returns an error if the id is malformed or the ticket does not exist.
pub fn execute(id: &str, json: bool, cli: &config::CliOverrides) -> Result<()> {
    let id = super::parse_id(id)?;
    let (mut storage, _layer, _paths) = config::open_storage(cli)?;
    let options = SplitReconciler::new(&mut storage).split_options(id)?;

    if json {
        return super::print_json(&options);
    }

    print_options(&options);
    Ok(())
}

fn print_options(options: &SplitOptions) {
    if options.milestones.is_empty() {
        println!("No tickets {} can be split to.", options.ticket);
        return;
    }
    for group in &options.milestones {
        println!("{}", group.milestone);
        for component in &group.components {
            println!("  {}", component.component.as_deref().unwrap_or("(none)"));
            for ticket in &component.tickets {
                println!("    {} [{}] {}", ticket.id, ticket.status, ticket.summary);
            }
        }
    }
}
