//! Create command implementation.

use crate::cli::CreateArgs;
use crate::config;
use crate::error::{Result, SplitError};
use crate::model::{NewTicket, Status};
use crate::storage::TicketStore;
use chrono::Utc;

/// Execute the create command.
///
/// # Errors
///
/// Returns an error if the workspace cannot be opened, the milestone or
/// component does not exist, or the ticket fails validation.
pub fn execute(args: &CreateArgs, json: bool, cli: &config::CliOverrides) -> Result<()> {
    let (mut storage, layer, _paths) = config::open_storage(cli)?;
    let actor = config::resolve_actor(&layer);

    if let Some(ref milestone) = args.milestone {
        if !storage.milestone_exists(milestone)? {
            return Err(SplitError::MilestoneNotFound {
                name: milestone.clone(),
            });
        }
    }
    if let Some(ref component) = args.component {
        if !storage.component_exists(component)? {
            return Err(SplitError::ComponentNotFound {
                name: component.clone(),
            });
        }
    }

    let ticket = NewTicket {
        summary: args.summary.clone(),
        description: args.description.clone(),
        reporter: Some(actor.clone()),
        milestone: args.milestone.clone(),
        component: args.component.clone(),
        status: Status::New,
        keywords: args.keywords.clone(),
    };
    let created = storage.create_ticket(&ticket, &actor, Utc::now())?;

    if json {
        return super::print_json(&created);
    }

    println!("Created {}: {}", created.id, created.summary);
    Ok(())
}
