//! Milestone command implementation.

use crate::cli::MilestoneCommands;
use crate::config;
use crate::error::Result;
use crate::model::Milestone;
use crate::util::{format_split_time, parse_due_date};
use chrono::Utc;
use std::fmt::Write as _;

/// Execute a milestone subcommand.
///
/// # Errors
///
/// Returns an error if the due date is malformed, the milestone already
/// exists (add) or does not exist (complete).
pub fn execute(command: &MilestoneCommands, json: bool, cli: &config::CliOverrides) -> Result<()> {
    let (mut storage, _layer, _paths) = config::open_storage(cli)?;

    match command {
        MilestoneCommands::Add { name, due } => {
            let due = due
                .as_deref()
                .map(|value| parse_due_date(value, "due"))
                .transpose()?;
            let milestone = storage.add_milestone(name, due)?;
            if json {
                return super::print_json(&milestone);
            }
            println!("Added milestone {}", milestone.name);
        }
        MilestoneCommands::List { all } => {
            let milestones = storage.list_milestones(*all)?;
            if json {
                return super::print_json(&milestones);
            }
            if milestones.is_empty() {
                println!("No milestones.");
            }
            for milestone in &milestones {
                println!("{}", describe(milestone));
            }
        }
        MilestoneCommands::Complete { name } => {
            let milestone = storage.complete_milestone(name, Utc::now())?;
            if json {
                return super::print_json(&milestone);
            }
            println!("Completed milestone {}", milestone.name);
        }
    }
    Ok(())
}

fn describe(milestone: &Milestone) -> String {
    let mut line = milestone.name.clone();
    if let Some(due) = milestone.due {
        let _ = write!(line, "  due {}", format_split_time(due));
    }
    if let Some(completed) = milestone.completed {
        let _ = write!(line, "  completed {}", format_split_time(completed));
    }
    line
}
