//! History command implementation.

use crate::config;
use crate::error::Result;
use crate::split::{SplitHistory, SplitLink, SplitReconciler};
use crate::util::format_split_time;

/// Execute the history command.
///
/// # Errors
///
/// Returns an error if the id is malformed or the ticket does not exist.
pub fn execute(id: &str, json: bool, cli: &config::CliOverrides) -> Result<()> {
    let id = super::parse_id(id)?;
    let (mut storage, _layer, _paths) = config::open_storage(cli)?;
    let history = SplitReconciler::new(&mut storage).split_history(id)?;

    if json {
        return super::print_json(&history);
    }

    print_history(&history);
    Ok(())
}

pub(super) fn print_history(history: &SplitHistory) {
    if history.from.is_empty() && history.to.is_empty() {
        println!("{} has no split history.", history.ticket);
        return;
    }
    if !history.from.is_empty() {
        println!("Split from:");
        for link in &history.from {
            print_link(link);
        }
    }
    if !history.to.is_empty() {
        println!("Split to:");
        for link in &history.to {
            print_link(link);
        }
    }
}

fn print_link(link: &SplitLink) {
    let when = format_split_time(link.split_at);
    match (&link.summary, &link.status) {
        (Some(summary), Some(status)) => {
            println!("  {} {when} [{status}] {summary}", link.ticket);
        }
        _ => println!("  {} {when} (missing)", link.ticket),
    }
}
