//! Split command implementation.

use crate::cli::SplitArgs;
use crate::config::{self, ConfigLayer};
use crate::error::{Result, SplitError};
use crate::split::{SplitOutcome, SplitReconciler, SplitRequest, TicketDraft};
use chrono::Utc;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;

/// Execute the split command.
///
/// # Errors
///
/// Returns an error if the request is empty without `--clear`, cannot be
/// read, or the split itself fails.
pub fn execute(args: &SplitArgs, json: bool, cli: &config::CliOverrides) -> Result<()> {
    let source = super::parse_id(&args.id)?;
    let (mut storage, layer, _paths) = config::open_storage(cli)?;
    let request = build_request(args, &layer)?;
    let actor = config::resolve_actor(&layer);

    let outcome = SplitReconciler::new(&mut storage).split(source, &request, Utc::now(), &actor)?;

    if json {
        return super::print_json(&outcome);
    }

    print_outcome(&outcome);
    Ok(())
}

/// Assemble the desired split set from the command line or an input file.
///
/// # Errors
///
/// Returns a validation error for a malformed draft, or when nothing was
/// given and `--clear` is not set.
pub fn build_request(args: &SplitArgs, layer: &ConfigLayer) -> Result<SplitRequest> {
    let mut request = if let Some(ref path) = args.input {
        read_request(path)?
    } else {
        let mut request = SplitRequest::default();
        for text in &args.to {
            request.add_targets_from_text(text);
        }
        for raw in &args.new {
            request.new_tickets.push(raw.parse::<TicketDraft>()?);
        }
        if request.is_empty() && !args.clear {
            return Err(SplitError::validation(
                "targets",
                "no split targets given (use --clear to remove every target)",
            ));
        }
        request
    };

    let milestone = config::default_milestone_from_layer(layer);
    let component = config::default_component_from_layer(layer);
    request.new_tickets = request
        .new_tickets
        .into_iter()
        .map(|draft| draft.with_defaults(milestone.as_deref(), component.as_deref()))
        .collect();

    Ok(request)
}

fn read_request(path: &Path) -> Result<SplitRequest> {
    if path == Path::new("-") {
        return SplitRequest::from_reader(io::stdin().lock());
    }
    SplitRequest::from_reader(BufReader::new(File::open(path)?))
}

fn print_outcome(outcome: &SplitOutcome) {
    for id in &outcome.ignored {
        println!("Ignored {id}: ticket does not exist");
    }
    for ticket in &outcome.created {
        println!("Created {}: {}", ticket.id, ticket.summary);
    }

    let reconcile = &outcome.reconcile;
    if !reconcile.changed() {
        println!("No changes to {}.", reconcile.source);
        return;
    }
    if !reconcile.added.is_empty() {
        println!("Added: {}", super::join_ids(&reconcile.added));
    }
    if !reconcile.removed.is_empty() {
        println!("Removed: {}", super::join_ids(&reconcile.removed));
    }
    if reconcile.targets.is_empty() {
        println!("{} is no longer split.", reconcile.source);
    } else {
        println!(
            "{} split to {}",
            reconcile.source,
            super::join_ids(&reconcile.targets)
        );
    }
    if reconcile.status_changed {
        println!(
            "Status: {} -> {}",
            reconcile.previous_status, reconcile.status
        );
    }
}
