//! Validation helpers for `splitticket`.
//!
//! These routines enforce ticket field constraints and return structured
//! validation errors without touching storage. Checks that need the
//! database (does this milestone exist?) live with the code that holds a
//! store.

use crate::error::ValidationError;
use crate::model::NewTicket;
use crate::split::{SplitRequest, TicketDraft};

/// Longest summary accepted, in characters. Matches the schema CHECK.
pub const MAX_SUMMARY_CHARS: usize = 255;

/// Validates ticket fields.
pub struct TicketValidator;

impl TicketValidator {
    /// Validate a ticket before insert and return all errors found.
    ///
    /// # Errors
    ///
    /// Returns a `Vec<ValidationError>` if any validation rules are violated.
    pub fn validate(ticket: &NewTicket) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        check_summary("summary", &ticket.summary, &mut errors);

        // Description: Optional, max 100KB.
        if let Some(description) = ticket.description.as_ref() {
            if description.len() > 102_400 {
                errors.push(ValidationError::new("description", "exceeds 100KB"));
            }
        }

        if let Some(keywords) = ticket.keywords.as_ref() {
            if keywords.len() > 500 {
                errors.push(ValidationError::new("keywords", "exceeds 500 characters"));
            }
        }

        check_name("milestone", ticket.milestone.as_deref(), &mut errors);
        check_name("component", ticket.component.as_deref(), &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Validates split requests at the boundary, before any ticket is created.
pub struct SplitRequestValidator;

impl SplitRequestValidator {
    /// Validate every existing target id and every draft.
    ///
    /// # Errors
    ///
    /// Returns a `Vec<ValidationError>` naming each offending entry.
    pub fn validate(request: &SplitRequest) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        for (index, id) in request.existing_targets.iter().enumerate() {
            if !id.is_valid() {
                errors.push(ValidationError::new(
                    format!("existing_targets[{index}]"),
                    "ticket ids must be positive",
                ));
            }
        }

        for (index, draft) in request.new_tickets.iter().enumerate() {
            Self::validate_draft(index, draft, &mut errors);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_draft(index: usize, draft: &TicketDraft, errors: &mut Vec<ValidationError>) {
        let field = |name: &str| format!("new_tickets[{index}].{name}");
        check_summary(&field("summary"), &draft.summary, errors);
        check_name(&field("milestone"), draft.milestone.as_deref(), errors);
        check_name(&field("component"), draft.component.as_deref(), errors);
    }
}

fn check_summary(field: &str, summary: &str, errors: &mut Vec<ValidationError>) {
    let trimmed = summary.trim();
    if trimmed.is_empty() {
        errors.push(ValidationError::new(field, "cannot be empty"));
    }
    if trimmed.chars().count() > MAX_SUMMARY_CHARS {
        errors.push(ValidationError::new(
            field,
            format!("exceeds {MAX_SUMMARY_CHARS} characters"),
        ));
    }
    if trimmed.contains(['\n', '\r']) {
        errors.push(ValidationError::new(field, "must be a single line"));
    }
}

// Milestone and component names are optional; when present they must not
// be blank.
fn check_name(field: &str, name: Option<&str>, errors: &mut Vec<ValidationError>) {
    if let Some(name) = name {
        if name.trim().is_empty() {
            errors.push(ValidationError::new(field, "cannot be blank"));
        }
    }
}
