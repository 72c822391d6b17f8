//! Boundary input for a split edit.

use crate::error::{Result, SplitError};
use crate::model::{NewTicket, Status, TicketId};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::str::FromStr;
use std::sync::LazyLock;
use tracing::debug;

// Regex is static and valid
static TICKET_ID_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").unwrap());

/// The desired split targets for one ticket: tickets that already exist
/// plus drafts for tickets to create.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitRequest {
    #[serde(default)]
    pub existing_targets: Vec<TicketId>,
    #[serde(default)]
    pub new_tickets: Vec<TicketDraft>,
}

impl SplitRequest {
    /// Extract ticket ids from free text: every run of digits is one id,
    /// so `"#12, 14"` yields 12 and 14. Zero and out-of-range runs are
    /// dropped.
    #[must_use]
    pub fn parse_targets(text: &str) -> Vec<TicketId> {
        TICKET_ID_RUN
            .find_iter(text)
            .filter_map(|m| match m.as_str().parse::<i64>() {
                Ok(value) if value > 0 => Some(TicketId(value)),
                _ => {
                    debug!("Split to invalid ticket ID [{}] ignored", m.as_str());
                    None
                }
            })
            .collect()
    }

    /// Read a request from JSON.
    ///
    /// # Errors
    ///
    /// Returns a JSON error if the input is not a valid request document.
    pub fn from_reader(reader: impl Read) -> Result<Self> {
        Ok(serde_json::from_reader(reader)?)
    }

    /// Add targets parsed from free text.
    pub fn add_targets_from_text(&mut self, text: &str) {
        self.existing_targets.extend(Self::parse_targets(text));
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.existing_targets.is_empty() && self.new_tickets.is_empty()
    }
}

/// A ticket to create and split to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketDraft {
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub milestone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
}

impl TicketDraft {
    #[must_use]
    pub fn new(summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            ..Self::default()
        }
    }

    /// Fill an unset milestone or component from configured defaults.
    #[must_use]
    pub fn with_defaults(mut self, milestone: Option<&str>, component: Option<&str>) -> Self {
        if self.milestone.is_none() {
            self.milestone = milestone.map(str::to_string);
        }
        if self.component.is_none() {
            self.component = component.map(str::to_string);
        }
        self
    }

    /// The ticket this draft creates: status `new`, reported by `reporter`.
    #[must_use]
    pub fn to_new_ticket(&self, reporter: &str) -> NewTicket {
        NewTicket {
            summary: self.summary.trim().to_string(),
            reporter: Some(reporter.to_string()),
            milestone: self.milestone.clone(),
            component: self.component.clone(),
            status: Status::New,
            ..NewTicket::default()
        }
    }
}

/// Parses `summary[|milestone[|component]]`. Empty milestone or component
/// segments mean "unset".
impl FromStr for TicketDraft {
    type Err = SplitError;

    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.splitn(3, '|').map(str::trim);
        let summary = parts.next().unwrap_or_default();
        if summary.is_empty() {
            return Err(SplitError::validation(
                "new_tickets.summary",
                "cannot be empty",
            ));
        }
        let non_empty = |part: Option<&str>| part.filter(|p| !p.is_empty()).map(str::to_string);

        Ok(Self {
            summary: summary.to_string(),
            milestone: non_empty(parts.next()),
            component: non_empty(parts.next()),
        })
    }
}
