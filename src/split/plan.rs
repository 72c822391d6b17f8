//! Set difference between stored and desired split targets.

use crate::model::{Status, TicketId};
use serde::Serialize;
use std::collections::BTreeSet;

/// The minimal change that turns the stored target set into the desired one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SplitPlan {
    /// Targets on record when the plan was computed.
    pub stored: BTreeSet<TicketId>,
    /// Desired but not stored.
    pub additions: BTreeSet<TicketId>,
    /// Stored but not desired.
    pub deletions: BTreeSet<TicketId>,
    /// Both stored and desired; left untouched.
    pub unchanged: BTreeSet<TicketId>,
}

impl SplitPlan {
    /// Diff `stored` against `desired`. Duplicates in either input collapse.
    #[must_use]
    pub fn compute(
        stored: impl IntoIterator<Item = TicketId>,
        desired: impl IntoIterator<Item = TicketId>,
    ) -> Self {
        let stored: BTreeSet<TicketId> = stored.into_iter().collect();
        let desired: BTreeSet<TicketId> = desired.into_iter().collect();

        Self {
            additions: desired.difference(&stored).copied().collect(),
            deletions: stored.difference(&desired).copied().collect(),
            unchanged: stored.intersection(&desired).copied().collect(),
            stored,
        }
    }

    /// `|stored| - |deletions| + |additions|`, which is `|desired|`.
    #[must_use]
    pub fn resulting_count(&self) -> usize {
        self.stored.len() - self.deletions.len() + self.additions.len()
    }

    /// The target set after the plan is applied.
    #[must_use]
    pub fn targets(&self) -> BTreeSet<TicketId> {
        self.unchanged.union(&self.additions).copied().collect()
    }

    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.additions.is_empty() && self.deletions.is_empty()
    }

    /// Status the source ticket carries once the plan is applied.
    #[must_use]
    pub fn derived_status(&self) -> Status {
        if self.resulting_count() > 0 {
            Status::Split
        } else {
            Status::New
        }
    }

    /// The status write needed for a ticket currently in `current`, if any.
    ///
    /// A ticket with targets becomes `split`. A `split` ticket left with no
    /// targets returns to `new`. Any other ticket without targets keeps its
    /// status.
    #[must_use]
    pub fn status_transition(&self, current: &Status) -> Option<Status> {
        let has_targets = self.resulting_count() > 0;
        match (has_targets, current.is_split()) {
            (true, false) => Some(Status::Split),
            (false, true) => Some(Status::New),
            _ => None,
        }
    }
}
