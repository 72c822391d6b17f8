//! Split candidates grouped for selection.

use crate::model::{Milestone, Status, Ticket, TicketId};
use serde::Serialize;
use std::collections::BTreeMap;

/// A ticket that may be chosen as a split target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SplitCandidate {
    pub id: TicketId,
    pub summary: String,
    pub status: Status,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComponentGroup {
    /// `None` for tickets filed without a component.
    pub component: Option<String>,
    pub tickets: Vec<SplitCandidate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MilestoneGroup {
    pub milestone: String,
    pub components: Vec<ComponentGroup>,
}

/// Group candidates milestone -> component -> tickets.
///
/// Milestones keep the order of `milestones`; those without candidates are
/// omitted. Components sort alphabetically with the unset component first,
/// tickets by id. Candidates whose milestone is not listed are dropped.
#[must_use]
pub fn group_candidates(milestones: &[Milestone], candidates: Vec<Ticket>) -> Vec<MilestoneGroup> {
    let mut by_milestone: BTreeMap<String, BTreeMap<Option<String>, Vec<SplitCandidate>>> =
        BTreeMap::new();

    for ticket in candidates {
        let Some(milestone) = ticket.milestone else {
            continue;
        };
        by_milestone
            .entry(milestone)
            .or_default()
            .entry(ticket.component)
            .or_default()
            .push(SplitCandidate {
                id: ticket.id,
                summary: ticket.summary,
                status: ticket.status,
            });
    }

    milestones
        .iter()
        .filter_map(|milestone| {
            let components = by_milestone.remove(&milestone.name)?;
            Some(MilestoneGroup {
                milestone: milestone.name.clone(),
                components: components
                    .into_iter()
                    .map(|(component, mut tickets)| {
                        tickets.sort_by_key(|t| t.id);
                        ComponentGroup { component, tickets }
                    })
                    .collect(),
            })
        })
        .collect()
}
