//! Split reconciliation.
//!
//! A ticket can be split into other tickets. [`SplitReconciler`] diffs the
//! stored targets against the desired ones, writes only the difference and
//! keeps the source ticket's status in step: `split` while it has targets,
//! back to `new` once a `split` ticket loses them all. Relationship rows
//! and the status change commit in one transaction.

mod options;
mod plan;
mod request;

pub use options::{ComponentGroup, MilestoneGroup, SplitCandidate, group_candidates};
pub use plan::SplitPlan;
pub use request::{SplitRequest, TicketDraft};

use crate::error::{Result, SplitError};
use crate::model::{SplitRelationship, Status, Ticket, TicketId};
use crate::storage::{SplitStore, SplitTransaction, TicketStore};
use crate::validation::SplitRequestValidator;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::{debug, info};

/// Result of one reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconcileOutcome {
    pub source: TicketId,
    /// Final target set, ascending.
    pub targets: Vec<TicketId>,
    pub added: Vec<TicketId>,
    pub removed: Vec<TicketId>,
    pub previous_status: Status,
    pub status: Status,
    pub status_changed: bool,
}

impl ReconcileOutcome {
    #[must_use]
    pub fn resulting_count(&self) -> usize {
        self.targets.len()
    }

    /// Did the reconciliation write anything?
    #[must_use]
    pub fn changed(&self) -> bool {
        self.status_changed || !self.added.is_empty() || !self.removed.is_empty()
    }
}

/// Result of a full split edit.
#[derive(Debug, Clone, Serialize)]
pub struct SplitOutcome {
    /// Tickets created from drafts, in request order.
    pub created: Vec<Ticket>,
    /// Requested existing targets that did not resolve to a ticket.
    pub ignored: Vec<TicketId>,
    #[serde(flatten)]
    pub reconcile: ReconcileOutcome,
}

/// One side of a split relationship as seen from a ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SplitLink {
    pub ticket: TicketId,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub split_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
}

/// Where a ticket was split from and what it was split to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SplitHistory {
    pub ticket: TicketId,
    /// Tickets this one was split from. No particular order.
    pub from: Vec<SplitLink>,
    /// Tickets this one was split to, ascending by id.
    pub to: Vec<SplitLink>,
}

/// Candidate split targets for a ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SplitOptions {
    pub ticket: TicketId,
    pub milestones: Vec<MilestoneGroup>,
}

/// Reconciles split relationships over a store.
pub struct SplitReconciler<'s, S> {
    store: &'s mut S,
}

impl<'s, S> SplitReconciler<'s, S>
where
    S: TicketStore + SplitStore,
{
    #[must_use]
    pub fn new(store: &'s mut S) -> Self {
        Self { store }
    }

    /// Make `desired` the split targets of `source`.
    ///
    /// `stored` is the caller's view of the targets on record. Rows for
    /// targets that stay are not rewritten. New rows are stamped `now`.
    ///
    /// # Errors
    ///
    /// - `InvalidTicketReference` if `source` or a desired target does not
    ///   exist, or a target equals `source`.
    /// - `PersistenceConflict` if the targets on record differ from
    ///   `stored`, or another writer holds the database.
    ///
    /// Nothing is written when an error is returned.
    pub fn reconcile(
        &mut self,
        source: TicketId,
        stored: impl IntoIterator<Item = TicketId>,
        desired: impl IntoIterator<Item = TicketId>,
        now: DateTime<Utc>,
        actor: &str,
    ) -> Result<ReconcileOutcome> {
        let plan = SplitPlan::compute(stored, desired);
        self.apply(source, &plan, now, actor).map_err(|err| {
            if err.is_busy() {
                SplitError::PersistenceConflict {
                    ticket: source,
                    detail: format!("database busy: {err}"),
                }
            } else {
                err
            }
        })
    }

    fn apply(
        &mut self,
        source: TicketId,
        plan: &SplitPlan,
        now: DateTime<Utc>,
        actor: &str,
    ) -> Result<ReconcileOutcome> {
        let mut tx = self.store.begin(actor)?;

        let Some(current) = tx.ticket_status(source)? else {
            return Err(SplitError::invalid_reference(
                source,
                "source ticket does not exist",
            ));
        };

        let targets = plan.targets();
        for &target in &targets {
            if target == source {
                return Err(SplitError::invalid_reference(
                    target,
                    "a ticket cannot be split into itself",
                ));
            }
            if tx.ticket_status(target)?.is_none() {
                return Err(SplitError::invalid_reference(target, "ticket does not exist"));
            }
        }

        let on_record = tx.stored_targets(source)?;
        if on_record != plan.stored {
            return Err(SplitError::PersistenceConflict {
                ticket: source,
                detail: format!(
                    "expected [{}], found [{}]",
                    format_ids(&plan.stored),
                    format_ids(&on_record)
                ),
            });
        }

        for &target in &plan.deletions {
            tx.delete(source, target)?;
            debug!(%source, %target, "Removed split target");
        }

        for &target in &plan.additions {
            if tx.relationship_exists(source, target)? {
                continue;
            }
            tx.insert(&SplitRelationship {
                source,
                target,
                split_at: now,
            })?;
            debug!(%source, %target, "Added split target");
        }

        let transition = plan.status_transition(&current);
        if let Some(ref status) = transition {
            tx.set_status(source, &current, status)?;
        }

        tx.commit()?;

        let status = transition.clone().unwrap_or_else(|| current.clone());
        info!(
            %source,
            added = plan.additions.len(),
            removed = plan.deletions.len(),
            targets = plan.resulting_count(),
            status = %status,
            actor,
            "Reconciled split targets"
        );

        Ok(ReconcileOutcome {
            source,
            targets: targets.into_iter().collect(),
            added: plan.additions.iter().copied().collect(),
            removed: plan.deletions.iter().copied().collect(),
            previous_status: current,
            status,
            status_changed: transition.is_some(),
        })
    }

    /// Apply a split edit: drop existing targets that do not resolve,
    /// create one ticket per draft, then reconcile against the targets on
    /// record.
    ///
    /// The request is validated in full, including draft milestones and
    /// components, before any ticket is created.
    ///
    /// # Errors
    ///
    /// - Validation errors for malformed requests.
    /// - `InvalidTicketReference` if `source` does not exist.
    /// - `MilestoneNotFound` / `ComponentNotFound` for unknown draft fields.
    /// - Anything [`Self::reconcile`] returns.
    pub fn split(
        &mut self,
        source: TicketId,
        request: &SplitRequest,
        now: DateTime<Utc>,
        actor: &str,
    ) -> Result<SplitOutcome> {
        SplitRequestValidator::validate(request).map_err(SplitError::from_validation_errors)?;

        if self.store.get_ticket(source)?.is_none() {
            return Err(SplitError::invalid_reference(
                source,
                "source ticket does not exist",
            ));
        }
        if request.existing_targets.contains(&source) {
            return Err(SplitError::invalid_reference(
                source,
                "a ticket cannot be split into itself",
            ));
        }

        for draft in &request.new_tickets {
            if let Some(ref milestone) = draft.milestone {
                if !self.store.milestone_exists(milestone)? {
                    return Err(SplitError::MilestoneNotFound {
                        name: milestone.clone(),
                    });
                }
            }
            if let Some(ref component) = draft.component {
                if !self.store.component_exists(component)? {
                    return Err(SplitError::ComponentNotFound {
                        name: component.clone(),
                    });
                }
            }
        }

        let mut desired = BTreeSet::new();
        let mut ignored = Vec::new();
        for &id in &request.existing_targets {
            if self.store.get_ticket(id)?.is_none() {
                debug!("Split to invalid ticket ID [{}] ignored", id.get());
                ignored.push(id);
                continue;
            }
            desired.insert(id);
        }

        let mut created = Vec::with_capacity(request.new_tickets.len());
        for draft in &request.new_tickets {
            let ticket = self
                .store
                .create_ticket(&draft.to_new_ticket(actor), actor, now)?;
            debug!(%source, target = %ticket.id, "Created split ticket");
            desired.insert(ticket.id);
            created.push(ticket);
        }

        let stored: Vec<TicketId> = self
            .store
            .list_by_source(source)?
            .into_iter()
            .map(|rel| rel.target)
            .collect();

        let reconcile = self.reconcile(source, stored, desired, now, actor)?;

        Ok(SplitOutcome {
            created,
            ignored,
            reconcile,
        })
    }

    /// Split relationships touching `ticket` in both directions, with the
    /// linked tickets' summary and status.
    ///
    /// # Errors
    ///
    /// Returns `TicketNotFound` if `ticket` does not exist.
    pub fn split_history(&self, ticket: TicketId) -> Result<SplitHistory> {
        if self.store.get_ticket(ticket)?.is_none() {
            return Err(SplitError::TicketNotFound { id: ticket });
        }

        let from = self
            .store
            .list_by_target(ticket)?
            .into_iter()
            .map(|rel| self.link(rel.source, rel.split_at))
            .collect::<Result<Vec<_>>>()?;

        let to = self
            .store
            .list_by_source(ticket)?
            .into_iter()
            .map(|rel| self.link(rel.target, rel.split_at))
            .collect::<Result<Vec<_>>>()?;

        Ok(SplitHistory { ticket, from, to })
    }

    /// Tickets `ticket` may be split to, grouped by active milestone and
    /// component.
    ///
    /// # Errors
    ///
    /// Returns `TicketNotFound` if `ticket` does not exist.
    pub fn split_options(&self, ticket: TicketId) -> Result<SplitOptions> {
        if self.store.get_ticket(ticket)?.is_none() {
            return Err(SplitError::TicketNotFound { id: ticket });
        }

        let milestones = self.store.active_milestones()?;
        let candidates = self.store.split_candidates(ticket)?;

        Ok(SplitOptions {
            ticket,
            milestones: group_candidates(&milestones, candidates),
        })
    }

    fn link(&self, ticket: TicketId, split_at: DateTime<Utc>) -> Result<SplitLink> {
        let found = self.store.get_ticket(ticket)?;
        Ok(SplitLink {
            ticket,
            split_at,
            summary: found.as_ref().map(|t| t.summary.clone()),
            status: found.map(|t| t.status),
        })
    }
}

fn format_ids(ids: &BTreeSet<TicketId>) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NewTicket;
    use crate::storage::SqliteStorage;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn seed(storage: &mut SqliteStorage, count: usize) -> Vec<TicketId> {
        (0..count)
            .map(|i| {
                storage
                    .create_ticket(&NewTicket::with_summary(format!("T{i}")), "seed", at(1))
                    .unwrap()
                    .id
            })
            .collect()
    }

    #[test]
    fn reconcile_adds_and_sets_split() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let ids = seed(&mut storage, 3);
        let mut reconciler = SplitReconciler::new(&mut storage);

        let outcome = reconciler
            .reconcile(ids[0], [], [ids[1], ids[2]], at(100), "alice")
            .unwrap();
        assert_eq!(outcome.targets, vec![ids[1], ids[2]]);
        assert_eq!(outcome.status, Status::Split);
        assert!(outcome.status_changed);
        assert!(outcome.changed());

        let rows = storage.list_by_source(ids[0]).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.split_at == at(100)));
    }

    #[test]
    fn reconcile_self_target_rejected() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let ids = seed(&mut storage, 1);
        let err = SplitReconciler::new(&mut storage)
            .reconcile(ids[0], [], [ids[0]], at(1), "a")
            .unwrap_err();
        assert!(matches!(err, SplitError::InvalidTicketReference { id, .. } if id == ids[0]));
    }

    #[test]
    fn stale_snapshot_conflicts() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let ids = seed(&mut storage, 3);
        let mut reconciler = SplitReconciler::new(&mut storage);
        reconciler
            .reconcile(ids[0], [], [ids[1]], at(1), "a")
            .unwrap();

        let err = reconciler
            .reconcile(ids[0], [], [ids[2]], at(2), "b")
            .unwrap_err();
        assert!(err.is_retryable());
        assert!(err.to_string().contains("expected [], found [#2]"), "{err}");
        assert_eq!(storage.list_by_source(ids[0]).unwrap().len(), 1);
    }

    #[test]
    fn split_history_lists_both_directions() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let ids = seed(&mut storage, 3);
        let mut reconciler = SplitReconciler::new(&mut storage);
        reconciler
            .reconcile(ids[0], [], [ids[2], ids[1]], at(10), "a")
            .unwrap();

        let history = reconciler.split_history(ids[0]).unwrap();
        assert!(history.from.is_empty());
        let to: Vec<TicketId> = history.to.iter().map(|l| l.ticket).collect();
        assert_eq!(to, vec![ids[1], ids[2]]);
        assert_eq!(history.to[0].summary.as_deref(), Some("T1"));

        let history = reconciler.split_history(ids[1]).unwrap();
        assert_eq!(history.from.len(), 1);
        assert_eq!(history.from[0].ticket, ids[0]);
        assert_eq!(history.from[0].status, Some(Status::Split));

        assert!(matches!(
            reconciler.split_history(TicketId(99)),
            Err(SplitError::TicketNotFound { .. })
        ));
    }

    #[test]
    fn format_ids_uses_ticket_display() {
        let ids: BTreeSet<TicketId> = [TicketId(3), TicketId(1)].into_iter().collect();
        assert_eq!(format_ids(&ids), "#1, #3");
        assert_eq!(format_ids(&BTreeSet::new()), "");
    }
}
