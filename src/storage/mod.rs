//! Persistence for tickets and split relationships.
//!
//! The split reconciler talks to storage only through the traits in this
//! module. [`SqliteStorage`] implements all of them over one connection so
//! relationship rows and the ticket status commit in the same transaction.

pub mod events;
pub mod schema;
mod sqlite;

pub use sqlite::{SqliteSplitTransaction, SqliteStorage, TicketFilters};

use crate::error::Result;
use crate::model::{Milestone, NewTicket, SplitRelationship, Status, Ticket, TicketId};
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;

/// Ticket lookups and mutations owned by the ticket system.
pub trait TicketStore {
    /// Fetch a ticket by id, `None` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage lookup fails.
    fn get_ticket(&self, id: TicketId) -> Result<Option<Ticket>>;

    /// Insert a new ticket and return it with its allocated id.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    fn create_ticket(
        &mut self,
        ticket: &NewTicket,
        actor: &str,
        now: DateTime<Utc>,
    ) -> Result<Ticket>;

    /// Set a ticket's status, recording the change against `actor`.
    /// Returns `false` when the status already had that value.
    ///
    /// # Errors
    ///
    /// Returns an error if the ticket does not exist or the update fails.
    fn set_status(&mut self, id: TicketId, status: &Status, actor: &str) -> Result<bool>;

    /// Whether a milestone with this name exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage lookup fails.
    fn milestone_exists(&self, name: &str) -> Result<bool>;

    /// Whether a component with this name exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage lookup fails.
    fn component_exists(&self, name: &str) -> Result<bool>;

    /// Milestones that are not completed, ordered by due date (undated
    /// last) then name.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage lookup fails.
    fn active_milestones(&self) -> Result<Vec<Milestone>>;

    /// Tickets in an active milestone, not closed, other than `ticket`.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage lookup fails.
    fn split_candidates(&self, ticket: TicketId) -> Result<Vec<Ticket>>;
}

/// Split relationship reads plus a transactional write path.
pub trait SplitStore {
    type Transaction<'a>: SplitTransaction
    where
        Self: 'a;

    /// Relationships whose source is `source`, ordered by target id.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage lookup fails.
    fn list_by_source(&self, source: TicketId) -> Result<Vec<SplitRelationship>>;

    /// Relationships whose target is `target`. No ordering guarantee.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage lookup fails.
    fn list_by_target(&self, target: TicketId) -> Result<Vec<SplitRelationship>>;

    /// Start a write transaction. Status changes made through it are
    /// attributed to `actor`. Dropping the transaction without calling
    /// [`SplitTransaction::commit`] discards every change.
    ///
    /// # Errors
    ///
    /// Returns a busy database error (see [`crate::SplitError::is_busy`]) if
    /// another writer holds the database past the lock timeout.
    fn begin(&mut self, actor: &str) -> Result<Self::Transaction<'_>>;
}

/// One atomic unit of split writes.
pub trait SplitTransaction {
    /// Current status of a ticket, `None` if the ticket does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup fails.
    fn ticket_status(&self, id: TicketId) -> Result<Option<Status>>;

    /// Targets currently on record for `source`.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup fails.
    fn stored_targets(&self, source: TicketId) -> Result<BTreeSet<TicketId>>;

    /// Whether a `(source, target)` row exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup fails.
    fn relationship_exists(&self, source: TicketId, target: TicketId) -> Result<bool>;

    /// Insert a relationship row. Returns `false` if the pair already existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    fn insert(&mut self, relationship: &SplitRelationship) -> Result<bool>;

    /// Delete a relationship row. Returns `false` if no row matched.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    fn delete(&mut self, source: TicketId, target: TicketId) -> Result<bool>;

    /// Write a ticket status inside this transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails.
    fn set_status(&mut self, id: TicketId, old: &Status, new: &Status) -> Result<()>;

    /// Commit every change made through this transaction.
    ///
    /// # Errors
    ///
    /// Returns a busy database error if the commit is refused because
    /// another writer holds the lock.
    fn commit(self) -> Result<()>
    where
        Self: Sized;
}
