//! Error types and handling for `splitticket`.
//!
//! # Design
//!
//! - Uses `thiserror` for derive-based error types
//! - Keeps the three reconciliation failure kinds (`InvalidTicketReference`,
//!   `PersistenceConflict`, `StoreUnavailable`) as first-class variants
//! - Provides recovery hints for user-facing errors
//! - Provides structured JSON output via [`StructuredError`]

mod structured;

pub use structured::{ErrorCode, StructuredError};

use crate::model::TicketId;
use std::path::PathBuf;
use thiserror::Error;

/// Primary error type for `splitticket` operations.
#[derive(Error, Debug)]
pub enum SplitError {
    // === Reconciliation Errors ===
    /// A source or target ticket id does not denote an existing ticket.
    #[error("Invalid ticket reference {id}: {reason}")]
    InvalidTicketReference { id: TicketId, reason: String },

    /// The split targets on record changed since the caller read them.
    #[error("Split targets of {ticket} changed concurrently: {detail}")]
    PersistenceConflict { ticket: TicketId, detail: String },

    /// The underlying database cannot be reached.
    #[error("Ticket store unavailable at '{path}': {reason}")]
    StoreUnavailable { path: PathBuf, reason: String },

    // === Storage Errors ===
    /// Database schema version is newer than this build understands.
    #[error("Schema version mismatch: expected at most {expected}, found {found}")]
    SchemaMismatch { expected: i32, found: i32 },

    /// `SQLite` database error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    // === Ticket Errors ===
    /// Ticket with the specified ID was not found.
    #[error("Ticket not found: {id}")]
    TicketNotFound { id: TicketId },

    /// Ticket ID could not be parsed.
    #[error("Invalid ticket ID: {input}")]
    InvalidId { input: String },

    /// Milestone with the given name does not exist.
    #[error("Milestone not found: {name}")]
    MilestoneNotFound { name: String },

    /// Component with the given name does not exist.
    #[error("Component not found: {name}")]
    ComponentNotFound { name: String },

    // === Validation Errors ===
    /// Field validation failed.
    #[error("Validation failed: {field}: {reason}")]
    Validation { field: String, reason: String },

    /// Multiple validation errors occurred.
    #[error("Validation errors: {errors:?}")]
    ValidationErrors { errors: Vec<ValidationError> },

    /// Invalid status value.
    #[error("Invalid status: {status}")]
    InvalidStatus { status: String },

    // === Configuration Errors ===
    /// Configuration file error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Workspace not initialized.
    #[error("splitticket not initialized: run 'st init' first")]
    NotInitialized,

    /// Already initialized.
    #[error("Already initialized at '{path}'")]
    AlreadyInitialized { path: PathBuf },

    // === I/O Errors ===
    /// File system I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Wrapped anyhow error.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// A single field validation error.
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// The field that failed validation.
    pub field: String,
    /// The reason for the validation failure.
    pub message: String,
}

impl ValidationError {
    /// Create a new validation error.
    #[must_use]
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

impl SplitError {
    /// Can the user fix this without code changes?
    #[must_use]
    pub const fn is_user_recoverable(&self) -> bool {
        matches!(
            self,
            Self::NotInitialized
                | Self::TicketNotFound { .. }
                | Self::InvalidTicketReference { .. }
                | Self::InvalidId { .. }
                | Self::MilestoneNotFound { .. }
                | Self::ComponentNotFound { .. }
                | Self::Validation { .. }
                | Self::ValidationErrors { .. }
                | Self::InvalidStatus { .. }
        )
    }

    /// Should the caller re-read the stored targets and try again?
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::PersistenceConflict { .. })
    }

    /// Is this a `SQLite` busy/locked failure from a competing writer?
    #[must_use]
    pub fn is_busy(&self) -> bool {
        match self {
            Self::Database(err) => matches!(
                err.sqlite_error_code(),
                Some(rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked)
            ),
            _ => false,
        }
    }

    /// Human-friendly suggestion for fixing this error.
    #[must_use]
    pub const fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::NotInitialized => Some("Run: st init"),
            Self::AlreadyInitialized { .. } => Some("Use --force to reinitialize"),
            Self::InvalidTicketReference { .. } => {
                Some("Check the ticket ids with: st list")
            }
            Self::PersistenceConflict { .. } => {
                Some("Another edit landed first; re-run the split against the current targets")
            }
            Self::StoreUnavailable { .. } => Some("Check the --db path and file permissions"),
            Self::MilestoneNotFound { .. } => Some("List milestones with: st milestone list"),
            Self::ComponentNotFound { .. } => Some("List components with: st component list"),
            Self::InvalidStatus { .. } => {
                Some("Valid statuses: new, assigned, accepted, reopened, closed, split")
            }
            _ => None,
        }
    }

    /// Create a validation error for a specific field.
    #[must_use]
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid reference error for a ticket id.
    #[must_use]
    pub fn invalid_reference(id: TicketId, reason: impl Into<String>) -> Self {
        Self::InvalidTicketReference {
            id,
            reason: reason.into(),
        }
    }

    /// Create from multiple validation errors.
    #[must_use]
    pub fn from_validation_errors(mut errors: Vec<ValidationError>) -> Self {
        if errors.len() == 1 {
            let err = errors.remove(0);
            Self::Validation {
                field: err.field,
                reason: err.message,
            }
        } else {
            Self::ValidationErrors { errors }
        }
    }
}

/// Result type using `SplitError`.
pub type Result<T> = std::result::Result<T, SplitError>;
