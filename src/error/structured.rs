//! Structured error output.
//!
//! Provides machine-parseable error information with:
//! - Error codes for categorization
//! - Hints for self-correction
//! - Retryability flags
//! - Context for debugging

use crate::error::SplitError;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Machine-readable error codes.
///
/// These codes are stable and can be used for programmatic error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // === Database Errors (exit code 2) ===
    /// Database cannot be reached
    StoreUnavailable,
    /// Database schema version mismatch
    SchemaMismatch,
    /// Database operation failed
    DatabaseError,
    /// Workspace not initialized
    NotInitialized,
    /// Already initialized
    AlreadyInitialized,

    // === Ticket Errors (exit code 3) ===
    /// Ticket with specified ID not found
    TicketNotFound,
    /// Ticket ID could not be parsed
    InvalidId,
    /// Milestone not found
    MilestoneNotFound,
    /// Component not found
    ComponentNotFound,

    // === Validation Errors (exit code 4) ===
    /// Field validation failed
    ValidationFailed,
    /// Invalid status value
    InvalidStatus,

    // === Split Errors (exit code 5) ===
    /// Split source or target does not exist
    InvalidTicketReference,
    /// Stored split targets changed underneath the caller
    PersistenceConflict,

    // === Config Errors (exit code 7) ===
    /// Configuration error
    ConfigError,

    // === I/O Errors (exit code 8) ===
    /// File I/O error
    IoError,
    /// JSON serialization error
    JsonError,
    /// YAML parsing error
    YamlError,

    // === Internal Errors (exit code 1) ===
    /// Unexpected internal error
    InternalError,
}

impl ErrorCode {
    /// Get the string representation for JSON output.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::StoreUnavailable => "STORE_UNAVAILABLE",
            Self::SchemaMismatch => "SCHEMA_MISMATCH",
            Self::DatabaseError => "DATABASE_ERROR",
            Self::NotInitialized => "NOT_INITIALIZED",
            Self::AlreadyInitialized => "ALREADY_INITIALIZED",
            Self::TicketNotFound => "TICKET_NOT_FOUND",
            Self::InvalidId => "INVALID_ID",
            Self::MilestoneNotFound => "MILESTONE_NOT_FOUND",
            Self::ComponentNotFound => "COMPONENT_NOT_FOUND",
            Self::ValidationFailed => "VALIDATION_FAILED",
            Self::InvalidStatus => "INVALID_STATUS",
            Self::InvalidTicketReference => "INVALID_TICKET_REFERENCE",
            Self::PersistenceConflict => "PERSISTENCE_CONFLICT",
            Self::ConfigError => "CONFIG_ERROR",
            Self::IoError => "IO_ERROR",
            Self::JsonError => "JSON_ERROR",
            Self::YamlError => "YAML_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Whether this error is potentially retryable.
    ///
    /// A conflict succeeds on retry with a fresh snapshot; validation
    /// failures succeed once the input is fixed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::PersistenceConflict | Self::ValidationFailed | Self::InvalidStatus
        )
    }

    /// Get the exit code for this error category.
    ///
    /// - 1: Internal/unknown errors
    /// - 2: Database errors
    /// - 3: Ticket errors
    /// - 4: Validation errors
    /// - 5: Split errors
    /// - 7: Config errors
    /// - 8: I/O errors
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::StoreUnavailable
            | Self::SchemaMismatch
            | Self::DatabaseError
            | Self::NotInitialized
            | Self::AlreadyInitialized => 2,
            Self::TicketNotFound
            | Self::InvalidId
            | Self::MilestoneNotFound
            | Self::ComponentNotFound => 3,
            Self::ValidationFailed | Self::InvalidStatus => 4,
            Self::InvalidTicketReference | Self::PersistenceConflict => 5,
            Self::ConfigError => 7,
            Self::IoError | Self::JsonError | Self::YamlError => 8,
            Self::InternalError => 1,
        }
    }
}

/// Structured error for machine-parseable output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredError {
    /// Machine-readable error code
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Optional hint for fixing the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    /// Whether the operation can be retried
    pub retryable: bool,
    /// Additional context data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
}

impl StructuredError {
    /// Create a new structured error from a `SplitError`.
    #[must_use]
    pub fn from_error(err: &SplitError) -> Self {
        let (code, context) = Self::extract_code_and_context(err);
        let hint = Self::generate_hint(err);

        Self {
            code,
            message: err.to_string(),
            hint,
            retryable: code.is_retryable(),
            context,
        }
    }

    /// Serialize to JSON value.
    #[must_use]
    pub fn to_json(&self) -> Value {
        json!({
            "error": {
                "code": self.code.as_str(),
                "message": self.message,
                "hint": self.hint,
                "retryable": self.retryable,
                "context": self.context,
            }
        })
    }

    /// Format for human-readable output.
    #[must_use]
    pub fn to_human(&self, color: bool) -> String {
        let mut output = String::new();

        if color {
            output.push_str("\x1b[31mError:\x1b[0m ");
        } else {
            output.push_str("Error: ");
        }

        output.push_str(&self.message);

        if let Some(hint) = &self.hint {
            output.push('\n');
            if color {
                output.push_str("\x1b[33mHint:\x1b[0m ");
            } else {
                output.push_str("Hint: ");
            }
            output.push_str(hint);
        }

        output
    }

    fn extract_code_and_context(err: &SplitError) -> (ErrorCode, Option<Value>) {
        match err {
            SplitError::InvalidTicketReference { id, reason } => (
                ErrorCode::InvalidTicketReference,
                Some(json!({"ticket": id.0, "reason": reason})),
            ),
            SplitError::PersistenceConflict { ticket, detail } => (
                ErrorCode::PersistenceConflict,
                Some(json!({"ticket": ticket.0, "detail": detail})),
            ),
            SplitError::StoreUnavailable { path, reason } => (
                ErrorCode::StoreUnavailable,
                Some(json!({"path": path.display().to_string(), "reason": reason})),
            ),
            SplitError::SchemaMismatch { expected, found } => (
                ErrorCode::SchemaMismatch,
                Some(json!({"expected": expected, "found": found})),
            ),
            SplitError::Database(_) => (ErrorCode::DatabaseError, None),
            SplitError::TicketNotFound { id } => {
                (ErrorCode::TicketNotFound, Some(json!({"searched_id": id.0})))
            }
            SplitError::InvalidId { input } => {
                (ErrorCode::InvalidId, Some(json!({"input": input})))
            }
            SplitError::MilestoneNotFound { name } => {
                (ErrorCode::MilestoneNotFound, Some(json!({"name": name})))
            }
            SplitError::ComponentNotFound { name } => {
                (ErrorCode::ComponentNotFound, Some(json!({"name": name})))
            }
            SplitError::Validation { field, reason } => (
                ErrorCode::ValidationFailed,
                Some(json!({"field": field, "reason": reason})),
            ),
            SplitError::ValidationErrors { errors } => (
                ErrorCode::ValidationFailed,
                Some(json!({
                    "errors": errors.iter()
                        .map(|e| json!({"field": e.field, "message": e.message}))
                        .collect::<Vec<_>>()
                })),
            ),
            SplitError::InvalidStatus { status } => {
                (ErrorCode::InvalidStatus, Some(json!({"status": status})))
            }
            SplitError::Config(_) => (ErrorCode::ConfigError, None),
            SplitError::NotInitialized => (ErrorCode::NotInitialized, None),
            SplitError::AlreadyInitialized { path } => (
                ErrorCode::AlreadyInitialized,
                Some(json!({"path": path.display().to_string()})),
            ),
            SplitError::Io(_) => (ErrorCode::IoError, None),
            SplitError::Json(_) => (ErrorCode::JsonError, None),
            SplitError::Yaml(_) => (ErrorCode::YamlError, None),
            SplitError::Other(_) => (ErrorCode::InternalError, None),
        }
    }

    fn generate_hint(err: &SplitError) -> Option<String> {
        if let Some(suggestion) = err.suggestion() {
            return Some(suggestion.to_string());
        }

        match err {
            SplitError::TicketNotFound { .. } => {
                Some("Run 'st list' to see available tickets.".to_string())
            }
            SplitError::InvalidId { .. } => {
                Some("Ticket ids are positive integers, optionally written as #12.".to_string())
            }
            SplitError::SchemaMismatch { .. } => {
                Some("The database was written by a newer st; upgrade st.".to_string())
            }
            _ => None,
        }
    }
}
