//! Core data types for `splitticket`.
//!
//! This module defines the fundamental types used throughout the application:
//! - `TicketId` - Numeric ticket identifier
//! - `Status` - Ticket workflow states
//! - `Ticket` / `NewTicket` - The work item and its creation payload
//! - `SplitRelationship` - "ticket A was split into ticket B at time T"
//! - `Milestone` / `Component` - Ticket grouping
//! - `Event` - Audit log entries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::SplitError;

/// Numeric ticket identifier. Always positive once persisted.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct TicketId(pub i64);

impl TicketId {
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }

    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 > 0
    }
}

impl fmt::Display for TicketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<i64> for TicketId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl FromStr for TicketId {
    type Err = SplitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed.strip_prefix('#').unwrap_or(trimmed);
        match digits.parse::<i64>() {
            Ok(value) if value > 0 => Ok(Self(value)),
            _ => Err(SplitError::InvalidId {
                input: s.to_string(),
            }),
        }
    }
}

/// Ticket workflow status.
///
/// The split workflow only ever writes `Split` and `New`; every other
/// value belongs to the surrounding workflow.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[default]
    New,
    Assigned,
    Accepted,
    Reopened,
    Closed,
    Split,
    #[serde(untagged)]
    Custom(String),
}

impl Status {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::New => "new",
            Self::Assigned => "assigned",
            Self::Accepted => "accepted",
            Self::Reopened => "reopened",
            Self::Closed => "closed",
            Self::Split => "split",
            Self::Custom(value) => value,
        }
    }

    #[must_use]
    pub const fn is_split(&self) -> bool {
        matches!(self, Self::Split)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Status {
    type Err = SplitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        match normalized.as_str() {
            "new" => Ok(Self::New),
            "assigned" => Ok(Self::Assigned),
            "accepted" => Ok(Self::Accepted),
            "reopened" => Ok(Self::Reopened),
            "closed" => Ok(Self::Closed),
            "split" => Ok(Self::Split),
            other
                if !other.is_empty()
                    && other.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') =>
            {
                Ok(Self::Custom(other.to_string()))
            }
            _ => Err(SplitError::InvalidStatus {
                status: s.to_string(),
            }),
        }
    }
}

/// A persisted ticket.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Ticket {
    pub id: TicketId,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reporter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub milestone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
    #[serde(default)]
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keywords: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Field values for a ticket that has not been inserted yet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTicket {
    pub summary: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub reporter: Option<String>,
    #[serde(default)]
    pub milestone: Option<String>,
    #[serde(default)]
    pub component: Option<String>,
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub keywords: Option<String>,
}

impl NewTicket {
    #[must_use]
    pub fn with_summary(summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            ..Self::default()
        }
    }
}

/// A directed record that `source` was split into `target`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitRelationship {
    pub source: TicketId,
    pub target: TicketId,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub split_at: DateTime<Utc>,
}

/// A release milestone tickets can be assigned to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Milestone {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<DateTime<Utc>>,
}

impl Milestone {
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.completed.is_none()
    }
}

/// A product component tickets can be filed against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    pub name: String,
}

/// Audit event type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventType {
    Created,
    StatusChanged,
    SplitAdded,
    SplitRemoved,
    Custom(String),
}

impl EventType {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Created => "created",
            Self::StatusChanged => "status_changed",
            Self::SplitAdded => "split_added",
            Self::SplitRemoved => "split_removed",
            Self::Custom(value) => value,
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value {
            "created" => Self::Created,
            "status_changed" => Self::StatusChanged,
            "split_added" => Self::SplitAdded,
            "split_removed" => Self::SplitRemoved,
            other => Self::Custom(other.to_string()),
        }
    }
}

impl Serialize for EventType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EventType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Ok(Self::parse(&value))
    }
}

/// An audit trail entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Event {
    pub id: i64,
    pub ticket_id: TicketId,
    pub event_type: EventType,
    pub actor: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn ticket_id_parses_hash_prefix_and_whitespace() {
        assert_eq!("12".parse::<TicketId>().unwrap(), TicketId(12));
        assert_eq!(" #7 ".parse::<TicketId>().unwrap(), TicketId(7));
        assert!("0".parse::<TicketId>().is_err());
        assert!("-3".parse::<TicketId>().is_err());
        assert!("abc".parse::<TicketId>().is_err());
        assert_eq!(TicketId(5).to_string(), "#5");
    }

    #[test]
    fn status_known_values_roundtrip() {
        for name in ["new", "assigned", "accepted", "reopened", "closed", "split"] {
            let status: Status = name.parse().unwrap();
            assert_eq!(status.as_str(), name);
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{name}\""));
        }
    }

    #[test]
    fn status_custom_roundtrip() {
        let status: Status = serde_json::from_str("\"needs_info\"").unwrap();
        assert_eq!(status, Status::Custom("needs_info".to_string()));
        assert_eq!(serde_json::to_string(&status).unwrap(), "\"needs_info\"");

        assert_eq!(
            "Needs_Info".parse::<Status>().unwrap(),
            Status::Custom("needs_info".to_string())
        );
        assert!("".parse::<Status>().is_err());
        assert!("not valid".parse::<Status>().is_err());
    }

    #[test]
    fn split_relationship_serializes_epoch_seconds() {
        let rel = SplitRelationship {
            source: TicketId(1),
            target: TicketId(2),
            split_at: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
        };
        let json = serde_json::to_value(&rel).unwrap();
        assert_eq!(json["source"], 1);
        assert_eq!(json["target"], 2);
        assert_eq!(json["split_at"], 1_700_000_000_i64);
    }

    #[test]
    fn event_type_unknown_is_custom() {
        assert_eq!(EventType::parse("split_added"), EventType::SplitAdded);
        assert_eq!(
            EventType::parse("milestone_changed"),
            EventType::Custom("milestone_changed".to_string())
        );
    }

    #[test]
    fn milestone_active_until_completed() {
        let mut milestone = Milestone {
            name: "1.0".to_string(),
            due: None,
            completed: None,
        };
        assert!(milestone.is_active());
        milestone.completed = Some(Utc.timestamp_opt(1_700_000_000, 0).unwrap());
        assert!(!milestone.is_active());
    }
}
