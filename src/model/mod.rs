//! Core data types for `jira_bulk`.
//!
//! This module defines the fundamental types used throughout the application:
//! - `Scope` - Board or project selection
//! - `Facet` / `FilterSet` - Query constraints
//! - `Ticket` - The issue snapshot actions are planned against
//! - `Action` / `ActionSet` - Requested bulk mutations
//! - `Instruction` - A concrete, planned mutation

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The set of tickets a run operates on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// A saved board, whose filter query is used verbatim.
    Board(String),
    /// A project, matched by key or name.
    Project(String),
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Board(name) => write!(f, "board '{name}'"),
            Self::Project(name) => write!(f, "project '{name}'"),
        }
    }
}

/// One filterable ticket attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Facet {
    Status(String),
    Assignee(String),
    Reporter(String),
    IssueType(String),
    Priority(String),
    /// Matches tickets carrying at least one of the labels.
    Labels(Vec<String>),
    /// Matches tickets created on this calendar day.
    CreatedOn(NaiveDate),
}

/// Ordered collection of facets. Absent facets impose no constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSet {
    facets: Vec<Facet>,
}

impl FilterSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a facet, keeping insertion order.
    #[must_use]
    pub fn with(mut self, facet: Facet) -> Self {
        self.push(facet);
        self
    }

    pub fn push(&mut self, facet: Facet) {
        self.facets.push(facet);
    }

    #[must_use]
    pub fn facets(&self) -> &[Facet] {
        &self.facets
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.facets.is_empty()
    }
}

/// Ticket priority as reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Priority {
    Critical,
    High,
    Medium,
    Low,
    Informational,
    #[default]
    None,
    /// Any priority scheme entry outside the known set.
    #[serde(untagged)]
    Custom(String),
}

impl Priority {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Critical => "Critical",
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
            Self::Informational => "Informational",
            Self::None => "None",
            Self::Custom(value) => value,
        }
    }

    /// Days from the base date to the due date, or `None` when the
    /// priority carries no deadline.
    #[must_use]
    pub const fn due_offset_days(&self) -> Option<i64> {
        match self {
            Self::Critical => Some(7),
            Self::High => Some(15),
            Self::Medium => Some(30),
            Self::Low => Some(90),
            Self::Informational | Self::None | Self::Custom(_) => None,
        }
    }

    /// Parse an optional backend priority name.
    #[must_use]
    pub fn from_name(name: Option<&str>) -> Self {
        name.map_or(Self::None, |n| n.parse().unwrap_or(Self::None))
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Priority {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_lowercase().as_str() {
            "critical" => Self::Critical,
            "high" => Self::High,
            "medium" => Self::Medium,
            "low" => Self::Low,
            "informational" => Self::Informational,
            "" | "none" => Self::None,
            _ => Self::Custom(s.trim().to_string()),
        })
    }
}

/// Minimal search hit; the full ticket is loaded separately.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketSummary {
    pub id: String,
    pub key: String,
}

/// Full ticket snapshot used for planning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    pub key: String,
    pub status: String,
    pub priority: Priority,
    pub labels: Vec<String>,
    pub due_date: Option<NaiveDate>,
    pub created: Option<NaiveDate>,
}

impl Ticket {
    #[must_use]
    pub fn summary(&self, id: impl Into<String>) -> TicketSummary {
        TicketSummary {
            id: id.into(),
            key: self.key.clone(),
        }
    }
}

/// A workflow edge available from a ticket's current status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub id: String,
    pub name: String,
}

impl Transition {
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Base date for due-date calculation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DueDateBase {
    /// Offset from the day of the run.
    #[default]
    Today,
    /// Offset from the ticket's creation date.
    Created,
}

/// A requested bulk mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    AddLabel(String),
    MoveToStatus(String),
    SetDueDate,
}

/// Requested actions, always applied in label, status, due-date order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionSet {
    pub add_label: Option<String>,
    pub move_to: Option<String>,
    pub set_due_date: bool,
}

impl ActionSet {
    /// Actions in application order.
    #[must_use]
    pub fn actions(&self) -> Vec<Action> {
        let mut actions = Vec::new();
        if let Some(label) = &self.add_label {
            actions.push(Action::AddLabel(label.clone()));
        }
        if let Some(status) = &self.move_to {
            actions.push(Action::MoveToStatus(status.clone()));
        }
        if self.set_due_date {
            actions.push(Action::SetDueDate);
        }
        actions
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.add_label.is_none() && self.move_to.is_none() && !self.set_due_date
    }
}

/// A concrete mutation planned for one ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Instruction {
    SetLabel {
        ticket: String,
        label: String,
    },
    Transition {
        ticket: String,
        transition_id: String,
        status: String,
    },
    SetDueDate {
        ticket: String,
        date: NaiveDate,
        priority: Priority,
    },
}

impl Instruction {
    #[must_use]
    pub fn ticket(&self) -> &str {
        match self {
            Self::SetLabel { ticket, .. }
            | Self::Transition { ticket, .. }
            | Self::SetDueDate { ticket, .. } => ticket,
        }
    }

    /// Human-readable description, phrased for preview or execution.
    #[must_use]
    pub fn describe(&self, dry_run: bool) -> String {
        let verb = |would: &'static str, doing: &'static str| if dry_run { would } else { doing };
        match self {
            Self::SetLabel { ticket, label } => format!(
                "{} {ticket} with label '{label}'",
                verb("Would update", "Updating")
            ),
            Self::Transition { ticket, status, .. } => {
                format!("{} {ticket} to '{status}'", verb("Would move", "Moving"))
            }
            Self::SetDueDate {
                ticket,
                date,
                priority,
            } => format!(
                "{} due date for {ticket} to {} ({priority})",
                verb("Would set", "Setting"),
                date.format("%d-%m-%Y")
            ),
        }
    }

    /// Confirmation line after the instruction was applied.
    #[must_use]
    pub fn describe_applied(&self) -> String {
        match self {
            Self::SetLabel { ticket, label } => format!("Updated {ticket} with label '{label}'"),
            Self::Transition { ticket, status, .. } => format!("Moved {ticket} to '{status}'"),
            Self::SetDueDate { ticket, date, .. } => {
                format!("Due date set for {ticket} ({})", date.format("%d-%m-%Y"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_parse_case_insensitive() {
        assert_eq!("CRITICAL".parse::<Priority>().unwrap(), Priority::Critical);
        assert_eq!("informational".parse::<Priority>().unwrap(), Priority::Informational);
        assert_eq!(
            "Blocker".parse::<Priority>().unwrap(),
            Priority::Custom("Blocker".to_string())
        );
        assert_eq!(Priority::from_name(None), Priority::None);
    }

    #[test]
    fn test_priority_due_offsets() {
        assert_eq!(Priority::Critical.due_offset_days(), Some(7));
        assert_eq!(Priority::High.due_offset_days(), Some(15));
        assert_eq!(Priority::Medium.due_offset_days(), Some(30));
        assert_eq!(Priority::Low.due_offset_days(), Some(90));
        assert_eq!(Priority::Informational.due_offset_days(), None);
        assert_eq!(Priority::None.due_offset_days(), None);
        assert_eq!(Priority::Custom("Blocker".into()).due_offset_days(), None);
    }

    #[test]
    fn test_action_set_order_is_fixed() {
        let actions = ActionSet {
            add_label: Some("security".to_string()),
            move_to: Some("Done".to_string()),
            set_due_date: true,
        };
        assert_eq!(
            actions.actions(),
            vec![
                Action::AddLabel("security".to_string()),
                Action::MoveToStatus("Done".to_string()),
                Action::SetDueDate,
            ]
        );
        assert!(ActionSet::default().is_empty());
    }

    #[test]
    fn test_instruction_describe() {
        let instruction = Instruction::SetLabel {
            ticket: "SEC-1".to_string(),
            label: "security".to_string(),
        };
        assert_eq!(
            instruction.describe(true),
            "Would update SEC-1 with label 'security'"
        );
        assert_eq!(instruction.describe(false), "Updating SEC-1 with label 'security'");

        let due = Instruction::SetDueDate {
            ticket: "SEC-2".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 8, 19).unwrap(),
            priority: Priority::Critical,
        };
        assert_eq!(
            due.describe(true),
            "Would set due date for SEC-2 to 19-08-2025 (Critical)"
        );
    }

    #[test]
    fn test_filter_set_keeps_insertion_order() {
        let filters = FilterSet::new()
            .with(Facet::Priority("High".to_string()))
            .with(Facet::Status("To Do".to_string()));
        assert_eq!(filters.facets()[0], Facet::Priority("High".to_string()));
        assert_eq!(filters.facets()[1], Facet::Status("To Do".to_string()));
    }
}
