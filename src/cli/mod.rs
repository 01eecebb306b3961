//! CLI definitions and boundary validation.
//!
//! Flags are parsed by clap, then turned into `Scope`, `FilterSet` and
//! `ActionSet` before any network call is made.

use crate::error::{BulkError, Result};
use crate::model::{ActionSet, DueDateBase, Facet, FilterSet, Scope};
use crate::util::parse_created_on;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Bulk label, transition and due-date updates for Jira issues
#[derive(Parser, Debug, Default)]
#[command(name = "jbulk", author, version, about, long_about = None)]
#[allow(clippy::struct_excessive_bools)]
pub struct Cli {
    /// Board whose saved filter selects the issues
    #[arg(long, help_heading = "Scope")]
    pub board_name: Option<String>,

    /// Project key or name
    #[arg(long, help_heading = "Scope")]
    pub project: Option<String>,

    /// Filter by status
    #[arg(long, help_heading = "Filters")]
    pub status: Option<String>,

    /// Filter by assignee
    #[arg(long, help_heading = "Filters")]
    pub assignee: Option<String>,

    /// Filter by reporter
    #[arg(long, help_heading = "Filters")]
    pub reporter: Option<String>,

    /// Filter by issue type
    #[arg(long, help_heading = "Filters")]
    pub issue_type: Option<String>,

    /// Filter by priority
    #[arg(long, help_heading = "Filters")]
    pub priority: Option<String>,

    /// Filter by labels, comma-separated (matches any)
    #[arg(long, help_heading = "Filters")]
    pub labels: Option<String>,

    /// Filter by creation day (DD-MM-YYYY)
    #[arg(long, help_heading = "Filters")]
    pub created_on: Option<String>,

    /// Add this label to every matched issue
    #[arg(long, help_heading = "Actions")]
    pub add_label: Option<String>,

    /// Transition every matched issue to this status
    #[arg(long, help_heading = "Actions")]
    pub move_to: Option<String>,

    /// Set the due date from the issue priority
    #[arg(long, help_heading = "Actions")]
    pub set_due_date: bool,

    /// Base date for --set-due-date
    #[arg(long, value_enum, default_value_t = DueFrom::Today, help_heading = "Actions")]
    pub due_from: DueFrom,

    /// Show what would change without writing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Credentials file (default: ./JiraCredentials.json)
    #[arg(long, env = "JBULK_CREDENTIALS")]
    pub credentials: Option<PathBuf>,

    /// Output the run report as JSON
    #[arg(long)]
    pub json: bool,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (no output except errors)
    #[arg(short, long)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DueFrom {
    /// Offset from the day of the run
    #[default]
    Today,
    /// Offset from the issue's creation date
    Created,
}

impl From<DueFrom> for DueDateBase {
    fn from(value: DueFrom) -> Self {
        match value {
            DueFrom::Today => Self::Today,
            DueFrom::Created => Self::Created,
        }
    }
}

impl Cli {
    /// The selected scope; exactly one of board and project is required.
    ///
    /// # Errors
    ///
    /// Returns `BulkError::InvalidScope` if neither or both are given.
    pub fn scope(&self) -> Result<Scope> {
        let board = non_empty(self.board_name.as_deref());
        let project = non_empty(self.project.as_deref());
        match (board, project) {
            (Some(board), None) => Ok(Scope::Board(board.to_string())),
            (None, Some(project)) => Ok(Scope::Project(project.to_string())),
            (None, None) => Err(BulkError::InvalidScope {
                reason: "either --board-name or --project is required".to_string(),
            }),
            (Some(_), Some(_)) => Err(BulkError::InvalidScope {
                reason: "--board-name and --project cannot be used together".to_string(),
            }),
        }
    }

    /// Filters in flag order: status, assignee, reporter, issue type,
    /// priority, labels, created-on.
    ///
    /// # Errors
    ///
    /// Returns `BulkError::Validation` for a malformed `--created-on`.
    pub fn filters(&self) -> Result<FilterSet> {
        let mut filters = FilterSet::new();
        let simple: [(Option<&str>, fn(String) -> Facet); 5] = [
            (self.status.as_deref(), Facet::Status),
            (self.assignee.as_deref(), Facet::Assignee),
            (self.reporter.as_deref(), Facet::Reporter),
            (self.issue_type.as_deref(), Facet::IssueType),
            (self.priority.as_deref(), Facet::Priority),
        ];
        for (value, facet) in simple {
            if let Some(value) = non_empty(value) {
                filters.push(facet(value.to_string()));
            }
        }

        if let Some(labels) = self.labels.as_deref() {
            let labels = split_labels(labels);
            if !labels.is_empty() {
                filters.push(Facet::Labels(labels));
            }
        }

        if let Some(created_on) = non_empty(self.created_on.as_deref()) {
            filters.push(Facet::CreatedOn(parse_created_on(created_on)?));
        }

        Ok(filters)
    }

    #[must_use]
    pub fn actions(&self) -> ActionSet {
        ActionSet {
            add_label: non_empty(self.add_label.as_deref()).map(str::to_string),
            move_to: non_empty(self.move_to.as_deref()).map(str::to_string),
            set_due_date: self.set_due_date,
        }
    }
}

/// Split a comma-separated label list, trimming and dropping empty items.
#[must_use]
pub fn split_labels(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|label| !label.is_empty())
        .map(str::to_string)
        .collect()
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
