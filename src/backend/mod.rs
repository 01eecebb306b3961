//! Issue-tracker backend abstraction.
//!
//! The planner and driver only see the `Tracker` trait. `JiraClient` talks
//! to a real Jira site over REST; `MemoryTracker` keeps everything in
//! process and records writes. Only tests construct it; a dry run goes
//! through the real client and skips the write calls.

pub mod jira;
pub mod memory;

pub use jira::JiraClient;
pub use memory::{MemoryTracker, SearchCall, WriteCall};

use crate::error::{BulkError, Result, ScopeKind};
use crate::model::{Ticket, TicketSummary, Transition};
use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

/// The authenticated account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub account_id: String,
    pub display_name: String,
}

/// A board located by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardRef {
    pub id: u64,
    pub name: String,
}

/// Operations the bulk engine needs from an issue tracker.
///
/// Lookups fail with `ScopeNotFound` / `AmbiguousScope`; writes fail with
/// `Write` / `Transition`.
pub trait Tracker {
    /// Verify the configured credentials.
    ///
    /// # Errors
    ///
    /// Returns `BulkError::Auth` if the backend rejects the credentials.
    fn authenticate(&self) -> Result<Session>;

    /// Find exactly one board with this name.
    ///
    /// # Errors
    ///
    /// Returns `ScopeNotFound` or `AmbiguousScope` when not exactly one board matches.
    fn find_board_by_name(&self, name: &str) -> Result<BoardRef>;

    /// The filter query configured for a board.
    ///
    /// # Errors
    ///
    /// Returns an error if the board configuration cannot be read.
    fn board_filter_query(&self, board: &BoardRef) -> Result<String>;

    /// Resolve a project name or key to its key.
    ///
    /// # Errors
    ///
    /// Returns `ScopeNotFound` or `AmbiguousScope` when not exactly one project matches.
    fn find_project_by_name(&self, name: &str) -> Result<String>;

    /// One page of search results.
    ///
    /// # Errors
    ///
    /// Returns an error if the query is rejected or the request fails.
    fn search(&self, query: &str, start_at: usize, max_results: usize) -> Result<Vec<TicketSummary>>;

    /// Load a ticket with the fields planning needs.
    ///
    /// # Errors
    ///
    /// Returns an error if the ticket cannot be loaded.
    fn get_ticket(&self, key: &str) -> Result<Ticket>;

    /// Transitions available from the ticket's current status.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    fn list_transitions(&self, key: &str) -> Result<Vec<Transition>>;

    /// # Errors
    ///
    /// Returns `BulkError::Transition` if the backend rejects the transition.
    fn apply_transition(&self, key: &str, transition_id: &str) -> Result<()>;

    /// Add a label. Adding a label that is already present is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `BulkError::Write` if the field cannot be written.
    fn set_label(&self, key: &str, label: &str) -> Result<()>;

    /// # Errors
    ///
    /// Returns `BulkError::Write` if the field cannot be written.
    fn set_due_date(&self, key: &str, date: NaiveDate) -> Result<()>;
}

/// A project as listed by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectRef {
    pub key: String,
    pub name: String,
}

/// Pick the single board named exactly `name`.
///
/// # Errors
///
/// Returns `ScopeNotFound` (with all board names as candidates) when nothing
/// matches, or `AmbiguousScope` when several boards share the name.
pub fn select_board(boards: &[BoardRef], name: &str) -> Result<BoardRef> {
    let matches: Vec<&BoardRef> = boards.iter().filter(|board| board.name == name).collect();
    debug!(name, candidates = boards.len(), matches = matches.len(), "Selecting board");
    match matches.as_slice() {
        [board] => Ok((*board).clone()),
        [] => Err(BulkError::ScopeNotFound {
            kind: ScopeKind::Board,
            name: name.to_string(),
            candidates: boards.iter().map(|board| board.name.clone()).collect(),
        }),
        many => Err(BulkError::AmbiguousScope {
            kind: ScopeKind::Board,
            name: name.to_string(),
            matches: many.iter().map(|board| format!("{} (id {})", board.name, board.id)).collect(),
        }),
    }
}

/// Resolve a project by exact key, falling back to a case-insensitive name match.
///
/// # Errors
///
/// Returns `ScopeNotFound` when nothing matches, or `AmbiguousScope` when
/// several projects share the name.
pub fn select_project(projects: &[ProjectRef], name: &str) -> Result<String> {
    if let Some(project) = projects.iter().find(|project| project.key == name) {
        return Ok(project.key.clone());
    }

    let matches: Vec<&ProjectRef> = projects
        .iter()
        .filter(|project| project.name.to_lowercase() == name.to_lowercase())
        .collect();
    debug!(name, candidates = projects.len(), matches = matches.len(), "Selecting project");
    match matches.as_slice() {
        [project] => Ok(project.key.clone()),
        [] => Err(BulkError::ScopeNotFound {
            kind: ScopeKind::Project,
            name: name.to_string(),
            candidates: projects.iter().map(|project| project.name.clone()).collect(),
        }),
        many => Err(BulkError::AmbiguousScope {
            kind: ScopeKind::Project,
            name: name.to_string(),
            matches: many.iter().map(|project| project.key.clone()).collect(),
        }),
    }
}
