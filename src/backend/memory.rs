//! In-process tracker for unit and integration tests.
//!
//! Holds boards, projects and tickets in memory, applies writes to its own
//! ticket snapshots and records each write call so tests can count them.
//! Search ignores the query text and pages over all tickets in insertion
//! order.

use super::{BoardRef, ProjectRef, Session, Tracker, select_board, select_project};
use crate::error::{BulkError, Result};
use crate::model::{Ticket, TicketSummary, Transition};
use chrono::NaiveDate;
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};

/// A mutation the tracker received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteCall {
    SetLabel { ticket: String, label: String },
    Transition { ticket: String, transition_id: String },
    SetDueDate { ticket: String, date: NaiveDate },
}

/// A recorded `search` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchCall {
    pub query: String,
    pub start_at: usize,
    pub max_results: usize,
}

#[derive(Debug, Default)]
pub struct MemoryTracker {
    boards: Vec<(BoardRef, String)>,
    projects: Vec<ProjectRef>,
    tickets: RefCell<Vec<Ticket>>,
    transitions: HashMap<String, Vec<Transition>>,
    default_transitions: Vec<Transition>,
    failing_writes: HashSet<String>,
    rejected_transitions: HashSet<String>,
    reject_auth: bool,
    writes: RefCell<Vec<WriteCall>>,
    searches: RefCell<Vec<SearchCall>>,
    transition_lookups: Cell<usize>,
}

impl MemoryTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a board with its filter query. Board ids are assigned in order.
    #[must_use]
    pub fn with_board(mut self, name: &str, filter_query: &str) -> Self {
        let id = self.boards.len() as u64 + 1;
        self.boards.push((
            BoardRef {
                id,
                name: name.to_string(),
            },
            filter_query.to_string(),
        ));
        self
    }

    #[must_use]
    pub fn with_project(mut self, key: &str, name: &str) -> Self {
        self.projects.push(ProjectRef {
            key: key.to_string(),
            name: name.to_string(),
        });
        self
    }

    #[must_use]
    pub fn with_ticket(self, ticket: Ticket) -> Self {
        self.tickets.borrow_mut().push(ticket);
        self
    }

    #[must_use]
    pub fn with_tickets(self, tickets: impl IntoIterator<Item = Ticket>) -> Self {
        self.tickets.borrow_mut().extend(tickets);
        self
    }

    /// Transitions offered for one ticket, overriding the default set.
    #[must_use]
    pub fn with_transitions(mut self, key: &str, transitions: Vec<Transition>) -> Self {
        self.transitions.insert(key.to_string(), transitions);
        self
    }

    /// Transitions offered for every ticket without its own set.
    #[must_use]
    pub fn with_default_transitions(mut self, transitions: Vec<Transition>) -> Self {
        self.default_transitions = transitions;
        self
    }

    /// Make label and due-date writes to this ticket fail.
    #[must_use]
    pub fn fail_writes_for(mut self, key: &str) -> Self {
        self.failing_writes.insert(key.to_string());
        self
    }

    /// Make transitions of this ticket fail despite a matching name.
    #[must_use]
    pub fn reject_transitions_for(mut self, key: &str) -> Self {
        self.rejected_transitions.insert(key.to_string());
        self
    }

    #[must_use]
    pub const fn reject_auth(mut self) -> Self {
        self.reject_auth = true;
        self
    }

    /// Every write received, in order.
    #[must_use]
    pub fn writes(&self) -> Vec<WriteCall> {
        self.writes.borrow().clone()
    }

    #[must_use]
    pub fn searches(&self) -> Vec<SearchCall> {
        self.searches.borrow().clone()
    }

    /// Number of `list_transitions` calls received.
    #[must_use]
    pub fn transition_lookups(&self) -> usize {
        self.transition_lookups.get()
    }

    /// Current snapshot of a ticket.
    #[must_use]
    pub fn ticket(&self, key: &str) -> Option<Ticket> {
        self.tickets.borrow().iter().find(|t| t.key == key).cloned()
    }

    fn transitions_for(&self, key: &str) -> &[Transition] {
        self.transitions
            .get(key)
            .map_or(self.default_transitions.as_slice(), Vec::as_slice)
    }

    fn update_ticket(&self, key: &str, f: impl FnOnce(&mut Ticket)) -> Result<()> {
        let mut tickets = self.tickets.borrow_mut();
        let ticket = tickets
            .iter_mut()
            .find(|t| t.key == key)
            .ok_or_else(|| BulkError::Write {
                ticket: key.to_string(),
                reason: "404 Not Found: Issue does not exist".to_string(),
            })?;
        f(ticket);
        Ok(())
    }

    fn check_writable(&self, key: &str) -> Result<()> {
        if self.failing_writes.contains(key) {
            return Err(BulkError::Write {
                ticket: key.to_string(),
                reason: "403 Forbidden: You do not have permission to edit issues".to_string(),
            });
        }
        Ok(())
    }
}

impl Tracker for MemoryTracker {
    fn authenticate(&self) -> Result<Session> {
        if self.reject_auth {
            return Err(BulkError::Auth {
                reason: "401 Unauthorized from memory".to_string(),
            });
        }
        Ok(Session {
            account_id: "memory".to_string(),
            display_name: "In-memory tracker".to_string(),
        })
    }

    fn find_board_by_name(&self, name: &str) -> Result<BoardRef> {
        let boards: Vec<BoardRef> = self.boards.iter().map(|(board, _)| board.clone()).collect();
        select_board(&boards, name)
    }

    fn board_filter_query(&self, board: &BoardRef) -> Result<String> {
        self.boards
            .iter()
            .find(|(candidate, _)| candidate.id == board.id)
            .map(|(_, query)| query.clone())
            .ok_or_else(|| BulkError::Backend {
                endpoint: format!("/rest/agile/1.0/board/{}/configuration", board.id),
                status: 404,
                body: "Board does not exist".to_string(),
            })
    }

    fn find_project_by_name(&self, name: &str) -> Result<String> {
        select_project(&self.projects, name)
    }

    fn search(&self, query: &str, start_at: usize, max_results: usize) -> Result<Vec<TicketSummary>> {
        self.searches.borrow_mut().push(SearchCall {
            query: query.to_string(),
            start_at,
            max_results,
        });
        let tickets = self.tickets.borrow();
        Ok(tickets
            .iter()
            .enumerate()
            .skip(start_at)
            .take(max_results)
            .map(|(idx, ticket)| ticket.summary((10_000 + idx).to_string()))
            .collect())
    }

    fn get_ticket(&self, key: &str) -> Result<Ticket> {
        self.ticket(key).ok_or_else(|| BulkError::Backend {
            endpoint: format!("/rest/api/2/issue/{key}"),
            status: 404,
            body: "Issue does not exist".to_string(),
        })
    }

    fn list_transitions(&self, key: &str) -> Result<Vec<Transition>> {
        self.transition_lookups.set(self.transition_lookups.get() + 1);
        Ok(self.transitions_for(key).to_vec())
    }

    fn apply_transition(&self, key: &str, transition_id: &str) -> Result<()> {
        self.writes.borrow_mut().push(WriteCall::Transition {
            ticket: key.to_string(),
            transition_id: transition_id.to_string(),
        });
        if self.rejected_transitions.contains(key) {
            return Err(BulkError::Transition {
                ticket: key.to_string(),
                reason: "400 Bad Request: workflow condition not met".to_string(),
            });
        }
        let target = self
            .transitions_for(key)
            .iter()
            .find(|t| t.id == transition_id)
            .map(|t| t.name.clone())
            .ok_or_else(|| BulkError::Transition {
                ticket: key.to_string(),
                reason: format!("400 Bad Request: transition {transition_id} is not valid"),
            })?;
        self.update_ticket(key, |ticket| ticket.status = target)
    }

    fn set_label(&self, key: &str, label: &str) -> Result<()> {
        self.writes.borrow_mut().push(WriteCall::SetLabel {
            ticket: key.to_string(),
            label: label.to_string(),
        });
        self.check_writable(key)?;
        self.update_ticket(key, |ticket| {
            if !ticket.labels.iter().any(|l| l == label) {
                ticket.labels.push(label.to_string());
            }
        })
    }

    fn set_due_date(&self, key: &str, date: NaiveDate) -> Result<()> {
        self.writes.borrow_mut().push(WriteCall::SetDueDate {
            ticket: key.to_string(),
            date,
        });
        self.check_writable(key)?;
        self.update_ticket(key, |ticket| ticket.due_date = Some(date))
    }
}
