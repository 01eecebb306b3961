//! Per-ticket action planning.
//!
//! Turns the requested `ActionSet` into concrete `Instruction`s for one
//! ticket snapshot. The only backend read is `list_transitions`, made once
//! and only when a status move is requested. Planning never writes.

use crate::backend::Tracker;
use crate::error::BulkError;
use crate::model::{Action, ActionSet, DueDateBase, Instruction, Ticket, Transition};
use chrono::{Days, NaiveDate};
use tracing::{debug, warn};

/// Inputs to due-date planning that do not come from the ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DueDatePolicy {
    pub today: NaiveDate,
    pub base: DueDateBase,
}

/// Outcome of planning one requested action.
#[derive(Debug)]
pub enum PlannedStep {
    /// A mutation to apply (or preview).
    Apply(Instruction),
    /// The action cannot be carried out for this ticket.
    Failed(BulkError),
    /// The action does not apply to this ticket.
    Skipped(String),
}

/// Everything planned for one ticket, in label, transition, due-date order.
#[derive(Debug, Default)]
pub struct TicketPlan {
    pub ticket: String,
    pub steps: Vec<PlannedStep>,
}

impl TicketPlan {
    /// The planned instructions, in application order.
    #[must_use]
    pub fn instructions(&self) -> Vec<&Instruction> {
        self.steps
            .iter()
            .filter_map(|step| match step {
                PlannedStep::Apply(instruction) => Some(instruction),
                _ => None,
            })
            .collect()
    }

    #[must_use]
    pub fn failures(&self) -> Vec<&BulkError> {
        self.steps
            .iter()
            .filter_map(|step| match step {
                PlannedStep::Failed(err) => Some(err),
                _ => None,
            })
            .collect()
    }

    #[must_use]
    pub fn skipped(&self) -> Vec<&str> {
        self.steps
            .iter()
            .filter_map(|step| match step {
                PlannedStep::Skipped(reason) => Some(reason.as_str()),
                _ => None,
            })
            .collect()
    }
}

/// Plan every requested action for one ticket.
pub fn plan_ticket<T: Tracker + ?Sized>(
    tracker: &T,
    ticket: &Ticket,
    actions: &ActionSet,
    due: DueDatePolicy,
) -> TicketPlan {
    let steps = actions
        .actions()
        .into_iter()
        .map(|action| match action {
            Action::AddLabel(label) => PlannedStep::Apply(Instruction::SetLabel {
                ticket: ticket.key.clone(),
                label,
            }),
            Action::MoveToStatus(status) => match plan_transition(tracker, ticket, &status) {
                Ok(instruction) => PlannedStep::Apply(instruction),
                Err(err) => {
                    warn!(ticket = %ticket.key, error = %err, "Cannot plan status move");
                    PlannedStep::Failed(err)
                }
            },
            Action::SetDueDate => match plan_due_date(ticket, due) {
                Ok(instruction) => PlannedStep::Apply(instruction),
                Err(reason) => {
                    debug!(ticket = %ticket.key, %reason, "Skipping due date");
                    PlannedStep::Skipped(reason)
                }
            },
        })
        .collect();

    TicketPlan {
        ticket: ticket.key.clone(),
        steps,
    }
}

fn plan_transition<T: Tracker + ?Sized>(
    tracker: &T,
    ticket: &Ticket,
    status: &str,
) -> Result<Instruction, BulkError> {
    let available = tracker.list_transitions(&ticket.key)?;
    debug!(
        ticket = %ticket.key,
        available = ?available.iter().map(|t| t.name.as_str()).collect::<Vec<_>>(),
        "Listed transitions"
    );
    let transition_id =
        match_transition(&available, status).ok_or_else(|| BulkError::NoValidTransition {
            ticket: ticket.key.clone(),
            status: status.to_string(),
        })?;
    Ok(Instruction::Transition {
        ticket: ticket.key.clone(),
        transition_id,
        status: status.to_string(),
    })
}

/// Due-date instruction, or the reason the ticket is skipped.
fn plan_due_date(ticket: &Ticket, due: DueDatePolicy) -> Result<Instruction, String> {
    let offset = ticket
        .priority
        .due_offset_days()
        .ok_or_else(|| format!("priority '{}' has no due-date policy", ticket.priority))?;
    let base = match due.base {
        DueDateBase::Today => due.today,
        DueDateBase::Created => ticket
            .created
            .ok_or_else(|| "no creation date".to_string())?,
    };
    let days = u64::try_from(offset).map_err(|_| format!("negative offset {offset}"))?;
    let date = base
        .checked_add_days(Days::new(days))
        .ok_or_else(|| "due date out of range".to_string())?;
    Ok(Instruction::SetDueDate {
        ticket: ticket.key.clone(),
        date,
        priority: ticket.priority.clone(),
    })
}

/// Find the transition whose name matches `requested`, ignoring case.
///
/// When several names match case-insensitively, a single exact-case match
/// wins; otherwise the lookup is ambiguous and returns `None`.
#[must_use]
pub fn match_transition(available: &[Transition], requested: &str) -> Option<String> {
    let wanted = requested.trim().to_lowercase();
    let matches: Vec<&Transition> = available
        .iter()
        .filter(|t| t.name.trim().to_lowercase() == wanted)
        .collect();

    match matches.as_slice() {
        [] => None,
        [only] => Some(only.id.clone()),
        many => {
            let exact: Vec<&&Transition> =
                many.iter().filter(|t| t.name.trim() == requested.trim()).collect();
            match exact.as_slice() {
                [only] => Some(only.id.clone()),
                _ => None,
            }
        }
    }
}
