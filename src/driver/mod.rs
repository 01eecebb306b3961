//! Execution driver: one end-to-end run.
//!
//! Resolve → Compile → Fetch → (Plan → Act)* → Summarize, strictly
//! sequential. Fatal errors are returned before any ticket is touched;
//! per-ticket failures are recorded in the `RunReport` and processing moves
//! on to the next instruction.

use crate::backend::Tracker;
use crate::config::RunOptions;
use crate::error::{BulkError, ErrorCode, Result, StructuredError};
use crate::model::{ActionSet, FilterSet, Instruction, Scope, TicketSummary};
use crate::output::OutputContext;
use crate::plan::{DueDatePolicy, PlannedStep, plan_ticket};
use crate::query;
use crate::scope;
use crate::util::create_spinner;
use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// What happened to one planned or attempted mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    /// Previewed in a dry run; nothing was written.
    Planned,
    Applied,
    Failed,
    /// The action does not apply to this ticket.
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outcome {
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instruction: Option<Instruction>,
    pub status: OutcomeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<ErrorCode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Outcome {
    fn planned(instruction: Instruction) -> Self {
        Self {
            description: instruction.describe(true),
            instruction: Some(instruction),
            status: OutcomeStatus::Planned,
            code: None,
            error: None,
        }
    }

    fn applied(instruction: Instruction) -> Self {
        Self {
            description: instruction.describe_applied(),
            instruction: Some(instruction),
            status: OutcomeStatus::Applied,
            code: None,
            error: None,
        }
    }

    fn failed(description: String, instruction: Option<Instruction>, err: &BulkError) -> Self {
        Self {
            description,
            instruction,
            status: OutcomeStatus::Failed,
            code: Some(StructuredError::from_error(err).code),
            error: Some(err.to_string()),
        }
    }

    fn skipped(description: String) -> Self {
        Self {
            description,
            instruction: None,
            status: OutcomeStatus::Skipped,
            code: None,
            error: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TicketReport {
    pub ticket: String,
    pub outcomes: Vec<Outcome>,
}

/// End-of-run counts.
///
/// `attempted` counts every planned instruction plus every planning or
/// loading failure; in a dry run nothing succeeds because nothing is written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub tickets_matched: usize,
    pub planned: usize,
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub query: String,
    pub dry_run: bool,
    pub tickets: Vec<TicketReport>,
    pub summary: Summary,
}

impl RunReport {
    /// Every instruction planned in this run, in execution order, whether
    /// previewed, applied or rejected by the backend.
    #[must_use]
    pub fn planned_instructions(&self) -> Vec<&Instruction> {
        self.tickets
            .iter()
            .flat_map(|t| &t.outcomes)
            .filter_map(|o| o.instruction.as_ref())
            .collect()
    }

    /// Outcomes that failed, with their ticket key.
    #[must_use]
    pub fn failures(&self) -> Vec<(&str, &Outcome)> {
        self.tickets
            .iter()
            .flat_map(|t| t.outcomes.iter().map(move |o| (t.ticket.as_str(), o)))
            .filter(|(_, o)| o.status == OutcomeStatus::Failed)
            .collect()
    }
}

/// Runs one bulk operation against a tracker.
pub struct Driver<'a, T: Tracker + ?Sized> {
    tracker: &'a T,
    options: RunOptions,
}

impl<'a, T: Tracker + ?Sized> Driver<'a, T> {
    #[must_use]
    pub fn new(tracker: &'a T, options: RunOptions) -> Self {
        Self { tracker, options }
    }

    /// Execute the run and return its report.
    ///
    /// # Errors
    ///
    /// Returns the first fatal error: authentication, scope resolution, or a
    /// failed search. Per-ticket failures are recorded in the report instead.
    pub fn run(
        &self,
        scope: &Scope,
        filters: &FilterSet,
        actions: &ActionSet,
        out: &OutputContext,
    ) -> Result<RunReport> {
        let session = self.tracker.authenticate()?;
        debug!(account_id = %session.account_id, "Session established");
        out.success("Jira authentication successful.");

        let spinner = create_spinner(&format!("Resolving {scope}..."), self.options.show_progress);
        let base = scope::resolve(self.tracker, scope);
        spinner.finish_and_clear();
        let base = base?;

        let query = query::compile(&base, filters);
        info!(%query, "Compiled query");
        out.info(&format!("JQL: {query}"));

        let spinner = create_spinner("Fetching issues...", self.options.show_progress);
        let matched = self.fetch_all(&query);
        spinner.finish_and_clear();
        let matched = matched?;

        let mut report = RunReport {
            query,
            dry_run: self.options.dry_run,
            tickets: Vec::with_capacity(matched.len()),
            summary: Summary {
                tickets_matched: matched.len(),
                ..Summary::default()
            },
        };

        if matched.is_empty() {
            out.info("No issues found matching the filters.");
            return Ok(report);
        }
        out.info(&format!("Total issues matching filters: {}", matched.len()));

        if actions.is_empty() {
            out.warning("No actions requested; nothing to do.");
        } else if self.options.dry_run {
            out.section("Dry run: no changes will be made");
        }

        if !actions.is_empty() {
            for hit in &matched {
                let ticket_report = self.process_ticket(hit, actions, out);
                tally(&mut report.summary, &ticket_report);
                report.tickets.push(ticket_report);
            }
        }

        print_summary(&report, out);
        Ok(report)
    }

    /// Fetch every ticket the query matches, page by page.
    ///
    /// Stops at the first short or empty page. Keys already seen are dropped
    /// so a ticket shifted across a page boundary is processed once.
    ///
    /// # Errors
    ///
    /// Returns the backend error of any failed page request.
    pub fn fetch_all(&self, query: &str) -> Result<Vec<TicketSummary>> {
        let page_size = self.options.page_size.max(1);
        let mut seen = HashSet::new();
        let mut all = Vec::new();
        let mut start_at = 0;

        loop {
            let page = self.tracker.search(query, start_at, page_size)?;
            let returned = page.len();
            debug!(start_at, returned, "Fetched search page");
            start_at += returned;

            for hit in page {
                if seen.insert(hit.key.clone()) {
                    all.push(hit);
                } else {
                    debug!(key = %hit.key, "Dropping duplicate search hit");
                }
            }

            if returned < page_size {
                break;
            }
        }

        Ok(all)
    }

    fn process_ticket(
        &self,
        hit: &TicketSummary,
        actions: &ActionSet,
        out: &OutputContext,
    ) -> TicketReport {
        let mut outcomes = Vec::new();

        let ticket = match self.tracker.get_ticket(&hit.key) {
            Ok(ticket) => ticket,
            Err(err) => {
                warn!(ticket = %hit.key, error = %err, "Failed to load ticket");
                let description = format!("Could not load {}", hit.key);
                out.failure(&format!("{description}: {err}"));
                outcomes.push(Outcome::failed(description, None, &err));
                return TicketReport {
                    ticket: hit.key.clone(),
                    outcomes,
                };
            }
        };

        let due = DueDatePolicy {
            today: self.options.today,
            base: self.options.due_from,
        };
        let plan = plan_ticket(self.tracker, &ticket, actions, due);

        for step in plan.steps {
            let outcome = match step {
                PlannedStep::Apply(instruction) if self.options.dry_run => {
                    out.info(&instruction.describe(true));
                    Outcome::planned(instruction)
                }
                PlannedStep::Apply(instruction) => self.apply(instruction, out),
                PlannedStep::Failed(err) => {
                    let description = match &err {
                        BulkError::NoValidTransition { status, .. } => {
                            format!("Move {} to '{status}'", ticket.key)
                        }
                        _ => format!("Plan {}", ticket.key),
                    };
                    out.failure(&err.to_string());
                    Outcome::failed(description, None, &err)
                }
                PlannedStep::Skipped(reason) => {
                    let description = format!("Skipped due date for {}: {reason}", ticket.key);
                    out.muted(&description);
                    Outcome::skipped(description)
                }
            };
            outcomes.push(outcome);
        }

        TicketReport {
            ticket: ticket.key,
            outcomes,
        }
    }

    fn apply(&self, instruction: Instruction, out: &OutputContext) -> Outcome {
        debug!(ticket = instruction.ticket(), action = %instruction.describe(false), "Applying");
        let result = match &instruction {
            Instruction::SetLabel { ticket, label } => self.tracker.set_label(ticket, label),
            Instruction::Transition {
                ticket,
                transition_id,
                ..
            } => self.tracker.apply_transition(ticket, transition_id),
            Instruction::SetDueDate { ticket, date, .. } => self.tracker.set_due_date(ticket, *date),
        };

        match result {
            Ok(()) => {
                out.success(&instruction.describe_applied());
                Outcome::applied(instruction)
            }
            Err(err) => {
                warn!(ticket = instruction.ticket(), error = %err, "Write failed");
                out.failure(&err.to_string());
                Outcome::failed(instruction.describe(false), Some(instruction), &err)
            }
        }
    }
}

fn tally(summary: &mut Summary, ticket: &TicketReport) {
    for outcome in &ticket.outcomes {
        match outcome.status {
            OutcomeStatus::Planned => {
                summary.planned += 1;
                summary.attempted += 1;
            }
            OutcomeStatus::Applied => {
                summary.planned += 1;
                summary.attempted += 1;
                summary.succeeded += 1;
            }
            OutcomeStatus::Failed => {
                if outcome.instruction.is_some() {
                    summary.planned += 1;
                }
                summary.attempted += 1;
                summary.failed += 1;
            }
            OutcomeStatus::Skipped => summary.skipped += 1,
        }
    }
}

fn print_summary(report: &RunReport, out: &OutputContext) {
    let s = &report.summary;
    out.section("Summary");
    out.info(&format!("Tickets matched: {}", s.tickets_matched));
    if report.dry_run {
        out.info(&format!("Changes planned: {}", s.planned));
    } else {
        out.info(&format!("Changes attempted: {}", s.attempted));
        out.info(&format!("Succeeded: {}", s.succeeded));
    }
    out.info(&format!("Failed: {}", s.failed));
    out.info(&format!("Skipped: {}", s.skipped));
    for (ticket, outcome) in report.failures() {
        out.muted(&format!(
            "  {ticket}: {}",
            outcome.error.as_deref().unwrap_or(&outcome.description)
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{MemoryTracker, WriteCall};
    use crate::logging::init_test_logging;
    use crate::model::{Priority, Ticket, Transition};
    use crate::output::OutputMode;
    use chrono::NaiveDate;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 8, 12).unwrap()
    }

    fn ticket(key: &str, priority: Priority) -> Ticket {
        Ticket {
            key: key.to_string(),
            status: "To Do".to_string(),
            priority,
            labels: vec![],
            due_date: None,
            created: None,
        }
    }

    fn tracker() -> MemoryTracker {
        MemoryTracker::new()
            .with_project("SEC", "Security")
            .with_tickets([ticket("SEC-1", Priority::High), ticket("SEC-2", Priority::Informational)])
            .with_default_transitions(vec![Transition::new("31", "Done")])
    }

    fn all_actions() -> ActionSet {
        ActionSet {
            add_label: Some("triaged".to_string()),
            move_to: Some("Done".to_string()),
            set_due_date: true,
        }
    }

    #[test]
    fn test_run_applies_in_fixed_order() {
        init_test_logging();
        info!("test_run_applies_in_fixed_order: starting");
        let tracker = tracker();
        let (out, buffer) = OutputContext::capture(OutputMode::Plain);
        let driver = Driver::new(&tracker, RunOptions::new(today()));

        let report = driver
            .run(&Scope::Project("SEC".to_string()), &FilterSet::new(), &all_actions(), &out)
            .unwrap();

        assert_eq!(report.query, "project = SEC ORDER BY Rank ASC");
        assert_eq!(
            tracker.writes()[..3],
            [
                WriteCall::SetLabel {
                    ticket: "SEC-1".to_string(),
                    label: "triaged".to_string(),
                },
                WriteCall::Transition {
                    ticket: "SEC-1".to_string(),
                    transition_id: "31".to_string(),
                },
                WriteCall::SetDueDate {
                    ticket: "SEC-1".to_string(),
                    date: NaiveDate::from_ymd_opt(2025, 8, 27).unwrap(),
                },
            ]
        );
        // SEC-2 has no due-date policy.
        assert_eq!(tracker.writes().len(), 5);
        assert_eq!(
            report.summary,
            Summary {
                tickets_matched: 2,
                planned: 5,
                attempted: 5,
                succeeded: 5,
                failed: 0,
                skipped: 1,
            }
        );
        let lines = buffer.lines();
        assert!(lines.contains(&"✓ Jira authentication successful.".to_string()));
        assert!(lines.contains(&"Total issues matching filters: 2".to_string()));
        assert!(lines.contains(&"✓ Moved SEC-1 to 'Done'".to_string()));
        info!("test_run_applies_in_fixed_order: assertions passed");
    }

    #[test]
    fn test_run_with_no_matches_prints_notice() {
        let tracker = MemoryTracker::new().with_project("SEC", "Security");
        let (out, buffer) = OutputContext::capture(OutputMode::Plain);
        let report = Driver::new(&tracker, RunOptions::new(today()))
            .run(&Scope::Project("SEC".to_string()), &FilterSet::new(), &all_actions(), &out)
            .unwrap();
        assert!(report.tickets.is_empty());
        assert_eq!(report.summary.tickets_matched, 0);
        assert!(
            buffer
                .lines()
                .contains(&"No issues found matching the filters.".to_string())
        );
        assert_eq!(tracker.transition_lookups(), 0);
    }

    #[test]
    fn test_scope_failure_is_fatal() {
        let tracker = tracker();
        let (out, _buffer) = OutputContext::capture(OutputMode::Quiet);
        let err = Driver::new(&tracker, RunOptions::new(today()))
            .run(&Scope::Board("Missing".to_string()), &FilterSet::new(), &all_actions(), &out)
            .unwrap_err();
        assert!(err.is_fatal());
        assert!(tracker.searches().is_empty());
        assert!(tracker.writes().is_empty());
    }

    #[test]
    fn test_auth_failure_is_fatal() {
        let tracker = tracker().reject_auth();
        let (out, _buffer) = OutputContext::capture(OutputMode::Quiet);
        let err = Driver::new(&tracker, RunOptions::new(today()))
            .run(&Scope::Project("SEC".to_string()), &FilterSet::new(), &all_actions(), &out)
            .unwrap_err();
        assert!(matches!(err, BulkError::Auth { .. }));
    }

    #[test]
    fn test_write_failure_does_not_stop_ticket() {
        let tracker = tracker().fail_writes_for("SEC-1");
        let (out, _buffer) = OutputContext::capture(OutputMode::Quiet);
        let report = Driver::new(&tracker, RunOptions::new(today()))
            .run(&Scope::Project("SEC".to_string()), &FilterSet::new(), &all_actions(), &out)
            .unwrap();

        let sec1 = &report.tickets[0];
        let statuses: Vec<OutcomeStatus> = sec1.outcomes.iter().map(|o| o.status).collect();
        assert_eq!(
            statuses,
            vec![OutcomeStatus::Failed, OutcomeStatus::Applied, OutcomeStatus::Failed]
        );
        assert_eq!(sec1.outcomes[0].code, Some(ErrorCode::WriteFailed));
        assert_eq!(report.summary.failed, 2);
        assert_eq!(report.summary.succeeded, 3);
        assert_eq!(report.failures().len(), 2);
    }

    #[test]
    fn test_fetch_all_stops_on_short_page() {
        let tracker = MemoryTracker::new().with_tickets((1..=7).map(|n| ticket(&format!("T-{n}"), Priority::Low)));
        let mut options = RunOptions::new(today());
        options.page_size = 3;
        let driver = Driver::new(&tracker, options);
        let hits = driver.fetch_all("project = T").unwrap();
        assert_eq!(hits.len(), 7);
        let offsets: Vec<usize> = tracker.searches().iter().map(|s| s.start_at).collect();
        assert_eq!(offsets, vec![0, 3, 6]);
    }

    #[test]
    fn test_report_serializes_outcomes() {
        let tracker = tracker();
        let (out, _buffer) = OutputContext::capture(OutputMode::Json);
        let report = Driver::new(&tracker, RunOptions::new(today()).dry_run(true))
            .run(&Scope::Project("SEC".to_string()), &FilterSet::new(), &all_actions(), &out)
            .unwrap();
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["dry_run"], true);
        assert_eq!(value["tickets"][0]["outcomes"][0]["status"], "planned");
        assert_eq!(value["tickets"][0]["outcomes"][0]["instruction"]["kind"], "set_label");
        assert_eq!(value["summary"]["succeeded"], 0);
    }
}
