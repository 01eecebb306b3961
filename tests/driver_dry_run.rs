mod common;

use common::fixtures::{options, ticket_with_priority, workflow};
use jira_bulk::backend::MemoryTracker;
use jira_bulk::driver::{Driver, OutcomeStatus};
use jira_bulk::model::{ActionSet, FilterSet, Priority, Scope};
use jira_bulk::output::{OutputContext, OutputMode};

fn tracker() -> MemoryTracker {
    MemoryTracker::new()
        .with_project("OPS", "Operations")
        .with_tickets([
            ticket_with_priority("OPS-1", Priority::Critical),
            ticket_with_priority("OPS-2", Priority::Low),
            ticket_with_priority("OPS-3", Priority::Informational),
        ])
        .with_default_transitions(workflow())
}

fn every_action() -> ActionSet {
    ActionSet {
        add_label: Some("ops-review".to_string()),
        move_to: Some("in progress".to_string()),
        set_due_date: true,
    }
}

#[test]
fn dry_run_performs_no_writes() {
    let _log = common::test_log("dry_run_performs_no_writes");
    let tracker = tracker();
    let (out, buffer) = OutputContext::capture(OutputMode::Plain);

    let report = Driver::new(&tracker, options().dry_run(true))
        .run(&Scope::Project("Operations".to_string()), &FilterSet::new(), &every_action(), &out)
        .expect("run");

    assert!(tracker.writes().is_empty());
    // Transition feasibility is still checked.
    assert_eq!(tracker.transition_lookups(), 3);
    assert!(report.dry_run);
    assert_eq!(report.summary.planned, 8);
    assert_eq!(report.summary.succeeded, 0);
    assert_eq!(report.summary.skipped, 1);
    assert!(
        report
            .tickets
            .iter()
            .flat_map(|t| &t.outcomes)
            .all(|o| matches!(o.status, OutcomeStatus::Planned | OutcomeStatus::Skipped))
    );

    let lines = buffer.lines();
    assert!(lines.contains(&"Would update OPS-1 with label 'ops-review'".to_string()));
    assert!(lines.contains(&"Would move OPS-1 to 'in progress'".to_string()));
    assert!(lines.contains(&"Would set due date for OPS-1 to 19-08-2025 (Critical)".to_string()));
    assert!(lines.contains(&"Would set due date for OPS-2 to 10-11-2025 (Low)".to_string()));
}

#[test]
fn dry_run_plans_what_a_real_run_applies() {
    let _log = common::test_log("dry_run_plans_what_a_real_run_applies");
    let scope = Scope::Project("OPS".to_string());
    let (out, _buffer) = OutputContext::capture(OutputMode::Quiet);

    let preview_tracker = tracker();
    let preview = Driver::new(&preview_tracker, options().dry_run(true))
        .run(&scope, &FilterSet::new(), &every_action(), &out)
        .expect("dry run");

    let live_tracker = tracker();
    let live = Driver::new(&live_tracker, options())
        .run(&scope, &FilterSet::new(), &every_action(), &out)
        .expect("live run");

    assert_eq!(preview.planned_instructions(), live.planned_instructions());
    assert_eq!(live_tracker.writes().len(), live.planned_instructions().len());
    assert_eq!(live.summary.succeeded, 8);
    assert_eq!(
        live_tracker.ticket("OPS-1").unwrap().status,
        "In Progress"
    );
}
